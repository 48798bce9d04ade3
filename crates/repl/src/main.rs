use std::error::Error;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{self, Context};
use serde_json::Value;
use tools::{Bridge, Tool, ToolError};
use tracing_subscriber::filter::EnvFilter;

/// Drive a debugger through tool calls read from stdin, one per line:
/// `<tool> [json arguments]`
#[derive(Debug, Parser)]
struct Args {
    /// Config file to use instead of the default location
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Port `start-debugger` uses when the call does not name one
    #[clap(short, long)]
    port: Option<u16>,
}

#[derive(Debug, PartialEq)]
enum Command<'a> {
    Empty,
    Help,
    Quit,
    Call(&'a str, Value),
}

fn parse_line(line: &str) -> Result<Command<'_>, serde_json::Error> {
    let line = line.trim();
    let (name, rest) = line
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((line, ""));
    Ok(match name {
        "" => Command::Empty,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        tool if rest.is_empty() => Command::Call(tool, Value::Null),
        tool => Command::Call(tool, serde_json::from_str(rest)?),
    })
}

/// The error with any causes its own message does not already include
fn describe(error: &ToolError) -> String {
    let mut out = error.to_string();
    let mut cause = error.source().and_then(|source| source.source());
    while let Some(e) = cause {
        out.push_str(": ");
        out.push_str(&e.to_string());
        cause = e.source();
    }
    out
}

fn print_help(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "usage: <tool> [json arguments]\n")?;
    for tool in Tool::ALL {
        writeln!(out, "  {:<26}{}", tool.name(), tool.description())?;
    }
    writeln!(out, "\n  {:<26}stop the debugger and exit", "quit")
}

fn init_tracing() {
    let in_ci = std::env::var("CI")
        .map(|val| val == "true")
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if std::io::stderr().is_terminal() || in_ci {
        builder.init();
    } else {
        builder.json().init();
    }
}

fn main() -> eyre::Result<()> {
    color_eyre::install().context("installing color_eyre")?;
    init_tracing();

    let args = Args::parse();
    let config = config::load(args.config.as_deref()).context("loading config")?;
    tracing::debug!(?config, "loaded config");

    let mut bridge = Bridge::new(config);
    if let Some(port) = args.port {
        bridge = bridge.with_default_port(port);
    }

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("reading from stdin")?;
        match parse_line(&line) {
            Ok(Command::Empty) => {}
            Ok(Command::Help) => print_help(&mut stdout)?,
            Ok(Command::Quit) => break,
            Ok(Command::Call(tool, arguments)) => match bridge.call(tool, arguments) {
                Ok(result) => writeln!(stdout, "{result}")?,
                Err(e) => writeln!(stdout, "error: {}", describe(&e))?,
            },
            Err(e) => writeln!(stdout, "error: invalid JSON arguments: {e}")?,
        }
        stdout.flush()?;
    }

    tracing::debug!("input finished, stopping debugger");
    if let Err(e) = bridge.stop_debugger() {
        tracing::warn!(error = %describe(&e), "stopping debugger on exit");
    }
    Ok(())
}
