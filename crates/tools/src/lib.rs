//! Debugger tools backed by a single DAP session
//!
//! Each tool takes JSON arguments, runs one or more session operations and
//! renders the result as text. [`Bridge::call`] is the entry point for
//! front ends.
mod bridge;
mod error;
pub mod format;
pub mod params;
mod tool;

pub use bridge::Bridge;
pub use error::ToolError;
pub use tool::Tool;
