//! Terminal output for the command-line shell.

pub mod console;
pub mod mode;

pub use console::{print_summary, ConsoleSink};
pub use mode::DisplayMode;
