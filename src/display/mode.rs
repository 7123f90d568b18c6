//! Display mode detection.
//!
//! Determines whether to show live progress, stay silent until the summary,
//! or emit JSON, based on CLI flags and terminal capabilities.

/// The display mode for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Live progress on stderr followed by a colored summary
    Interactive,
    /// Silent mode - no output until final results
    Silent,
    /// JSON mode - structured output only
    Json,
}

impl DisplayMode {
    /// Determine display mode from CLI flags and environment.
    ///
    /// # Returns
    /// * `Json` when json_flag is true (regardless of is_tty)
    /// * `Interactive` when json_flag is false AND is_tty is true
    /// * `Silent` when json_flag is false AND is_tty is false
    pub fn detect(json_flag: bool, is_tty: bool) -> Self {
        if json_flag {
            DisplayMode::Json
        } else if is_tty {
            DisplayMode::Interactive
        } else {
            DisplayMode::Silent
        }
    }

    /// Whether progress events should be printed.
    pub fn shows_progress(&self) -> bool {
        matches!(self, DisplayMode::Interactive)
    }
}
