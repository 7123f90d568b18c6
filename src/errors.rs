//! Error types for measurement runs.
//!
//! Fatal failures abort a run and carry a user-facing message, an optional
//! suggestion and the underlying probe error. Each kind maps onto a process
//! exit code so the CLI can report failures to scripts.

use std::error::Error;
use std::fmt;

/// Boxed error returned by probe implementations.
pub type ProbeError = Box<dyn Error + Send + Sync>;

/// Exit codes for the application.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// The measurement backend could not be reached.
    pub const BACKEND_UNAVAILABLE: i32 = 1;
    /// A download or upload transfer failed.
    pub const TRANSFER_FAILED: i32 = 2;
    /// Configuration error (invalid arguments, bad backend URL).
    pub const CONFIG_ERROR: i32 = 3;
    /// Results could not be written.
    pub const OUTPUT_ERROR: i32 = 5;
    /// The run was interrupted by the user.
    pub const CANCELLED: i32 = 130;
}

/// Categories of errors that can occur during a measurement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server discovery failed; no measurement could start.
    BackendUnavailable,
    /// The download or upload phase failed.
    TransferFailed,
    /// Latency sampling fell back to default values. Never fatal.
    ProbeDegraded,
    /// The run was cancelled before it finished.
    Cancelled,
    /// Invalid configuration or arguments.
    Config,
    /// Writing results failed.
    Output,
}

impl ErrorKind {
    /// Get the exit code for this error kind.
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorKind::BackendUnavailable => exit_codes::BACKEND_UNAVAILABLE,
            ErrorKind::TransferFailed => exit_codes::TRANSFER_FAILED,
            ErrorKind::ProbeDegraded => exit_codes::SUCCESS,
            ErrorKind::Cancelled => exit_codes::CANCELLED,
            ErrorKind::Config => exit_codes::CONFIG_ERROR,
            ErrorKind::Output => exit_codes::OUTPUT_ERROR,
        }
    }

    /// Get a user-friendly description of this error kind.
    pub fn description(&self) -> &'static str {
        match self {
            ErrorKind::BackendUnavailable => "Backend unavailable",
            ErrorKind::TransferFailed => "Transfer failed",
            ErrorKind::ProbeDegraded => "Latency probe degraded",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Config => "Configuration error",
            ErrorKind::Output => "Output error",
        }
    }

    /// Whether this kind ends a run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ErrorKind::ProbeDegraded)
    }
}

/// Likely root cause of a probe failure, derived from its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCause {
    Dns,
    Timeout,
    Tls,
    Connection,
    Other,
}

impl FailureCause {
    /// Suggestion shown to the user for this cause.
    pub fn suggestion(&self) -> &'static str {
        match self {
            FailureCause::Dns => {
                "Check your DNS settings or try using a different DNS server."
            }
            FailureCause::Timeout => {
                "The server may be slow or unreachable. Try again later."
            }
            FailureCause::Tls => {
                "There may be a certificate issue. Check your system time."
            }
            FailureCause::Connection => {
                "Check your internet connection and try again."
            }
            FailureCause::Other => {
                "The measurement service may be experiencing issues. Try again later."
            }
        }
    }
}

/// A user-friendly error for measurement operations.
#[derive(Debug)]
pub struct MeasurementError {
    /// The kind of error.
    pub kind: ErrorKind,
    /// User-friendly error message.
    pub message: String,
    /// Optional suggestion for how to resolve the error.
    pub suggestion: Option<String>,
    /// The underlying error, if any.
    pub source: Option<ProbeError>,
}

impl MeasurementError {
    /// Create a new MeasurementError.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), suggestion: None, source: None }
    }

    /// Add a suggestion for how to resolve the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add the underlying error source.
    pub fn with_source(mut self, source: impl Into<ProbeError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// Wrap a probe failure, picking a suggestion from the failure text.
    pub fn from_probe(kind: ErrorKind, context: &str, error: ProbeError) -> Self {
        let cause = classify_cause(error.as_ref());
        Self::new(kind, format!("{}: {}", context, error))
            .with_suggestion(cause.suggestion())
            .with_source(error)
    }

    pub fn transfer_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransferFailed, message)
    }

    pub fn probe_degraded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProbeDegraded, message).with_suggestion(
            "Ping and jitter fell back to defaults; latency verdicts are approximate.",
        )
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "measurement run was cancelled")
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Output, message)
    }
}

impl fmt::Display for MeasurementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.description(), self.message)?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  Suggestion: {}", suggestion)?;
        }

        Ok(())
    }
}

impl Error for MeasurementError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn Error + 'static))
    }
}

/// Guess the root cause of a probe error from its message.
pub fn classify_cause(error: &(dyn Error + Send + Sync)) -> FailureCause {
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("dns")
        || error_str.contains("resolve")
        || error_str.contains("no such host")
    {
        return FailureCause::Dns;
    }

    if error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("deadline")
    {
        return FailureCause::Timeout;
    }

    if error_str.contains("tls")
        || error_str.contains("ssl")
        || error_str.contains("certificate")
    {
        return FailureCause::Tls;
    }

    if error_str.contains("connection refused")
        || error_str.contains("connection reset")
        || error_str.contains("network unreachable")
        || error_str.contains("host unreachable")
        || error_str.contains("no route")
        || error_str.contains("broken pipe")
        || error_str.contains("error sending request")
    {
        return FailureCause::Connection;
    }

    FailureCause::Other
}

/// Format an error for user display.
pub fn format_error_for_display(error: &MeasurementError) -> String {
    let mut output = format!("Error: {}", error.message);

    if let Some(ref suggestion) = error.suggestion {
        output.push_str(&format!("\n\nSuggestion: {}", suggestion));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error(kind: std::io::ErrorKind, message: &str) -> ProbeError {
        Box::new(std::io::Error::new(kind, message.to_string()))
    }

    #[test]
    fn test_error_kind_exit_codes() {
        assert_eq!(
            ErrorKind::BackendUnavailable.exit_code(),
            exit_codes::BACKEND_UNAVAILABLE
        );
        assert_eq!(
            ErrorKind::TransferFailed.exit_code(),
            exit_codes::TRANSFER_FAILED
        );
        assert_eq!(ErrorKind::ProbeDegraded.exit_code(), exit_codes::SUCCESS);
        assert_eq!(ErrorKind::Cancelled.exit_code(), exit_codes::CANCELLED);
        assert_eq!(ErrorKind::Config.exit_code(), exit_codes::CONFIG_ERROR);
        assert_eq!(ErrorKind::Output.exit_code(), exit_codes::OUTPUT_ERROR);
    }

    #[test]
    fn test_only_probe_degraded_is_non_fatal() {
        assert!(!ErrorKind::ProbeDegraded.is_fatal());
        assert!(ErrorKind::BackendUnavailable.is_fatal());
        assert!(ErrorKind::TransferFailed.is_fatal());
        assert!(ErrorKind::Cancelled.is_fatal());
    }

    #[test]
    fn test_measurement_error_display() {
        let error = MeasurementError::new(
            ErrorKind::BackendUnavailable,
            "Failed to discover a server",
        )
        .with_suggestion(FailureCause::Connection.suggestion());

        let display = format!("{}", error);
        assert!(display.contains("Backend unavailable"));
        assert!(display.contains("Failed to discover"));
        assert!(display.contains("Suggestion"));
    }

    #[test]
    fn test_classify_cause_dns() {
        let error = io_error(
            std::io::ErrorKind::Other,
            "DNS resolution failed: no such host",
        );
        assert_eq!(classify_cause(error.as_ref()), FailureCause::Dns);
    }

    #[test]
    fn test_classify_cause_timeout() {
        let error =
            io_error(std::io::ErrorKind::TimedOut, "connection timed out");
        assert_eq!(classify_cause(error.as_ref()), FailureCause::Timeout);
    }

    #[test]
    fn test_classify_cause_connection() {
        let error = io_error(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        );
        assert_eq!(classify_cause(error.as_ref()), FailureCause::Connection);
    }

    #[test]
    fn test_classify_cause_other() {
        let error = io_error(std::io::ErrorKind::Other, "some random error");
        assert_eq!(classify_cause(error.as_ref()), FailureCause::Other);
    }

    #[test]
    fn test_from_probe_keeps_context_and_source() {
        let error = io_error(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        );

        let measurement_error = MeasurementError::from_probe(
            ErrorKind::TransferFailed,
            "Download test failed",
            error,
        );

        assert_eq!(measurement_error.kind, ErrorKind::TransferFailed);
        assert!(measurement_error.message.contains("Download test failed"));
        assert!(measurement_error.message.contains("connection refused"));
        assert_eq!(
            measurement_error.suggestion.as_deref(),
            Some(FailureCause::Connection.suggestion())
        );
        assert!(Error::source(&measurement_error).is_some());
    }

    #[test]
    fn test_format_error_for_display() {
        let error = MeasurementError::config("samples must be at least 1")
            .with_suggestion("Pass --samples 1 or higher.");

        let output = format_error_for_display(&error);
        assert!(output.starts_with("Error: samples must be at least 1"));
        assert!(output.contains("Suggestion: Pass --samples 1 or higher."));
    }

    #[test]
    fn test_cancelled_has_no_suggestion() {
        let error = MeasurementError::cancelled();
        assert_eq!(error.kind, ErrorKind::Cancelled);
        assert!(error.suggestion.is_none());
        assert_eq!(format_error_for_display(&error).lines().count(), 1);
    }
}
