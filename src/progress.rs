//! Progress reporting for measurement runs.

use crate::probe::ServerHandle;
use std::fmt;

/// Lifecycle of a measurement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// No run has started
    Idle,
    /// Locating the measurement server
    DiscoveringServer,
    /// Sampling ping and jitter
    MeasuringLatency,
    /// Running the download transfer
    MeasuringDownload,
    /// Running the upload transfer
    MeasuringUpload,
    /// The run finished and produced a snapshot
    Complete,
    /// The run stopped early; no snapshot was produced
    Aborted,
}

impl RunPhase {
    /// Whether the run has ended, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Complete | RunPhase::Aborted)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::Idle => "idle",
            RunPhase::DiscoveringServer => "discovering server",
            RunPhase::MeasuringLatency => "measuring latency",
            RunPhase::MeasuringDownload => "measuring download",
            RunPhase::MeasuringUpload => "measuring upload",
            RunPhase::Complete => "complete",
            RunPhase::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Progress events emitted during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// The run entered a new phase
    PhaseChange(RunPhase),
    /// Overall completion and a human-readable status line
    Progress {
        /// Percent complete, 0-100, never decreasing within a run
        percent: u8,
        status: String,
    },
    /// Discovery picked a server
    ServerSelected(ServerHandle),
    /// One latency sample completed
    LatencySample {
        /// Measured latency in milliseconds
        value_ms: f64,
        /// Current sample number (1-indexed)
        current: usize,
        /// Total number of samples
        total: usize,
    },
    /// Latency sampling failed and fallback values are in use
    ProbeDegraded { reason: String },
    /// The run aborted
    Error(String),
}

/// Receiver of progress events.
///
/// Implementations must be non-blocking to avoid affecting
/// measurement accuracy.
pub trait ProgressSink: Send + Sync {
    /// Called when a progress event occurs.
    fn on_progress(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_progress(&self, event: ProgressEvent) {
        self(event)
    }
}

/// A sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn on_progress(&self, _event: ProgressEvent) {}
}
