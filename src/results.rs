//! Serializable report of a completed run.
//!
//! The report bundles the measured metrics with the verdicts derived from
//! them so a single JSON document describes the whole analysis.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classifier::{ClassificationResult, SuitabilityStatus};
use crate::probe::ServerHandle;
use crate::snapshot::MetricsSnapshot;
use crate::suggestions::Suggestion;

/// Crate version with the build's git revision, when known.
pub fn version() -> String {
    match option_env!("CRYOS_BUILD_GIT_HASH") {
        Some(hash) => format!("{} ({})", env!("CARGO_PKG_VERSION"), hash),
        None => env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Everything known about one analysis.
///
/// ```no_run
/// use cryos::classifier::classify;
/// use cryos::catalog::UseCaseCatalog;
/// use cryos::results::SuitabilityReport;
/// use cryos::snapshot::MetricsSnapshot;
/// use cryos::suggestions::suggest;
///
/// let metrics = MetricsSnapshot::new(60.0, 25.0, 20.0, 4.0);
/// let verdicts = classify(&metrics, UseCaseCatalog::standard().definitions());
/// let report =
///     SuitabilityReport::new(None, metrics, false, &verdicts, suggest(&metrics));
/// println!("{}", serde_json::to_string_pretty(&report).unwrap());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct SuitabilityReport {
    /// Timestamp when the report was built
    pub timestamp: DateTime<Utc>,
    /// Version of the tool that produced the report
    pub version: String,
    /// Measurement server, if one was discovered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerHandle>,
    /// Measured metrics
    pub metrics: MetricsSnapshot,
    /// True when ping and jitter are fallback values
    pub latency_degraded: bool,
    /// Per-use-case verdicts, in catalog order
    pub use_cases: Vec<UseCaseVerdict>,
    /// Improvement suggestions
    pub suggestions: Vec<Suggestion>,
}

impl SuitabilityReport {
    pub fn new(
        server: Option<ServerHandle>,
        metrics: MetricsSnapshot,
        latency_degraded: bool,
        classifications: &[ClassificationResult<'_>],
        suggestions: Vec<Suggestion>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            version: version(),
            server,
            metrics,
            latency_degraded,
            use_cases: classifications.iter().map(UseCaseVerdict::from).collect(),
            suggestions,
        }
    }
}

/// An owned copy of one classification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UseCaseVerdict {
    pub title: String,
    pub icon: String,
    pub status: SuitabilityStatus,
    pub message: String,
}

impl From<&ClassificationResult<'_>> for UseCaseVerdict {
    fn from(result: &ClassificationResult<'_>) -> Self {
        Self {
            title: result.use_case.title().to_string(),
            icon: result.use_case.icon().to_string(),
            status: result.status,
            message: result.message.to_string(),
        }
    }
}
