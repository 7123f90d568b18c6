//! Suitability classification of a metrics snapshot.
//!
//! Each use case is rated by checking every metric it names against its
//! threshold pair. The use case's status is the worst of those per-metric
//! ratings, and its message is the one registered for that status.
//!
//! Classification is pure: the same snapshot and catalog always produce the
//! same results, and no state is shared between calls.

use crate::catalog::{ThresholdPair, UseCaseDefinition};
use crate::snapshot::{MetricsSnapshot, Polarity};
use serde::Serialize;
use std::fmt;

/// How well the connection serves a use case.
///
/// Variants are ordered worst to best so the aggregate of several checks is
/// simply their minimum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SuitabilityStatus {
    Bad,
    Moderate,
    Good,
}

impl SuitabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuitabilityStatus::Bad => "bad",
            SuitabilityStatus::Moderate => "moderate",
            SuitabilityStatus::Good => "good",
        }
    }
}

impl fmt::Display for SuitabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict for one use case.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult<'a> {
    pub use_case: &'a UseCaseDefinition,
    pub status: SuitabilityStatus,
    pub message: &'a str,
}

/// Rate a single metric value against its thresholds.
///
/// Boundaries are inclusive: a download exactly at `good` is good, a ping
/// exactly at `moderate` is moderate. Non-finite values rate as bad.
pub fn evaluate_metric(
    value: f64,
    thresholds: ThresholdPair,
    polarity: Polarity,
) -> SuitabilityStatus {
    match polarity {
        Polarity::HigherIsBetter => {
            if value >= thresholds.good {
                SuitabilityStatus::Good
            } else if value >= thresholds.moderate {
                SuitabilityStatus::Moderate
            } else {
                SuitabilityStatus::Bad
            }
        }
        Polarity::LowerIsBetter => {
            if value <= thresholds.good {
                SuitabilityStatus::Good
            } else if value <= thresholds.moderate {
                SuitabilityStatus::Moderate
            } else {
                SuitabilityStatus::Bad
            }
        }
    }
}

/// Classify a snapshot against a single use case.
pub fn classify_use_case<'a>(
    snapshot: &MetricsSnapshot,
    use_case: &'a UseCaseDefinition,
) -> ClassificationResult<'a> {
    let mut status = SuitabilityStatus::Good;

    for (metric, thresholds) in use_case.checks() {
        let rating =
            evaluate_metric(snapshot.value(metric), thresholds, metric.polarity());
        status = status.min(rating);

        if status == SuitabilityStatus::Bad {
            break;
        }
    }

    ClassificationResult { use_case, status, message: use_case.message_for(status) }
}

/// Classify a snapshot against every use case, preserving catalog order.
pub fn classify<'a>(
    snapshot: &MetricsSnapshot,
    catalog: &'a [UseCaseDefinition],
) -> Vec<ClassificationResult<'a>> {
    catalog
        .iter()
        .map(|use_case| classify_use_case(snapshot, use_case))
        .collect()
}
