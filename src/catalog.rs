//! Use-case definitions and the built-in catalog.
//!
//! A use case names a real-world activity (streaming, gaming, ...) and the
//! thresholds each relevant metric must meet. Definitions are validated when
//! they are built, so the classifier can trust every threshold it reads.

use crate::classifier::SuitabilityStatus;
use crate::snapshot::{Metric, Polarity};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::LazyLock;

/// Good and moderate thresholds for one metric.
///
/// The pair is read according to the metric's polarity: for throughput a
/// value must reach `good` to be good, for latency it must stay at or below
/// it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPair {
    pub good: f64,
    pub moderate: f64,
}

impl ThresholdPair {
    pub const fn new(good: f64, moderate: f64) -> Self {
        Self { good, moderate }
    }
}

/// One advisory message per status level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessages {
    pub good: String,
    pub moderate: String,
    pub bad: String,
}

impl StatusMessages {
    pub fn new(
        good: impl Into<String>,
        moderate: impl Into<String>,
        bad: impl Into<String>,
    ) -> Self {
        Self { good: good.into(), moderate: moderate.into(), bad: bad.into() }
    }
}

/// Reasons a use-case definition is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// The definition has no metric checks.
    EmptyChecks { title: String },
    /// The same metric was given two threshold pairs.
    DuplicateMetric { title: String, metric: Metric },
    /// A threshold is negative, infinite or NaN.
    InvalidThreshold { title: String, metric: Metric, value: f64 },
    /// `good` is on the wrong side of `moderate` for the metric's polarity.
    InconsistentOrdering { title: String, metric: Metric, pair: ThresholdPair },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::EmptyChecks { title } => {
                write!(f, "use case '{}' has no metric checks", title)
            }
            CatalogError::DuplicateMetric { title, metric } => write!(
                f,
                "use case '{}' checks {} more than once",
                title, metric
            ),
            CatalogError::InvalidThreshold { title, metric, value } => write!(
                f,
                "use case '{}' has invalid {} threshold {}",
                title, metric, value
            ),
            CatalogError::InconsistentOrdering { title, metric, pair } => {
                write!(
                    f,
                    "use case '{}' has {} thresholds in the wrong order \
                     (good {}, moderate {})",
                    title, metric, pair.good, pair.moderate
                )
            }
        }
    }
}

impl Error for CatalogError {}

/// A named activity with the thresholds it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct UseCaseDefinition {
    title: String,
    icon: String,
    checks: BTreeMap<Metric, ThresholdPair>,
    messages: StatusMessages,
}

impl UseCaseDefinition {
    /// Build a definition, rejecting empty, duplicate, non-finite, negative
    /// or misordered thresholds.
    pub fn new(
        title: impl Into<String>,
        icon: impl Into<String>,
        checks: impl IntoIterator<Item = (Metric, ThresholdPair)>,
        messages: StatusMessages,
    ) -> Result<Self, CatalogError> {
        let title = title.into();
        let mut map = BTreeMap::new();

        for (metric, pair) in checks {
            for value in [pair.good, pair.moderate] {
                if !value.is_finite() || value < 0.0 {
                    return Err(CatalogError::InvalidThreshold {
                        title,
                        metric,
                        value,
                    });
                }
            }

            let ordered = match metric.polarity() {
                Polarity::HigherIsBetter => pair.good >= pair.moderate,
                Polarity::LowerIsBetter => pair.good <= pair.moderate,
            };
            if !ordered {
                return Err(CatalogError::InconsistentOrdering {
                    title,
                    metric,
                    pair,
                });
            }

            if map.insert(metric, pair).is_some() {
                return Err(CatalogError::DuplicateMetric { title, metric });
            }
        }

        if map.is_empty() {
            return Err(CatalogError::EmptyChecks { title });
        }

        Ok(Self { title, icon: icon.into(), checks: map, messages })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn icon(&self) -> &str {
        &self.icon
    }

    /// Metric checks, ordered by metric.
    pub fn checks(&self) -> impl Iterator<Item = (Metric, ThresholdPair)> + '_ {
        self.checks.iter().map(|(metric, pair)| (*metric, *pair))
    }

    pub fn threshold(&self, metric: Metric) -> Option<ThresholdPair> {
        self.checks.get(&metric).copied()
    }

    pub fn messages(&self) -> &StatusMessages {
        &self.messages
    }

    /// The advisory message for `status`.
    pub fn message_for(&self, status: SuitabilityStatus) -> &str {
        match status {
            SuitabilityStatus::Good => &self.messages.good,
            SuitabilityStatus::Moderate => &self.messages.moderate,
            SuitabilityStatus::Bad => &self.messages.bad,
        }
    }
}

/// An ordered, read-only list of use cases. Order is display order.
#[derive(Debug, Clone, PartialEq)]
pub struct UseCaseCatalog {
    definitions: Vec<UseCaseDefinition>,
}

impl UseCaseCatalog {
    pub fn new(definitions: Vec<UseCaseDefinition>) -> Self {
        Self { definitions }
    }

    /// The built-in catalog of nine use cases, initialized on first use.
    pub fn standard() -> &'static UseCaseCatalog {
        &STANDARD_CATALOG
    }

    pub fn definitions(&self) -> &[UseCaseDefinition] {
        &self.definitions
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UseCaseDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl<'a> IntoIterator for &'a UseCaseCatalog {
    type Item = &'a UseCaseDefinition;
    type IntoIter = std::slice::Iter<'a, UseCaseDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.iter()
    }
}

static STANDARD_CATALOG: LazyLock<UseCaseCatalog> = LazyLock::new(|| {
    UseCaseCatalog::new(
        standard_definitions().expect("built-in use-case table is valid"),
    )
});

fn standard_definitions() -> Result<Vec<UseCaseDefinition>, CatalogError> {
    use Metric::{Download, Jitter, Ping, Upload};

    let pair = ThresholdPair::new;

    Ok(vec![
        UseCaseDefinition::new(
            "Video Streaming",
            "📺",
            [(Download, pair(25.0, 10.0))],
            StatusMessages::new(
                "Excellent! 4K HDR content will stream fluidly.",
                "Suitable for 720p-1080p. Multiple users may experience buffering.",
                "Too slow for smooth video playback. Expect frequent buffering.",
            ),
        )?,
        UseCaseDefinition::new(
            "Gaming / AR-VR",
            "🎮",
            [(Ping, pair(30.0, 80.0)), (Jitter, pair(5.0, 15.0))],
            StatusMessages::new(
                "Perfect for competitive gaming and real-time VR applications.",
                "Acceptable for casual games but may experience occasional lag in fast-paced titles.",
                "High latency will cause significant lag in most games and VR apps.",
            ),
        )?,
        UseCaseDefinition::new(
            "Video Calls",
            "🎥",
            [(Upload, pair(5.0, 2.0)), (Download, pair(5.0, 2.0))],
            StatusMessages::new(
                "Crisp HD video calls with multiple participants supported.",
                "Standard definition calls possible with occasional quality drops.",
                "Likely to experience freezing, pixelation and audio issues.",
            ),
        )?,
        UseCaseDefinition::new(
            "Industry 4.0 / IoT",
            "🏭",
            [
                (Ping, pair(20.0, 50.0)),
                (Upload, pair(10.0, 5.0)),
                (Jitter, pair(3.0, 10.0)),
            ],
            StatusMessages::new(
                "Ideal for industrial automation and real-time cloud sync.",
                "Usable for basic industrial applications with modest data needs.",
                "Too unreliable for critical industrial applications.",
            ),
        )?,
        UseCaseDefinition::new(
            "Banking / Transactions",
            "🏦",
            [(Ping, pair(80.0, 150.0)), (Jitter, pair(10.0, 20.0))],
            StatusMessages::new(
                "Fast and responsive for secure financial transactions.",
                "Transactions will work but with slight delays.",
                "Connection may time out during sensitive operations.",
            ),
        )?,
        UseCaseDefinition::new(
            "Healthcare / Telemedicine",
            "🏥",
            [
                (Download, pair(15.0, 5.0)),
                (Upload, pair(3.0, 1.0)),
                (Ping, pair(50.0, 100.0)),
                (Jitter, pair(5.0, 15.0)),
            ],
            StatusMessages::new(
                "Perfect for telemedicine consultations and medical image sharing.",
                "Basic telemedicine possible but image quality may be reduced.",
                "Not reliable enough for critical healthcare applications.",
            ),
        )?,
        UseCaseDefinition::new(
            "Smart City Infrastructure",
            "🌆",
            [
                (Upload, pair(10.0, 3.0)),
                (Ping, pair(30.0, 80.0)),
                (Jitter, pair(5.0, 15.0)),
            ],
            StatusMessages::new(
                "Excellent for smart city sensors, traffic management and public safety systems.",
                "Can support basic smart city functions with limited real-time capabilities.",
                "Too unstable for reliable smart city infrastructure.",
            ),
        )?,
        UseCaseDefinition::new(
            "Research & Data Science",
            "🔬",
            [(Download, pair(50.0, 20.0)), (Upload, pair(20.0, 10.0))],
            StatusMessages::new(
                "Perfect for cloud computing, large dataset transfers and collaborative research.",
                "Usable for moderate research needs but large data transfers will be slow.",
                "Data-intensive research will be significantly hampered.",
            ),
        )?,
        UseCaseDefinition::new(
            "Remote Work",
            "💼",
            [
                (Download, pair(15.0, 5.0)),
                (Upload, pair(5.0, 2.0)),
                (Ping, pair(100.0, 200.0)),
                (Jitter, pair(10.0, 20.0)),
            ],
            StatusMessages::new(
                "Excellent for all remote work needs including collaborative tools.",
                "Suitable for basic remote work but may struggle with video meetings.",
                "Remote work will be challenging with frequent connectivity issues.",
            ),
        )?,
    ])
}
