//! Improvement suggestions derived from a metrics snapshot.
//!
//! Rules fire on a single metric crossing a threshold. When several tiers
//! match the same metric (critically low and low download, say) only the
//! most severe one is reported. General advice rules fire unconditionally
//! and always come last.

use crate::snapshot::{Metric, MetricsSnapshot};
use serde::Serialize;
use std::sync::LazyLock;

/// How urgent a metric-triggered suggestion is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Moderate,
    Critical,
}

/// When a suggestion rule applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// The metric is strictly below the threshold.
    Below { metric: Metric, threshold: f64, severity: Severity },
    /// The metric is strictly above the threshold.
    Above { metric: Metric, threshold: f64, severity: Severity },
    /// General advice, emitted for every snapshot.
    Always,
}

impl Trigger {
    fn metric(&self) -> Option<Metric> {
        match self {
            Trigger::Below { metric, .. } | Trigger::Above { metric, .. } => {
                Some(*metric)
            }
            Trigger::Always => None,
        }
    }

    fn severity(&self) -> Option<Severity> {
        match self {
            Trigger::Below { severity, .. }
            | Trigger::Above { severity, .. } => Some(*severity),
            Trigger::Always => None,
        }
    }

    fn matches(&self, snapshot: &MetricsSnapshot) -> bool {
        match self {
            Trigger::Below { metric, threshold, .. } => {
                snapshot.value(*metric) < *threshold
            }
            Trigger::Above { metric, threshold, .. } => {
                snapshot.value(*metric) > *threshold
            }
            Trigger::Always => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionRule {
    pub trigger: Trigger,
    pub icon: String,
    pub title: String,
    pub content: String,
}

impl SuggestionRule {
    pub fn new(
        trigger: Trigger,
        icon: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            trigger,
            icon: icon.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    fn to_suggestion(&self) -> Suggestion {
        Suggestion {
            icon: self.icon.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }
}

/// An emitted piece of advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub icon: String,
    pub title: String,
    pub content: String,
}

/// The built-in rule set.
pub fn standard_rules() -> &'static [SuggestionRule] {
    &STANDARD_RULES
}

/// Evaluate the built-in rules.
pub fn suggest(snapshot: &MetricsSnapshot) -> Vec<Suggestion> {
    suggest_with(snapshot, standard_rules())
}

/// Evaluate `rules` against a snapshot.
///
/// Metric rules are reported in download, upload, ping, jitter order with at
/// most one suggestion per metric; ties in severity go to the rule listed
/// first. `Always` rules follow in the order given.
pub fn suggest_with(
    snapshot: &MetricsSnapshot,
    rules: &[SuggestionRule],
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for metric in Metric::ALL {
        let mut chosen: Option<&SuggestionRule> = None;

        for rule in rules.iter().filter(|rule| {
            rule.trigger.metric() == Some(metric) && rule.trigger.matches(snapshot)
        }) {
            let more_severe = match chosen {
                None => true,
                Some(current) => rule.trigger.severity() > current.trigger.severity(),
            };
            if more_severe {
                chosen = Some(rule);
            }
        }

        if let Some(rule) = chosen {
            suggestions.push(rule.to_suggestion());
        }
    }

    suggestions.extend(
        rules
            .iter()
            .filter(|rule| matches!(rule.trigger, Trigger::Always))
            .map(SuggestionRule::to_suggestion),
    );

    suggestions
}

static STANDARD_RULES: LazyLock<Vec<SuggestionRule>> = LazyLock::new(|| {
    use Metric::{Download, Jitter, Ping, Upload};
    use Severity::{Critical, Moderate};

    vec![
        SuggestionRule::new(
            Trigger::Below { metric: Download, threshold: 10.0, severity: Critical },
            "🔽",
            "Critically Low Download Speed",
            "Your download speed is severely limiting your online activities. \
             Consider upgrading to at least a 50 Mbps plan for general use, or \
             100+ Mbps for households with multiple users.",
        ),
        SuggestionRule::new(
            Trigger::Below { metric: Download, threshold: 25.0, severity: Moderate },
            "🔽",
            "Low Download Speed",
            "Your download speed may limit streaming quality and large file \
             downloads. Consider upgrading your plan or checking for network \
             interference.",
        ),
        SuggestionRule::new(
            Trigger::Below { metric: Upload, threshold: 2.0, severity: Critical },
            "🔼",
            "Critically Low Upload Speed",
            "Your upload speed will severely impact video calls, file sharing, \
             and cloud backups. Contact your ISP about asymmetric connection \
             options or business-grade plans with better upload speeds.",
        ),
        SuggestionRule::new(
            Trigger::Below { metric: Upload, threshold: 5.0, severity: Moderate },
            "🔼",
            "Low Upload Speed",
            "Your upload speed may impact video conferencing and file sharing. \
             Consider a plan with better upload capacity if you frequently use \
             these services.",
        ),
        SuggestionRule::new(
            Trigger::Above { metric: Ping, threshold: 100.0, severity: Moderate },
            "⏱️",
            "High Latency Detected",
            "Your high ping will impact gaming, video calls, and real-time \
             applications. Try using a wired Ethernet connection instead of \
             WiFi, and ensure no other bandwidth-heavy applications are running.",
        ),
        SuggestionRule::new(
            Trigger::Above { metric: Jitter, threshold: 10.0, severity: Moderate },
            "📶",
            "Connection Instability",
            "Your connection shows significant jitter (variation in ping), \
             which can cause unstable performance even with good speeds. Check \
             for interference sources, outdated router firmware, or try a mesh \
             WiFi system for better coverage.",
        ),
        SuggestionRule::new(
            Trigger::Always,
            "🛠️",
            "Connection Optimization",
            "For best performance: (1) Use wired connections for stationary \
             devices, (2) Place your router in a central, elevated location, \
             (3) Use 5GHz WiFi for devices that support it, (4) Regularly \
             restart your modem and router.",
        ),
        SuggestionRule::new(
            Trigger::Always,
            "📱",
            "Device Optimization",
            "Ensure your devices are updated with the latest firmware and \
             drivers. Close background applications that may be consuming \
             bandwidth. Consider upgrading older devices that may have limited \
             WiFi capabilities.",
        ),
    ]
});
