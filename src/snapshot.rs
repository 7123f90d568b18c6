//! The four measured quantities of a completed run.

use serde::Serialize;
use std::fmt;

/// Whether larger or smaller values of a metric are favorable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// A measured network quantity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Download throughput in Mbps.
    Download,
    /// Upload throughput in Mbps.
    Upload,
    /// Mean round-trip latency in milliseconds.
    Ping,
    /// Standard deviation of latency in milliseconds.
    Jitter,
}

impl Metric {
    /// Every metric, in evaluation order.
    pub const ALL: [Metric; 4] =
        [Metric::Download, Metric::Upload, Metric::Ping, Metric::Jitter];

    pub fn polarity(&self) -> Polarity {
        match self {
            Metric::Download | Metric::Upload => Polarity::HigherIsBetter,
            Metric::Ping | Metric::Jitter => Polarity::LowerIsBetter,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Download => "download",
            Metric::Upload => "upload",
            Metric::Ping => "ping",
            Metric::Jitter => "jitter",
        }
    }

    /// Display unit for values of this metric.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Download | Metric::Upload => "Mbps",
            Metric::Ping | Metric::Jitter => "ms",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Results of one completed measurement run.
///
/// Snapshots are only built once all four values are known, so a partially
/// measured connection is never observable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Download throughput in Mbps
    pub download_mbps: f64,
    /// Upload throughput in Mbps
    pub upload_mbps: f64,
    /// Mean latency in milliseconds
    pub ping_ms: f64,
    /// Latency standard deviation in milliseconds
    pub jitter_ms: f64,
}

impl MetricsSnapshot {
    pub fn new(
        download_mbps: f64,
        upload_mbps: f64,
        ping_ms: f64,
        jitter_ms: f64,
    ) -> Self {
        Self { download_mbps, upload_mbps, ping_ms, jitter_ms }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Download => self.download_mbps,
            Metric::Upload => self.upload_mbps,
            Metric::Ping => self.ping_ms,
            Metric::Jitter => self.jitter_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_per_metric() {
        assert_eq!(Metric::Download.polarity(), Polarity::HigherIsBetter);
        assert_eq!(Metric::Upload.polarity(), Polarity::HigherIsBetter);
        assert_eq!(Metric::Ping.polarity(), Polarity::LowerIsBetter);
        assert_eq!(Metric::Jitter.polarity(), Polarity::LowerIsBetter);
    }

    #[test]
    fn test_value_reads_matching_field() {
        let snapshot = MetricsSnapshot::new(60.0, 25.0, 20.0, 4.0);

        assert_eq!(snapshot.value(Metric::Download), 60.0);
        assert_eq!(snapshot.value(Metric::Upload), 25.0);
        assert_eq!(snapshot.value(Metric::Ping), 20.0);
        assert_eq!(snapshot.value(Metric::Jitter), 4.0);
    }

    #[test]
    fn test_metric_serializes_lowercase() {
        let json = serde_json::to_string(&Metric::Jitter).unwrap();
        assert_eq!(json, "\"jitter\"");
    }
}
