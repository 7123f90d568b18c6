//! Console progress and summary rendering.
//!
//! Progress events are handed to a printer task over an unbounded channel,
//! so reporting never blocks the measurement itself.

use crate::classifier::SuitabilityStatus;
use crate::progress::{ProgressEvent, ProgressSink};
use crate::results::SuitabilityReport;
use colored::{ColoredString, Colorize};
use std::fmt::Write as _;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Format speed value with 2 decimal places.
pub fn format_speed(speed_mbps: f64) -> String {
    format!("{:.2} Mbps", speed_mbps)
}

/// Format latency value with 2 decimal places.
pub fn format_latency(latency_ms: f64) -> String {
    format!("{:.2} ms", latency_ms)
}

/// Colored, fixed-width label for a status.
pub fn status_label(status: SuitabilityStatus) -> ColoredString {
    match status {
        SuitabilityStatus::Good => format!("{:<8}", "GOOD").green().bold(),
        SuitabilityStatus::Moderate => {
            format!("{:<8}", "MODERATE").yellow().bold()
        }
        SuitabilityStatus::Bad => format!("{:<8}", "BAD").red().bold(),
    }
}

/// Progress sink that prints events to stderr from a background task.
pub struct ConsoleSink {
    sender: mpsc::UnboundedSender<ProgressEvent>,
}

impl ConsoleSink {
    /// Start the printer task.
    ///
    /// The task exits once the sink is dropped and every queued event has
    /// been printed; await the handle to flush.
    pub fn spawn() -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                if let Some(line) = render_event(&event) {
                    eprintln!("{}", line);
                }
            }
        });

        (Self { sender }, handle)
    }
}

impl ProgressSink for ConsoleSink {
    fn on_progress(&self, event: ProgressEvent) {
        // The printer only goes away at shutdown; late events are dropped.
        let _ = self.sender.send(event);
    }
}

/// One console line for a progress event, if it deserves one.
pub fn render_event(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::Progress { percent, status } => {
            Some(format!("[{:>3}%] {}", percent, status))
        }
        ProgressEvent::ServerSelected(server) => Some(format!(
            "{} {}",
            "Server location:".bold().white(),
            server.to_string().bright_blue()
        )),
        ProgressEvent::LatencySample { value_ms, current, total } => Some(
            format!(
                "       latency sample {}/{}: {}",
                current,
                total,
                format_latency(*value_ms)
            )
            .dimmed()
            .to_string(),
        ),
        ProgressEvent::ProbeDegraded { reason } => {
            Some(format!("{} {}", "warning:".yellow().bold(), reason))
        }
        // Fatal errors are reported once the run returns.
        ProgressEvent::PhaseChange(_) | ProgressEvent::Error(_) => None,
    }
}

/// Human-readable summary of a report.
pub fn render_summary(report: &SuitabilityReport) -> String {
    let mut out = String::new();
    let metrics = &report.metrics;

    if let Some(server) = &report.server {
        let _ = writeln!(
            out,
            "{} {}",
            "Server Location:".bold().white(),
            server.to_string().bright_blue()
        );
    }
    let _ = writeln!(
        out,
        "{} {}",
        "Download:".bold().white(),
        format_speed(metrics.download_mbps).bright_cyan()
    );
    let _ = writeln!(
        out,
        "{} {}",
        "Upload:".bold().white(),
        format_speed(metrics.upload_mbps).bright_cyan()
    );

    let estimated = if report.latency_degraded {
        format!(" {}", "(estimated)".yellow())
    } else {
        String::new()
    };
    let _ = writeln!(
        out,
        "{} {}{}",
        "Ping:".bold().white(),
        format_latency(metrics.ping_ms),
        estimated
    );
    let _ = writeln!(
        out,
        "{} {}{}",
        "Jitter:".bold().white(),
        format_latency(metrics.jitter_ms),
        estimated
    );

    let _ = writeln!(out, "\n{}", "Use cases".bold().underline());
    for verdict in &report.use_cases {
        let _ = writeln!(
            out,
            "  {} {:<28} {} {}",
            verdict.icon,
            verdict.title,
            status_label(verdict.status),
            verdict.message
        );
    }

    if !report.suggestions.is_empty() {
        let _ = writeln!(out, "\n{}", "Suggestions".bold().underline());
        for suggestion in &report.suggestions {
            let _ = writeln!(
                out,
                "  {} {}\n     {}",
                suggestion.icon,
                suggestion.title.bold(),
                suggestion.content
            );
        }
    }

    out
}

/// Print the summary to stdout.
pub fn print_summary(report: &SuitabilityReport) {
    print!("{}", render_summary(report));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::UseCaseCatalog;
    use crate::classifier::classify;
    use crate::probe::ServerHandle;
    use crate::snapshot::MetricsSnapshot;
    use crate::suggestions::suggest;
    use proptest::prelude::*;

    fn report(degraded: bool) -> SuitabilityReport {
        let metrics = MetricsSnapshot::new(8.0, 25.0, 20.0, 4.0);
        let verdicts =
            classify(&metrics, UseCaseCatalog::standard().definitions());
        let server = ServerHandle {
            host: "speed.cloudflare.com".to_string(),
            address: "104.16.0.1:443".parse().unwrap(),
            colo: "FRA".to_string(),
            city: Some("Frankfurt".to_string()),
        };
        SuitabilityReport::new(
            Some(server),
            metrics,
            degraded,
            &verdicts,
            suggest(&metrics),
        )
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(60.0), "60.00 Mbps");
        assert_eq!(format_speed(0.126), "0.13 Mbps");
    }

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(1.58113), "1.58 ms");
    }

    #[test]
    fn test_render_progress_event() {
        let line = render_event(&ProgressEvent::Progress {
            percent: 5,
            status: "Initializing speed test...".to_string(),
        });
        assert_eq!(line.as_deref(), Some("[  5%] Initializing speed test..."));
    }

    #[test]
    fn test_phase_and_error_events_are_silent() {
        assert!(render_event(&ProgressEvent::Error("boom".to_string())).is_none());
        assert!(render_event(&ProgressEvent::PhaseChange(
            crate::progress::RunPhase::MeasuringUpload
        ))
        .is_none());
    }

    #[test]
    fn test_summary_lists_everything() {
        let summary = render_summary(&report(false));

        assert!(summary.contains("Frankfurt (FRA)"));
        assert!(summary.contains("8.00 Mbps"));
        assert!(summary.contains("20.00 ms"));
        assert!(summary.contains("Video Streaming"));
        assert!(summary.contains("Too slow for smooth video playback."));
        assert!(summary.contains("Critically Low Download Speed"));
        assert!(summary.contains("Device Optimization"));
        assert!(!summary.contains("(estimated)"));
    }

    #[test]
    fn test_summary_marks_estimated_latency() {
        assert!(render_summary(&report(true)).contains("(estimated)"));
    }

    #[tokio::test]
    async fn test_console_sink_drains_on_drop() {
        let (sink, handle) = ConsoleSink::spawn();
        sink.on_progress(ProgressEvent::Progress {
            percent: 10,
            status: "Finding optimal server...".to_string(),
        });
        drop(sink);

        handle.await.unwrap();
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn speed_formatting_has_two_decimals(speed in 0.0f64..100_000.0) {
            let formatted = format_speed(speed);
            prop_assert!(formatted.ends_with(" Mbps"));

            let numeric_part = formatted.trim_end_matches(" Mbps");
            let dot_pos = numeric_part.find('.');
            prop_assert!(dot_pos.is_some(), "no decimal point in {}", formatted);
            if let Some(dot_pos) = dot_pos {
                prop_assert_eq!(numeric_part.len() - dot_pos - 1, 2);
            }
        }
    }
}
