//! Measurement orchestration.
//!
//! A run walks through server discovery, latency sampling, download and
//! upload in that order. Discovery and transfer failures end the run;
//! latency failures degrade to fallback values and the run continues. The
//! only output of a successful run is a complete [`MetricsSnapshot`].

use crate::errors::{ErrorKind, MeasurementError};
use crate::jitter::{JitterEstimator, DEFAULT_INTER_SAMPLE_DELAY, DEFAULT_SAMPLE_COUNT};
use crate::measurements::to_mbps;
use crate::probe::{NetworkProbe, ServerHandle};
use crate::progress::{ProgressEvent, ProgressSink, RunPhase};
use crate::retry::RetryConfig;
use crate::snapshot::MetricsSnapshot;
use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Settings for a measurement run.
#[derive(Debug, Clone)]
pub struct MeasurementConfig {
    /// Number of latency samples (default: 5)
    pub latency_samples: usize,
    /// Pause between latency samples (default: 200ms)
    pub inter_sample_delay: Duration,
    /// Retry policy for each latency sample (default: one retry)
    pub latency_retry: RetryConfig,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            latency_samples: DEFAULT_SAMPLE_COUNT,
            inter_sample_delay: DEFAULT_INTER_SAMPLE_DELAY,
            latency_retry: RetryConfig::default(),
        }
    }
}

/// Percent reported at each checkpoint of a run.
mod checkpoints {
    pub const INITIALIZING: u8 = 0;
    pub const DISCOVERING: u8 = 10;
    pub const LATENCY: u8 = 30;
    pub const DOWNLOAD: u8 = 50;
    pub const UPLOAD: u8 = 70;
    pub const UPLOAD_DONE: u8 = 95;
    pub const COMPLETE: u8 = 100;
}

/// Emits progress percentages that never go backwards.
#[derive(Debug, Default)]
struct ProgressTracker {
    percent: u8,
}

impl ProgressTracker {
    fn report(
        &mut self,
        sink: &dyn ProgressSink,
        percent: u8,
        status: impl Into<String>,
    ) {
        self.percent = self.percent.max(percent.min(checkpoints::COMPLETE));
        sink.on_progress(ProgressEvent::Progress {
            percent: self.percent,
            status: status.into(),
        });
    }
}

/// Drives a [`NetworkProbe`] through one measurement run at a time.
///
/// `run` borrows the orchestrator mutably, so a second run cannot start
/// while one is in flight.
pub struct MeasurementOrchestrator<P> {
    probe: P,
    config: MeasurementConfig,
    phase: RunPhase,
    cancel: CancellationToken,
    server: Option<ServerHandle>,
    latency_degraded: bool,
}

impl<P: NetworkProbe> MeasurementOrchestrator<P> {
    pub fn new(probe: P, config: MeasurementConfig) -> Self {
        Self {
            probe,
            config,
            phase: RunPhase::Idle,
            cancel: CancellationToken::new(),
            server: None,
            latency_degraded: false,
        }
    }

    /// Use `token` to cancel runs from outside.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Server chosen by the most recent run, if discovery succeeded.
    pub fn server(&self) -> Option<&ServerHandle> {
        self.server.as_ref()
    }

    /// Whether the most recent run used fallback latency values.
    pub fn latency_degraded(&self) -> bool {
        self.latency_degraded
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute one full run.
    ///
    /// Progress is reported through `sink`. On success the phase ends as
    /// [`RunPhase::Complete`] and exactly one snapshot is returned; on any
    /// fatal error it ends as [`RunPhase::Aborted`] and no metrics escape.
    pub async fn run(
        &mut self,
        sink: &dyn ProgressSink,
    ) -> Result<MetricsSnapshot, MeasurementError> {
        let mut progress = ProgressTracker::default();
        self.server = None;
        self.latency_degraded = false;

        info!("Starting measurement run");

        let outcome = self.execute(sink, &mut progress).await;
        match outcome {
            Ok(snapshot) => {
                self.enter(RunPhase::Complete, sink);
                progress.report(
                    sink,
                    checkpoints::COMPLETE,
                    "Test completed successfully!",
                );
                info!(
                    "Measurement run complete: {:.2} Mbps down, {:.2} Mbps up, \
                     {:.2} ms ping, {:.2} ms jitter",
                    snapshot.download_mbps,
                    snapshot.upload_mbps,
                    snapshot.ping_ms,
                    snapshot.jitter_ms
                );
                Ok(snapshot)
            }
            Err(error) => {
                warn!("Measurement run aborted during {}: {}", self.phase, error.message);
                self.enter(RunPhase::Aborted, sink);
                sink.on_progress(ProgressEvent::Error(error.message.clone()));
                Err(error)
            }
        }
    }

    async fn execute(
        &mut self,
        sink: &dyn ProgressSink,
        progress: &mut ProgressTracker,
    ) -> Result<MetricsSnapshot, MeasurementError> {
        self.ensure_not_cancelled()?;
        progress.report(sink, checkpoints::INITIALIZING, "Initializing speed test...");

        // Server discovery
        self.enter(RunPhase::DiscoveringServer, sink);
        progress.report(sink, checkpoints::DISCOVERING, "Finding optimal server...");
        let server = until_cancelled(&self.cancel, self.probe.discover_server())
            .await?
            .map_err(|e| {
                MeasurementError::from_probe(
                    ErrorKind::BackendUnavailable,
                    "Server discovery failed",
                    e,
                )
            })?;
        info!("Selected server {}", server);
        sink.on_progress(ProgressEvent::ServerSelected(server.clone()));
        self.server = Some(server.clone());

        // Latency and jitter
        self.ensure_not_cancelled()?;
        self.enter(RunPhase::MeasuringLatency, sink);
        progress.report(sink, checkpoints::LATENCY, "Measuring ping and jitter...");
        let estimator =
            JitterEstimator::new(self.config.latency_samples, self.config.inter_sample_delay)
                .with_retry(self.config.latency_retry.clone());
        let estimate =
            until_cancelled(&self.cancel, estimator.estimate(&self.probe, sink)).await?;
        if let Some(degraded) = estimate.degradation() {
            warn!("{}", degraded);
            self.latency_degraded = true;
            sink.on_progress(ProgressEvent::ProbeDegraded {
                reason: degraded.message,
            });
        }
        progress.report(
            sink,
            checkpoints::LATENCY,
            format!(
                "Ping: {:.2} ms, Jitter: {:.2} ms",
                estimate.mean_ping_ms, estimate.jitter_ms
            ),
        );

        // Download
        self.ensure_not_cancelled()?;
        self.enter(RunPhase::MeasuringDownload, sink);
        progress.report(sink, checkpoints::DOWNLOAD, "Testing download speed...");
        let download_bps =
            until_cancelled(&self.cancel, self.probe.measure_download(&server))
                .await?
                .map_err(|e| {
                    MeasurementError::from_probe(
                        ErrorKind::TransferFailed,
                        "Download test failed",
                        e,
                    )
                })?;
        let download_mbps = checked_mbps(download_bps, "Download")?;
        progress.report(
            sink,
            checkpoints::UPLOAD,
            format!("Download speed: {:.2} Mbps", download_mbps),
        );

        // Upload
        self.ensure_not_cancelled()?;
        self.enter(RunPhase::MeasuringUpload, sink);
        progress.report(sink, checkpoints::UPLOAD, "Testing upload speed...");
        let upload_bps = until_cancelled(&self.cancel, self.probe.measure_upload(&server))
            .await?
            .map_err(|e| {
                MeasurementError::from_probe(
                    ErrorKind::TransferFailed,
                    "Upload test failed",
                    e,
                )
            })?;
        let upload_mbps = checked_mbps(upload_bps, "Upload")?;
        progress.report(
            sink,
            checkpoints::UPLOAD_DONE,
            format!("Upload speed: {:.2} Mbps", upload_mbps),
        );

        Ok(MetricsSnapshot::new(
            download_mbps,
            upload_mbps,
            estimate.mean_ping_ms,
            estimate.jitter_ms,
        ))
    }

    fn enter(&mut self, phase: RunPhase, sink: &dyn ProgressSink) {
        debug!("Phase {} -> {}", self.phase, phase);
        self.phase = phase;
        sink.on_progress(ProgressEvent::PhaseChange(phase));
    }

    fn ensure_not_cancelled(&self) -> Result<(), MeasurementError> {
        if self.cancel.is_cancelled() {
            return Err(MeasurementError::cancelled());
        }
        Ok(())
    }
}

/// Await `future` unless `cancel` fires first.
async fn until_cancelled<F: Future>(
    cancel: &CancellationToken,
    future: F,
) -> Result<F::Output, MeasurementError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(MeasurementError::cancelled()),
        output = future => Ok(output),
    }
}

/// Convert a transfer rate to Mbps, rejecting values no transfer produces.
fn checked_mbps(bits_per_second: f64, direction: &str) -> Result<f64, MeasurementError> {
    if !bits_per_second.is_finite() || bits_per_second < 0.0 {
        return Err(MeasurementError::transfer_failed(format!(
            "{} test reported an invalid rate of {} bits/s",
            direction, bits_per_second
        )));
    }
    Ok(to_mbps(bits_per_second))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProbeError;
    use crate::jitter::{FALLBACK_JITTER_MS, FALLBACK_PING_MS};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Probe with fixed per-operation outcomes.
    struct FakeProbe {
        discover: Result<(), String>,
        latencies: Mutex<Vec<Result<f64, String>>>,
        download_bps: Result<f64, String>,
        upload_bps: Result<f64, String>,
        transfers: AtomicUsize,
        cancel_on_download: Option<CancellationToken>,
    }

    impl FakeProbe {
        fn healthy() -> Self {
            Self {
                discover: Ok(()),
                latencies: Mutex::new(vec![Ok(20.0); 5]),
                download_bps: Ok(60_000_000.0),
                upload_bps: Ok(25_000_000.0),
                transfers: AtomicUsize::new(0),
                cancel_on_download: None,
            }
        }

        fn server() -> ServerHandle {
            ServerHandle {
                host: "fake.test".to_string(),
                address: "127.0.0.1:443".parse().unwrap(),
                colo: "FKE".to_string(),
                city: Some("Faketown".to_string()),
            }
        }
    }

    impl NetworkProbe for FakeProbe {
        async fn discover_server(&self) -> Result<ServerHandle, ProbeError> {
            match &self.discover {
                Ok(()) => Ok(Self::server()),
                Err(message) => Err(message.clone().into()),
            }
        }

        async fn measure_latency(
            &self,
            _server: &ServerHandle,
        ) -> Result<f64, ProbeError> {
            let next = {
                let mut latencies = self.latencies.lock().unwrap();
                if latencies.is_empty() {
                    None
                } else {
                    Some(latencies.remove(0))
                }
            };
            match next {
                Some(Ok(value)) => Ok(value),
                Some(Err(message)) => Err(message.into()),
                None => Err("no more latency samples".into()),
            }
        }

        async fn measure_download(
            &self,
            _server: &ServerHandle,
        ) -> Result<f64, ProbeError> {
            self.transfers.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel_on_download {
                token.cancel();
                std::future::pending::<()>().await;
            }
            self.download_bps.clone().map_err(ProbeError::from)
        }

        async fn measure_upload(
            &self,
            _server: &ServerHandle,
        ) -> Result<f64, ProbeError> {
            self.transfers.fetch_add(1, Ordering::SeqCst);
            self.upload_bps.clone().map_err(ProbeError::from)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl ProgressSink for RecordingSink {
        fn on_progress(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl RecordingSink {
        fn events(&self) -> Vec<ProgressEvent> {
            self.events.lock().unwrap().clone()
        }

        fn percents(&self) -> Vec<u8> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    ProgressEvent::Progress { percent, .. } => Some(percent),
                    _ => None,
                })
                .collect()
        }

        fn phases(&self) -> Vec<RunPhase> {
            self.events()
                .into_iter()
                .filter_map(|event| match event {
                    ProgressEvent::PhaseChange(phase) => Some(phase),
                    _ => None,
                })
                .collect()
        }
    }

    fn fast_config() -> MeasurementConfig {
        MeasurementConfig {
            latency_samples: 5,
            inter_sample_delay: Duration::ZERO,
            latency_retry: RetryConfig::new(1, 0, 0),
        }
    }

    #[tokio::test]
    async fn test_successful_run_produces_snapshot() {
        let mut orchestrator =
            MeasurementOrchestrator::new(FakeProbe::healthy(), fast_config());
        let sink = RecordingSink::default();

        let snapshot = orchestrator.run(&sink).await.unwrap();

        assert_eq!(snapshot, MetricsSnapshot::new(60.0, 25.0, 20.0, 0.0));
        assert_eq!(orchestrator.phase(), RunPhase::Complete);
        assert!(!orchestrator.latency_degraded());
        assert_eq!(orchestrator.server().map(|s| s.colo.as_str()), Some("FKE"));
        assert_eq!(
            sink.phases(),
            vec![
                RunPhase::DiscoveringServer,
                RunPhase::MeasuringLatency,
                RunPhase::MeasuringDownload,
                RunPhase::MeasuringUpload,
                RunPhase::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_reaches_100() {
        let mut orchestrator =
            MeasurementOrchestrator::new(FakeProbe::healthy(), fast_config());
        let sink = RecordingSink::default();

        orchestrator.run(&sink).await.unwrap();

        let percents = sink.percents();
        assert_eq!(percents.first(), Some(&0));
        assert_eq!(percents.last(), Some(&100));
        assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", percents);
    }

    #[tokio::test]
    async fn test_status_lines() {
        let mut orchestrator =
            MeasurementOrchestrator::new(FakeProbe::healthy(), fast_config());
        let sink = RecordingSink::default();

        orchestrator.run(&sink).await.unwrap();

        let statuses: Vec<String> = sink
            .events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::Progress { status, .. } => Some(status),
                _ => None,
            })
            .collect();
        assert!(statuses.contains(&"Ping: 20.00 ms, Jitter: 0.00 ms".to_string()));
        assert!(statuses.contains(&"Download speed: 60.00 Mbps".to_string()));
        assert!(statuses.contains(&"Upload speed: 25.00 Mbps".to_string()));
        assert_eq!(statuses.last().map(String::as_str), Some("Test completed successfully!"));
    }

    #[tokio::test]
    async fn test_discovery_failure_aborts_without_snapshot() {
        let probe = FakeProbe {
            discover: Err("dns error: no such host".to_string()),
            ..FakeProbe::healthy()
        };
        let mut orchestrator = MeasurementOrchestrator::new(probe, fast_config());
        let sink = RecordingSink::default();

        let error = orchestrator.run(&sink).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::BackendUnavailable);
        assert_eq!(orchestrator.phase(), RunPhase::Aborted);
        assert!(orchestrator.server().is_none());
        assert!(error.suggestion.as_deref().unwrap_or("").contains("DNS"));
        assert!(sink
            .events()
            .iter()
            .any(|event| matches!(event, ProgressEvent::Error(_))));
        assert!(!sink.percents().contains(&100));
        assert_eq!(orchestrator.probe.transfers.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_latency_fallback_is_flagged_but_run_completes() {
        let probe = FakeProbe {
            latencies: Mutex::new(vec![Err("timed out".to_string()); 2]),
            ..FakeProbe::healthy()
        };
        let mut orchestrator = MeasurementOrchestrator::new(probe, fast_config());
        let sink = RecordingSink::default();

        let snapshot = orchestrator.run(&sink).await.unwrap();

        assert_eq!(snapshot.ping_ms, FALLBACK_PING_MS);
        assert_eq!(snapshot.jitter_ms, FALLBACK_JITTER_MS);
        assert_eq!(snapshot.download_mbps, 60.0);
        assert!(orchestrator.latency_degraded());
        assert_eq!(orchestrator.phase(), RunPhase::Complete);
        assert!(sink
            .events()
            .iter()
            .any(|event| matches!(event, ProgressEvent::ProbeDegraded { .. })));
    }

    #[tokio::test]
    async fn test_download_failure_is_transfer_failed() {
        let probe = FakeProbe {
            download_bps: Err("connection reset by peer".to_string()),
            ..FakeProbe::healthy()
        };
        let mut orchestrator = MeasurementOrchestrator::new(probe, fast_config());

        let error = orchestrator.run(&RecordingSink::default()).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::TransferFailed);
        assert!(error.message.contains("Download test failed"));
        assert_eq!(orchestrator.phase(), RunPhase::Aborted);
        // upload is never attempted
        assert_eq!(orchestrator.probe.transfers.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_is_transfer_failed() {
        let probe = FakeProbe {
            upload_bps: Err("broken pipe".to_string()),
            ..FakeProbe::healthy()
        };
        let mut orchestrator = MeasurementOrchestrator::new(probe, fast_config());

        let error = orchestrator.run(&RecordingSink::default()).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::TransferFailed);
        assert!(error.message.contains("Upload test failed"));
    }

    #[tokio::test]
    async fn test_invalid_rate_is_transfer_failed() {
        let probe = FakeProbe {
            upload_bps: Ok(f64::INFINITY),
            ..FakeProbe::healthy()
        };
        let mut orchestrator = MeasurementOrchestrator::new(probe, fast_config());

        let error = orchestrator.run(&RecordingSink::default()).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::TransferFailed);
        assert_eq!(orchestrator.phase(), RunPhase::Aborted);
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let token = CancellationToken::new();
        token.cancel();
        let mut orchestrator =
            MeasurementOrchestrator::new(FakeProbe::healthy(), fast_config())
                .with_cancellation(token);

        let error = orchestrator.run(&RecordingSink::default()).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Cancelled);
        assert_eq!(orchestrator.phase(), RunPhase::Aborted);
    }

    #[tokio::test]
    async fn test_cancel_during_transfer() {
        let token = CancellationToken::new();
        let probe = FakeProbe {
            cancel_on_download: Some(token.clone()),
            ..FakeProbe::healthy()
        };
        let mut orchestrator =
            MeasurementOrchestrator::new(probe, fast_config()).with_cancellation(token);

        let error = orchestrator.run(&RecordingSink::default()).await.unwrap_err();

        assert_eq!(error.kind, ErrorKind::Cancelled);
        assert_eq!(orchestrator.phase(), RunPhase::Aborted);
    }

    #[tokio::test]
    async fn test_orchestrator_can_run_again() {
        let probe = FakeProbe {
            latencies: Mutex::new(vec![Ok(20.0); 10]),
            ..FakeProbe::healthy()
        };
        let mut orchestrator = MeasurementOrchestrator::new(probe, fast_config());

        let first = orchestrator.run(&RecordingSink::default()).await.unwrap();
        let second = orchestrator.run(&RecordingSink::default()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(orchestrator.phase(), RunPhase::Complete);
    }

    #[test]
    fn test_checked_mbps() {
        assert_eq!(checked_mbps(12_500_000.0, "Download").unwrap(), 12.5);
        assert!(checked_mbps(-1.0, "Download").is_err());
        assert!(checked_mbps(f64::NAN, "Upload").is_err());
    }
}
