extern crate clap;

use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use cryos::catalog::UseCaseCatalog;
use cryos::classifier::classify;
use cryos::cloudflare::client::BASE_URL;
use cryos::cloudflare::probe::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_DOWNLOAD_BYTES, DEFAULT_UPLOAD_BYTES,
    MAX_TRANSFER_BYTES,
};
use cryos::cloudflare::{CloudflareConfig, CloudflareProbe};
use cryos::display::{print_summary, ConsoleSink, DisplayMode};
use cryos::errors::{format_error_for_display, MeasurementError};
use cryos::orchestrator::{MeasurementConfig, MeasurementOrchestrator};
use cryos::progress::NoopSink;
use cryos::results::{version, SuitabilityReport};
use cryos::suggestions::suggest;
use log::{info, warn};
use std::io::{self, IsTerminal};
use std::process;
use std::sync::LazyLock;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

static VERSION: LazyLock<String> = LazyLock::new(version);

#[derive(Parser)]
#[command(author, version = VERSION.as_str(), about, long_about = None)]
struct Cli {
    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Number of latency samples used for ping and jitter
    #[arg(
        long,
        default_value_t = 5,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    samples: u16,

    /// Pause between latency samples, in milliseconds
    #[arg(long, default_value_t = 200)]
    sample_delay_ms: u64,

    /// Bytes to download for the download test
    #[arg(
        long,
        default_value_t = DEFAULT_DOWNLOAD_BYTES,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TRANSFER_BYTES)
    )]
    download_bytes: u64,

    /// Bytes to upload for the upload test
    #[arg(
        long,
        default_value_t = DEFAULT_UPLOAD_BYTES,
        value_parser = clap::value_parser!(u64).range(1..=MAX_TRANSFER_BYTES)
    )]
    upload_bytes: u64,

    /// Base URL of the speed-test service
    #[arg(long, default_value = BASE_URL)]
    server_url: String,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .parse_default_env()
        .init();

    let mode = DisplayMode::detect(cli.json, io::stdout().is_terminal());

    if let Err(error) = run(cli, mode).await {
        eprintln!("{}", format_error_for_display(&error));
        process::exit(error.exit_code());
    }
}

async fn run(cli: Cli, mode: DisplayMode) -> Result<(), MeasurementError> {
    let probe = CloudflareProbe::new(CloudflareConfig {
        base_url: cli.server_url,
        download_bytes: cli.download_bytes,
        upload_bytes: cli.upload_bytes,
        connect_timeout: DEFAULT_CONNECT_TIMEOUT,
    })?;

    let config = MeasurementConfig {
        latency_samples: usize::from(cli.samples),
        inter_sample_delay: Duration::from_millis(cli.sample_delay_ms),
        ..MeasurementConfig::default()
    };

    let cancel = CancellationToken::new();
    listen_for_interrupt(cancel.clone());

    let mut orchestrator =
        MeasurementOrchestrator::new(probe, config).with_cancellation(cancel);

    let snapshot = if mode.shows_progress() {
        let (sink, printer) = ConsoleSink::spawn();
        let result = orchestrator.run(&sink).await;
        drop(sink);
        if let Err(e) = printer.await {
            warn!("Progress printer stopped unexpectedly: {}", e);
        }
        result?
    } else {
        orchestrator.run(&NoopSink).await?
    };

    let catalog = UseCaseCatalog::standard();
    let verdicts = classify(&snapshot, catalog.definitions());
    let report = SuitabilityReport::new(
        orchestrator.server().cloned(),
        snapshot,
        orchestrator.latency_degraded(),
        &verdicts,
        suggest(&snapshot),
    );

    match mode {
        DisplayMode::Json => {
            let json = serde_json::to_string_pretty(&report).map_err(|e| {
                MeasurementError::output("Failed to serialize results")
                    .with_source(e)
            })?;
            println!("{}", json);
        }
        DisplayMode::Interactive | DisplayMode::Silent => {
            if mode.shows_progress() {
                println!();
            }
            print_summary(&report);
        }
    }

    info!("Analysis finished");
    Ok(())
}

/// Cancel `token` on Ctrl-C.
fn listen_for_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling measurement");
            token.cancel();
        }
    });
}
