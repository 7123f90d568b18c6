//! Throughput arithmetic for timed transfers.

use http::HeaderValue;
use std::time::Duration;

/// Convert bits per second to megabits per second.
pub fn to_mbps(bits_per_second: f64) -> f64 {
    bits_per_second / 1_000_000.0
}

/// Transfer rate in bits per second.
///
/// `server_time` is the processing time the server reported for the
/// request; it is subtracted from the client-side `elapsed` so only time on
/// the wire counts. A server time that is not smaller than `elapsed` is
/// ignored. Returns `None` when no time elapsed at all.
pub fn bits_per_second(
    bytes: u64,
    elapsed: Duration,
    server_time: Option<Duration>,
) -> Option<f64> {
    let effective = match server_time {
        Some(server) if server < elapsed => elapsed - server,
        _ => elapsed,
    };

    let seconds = effective.as_secs_f64();
    if seconds <= 0.0 {
        return None;
    }

    Some(bytes as f64 * 8.0 / seconds)
}

/// Parse the `dur=<ms>` entry of a `server-timing` header.
///
/// Cloudflare sends values like `cfRequestDuration;dur=12.345`.
pub fn parse_server_timing(header: &HeaderValue) -> Option<Duration> {
    let value = header.to_str().ok()?;

    value
        .split([';', ','])
        .map(str::trim)
        .find_map(|part| part.strip_prefix("dur="))
        .and_then(|ms| ms.trim_matches('"').parse::<f64>().ok())
        .and_then(|ms| Duration::try_from_secs_f64(ms / 1000.0).ok())
}
