//! The capability interface to a speed-test backend.
//!
//! The orchestrator only ever talks to a [`NetworkProbe`]; the concrete
//! mechanism (which service, which protocol) lives behind it.

use crate::errors::ProbeError;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// The measurement server chosen by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerHandle {
    /// Host name requests are sent to
    pub host: String,
    /// Resolved socket address used for latency probes
    pub address: SocketAddr,
    /// Data-center code (IATA airport code for Cloudflare)
    pub colo: String,
    /// City of the data center, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl fmt::Display for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.city {
            Some(city) => write!(f, "{} ({})", city, self.colo),
            None => write!(f, "{} ({})", self.host, self.colo),
        }
    }
}

/// A backend able to locate a server and measure the link to it.
///
/// Implementations must be usable from a multi-threaded runtime; every
/// future they return is `Send`.
pub trait NetworkProbe: Send + Sync {
    /// Locate the best server for this client.
    fn discover_server(
        &self,
    ) -> impl Future<Output = Result<ServerHandle, ProbeError>> + Send;

    /// One round-trip latency sample, in milliseconds.
    fn measure_latency(
        &self,
        server: &ServerHandle,
    ) -> impl Future<Output = Result<f64, ProbeError>> + Send;

    /// Download throughput, in bits per second.
    fn measure_download(
        &self,
        server: &ServerHandle,
    ) -> impl Future<Output = Result<f64, ProbeError>> + Send;

    /// Upload throughput, in bits per second.
    fn measure_upload(
        &self,
        server: &ServerHandle,
    ) -> impl Future<Output = Result<f64, ProbeError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(city: Option<&str>) -> ServerHandle {
        ServerHandle {
            host: "speed.example.net".to_string(),
            address: "192.0.2.10:443".parse().unwrap(),
            colo: "AMS".to_string(),
            city: city.map(str::to_string),
        }
    }

    #[test]
    fn test_display_prefers_city() {
        assert_eq!(server(Some("Amsterdam")).to_string(), "Amsterdam (AMS)");
        assert_eq!(server(None).to_string(), "speed.example.net (AMS)");
    }

    #[test]
    fn test_serialize_skips_missing_city() {
        let json = serde_json::to_value(server(None)).unwrap();
        assert_eq!(json["colo"], "AMS");
        assert_eq!(json["address"], "192.0.2.10:443");
        assert!(json.get("city").is_none());
    }
}
