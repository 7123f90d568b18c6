//! [`NetworkProbe`] over Cloudflare's speed-test endpoints.
//!
//! Discovery asks the edge which data center answered (`cdn-cgi/trace`) and
//! resolves the service host through the system DNS configuration. Latency
//! is the duration of a TCP handshake to the resolved address. Throughput
//! comes from timed `__down` and `__up` transfers, with the server's own
//! processing time removed.

use crate::cloudflare::client::{Client, BASE_URL};
use crate::cloudflare::requests::download::Download;
use crate::cloudflare::requests::locations::{Locations, LocationsResponse};
use crate::cloudflare::requests::trace::TraceRequest;
use crate::cloudflare::requests::upload::Upload;
use crate::errors::{MeasurementError, ProbeError};
use crate::probe::{NetworkProbe, ServerHandle};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use log::{debug, info, warn};
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::OnceCell;
use tokio::time::{timeout, Instant};
use url::{Host, Url};

/// Default download payload (25 MB).
pub const DEFAULT_DOWNLOAD_BYTES: u64 = 25_000_000;

/// Default upload payload (10 MB).
pub const DEFAULT_UPLOAD_BYTES: u64 = 10_000_000;

/// Largest download or upload payload accepted (1 GB).
///
/// The upload body is held in memory for the duration of the request.
pub const MAX_TRANSFER_BYTES: u64 = 1_000_000_000;

/// Default TCP connect timeout for latency probes.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for the Cloudflare backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudflareConfig {
    /// Base URL of the speed-test service (default: https://speed.cloudflare.com)
    pub base_url: String,
    /// Bytes requested by the download test (default: 25 MB)
    pub download_bytes: u64,
    /// Bytes sent by the upload test (default: 10 MB)
    pub upload_bytes: u64,
    /// Timeout for each latency handshake (default: 5s)
    pub connect_timeout: Duration,
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            download_bytes: DEFAULT_DOWNLOAD_BYTES,
            upload_bytes: DEFAULT_UPLOAD_BYTES,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

pub struct CloudflareProbe {
    client: Client,
    config: CloudflareConfig,
    host: Host<String>,
    port: u16,
    resolver: OnceCell<TokioAsyncResolver>,
    locations: OnceCell<Option<LocationsResponse>>,
}

impl CloudflareProbe {
    /// Build a probe, validating the configured base URL.
    pub fn new(config: CloudflareConfig) -> Result<Self, MeasurementError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            MeasurementError::config(format!(
                "invalid server URL '{}': {}",
                config.base_url, e
            ))
        })?;

        let host = base_url.host().map(|host| host.to_owned()).ok_or_else(|| {
            MeasurementError::config(format!(
                "server URL '{}' has no host",
                config.base_url
            ))
        })?;

        let port = base_url.port_or_known_default().ok_or_else(|| {
            MeasurementError::config(format!(
                "server URL '{}' has no known port",
                config.base_url
            ))
        })?;

        for (direction, bytes) in
            [("download", config.download_bytes), ("upload", config.upload_bytes)]
        {
            if bytes == 0 || bytes > MAX_TRANSFER_BYTES {
                return Err(MeasurementError::config(format!(
                    "{} size must be between 1 and {} bytes, got {}",
                    direction, MAX_TRANSFER_BYTES, bytes
                )));
            }
        }

        Ok(Self {
            client: Client::new(base_url),
            config,
            host,
            port,
            resolver: OnceCell::new(),
            locations: OnceCell::new(),
        })
    }

    async fn resolve(&self) -> Result<IpAddr, ProbeError> {
        let name = match &self.host {
            Host::Ipv4(ip) => return Ok(IpAddr::V4(*ip)),
            Host::Ipv6(ip) => return Ok(IpAddr::V6(*ip)),
            Host::Domain(name) => name.as_str(),
        };

        let resolver = self
            .resolver
            .get_or_init(|| async {
                TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
                    warn!("System DNS configuration unavailable ({}), using defaults", e);
                    TokioAsyncResolver::tokio(
                        ResolverConfig::default(),
                        ResolverOpts::default(),
                    )
                })
            })
            .await;

        let begin = Instant::now();
        let response = resolver.lookup_ip(name).await?;
        debug!("Resolved {} in {:?}", name, begin.elapsed());

        let addresses: Vec<IpAddr> = response.iter().collect();
        addresses
            .iter()
            .find(|address| address.is_ipv4())
            .or_else(|| addresses.first())
            .copied()
            .ok_or_else(|| format!("DNS lookup for {} returned no addresses", name).into())
    }

    async fn city_for(&self, colo: &str) -> Option<String> {
        let locations = self
            .locations
            .get_or_init(|| async {
                match self.client.send(Locations {}).await {
                    Ok(locations) => Some(locations),
                    Err(e) => {
                        warn!("Could not load data center locations: {}", e);
                        None
                    }
                }
            })
            .await;

        locations
            .as_ref()
            .and_then(|locations| locations.get(colo))
            .map(|location| location.city.clone())
    }
}

impl NetworkProbe for CloudflareProbe {
    async fn discover_server(&self) -> Result<ServerHandle, ProbeError> {
        let trace = self.client.send(TraceRequest {}).await?;
        debug!(
            "Trace: colo={} client ip={} country={}",
            trace.colo, trace.ip, trace.loc
        );

        let city = self.city_for(&trace.colo).await;
        let ip = self.resolve().await?;

        Ok(ServerHandle {
            host: self.host.to_string(),
            address: SocketAddr::new(ip, self.port),
            colo: trace.colo,
            city,
        })
    }

    async fn measure_latency(
        &self,
        server: &ServerHandle,
    ) -> Result<f64, ProbeError> {
        let begin = Instant::now();
        let stream = timeout(
            self.config.connect_timeout,
            TcpStream::connect(server.address),
        )
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connection to {} timed out", server.address),
            )
        })??;
        let elapsed = begin.elapsed();
        drop(stream);

        Ok(elapsed.as_secs_f64() * 1000.0)
    }

    async fn measure_download(
        &self,
        server: &ServerHandle,
    ) -> Result<f64, ProbeError> {
        info!(
            "Beginning download test: {} bytes from {}",
            self.config.download_bytes, server
        );
        let transfer = self
            .client
            .transfer(Download { bytes: self.config.download_bytes })
            .await?;

        if transfer.received == 0 {
            return Err("download returned an empty body".into());
        }

        transfer
            .bits_per_second(transfer.received)
            .ok_or_else(|| "download finished in zero time".into())
    }

    async fn measure_upload(
        &self,
        server: &ServerHandle,
    ) -> Result<f64, ProbeError> {
        info!(
            "Beginning upload test: {} bytes to {}",
            self.config.upload_bytes, server
        );
        let transfer =
            self.client.transfer(Upload::new(self.config.upload_bytes)).await?;

        transfer
            .bits_per_second(transfer.sent)
            .ok_or_else(|| "upload finished in zero time".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use tokio::net::TcpListener;

    fn probe_for(base_url: &str) -> CloudflareProbe {
        CloudflareProbe::new(CloudflareConfig {
            base_url: base_url.to_string(),
            ..CloudflareConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = CloudflareConfig::default();
        assert_eq!(config.base_url, "https://speed.cloudflare.com");
        assert_eq!(config.download_bytes, 25_000_000);
        assert_eq!(config.upload_bytes, 10_000_000);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_default_port_is_https() {
        let probe = probe_for(BASE_URL);
        assert_eq!(probe.port, 443);
        assert_eq!(probe.host.to_string(), "speed.cloudflare.com");
    }

    #[test]
    fn test_invalid_url_is_config_error() {
        let result = CloudflareProbe::new(CloudflareConfig {
            base_url: "not a url".to_string(),
            ..CloudflareConfig::default()
        });

        match result {
            Err(error) => assert_eq!(error.kind, ErrorKind::Config),
            Ok(_) => panic!("expected a config error"),
        }
    }

    #[test]
    fn test_zero_payload_is_config_error() {
        let result = CloudflareProbe::new(CloudflareConfig {
            upload_bytes: 0,
            ..CloudflareConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_oversized_payload_is_config_error() {
        let upload = CloudflareProbe::new(CloudflareConfig {
            upload_bytes: MAX_TRANSFER_BYTES + 1,
            ..CloudflareConfig::default()
        });
        match upload {
            Err(error) => {
                assert_eq!(error.kind, ErrorKind::Config);
                assert!(error.message.contains("upload"));
            }
            Ok(_) => panic!("expected a config error"),
        }

        let download = CloudflareProbe::new(CloudflareConfig {
            download_bytes: u64::MAX,
            ..CloudflareConfig::default()
        });
        assert!(download.is_err());

        let at_limit = CloudflareProbe::new(CloudflareConfig {
            upload_bytes: MAX_TRANSFER_BYTES,
            download_bytes: MAX_TRANSFER_BYTES,
            ..CloudflareConfig::default()
        });
        assert!(at_limit.is_ok());
    }

    #[tokio::test]
    async fn test_ip_literal_skips_dns() {
        let probe = probe_for("http://127.0.0.1:9/");
        assert_eq!(probe.resolve().await.unwrap(), IpAddr::from([127, 0, 0, 1]));
    }

    #[tokio::test]
    async fn test_latency_is_tcp_handshake_time() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let probe = probe_for(&format!("http://{}/", address));

        let server = ServerHandle {
            host: "127.0.0.1".to_string(),
            address,
            colo: "LCL".to_string(),
            city: None,
        };
        let latency = probe.measure_latency(&server).await.unwrap();

        assert!(latency >= 0.0);
        assert!(latency < 5_000.0);
    }
}
