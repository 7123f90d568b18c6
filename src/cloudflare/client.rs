use crate::cloudflare::requests::{Request, RequestBody};
use crate::errors::ProbeError;
use crate::measurements::{bits_per_second, parse_server_timing};
use log::debug;
use reqwest::{Body, Client as ReqwestClient, RequestBuilder};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

pub const BASE_URL: &str = "https://speed.cloudflare.com";

/// Outcome of a timed transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    /// Request body bytes sent
    pub sent: u64,
    /// Response body bytes received
    pub received: u64,
    /// Time from sending the request to reading the last body byte
    pub elapsed: Duration,
    /// Processing time reported by the server, if any
    pub server_time: Option<Duration>,
}

impl Transfer {
    /// Rate for moving `bytes` over this transfer's wire time.
    pub fn bits_per_second(&self, bytes: u64) -> Option<f64> {
        bits_per_second(bytes, self.elapsed, self.server_time)
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    client: ReqwestClient,
    base_url: Url,
}

impl Client {
    pub fn new(mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Client { client: ReqwestClient::new(), base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(endpoint.trim_start_matches('/'))
    }

    pub async fn send<R: Request>(
        &self,
        request: R,
    ) -> Result<R::Response, ProbeError> {
        let url = self.url_for(&request.endpoint())?;
        debug!("{} {}", R::METHOD, url);

        let response = self
            .client
            .request(R::METHOD, url)
            .headers(request.headers())
            .cloudflare_body(request.body())
            .send()
            .await?
            .error_for_status()?;

        let text = response.text().await?;

        // Cloudflare often returns JSON with a text/plain content-type
        if let Ok(parsed) = serde_json::from_str::<R::Response>(&text) {
            return Ok(parsed);
        }

        // Plain `key=value` bodies such as the trace endpoint
        let deserialized = serde_plain::from_str(&text)?;

        Ok(deserialized)
    }

    /// Send `request` and time it until the response body is fully read.
    ///
    /// The body is drained chunk by chunk and discarded.
    pub async fn transfer<R: Request>(
        &self,
        request: R,
    ) -> Result<Transfer, ProbeError> {
        let url = self.url_for(&request.endpoint())?;
        let body = request.body();
        let sent = body.size();

        let builder = self
            .client
            .request(R::METHOD, url.clone())
            .headers(request.headers())
            .cloudflare_body(body);

        let start = Instant::now();
        let mut response = builder.send().await?.error_for_status()?;
        let server_time =
            response.headers().get("server-timing").and_then(parse_server_timing);

        let mut received = 0u64;
        while let Some(chunk) = response.chunk().await? {
            received += chunk.len() as u64;
        }
        let elapsed = start.elapsed();

        debug!(
            "{} {}: sent {} bytes, received {} bytes in {:?} (server {:?})",
            R::METHOD,
            url,
            sent,
            received,
            elapsed,
            server_time
        );

        Ok(Transfer { sent, received, elapsed, server_time })
    }
}

trait RequestBuilderExt: Sized {
    fn cloudflare_body(self, body: RequestBody) -> Self;
}

impl RequestBuilderExt for RequestBuilder {
    fn cloudflare_body(self, body: RequestBody) -> Self {
        match body {
            RequestBody::None => self,
            RequestBody::Bytes(bytes) => self.body(Body::from(bytes)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Client {
        Client::new(Url::parse(base).unwrap())
    }

    #[test]
    fn test_url_for_root() {
        let client = client(BASE_URL);
        assert_eq!(
            client.url_for("cdn-cgi/trace").unwrap().as_str(),
            "https://speed.cloudflare.com/cdn-cgi/trace"
        );
        assert_eq!(
            client.url_for("/locations").unwrap().as_str(),
            "https://speed.cloudflare.com/locations"
        );
    }

    #[test]
    fn test_url_for_keeps_base_path_and_query() {
        let client = client("http://127.0.0.1:8080/speed");
        assert_eq!(client.base_url().path(), "/speed/");
        assert_eq!(
            client.url_for("__down?bytes=100").unwrap().as_str(),
            "http://127.0.0.1:8080/speed/__down?bytes=100"
        );
    }

    #[test]
    fn test_transfer_rate() {
        let transfer = Transfer {
            sent: 0,
            received: 2_000_000,
            elapsed: Duration::from_millis(1100),
            server_time: Some(Duration::from_millis(100)),
        };
        assert_eq!(transfer.bits_per_second(transfer.received), Some(16_000_000.0));
    }
}
