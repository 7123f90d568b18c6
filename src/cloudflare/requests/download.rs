use crate::cloudflare::requests::{default_headers, Request};
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL};
use std::borrow::Cow;

/// Ask the server for `bytes` bytes of payload.
#[derive(Copy, Clone)]
pub(crate) struct Download {
    pub bytes: u64,
}

impl Request for Download {
    type Response = String;

    fn endpoint(&self) -> Cow<str> {
        format!("__down?bytes={}", self.bytes).into()
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = default_headers();

        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::USER_AGENT;

    #[test]
    fn test_download_endpoint() {
        let request = Download { bytes: 25_000_000 };
        assert_eq!(request.endpoint(), "__down?bytes=25000000");
    }

    #[test]
    fn test_download_headers_disable_caching() {
        let headers = Download { bytes: 1 }.headers();
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-cache");
        assert!(headers.contains_key(USER_AGENT));
    }
}
