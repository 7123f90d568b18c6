extern crate serde;

pub mod download;
pub mod locations;
pub mod trace;
pub mod upload;

use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    Method,
};
use serde::Deserialize;
use std::borrow::Cow;

const UA: &str = concat!(
    env!("CARGO_PKG_NAME"),
    "/",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_REPOSITORY"),
    ")"
);

/// Body sent with a request.
pub enum RequestBody {
    None,
    Bytes(Vec<u8>),
}

impl RequestBody {
    pub fn size(&self) -> u64 {
        match self {
            RequestBody::None => 0,
            RequestBody::Bytes(bytes) => bytes.len() as u64,
        }
    }
}

pub trait Request {
    type Response: for<'de> Deserialize<'de>;

    const METHOD: Method = Method::GET;

    fn endpoint(&self) -> Cow<str>;

    fn headers(&self) -> HeaderMap {
        default_headers()
    }

    fn body(&self) -> RequestBody {
        RequestBody::None
    }
}

/// Headers sent with every request.
pub(crate) fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(USER_AGENT, HeaderValue::from_static(UA));

    headers
}

impl<R: Request> Request for &R {
    type Response = R::Response;

    const METHOD: Method = R::METHOD;

    fn endpoint(&self) -> Cow<str> {
        (**self).endpoint()
    }

    fn headers(&self) -> HeaderMap {
        (**self).headers()
    }

    fn body(&self) -> RequestBody {
        (**self).body()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_agent_names_the_tool() {
        assert!(UA.starts_with("cryos/"));
        assert!(HeaderValue::from_str(UA).is_ok());
    }

    #[test]
    fn test_body_size() {
        assert_eq!(RequestBody::None.size(), 0);
        assert_eq!(RequestBody::Bytes(vec![b'0'; 16]).size(), 16);
    }
}
