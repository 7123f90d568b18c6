use crate::cloudflare::requests::{Request, RequestBody};
use reqwest::Method;
use std::borrow::Cow;

/// Send `bytes` bytes of filler to the server.
pub(crate) struct Upload {
    bytes: u64,
}

impl Upload {
    pub fn new(bytes: u64) -> Self {
        Self { bytes }
    }
}

impl Request for Upload {
    type Response = String;

    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<str> {
        "__up".into()
    }

    fn body(&self) -> RequestBody {
        RequestBody::Bytes(vec![b'0'; self.bytes as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_is_post_with_sized_body() {
        let request = Upload::new(1024);

        assert_eq!(Upload::METHOD, Method::POST);
        assert_eq!(request.endpoint(), "__up");
        assert_eq!(request.body().size(), 1024);
    }
}
