extern crate serde;

use crate::cloudflare::requests::Request;
use serde::de::{Error, Visitor};
use serde::{Deserialize, Deserializer};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Formatter;

/// The `cdn-cgi/trace` response: which edge answered and who asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Trace {
    /// Client IP as seen by the edge
    pub ip: String,
    /// IATA code of the answering data center
    pub colo: String,
    /// Client country code
    pub loc: String,
}

pub(crate) struct TraceRequest {}

impl Request for TraceRequest {
    type Response = Trace;

    fn endpoint(&self) -> Cow<str> {
        "cdn-cgi/trace".into()
    }
}

impl<'de> Deserialize<'de> for Trace {
    fn deserialize<D>(deserializer: D) -> Result<Trace, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(TraceVisitor)
    }
}

struct TraceVisitor;

impl<'de> Visitor<'de> for TraceVisitor {
    type Value = Trace;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a newline-separated list of key=value pairs")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: Error,
    {
        let mut properties: HashMap<&str, &str> = v
            .lines()
            .filter_map(|property| property.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect();

        let colo = properties
            .remove("colo")
            .filter(|colo| !colo.is_empty())
            .ok_or_else(|| E::missing_field("colo"))?;

        Ok(Trace {
            ip: properties.remove("ip").unwrap_or_default().to_string(),
            colo: colo.to_string(),
            loc: properties.remove("loc").unwrap_or_default().to_string(),
        })
    }
}
