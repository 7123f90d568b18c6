extern crate serde;

use crate::cloudflare::requests::Request;
use serde::Deserialize;
use std::borrow::Cow;

#[derive(Deserialize, Debug)]
pub(crate) struct LocationsResponse(Vec<Location>);

/// One Cloudflare data center.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub(crate) struct Location {
    pub iata: String,
    pub city: String,
}

pub(crate) struct Locations {}

impl Request for Locations {
    type Response = LocationsResponse;

    fn endpoint(&self) -> Cow<str> {
        "/locations".into()
    }
}

impl LocationsResponse {
    /// Find the data center with the given IATA code.
    pub(crate) fn get(&self, iata: &str) -> Option<&Location> {
        self.0.iter().find(|loc| loc.iata.eq_ignore_ascii_case(iata))
    }
}
