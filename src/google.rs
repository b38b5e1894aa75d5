//! Thin clients for the Google web service endpoints we use.
//!
//! All clients take their base URL as a parameter, so they can be pointed at a local server.

use crate::error::{Error, Result};
use serde::Deserialize;

pub mod directions;
pub mod places;
pub mod search;

pub static MAPS_API_URL: &str = "https://maps.googleapis.com/maps/api";
pub static CUSTOM_SEARCH_URL: &str = "https://www.googleapis.com/customsearch/v1";

static STATUS_OK: &str = "OK";
static STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";

/// The status fields every maps web service response carries
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ApiStatus {
    pub status: String,
    pub error_message: Option<String>,
}

impl ApiStatus {
    /// Ok(true) if there are results, Ok(false) for ZERO_RESULTS, and an error for anything else
    pub fn check(&self, service: &'static str) -> Result<bool> {
        if self.status == STATUS_OK {
            return Ok(true);
        }
        if self.status == STATUS_ZERO_RESULTS {
            return Ok(false);
        }
        Err(Error::api(service, &self.status, self.error_message.clone()))
    }
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
