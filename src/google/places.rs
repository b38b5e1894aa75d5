use super::{ApiStatus, endpoint};
use crate::{cache::Client, error::Result};
use serde::Deserialize;
use tracing::trace;

static SERVICE: &str = "places";
static DETAIL_FIELDS: &str = "formatted_phone_number,website";

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Place {
    pub place_id: Option<String>,
    pub name: Option<String>,
    pub formatted_address: Option<String>,
}

/// One page of text search results
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SearchPage {
    #[serde(flatten)]
    pub status: ApiStatus,
    pub results: Vec<Place>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PlaceDetails {
    pub formatted_phone_number: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DetailsResponse {
    #[serde(flatten)]
    status: ApiStatus,
    result: PlaceDetails,
}

#[derive(Clone)]
pub struct PlacesClient {
    client: Client,
    base_url: String,
    key: String,
}

impl PlacesClient {
    pub fn new(client: Client, base_url: &str, key: &str) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            key: key.into(),
        }
    }

    /// Free text search, e.g. "HVAC contractor in Columbia, SC".
    /// Pass the token from a previous page to get the next one.
    pub async fn text_search(&self, query: &str, page_token: Option<&str>) -> Result<SearchPage> {
        trace!(query, ?page_token, "Searching places...");
        let url = endpoint(&self.base_url, "place/textsearch/json");
        let page: SearchPage = match page_token {
            Some(token) => {
                self.client
                    .get_json(url, &[("pagetoken", token), ("key", self.key.as_str())])
                    .await?
            }
            None => {
                self.client
                    .get_json(url, &[("query", query), ("key", self.key.as_str())])
                    .await?
            }
        };
        if !page.status.check(SERVICE)? {
            return Ok(SearchPage::default());
        }
        Ok(page)
    }

    /// Phone number and website for a place
    pub async fn details(&self, place_id: &str) -> Result<PlaceDetails> {
        trace!(place_id, "Fetching place details...");
        let res: DetailsResponse = self
            .client
            .get_json(
                endpoint(&self.base_url, "place/details/json"),
                &[
                    ("place_id", place_id),
                    ("fields", DETAIL_FIELDS),
                    ("key", self.key.as_str()),
                ],
            )
            .await?;
        if !res.status.check(SERVICE)? {
            return Ok(PlaceDetails::default());
        }
        Ok(res.result)
    }
}
