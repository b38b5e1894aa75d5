// Places search: every keyword in every city, with details fetched per place.

use crate::{
    error::Result,
    google::places::{Place, PlacesClient},
    models::Business,
    runlog::RunLog,
};
use indicatif::ProgressBar;
use std::{collections::HashSet, sync::Arc, time::Duration};
use tracing::{debug, info, warn};

pub static DEFAULT_CITIES: [&str; 7] = [
    "Columbia, SC",
    "Lexington, SC",
    "Blythewood, SC",
    "Cayce, SC",
    "West Columbia, SC",
    "Irmo, SC",
    "Chapin, SC",
];
pub static DEFAULT_KEYWORDS: [&str; 2] = ["HVAC contractor", "Plumbing contractor"];

pub struct PlacesScraper {
    places: PlacesClient,
    run_log: Arc<RunLog>,
    request_delay: Duration,
    page_delay: Duration,
    max_pages: usize,
}

impl PlacesScraper {
    pub fn new(places: PlacesClient, run_log: Arc<RunLog>) -> Self {
        Self {
            places,
            run_log,
            request_delay: Duration::from_secs(1),
            page_delay: Duration::from_secs(2),
            max_pages: 1,
        }
    }

    /// Pause after each place, to stay below the API rate limits
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Pause before asking for a follow-up page. Page tokens take a moment to become valid.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn with_max_pages(mut self, pages: usize) -> Self {
        self.max_pages = pages.max(1);
        self
    }

    /// Search every keyword in every city. A failing query is logged and skipped.
    /// Places found by more than one query are only returned once.
    pub async fn run<C, K>(&self, cities: &[C], keywords: &[K], progress: &ProgressBar) -> Vec<Business>
    where
        C: AsRef<str>,
        K: AsRef<str>,
    {
        let total = cities.len() * keywords.len();
        progress.set_length(total as u64);

        let mut seen = HashSet::new();
        let mut businesses = Vec::new();
        let mut n = 0;

        for city in cities {
            let city: &str = city.as_ref();
            for keyword in keywords {
                let keyword: &str = keyword.as_ref();
                n += 1;
                info!("[{n}/{total}] Searching for '{keyword}' in {city}...");
                progress.set_message(format!("{keyword} in {city}"));

                let places = match self.search(&format!("{keyword} in {city}")).await {
                    Ok(p) => p,
                    Err(err) => {
                        self.run_log
                            .error(format!("Error fetching data for {keyword} in {city}: {err}"));
                        progress.inc(1);
                        continue;
                    }
                };
                info!("Found {} results", places.len());

                for place in places {
                    if let Some(id) = place.place_id.as_ref() {
                        if !seen.insert(id.clone()) {
                            debug!(place_id = %id, "Skipping place already found by another query");
                            continue;
                        }
                    }
                    businesses.push(self.business(place, keyword).await);
                    tokio::time::sleep(self.request_delay).await;
                }
                progress.inc(1);
            }
        }

        businesses
    }

    /// All result pages for a query, up to `max_pages`
    async fn search(&self, query: &str) -> Result<Vec<Place>> {
        let mut page = self.places.text_search(query, None).await?;
        let mut places = std::mem::take(&mut page.results);

        for _ in 1..self.max_pages {
            let Some(token) = page.next_page_token.take() else {
                break;
            };
            tokio::time::sleep(self.page_delay).await;
            page = self.places.text_search(query, Some(&token)).await?;
            places.append(&mut page.results);
        }

        Ok(places)
    }

    async fn business(&self, place: Place, keyword: &str) -> Business {
        let details = match place.place_id.as_deref() {
            Some(id) => self.places.details(id).await.unwrap_or_else(|err| {
                warn!(%err, place_id = id, "Error fetching details for place");
                Default::default()
            }),
            None => Default::default(),
        };

        Business {
            name: place.name.unwrap_or_default(),
            address: place.formatted_address,
            category: Some(keyword.into()),
            phone: details.formatted_phone_number,
            website: details.website,
            owners: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Client, Opts};
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    async fn scraper(server: &MockServer) -> PlacesScraper {
        let client = Client::build(Opts::default()).await.unwrap();
        PlacesScraper::new(
            PlacesClient::new(client, &server.uri(), "k"),
            Arc::new(RunLog::disabled()),
        )
        .with_request_delay(Duration::ZERO)
        .with_page_delay(Duration::ZERO)
    }

    async fn mount_search(server: &MockServer, query: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/place/textsearch/json"))
            .and(query_param("query", query))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn scrapes_all_queries_and_dedupes() {
        let server = MockServer::start().await;
        mount_search(
            &server,
            "HVAC contractor in Irmo, SC",
            json!({"status": "OK", "results": [
                {"place_id": "p1", "name": "Cool Air", "formatted_address": "1 Lake Murray Blvd, Irmo, SC"}
            ]}),
        )
        .await;
        mount_search(
            &server,
            "Plumbing contractor in Irmo, SC",
            json!({"status": "OK", "results": [
                {"place_id": "p1", "name": "Cool Air", "formatted_address": "1 Lake Murray Blvd, Irmo, SC"},
                {"place_id": "p2", "name": "Pipe Dreams", "formatted_address": "2 Main St, Irmo, SC"}
            ]}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/place/details/json"))
            .and(query_param("place_id", "p1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "result": {"formatted_phone_number": "(803) 555-0100", "website": "coolair.test"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/place/details/json"))
            .and(query_param("place_id", "p2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let b = scraper(&server)
            .await
            .run(&["Irmo, SC"], &DEFAULT_KEYWORDS, &ProgressBar::hidden())
            .await;

        assert_eq!(2, b.len());
        assert_eq!("Cool Air", b[0].name);
        assert_eq!(Some("HVAC contractor".into()), b[0].category);
        assert_eq!(Some("(803) 555-0100".into()), b[0].phone);
        assert_eq!(Some("coolair.test".into()), b[0].website);
        assert_eq!("Pipe Dreams", b[1].name);
        assert_eq!(Some("Plumbing contractor".into()), b[1].category);
        // details failed, so phone and website are missing
        assert_eq!(None, b[1].phone);
        assert_eq!(None, b[1].website);
    }

    #[tokio::test]
    async fn failing_query_is_skipped() {
        let server = MockServer::start().await;
        mount_search(
            &server,
            "HVAC contractor in Cayce, SC",
            json!({"status": "OVER_QUERY_LIMIT", "error_message": "slow down"}),
        )
        .await;
        mount_search(
            &server,
            "HVAC contractor in Chapin, SC",
            json!({"status": "OK", "results": [{"name": "No Id Heating"}]}),
        )
        .await;

        let b = scraper(&server)
            .await
            .run(
                &["Cayce, SC", "Chapin, SC"],
                &["HVAC contractor"],
                &ProgressBar::hidden(),
            )
            .await;
        assert_eq!(1, b.len());
        assert_eq!("No Id Heating", b[0].name);
        assert_eq!(None, b[0].address);
    }

    #[tokio::test]
    async fn follows_page_tokens() {
        let server = MockServer::start().await;
        mount_search(
            &server,
            "HVAC contractor in Cayce, SC",
            json!({"status": "OK", "results": [{"name": "First"}], "next_page_token": "tok2"}),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/place/textsearch/json"))
            .and(query_param("pagetoken", "tok2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"status": "OK", "results": [{"name": "Second"}], "next_page_token": "tok3"}),
            ))
            .mount(&server)
            .await;

        let s = scraper(&server).await;
        let one = s
            .run(&["Cayce, SC"], &["HVAC contractor"], &ProgressBar::hidden())
            .await;
        assert_eq!(1, one.len());

        let two = s
            .with_max_pages(2)
            .run(&["Cayce, SC"], &["HVAC contractor"], &ProgressBar::hidden())
            .await;
        let names: Vec<_> = two.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(vec!["First", "Second"], names);
    }
}
