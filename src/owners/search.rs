use super::OwnerSource;
use crate::{
    google::search::{CustomSearchClient, SearchItem, SearchResponse},
    models::{Business, Lookup},
    runlog::RunLog,
    util::reduce_whitespace,
};
use std::{sync::Arc, time::Duration};

/// Owner lookup through a custom web search for "Owner of {name}".
/// Quota errors and failed requests are retried with exponential backoff.
#[derive(Clone)]
pub struct SearchSource {
    search: CustomSearchClient,
    run_log: Arc<RunLog>,
    attempts: usize,
    base_delay: Duration,
}

impl SearchSource {
    pub fn new(search: CustomSearchClient, run_log: Arc<RunLog>) -> Self {
        Self {
            search,
            run_log,
            attempts: 5,
            base_delay: Duration::from_secs(10),
        }
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry. It doubles for every retry after that.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    fn owner_from_items(&self, name: &str, items: &[SearchItem]) -> Lookup {
        if items.is_empty() {
            self.run_log
                .failure(format!("No search results for owner of {name}"));
            return Lookup::NotFound;
        }
        let snippet = items
            .iter()
            .filter_map(|i| i.snippet.as_deref())
            .map(reduce_whitespace)
            .find(|s| !s.is_empty());
        match snippet {
            Some(s) => {
                self.run_log.success(format!("Google found: {s}"));
                Lookup::Found(s)
            }
            None => {
                self.run_log
                    .failure(format!("No owner info in search results for {name}"));
                Lookup::NoOwnerInfo
            }
        }
    }
}

impl OwnerSource for SearchSource {
    async fn lookup(&self, business: &Business) -> Lookup {
        let name = business.name.trim();
        if name.is_empty() {
            return Lookup::NotFound;
        }
        let query = format!("Owner of {name}");
        let mut delay = self.base_delay;

        for attempt in 1..=self.attempts {
            match self.search.search(&query).await {
                Ok(SearchResponse {
                    error: Some(err), ..
                }) => {
                    self.run_log
                        .error(format!("Google API error: {}", err.message()));
                    if err.is_invalid_key() {
                        self.run_log
                            .error("Verify that the API key and search engine id are correct");
                        return Lookup::ApiKeyError;
                    }
                    if !err.is_quota() {
                        return Lookup::ApiError;
                    }
                    self.run_log.error(format!(
                        "Quota exceeded on attempt {attempt}/{}",
                        self.attempts
                    ));
                }
                Ok(res) => return self.owner_from_items(name, &res.items),
                Err(err) => {
                    self.run_log
                        .error(format!("Google API request error: {err}"));
                }
            }

            if attempt < self.attempts {
                self.run_log.error(format!(
                    "Waiting {} before retrying search for {name}",
                    humantime::format_duration(delay)
                ));
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }

        self.run_log.error(format!(
            "Giving up search for {name} after {} attempts",
            self.attempts
        ));
        Lookup::Error
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
