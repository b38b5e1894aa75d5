// Owner lookup: each business is checked against its own website, a web search and the BBB
// directory. Lookups never fail a row, they resolve to a sentinel instead.

pub mod bbb;
pub mod search;
pub mod website;

pub use bbb::BbbSource;
pub use search::SearchSource;
pub use website::WebsiteSource;

use crate::models::{Business, Lookup, Owners};
use futures::{StreamExt, stream};
use indicatif::ProgressBar;
use tracing::debug;

// Only implemented and awaited inside this crate, so no Send bound on the returned futures
#[allow(async_fn_in_trait)]
pub trait OwnerSource {
    async fn lookup(&self, business: &Business) -> Lookup;

    fn name(&self) -> &'static str;
}

pub struct OwnerFinder<W, S, B> {
    website: W,
    search: S,
    bbb: B,
    concurrency: Option<usize>,
}

impl<W, S, B> OwnerFinder<W, S, B>
where
    W: OwnerSource,
    S: OwnerSource,
    B: OwnerSource,
{
    pub fn new(website: W, search: S, bbb: B) -> Self {
        Self {
            website,
            search,
            bbb,
            concurrency: None,
        }
    }

    /// Cap the number of rows looked up at the same time. Unlimited if not set.
    pub fn with_concurrency(mut self, limit: Option<usize>) -> Self {
        self.concurrency = limit;
        self
    }

    /// All three lookups for a single business, run concurrently
    pub async fn find(&self, business: &Business) -> Owners {
        let (website, google, bbb) = tokio::join!(
            self.website.lookup(business),
            self.search.lookup(business),
            self.bbb.lookup(business),
        );
        debug!(
            name = %business.name,
            "{}: {website}, {}: {google}, {}: {bbb}",
            self.website.name(),
            self.search.name(),
            self.bbb.name(),
        );
        Owners {
            website,
            google,
            bbb,
        }
    }

    /// Look up owners for every business. The result has one entry per business, in input order.
    pub async fn find_all(&self, businesses: &[Business], progress: &ProgressBar) -> Vec<Owners> {
        let limit = self.concurrency.unwrap_or(businesses.len()).max(1);
        stream::iter(businesses)
            .map(|b| async move {
                let owners = self.find(b).await;
                progress.inc(1);
                owners
            })
            .buffered(limit)
            .collect()
            .await
    }
}
