use super::OwnerSource;
use crate::{
    cache::Client,
    error::Result,
    models::{Business, Lookup, NOT_AVAILABLE},
    runlog::RunLog,
    util::{sel, with_scheme},
};
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::info;
use url::Url;

// Links with any of these in the href usually lead to a page naming the people behind the company
static ABOUT_KEYWORDS: [&str; 5] = ["about", "team", "leadership", "company", "who-we-are"];

lazy_static! {
    static ref SEL_LINK: Selector = sel("a[href]");
}

#[derive(Clone)]
pub struct WebsiteSource {
    client: Client,
    run_log: Arc<RunLog>,
}

impl WebsiteSource {
    pub fn new(client: Client, run_log: Arc<RunLog>) -> Self {
        Self { client, run_log }
    }

    async fn about_page(&self, site: &str) -> Result<Option<String>> {
        let url = Url::parse(&with_scheme(site))?;
        info!("Checking business website: {url}");
        let html = self.client.get_as_string(url.clone()).await?;
        Ok(find_about_link(&html, &url))
    }
}

impl OwnerSource for WebsiteSource {
    async fn lookup(&self, business: &Business) -> Lookup {
        let Some(site) = business
            .website
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != NOT_AVAILABLE)
        else {
            return Lookup::NoWebsite;
        };

        match self.about_page(site).await {
            Ok(Some(link)) => {
                self.run_log
                    .success(format!("Found about page for {}: {link}", business.name));
                Lookup::Found(link)
            }
            Ok(None) => {
                self.run_log.failure(format!(
                    "No about page link found for {} on {site}",
                    business.name
                ));
                Lookup::NotFound
            }
            Err(err) => {
                self.run_log
                    .error(format!("Website scraping error for {site}: {err}"));
                Lookup::Error
            }
        }
    }

    fn name(&self) -> &'static str {
        "website"
    }
}

/// First link that looks like an about page, made absolute against the page URL
pub fn find_about_link(html: &str, page: &Url) -> Option<String> {
    let doc = Html::parse_document(html);
    let href = doc
        .select(&SEL_LINK)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| {
            let href = href.to_lowercase();
            ABOUT_KEYWORDS.iter().any(|k| href.contains(k))
        })?;

    match page.join(href) {
        Ok(u) => Some(u.into()),
        Err(_) => Some(href.into()),
    }
}
