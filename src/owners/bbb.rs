// Better Business Bureau directory: search for the business, open the best matching profile and
// read the owner from its management section.

use super::OwnerSource;
use crate::{
    cache::Client,
    error::Result,
    fuzzy,
    models::{Business, Lookup},
    runlog::RunLog,
    util::{encode_path_segment, get_text, sel},
};
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

pub static BBB_URL: &str = "https://www.bbb.org";

// Headings on the profile page that are followed by the owner name, in order of preference
static OWNER_HEADINGS: [&str; 2] = ["Business Management", "Principal Contacts"];

lazy_static! {
    static ref SEL_LINK: Selector = sel("a[href]");
    static ref SEL_H2_OR_P: Selector = sel("h2, p");
}

#[derive(Clone)]
pub struct BbbSource {
    client: Client,
    base_url: Url,
    run_log: Arc<RunLog>,
}

impl BbbSource {
    pub fn new(client: Client, base_url: &str, run_log: Arc<RunLog>) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
            run_log,
        })
    }

    async fn find_owner(&self, name: &str) -> Result<Lookup> {
        info!("Searching BBB: {name}");
        let search = self
            .base_url
            .join(&format!("search?find_text={}", encode_path_segment(name)))?;
        let html = self.client.get_as_string(search).await?;

        let Some(href) = profile_link(&html, name) else {
            self.run_log
                .failure(format!("No BBB profile found for {name}"));
            return Ok(Lookup::NotFound);
        };
        let profile = self.base_url.join(&href)?;
        info!("Found BBB profile: {profile}");

        let html = self.client.get_as_string(profile).await?;
        match owner_from_profile(&html) {
            Some(owner) => {
                self.run_log.success(format!("BBB found: {owner}"));
                Ok(Lookup::Found(owner))
            }
            None => {
                self.run_log
                    .failure(format!("No owner listed on BBB profile for {name}"));
                Ok(Lookup::NotFound)
            }
        }
    }
}

impl OwnerSource for BbbSource {
    async fn lookup(&self, business: &Business) -> Lookup {
        let name = business.name.trim();
        if name.is_empty() {
            return Lookup::NotFound;
        }
        self.find_owner(name).await.unwrap_or_else(|err| {
            self.run_log.error(format!("BBB search error for {name}: {err}"));
            Lookup::Error
        })
    }

    fn name(&self) -> &'static str {
        "bbb"
    }
}

/// Pick a profile link from a search result page.
/// The best fuzzy match on the link text wins, otherwise the first profile link.
pub fn profile_link(html: &str, name: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let candidates: Vec<(String, String)> = doc
        .select(&SEL_LINK)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            (href.contains("/us/") && href.contains("profile")).then(|| (href.to_string(), get_text(&a)))
        })
        .collect();

    let idx = match fuzzy::best_match(
        name,
        candidates.iter().map(|(_, text)| text.as_str()),
        fuzzy::DEFAULT_THRESHOLD,
    ) {
        Some((i, score)) => {
            debug!(name, matched = %candidates[i].1, score, "Fuzzy matched BBB profile");
            i
        }
        None => 0,
    };
    candidates.into_iter().nth(idx).map(|(href, _)| href)
}

/// Owner as listed on a profile page
pub fn owner_from_profile(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    OWNER_HEADINGS
        .iter()
        .find_map(|heading| paragraph_after(&doc, heading))
}

/// Text of the first paragraph following the h2 with the given title, in document order
fn paragraph_after(doc: &Html, heading: &str) -> Option<String> {
    let mut elems = doc
        .select(&SEL_H2_OR_P)
        .skip_while(|e| !(e.value().name() == "h2" && get_text(e) == heading));
    elems.next()?;
    elems
        .find(|e| e.value().name() == "p")
        .map(|p| get_text(&p))
        .filter(|t| !t.is_empty())
}
