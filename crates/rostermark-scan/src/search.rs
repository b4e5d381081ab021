//! HTTP search tier.
//!
//! Fast structured fetch of the quick-search results page, parsed into
//! [`CandidateProfile`]s. This is the first acquisition tier; rows that
//! match here but carry no inline value fall through to the browser tier.

use crate::error::Result;
use crate::resolver::SearchBackend;
use crate::value::extract_value_fragment;
use async_trait::async_trait;
use rostermark_core::CandidateProfile;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use std::time::Duration;

/// Origin of the market-value site.
pub const BASE_URL: &str = "https://www.transfermarkt.com";

fn selector(cached: &'static OnceLock<Selector>, css: &'static str) -> &'static Selector {
    cached.get_or_init(|| Selector::parse(css).expect("valid selector"))
}

fn result_row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "table.items > tbody > tr")
}

fn any_row_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "tr")
}

fn player_link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, r#"a[href*="/profil/spieler/"]"#)
}

fn club_link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, r#"a[href*="/verein/"]"#)
}

fn club_badge_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "img[title], img[alt]")
}

fn value_cell_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "td.rechts.hauptlink")
}

/// Client for the structured quick-search endpoint.
pub struct SearchClient {
    http: reqwest::Client,
}

impl SearchClient {
    /// Build a client with the configured user agent and request timeout.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }

    /// Fetch and parse search hits for a player name.
    pub async fn search(&self, player_name: &str) -> Result<Vec<CandidateProfile>> {
        let url = format!("{BASE_URL}/schnellsuche/ergebnis/schnellsuche");
        let response = self
            .http
            .get(url)
            .query(&[("query", player_name.trim())])
            .send()
            .await?;
        let html = response.error_for_status()?.text().await?;
        Ok(parse_search_results(&html, BASE_URL))
    }
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn search(&self, player_name: &str) -> Result<Vec<CandidateProfile>> {
        SearchClient::search(self, player_name).await
    }
}

/// Parse a search-results page into candidates.
///
/// Every table row with a player-profile link becomes one candidate:
/// club label from the row's club link (badge image as fallback), value
/// text from the value cell with a currency-fragment sweep of the whole
/// row as fallback. Rows without a player link are skipped; duplicate
/// profile URLs keep the first-seen row.
#[must_use]
pub fn parse_search_results(html: &str, base_url: &str) -> Vec<CandidateProfile> {
    let document = Html::parse_document(html);

    let mut rows: Vec<ElementRef> = document.select(result_row_selector()).collect();
    if rows.is_empty() {
        // Fixture pages and stripped-down markup have no items table.
        rows = document.select(any_row_selector()).collect();
    }

    let mut candidates = Vec::new();
    let mut seen_urls = Vec::new();

    for row in rows {
        let Some(link) = row.select(player_link_selector()).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };

        let profile_url = if href.starts_with('/') {
            format!("{base_url}{href}")
        } else {
            href.to_string()
        };
        if seen_urls.contains(&profile_url) {
            continue;
        }

        let display_name = element_text(&link);
        if display_name.is_empty() {
            continue;
        }

        let club_name = row
            .select(club_link_selector())
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty())
            .or_else(|| {
                row.select(club_badge_selector())
                    .filter_map(|el| {
                        el.value()
                            .attr("title")
                            .or_else(|| el.value().attr("alt"))
                            .map(|s| s.trim().to_string())
                    })
                    .find(|text| !text.is_empty())
            })
            .unwrap_or_default();

        let raw_value_text = row
            .select(value_cell_selector())
            .map(|el| element_text(&el))
            .find(|text| extract_value_fragment(text).is_some())
            .or_else(|| extract_value_fragment(&row.text().collect::<String>()));

        seen_urls.push(profile_url.clone());
        candidates.push(CandidateProfile {
            display_name,
            club_name,
            profile_url,
            raw_value_text,
        });
    }

    candidates
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}
