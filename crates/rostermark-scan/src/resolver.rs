//! Two-tier acquisition state machine.
//!
//! One resolver invocation takes a roster row through
//! `FETCH_HTTP → PARSE_HTTP → [DONE | FETCH_BROWSER → PARSE_BROWSER →
//! DONE]` and always terminates in exactly one [`ResolutionResult`].
//! Tier failures are absorbed here: a resolution never surfaces an error
//! to the orchestrator.

use crate::error::Result;
use crate::matcher;
use crate::value::{extract_value_fragment, parse_value_text};
use async_trait::async_trait;
use rostermark_browser::{BrowserSession, SessionOptions};
use rostermark_core::{CandidateProfile, ResolutionResult, RowKey};

/// Selectors that carry the market value on a rendered profile page.
const VALUE_SELECTORS: &[&str] = &[
    "a.data-header__market-value-wrapper",
    "div.data-header__market-value-wrapper",
];

/// Structured search over the fast HTTP tier.
#[async_trait]
pub trait SearchBackend: Send {
    /// Return search hits for a player name. Zero hits is a valid answer;
    /// an `Err` means the tier itself failed.
    async fn search(&self, player_name: &str) -> Result<Vec<CandidateProfile>>;
}

/// Rendered-page value acquisition over the browser tier.
#[async_trait]
pub trait ValueFetcher: Send {
    /// Fetch the value text from a profile page. `Ok(None)` means the page
    /// rendered but carried no recognizable value.
    async fn fetch_value_text(&mut self, profile_url: &str) -> Result<Option<String>>;

    /// Clear per-row state (cookies, consent) so nothing leaks into the
    /// next row.
    async fn reset(&mut self) {}

    /// Release held resources at the end of a worker's life.
    async fn shutdown(&mut self) {}
}

/// Production [`ValueFetcher`] backed by a lazily launched browser
/// session.
///
/// The session is created on the first fallback in a worker's life and
/// reused for later rows; rows that resolve on the HTTP tier alone never
/// pay the browser startup cost.
pub struct BrowserValueFetcher {
    options: SessionOptions,
    session: Option<BrowserSession>,
}

impl BrowserValueFetcher {
    /// Create a fetcher that will launch with the given options.
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            session: None,
        }
    }
}

#[async_trait]
impl ValueFetcher for BrowserValueFetcher {
    async fn fetch_value_text(&mut self, profile_url: &str) -> Result<Option<String>> {
        if self.session.is_none() {
            let session = BrowserSession::launch(self.options.clone()).await?;
            self.session = Some(session);
        }
        let session = self.session.as_mut().expect("session launched above");
        Ok(session.fetch_text(profile_url, VALUE_SELECTORS).await?)
    }

    async fn reset(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if let Err(e) = session.reset().await {
                tracing::debug!("Browser reset failed, dropping session: {}", e);
                if let Some(session) = self.session.take() {
                    session.close().await;
                }
            }
        }
    }

    async fn shutdown(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }
}

/// Resolves one roster row to a market value through the two acquisition
/// tiers.
pub struct PlayerResolver<S, V> {
    search: S,
    fetcher: V,
}

impl<S: SearchBackend, V: ValueFetcher> PlayerResolver<S, V> {
    /// Create a resolver from its two acquisition backends.
    pub fn new(search: S, fetcher: V) -> Self {
        Self { search, fetcher }
    }

    /// Run the state machine for one row.
    pub async fn resolve(&mut self, key: &RowKey) -> ResolutionResult {
        // FETCH_HTTP
        let candidates = match self.search.search(&key.player).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::debug!("Search failed for {}: {}", key, e);
                return ResolutionResult::error();
            }
        };

        // PARSE_HTTP
        if candidates.is_empty() {
            return ResolutionResult::no_match();
        }
        let Some(candidate) = matcher::select_best(&candidates, key) else {
            return ResolutionResult::no_match();
        };
        let matched_club = candidate.club_name.clone();
        let profile_url = candidate.profile_url.clone();

        if let Some(raw) = candidate
            .raw_value_text
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
        {
            if let Some(parsed) = parse_value_text(raw) {
                return ResolutionResult::matched(
                    matched_club,
                    profile_url,
                    Some(raw.to_string()),
                    Some(parsed),
                );
            }
            tracing::debug!("Inline value {:?} unparsable for {}, trying browser", raw, key);
        }

        // FETCH_BROWSER / PARSE_BROWSER
        let text = match self.fetcher.fetch_value_text(&profile_url).await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Browser tier failed for {}: {}", key, e);
                None
            }
        };
        self.fetcher.reset().await;

        let raw = text.as_deref().and_then(extract_value_fragment);
        let parsed = raw.as_deref().and_then(parse_value_text);
        ResolutionResult::matched(matched_club, profile_url, raw, parsed)
    }

    /// Release backend resources.
    pub async fn shutdown(&mut self) {
        self.fetcher.shutdown().await;
    }
}

/// Worker-facing view of a resolver: one call per row, infallible, plus
/// end-of-life cleanup. The orchestrator is generic over this so its
/// scheduling can be exercised without any network or browser.
#[async_trait]
pub trait RowResolver: Send {
    /// Resolve one row to its terminal result.
    async fn resolve_row(&mut self, key: &RowKey) -> ResolutionResult;

    /// Release held resources at the end of a worker's life.
    async fn shutdown(&mut self) {}
}

#[async_trait]
impl<S: SearchBackend, V: ValueFetcher> RowResolver for PlayerResolver<S, V> {
    async fn resolve_row(&mut self, key: &RowKey) -> ResolutionResult {
        self.resolve(key).await
    }

    async fn shutdown(&mut self) {
        PlayerResolver::shutdown(self).await;
    }
}
