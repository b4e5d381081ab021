use crate::consent::{self, DismissStrategy};
use crate::error::{BrowserError, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::ClearBrowserCookiesParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;

/// Options for launching a browser session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Bound on page navigation
    pub page_load_timeout: Duration,
    /// Bound on each consent-dismissal attempt
    pub consent_wait: Duration,
    /// Explicit browser binary (system default when unset)
    pub chrome_binary: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            page_load_timeout: Duration::from_secs(12),
            consent_wait: Duration::from_millis(1000),
            chrome_binary: None,
        }
    }
}

/// One browser session: a launched chromium instance with a single reused
/// page.
///
/// Sessions are owned by exactly one worker and reused across rows; call
/// [`BrowserSession::reset`] between rows so cookies and consent state do
/// not leak from one row to the next.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    options: SessionOptions,
    strategies: Vec<DismissStrategy>,
    consent_dismissed: bool,
}

impl BrowserSession {
    /// Launch a browser and open the session page.
    pub async fn launch(options: SessionOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder().no_sandbox();
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(binary) = &options.chrome_binary {
            builder = builder.chrome_executable(binary);
        }
        let config = builder
            .build()
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Drive the CDP event loop for the lifetime of the browser.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        Ok(Self {
            browser,
            page,
            options,
            strategies: consent::default_strategies(),
            consent_dismissed: false,
        })
    }

    /// Navigate to a URL and extract the text of the first selector that
    /// yields a non-empty match.
    ///
    /// Navigation is bounded by the configured page-load timeout; a
    /// consent dialog, if one has not been dismissed in this session yet,
    /// is handled best-effort before extraction. Returns `Ok(None)` when
    /// the page rendered but no selector matched.
    pub async fn fetch_text(&mut self, url: &str, selectors: &[&str]) -> Result<Option<String>> {
        self.navigate(url).await?;

        if !self.consent_dismissed {
            self.consent_dismissed = consent::dismiss_consent(
                &self.page,
                &self.strategies,
                self.options.consent_wait,
            )
            .await;
        }

        for selector in selectors {
            let Ok(element) = self.page.find_element(*selector).await else {
                continue;
            };
            match element.inner_text().await {
                Ok(Some(text)) => {
                    let text = text.trim().to_string();
                    if !text.is_empty() {
                        return Ok(Some(text));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::trace!("Text extraction failed for {}: {}", selector, e);
                }
            }
        }

        Ok(None)
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let navigation = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
            self.page
                .wait_for_navigation()
                .await
                .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
            Ok::<(), BrowserError>(())
        };

        tokio::time::timeout(self.options.page_load_timeout, navigation)
            .await
            .map_err(|_| {
                BrowserError::Timeout(format!(
                    "page load exceeded {:?} for {}",
                    self.options.page_load_timeout, url
                ))
            })?
    }

    /// Clear cookies and return to a blank page so the next row starts
    /// from a clean slate.
    pub async fn reset(&mut self) -> Result<()> {
        self.page
            .execute(ClearBrowserCookiesParams::default())
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        self.page
            .goto("about:blank")
            .await
            .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
        self.consent_dismissed = false;
        Ok(())
    }

    /// Shut the browser down.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("Browser close failed: {}", e);
        }
        let _ = self.browser.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = SessionOptions::default();
        assert!(options.headless);
        assert_eq!(options.page_load_timeout, Duration::from_secs(12));
        assert!(options.chrome_binary.is_none());
    }
}
