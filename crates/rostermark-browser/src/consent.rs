//! Consent-dialog dismissal.
//!
//! Rendered pages frequently open with a cookie/consent interstitial that
//! hides the content we want to read. Dismissal is best-effort: an ordered
//! list of strategies is tried against the main document and same-origin
//! frames, each attempt independently fallible, and the page is treated as
//! usable whether or not any of them succeeds.

use crate::error::Result;
use chromiumoxide::Page;
use std::time::Duration;

/// One dismissal attempt.
pub struct DismissStrategy {
    /// Short label used in trace logs
    pub label: &'static str,
    action: Action,
}

enum Action {
    /// Find an element by CSS selector and click it
    ClickCss(&'static str),
    /// Evaluate a script that returns `true` when it clicked something
    EvalJs(&'static str),
}

/// Script that clicks the first button in the main document whose text
/// looks like a consent acceptance.
const CLICK_BY_TEXT_JS: &str = r#"
(() => {
    const accepted = ['accept & continue', 'accept all', 'i agree', 'agree', 'accept'];
    for (const btn of document.querySelectorAll('button')) {
        const text = (btn.textContent || '').trim().toLowerCase();
        if (accepted.some((t) => text.includes(t))) {
            btn.click();
            return true;
        }
    }
    return false;
})()
"#;

/// Script that sweeps same-origin iframes for a consent button.
/// Cross-origin frames throw on `contentDocument` access and are skipped.
const CLICK_IN_FRAMES_JS: &str = r#"
(() => {
    let clicked = false;
    for (const frame of document.querySelectorAll('iframe')) {
        try {
            const doc = frame.contentDocument;
            if (!doc) continue;
            let btn = doc.querySelector('#onetrust-accept-btn-handler, button.accept-all');
            if (!btn) {
                btn = Array.from(doc.querySelectorAll('button'))
                    .find((b) => /accept|agree/i.test(b.textContent || ''));
            }
            if (btn) {
                btn.click();
                clicked = true;
            }
        } catch (e) {
            // cross-origin frame
        }
    }
    return clicked;
})()
"#;

/// The default strategy cascade, most specific first.
#[must_use]
pub fn default_strategies() -> Vec<DismissStrategy> {
    vec![
        DismissStrategy {
            label: "onetrust-accept",
            action: Action::ClickCss("#onetrust-accept-btn-handler"),
        },
        DismissStrategy {
            label: "accept-all-button",
            action: Action::ClickCss("button.accept-all"),
        },
        DismissStrategy {
            label: "accept-continue-title",
            action: Action::ClickCss("button[title='Accept & continue']"),
        },
        DismissStrategy {
            label: "button-text-scan",
            action: Action::EvalJs(CLICK_BY_TEXT_JS),
        },
        DismissStrategy {
            label: "iframe-sweep",
            action: Action::EvalJs(CLICK_IN_FRAMES_JS),
        },
    ]
}

/// Run the strategy list against a page.
///
/// Each attempt is bounded by `per_attempt`; failures (missing element,
/// script error, timeout) move on to the next strategy. Returns `true` as
/// soon as one strategy reports a click.
pub async fn dismiss_consent(
    page: &Page,
    strategies: &[DismissStrategy],
    per_attempt: Duration,
) -> bool {
    for strategy in strategies {
        match tokio::time::timeout(per_attempt, attempt(page, strategy)).await {
            Ok(Ok(true)) => {
                tracing::debug!("Consent dismissed via {}", strategy.label);
                return true;
            }
            Ok(Ok(false)) => {}
            Ok(Err(e)) => {
                tracing::trace!("Consent attempt {} failed: {}", strategy.label, e);
            }
            Err(_) => {
                tracing::trace!("Consent attempt {} timed out", strategy.label);
            }
        }
    }
    false
}

async fn attempt(page: &Page, strategy: &DismissStrategy) -> Result<bool> {
    match &strategy.action {
        Action::ClickCss(selector) => {
            let Ok(element) = page.find_element(*selector).await else {
                return Ok(false);
            };
            element
                .click()
                .await
                .map_err(|e| crate::error::BrowserError::ChromiumError(e.to_string()))?;
            Ok(true)
        }
        Action::EvalJs(script) => {
            let result = page
                .evaluate(*script)
                .await
                .map_err(|e| crate::error::BrowserError::ChromiumError(e.to_string()))?;
            Ok(result.into_value::<bool>().unwrap_or(false))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_order_is_specific_first() {
        let strategies = default_strategies();
        assert_eq!(strategies[0].label, "onetrust-accept");
        assert_eq!(
            strategies.last().expect("non-empty strategy list").label,
            "iframe-sweep"
        );
    }

    #[test]
    fn test_strategy_list_is_bounded() {
        // The cascade must stay small: every strategy runs against every
        // page that still shows a consent dialog.
        assert!(default_strategies().len() <= 8);
    }
}
