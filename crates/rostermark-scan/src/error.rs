use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScanError>;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Transient search-tier failure (connect, timeout, HTTP status).
    /// Absorbed at the resolver tier boundary, never fatal to a worker.
    #[error("search request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The fetched page did not have the expected shape.
    #[error("malformed page: {0}")]
    Parse(String),

    /// Browser-tier failure. Absorbed at the resolver tier boundary.
    #[error("browser error: {0}")]
    Browser(#[from] rostermark_browser::BrowserError),

    /// Persistence failure. Fatal: propagates out of the orchestrator.
    #[error("store error: {0}")]
    Store(#[from] rostermark_store::StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScanError::Parse("no result rows".to_string());
        assert_eq!(err.to_string(), "malformed page: no result rows");
    }

    #[test]
    fn test_error_from_browser() {
        let browser_err = rostermark_browser::BrowserError::Timeout("12s".to_string());
        let err: ScanError = browser_err.into();
        assert!(matches!(err, ScanError::Browser(_)));
    }
}
