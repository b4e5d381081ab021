//! Scan pipeline for Rostermark.
//!
//! This crate holds the enrichment core: candidate matching, value
//! parsing, the HTTP search tier, the two-tier resolver state machine,
//! and the worker-pool orchestrator.

pub mod error;
pub mod matcher;
pub mod orchestrator;
pub mod resolver;
pub mod search;
pub mod value;

pub use error::{Result, ScanError};
pub use matcher::{select_best, MatchScore, ACCEPT_THRESHOLD};
pub use orchestrator::{Orchestrator, RunOptions, RunSummary};
pub use resolver::{
    BrowserValueFetcher, PlayerResolver, RowResolver, SearchBackend, ValueFetcher,
};
pub use search::{parse_search_results, SearchClient, BASE_URL};
pub use value::{extract_value_fragment, parse_value_text};
