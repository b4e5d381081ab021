//! Rostermark Core - Foundation crate for the Rostermark pipeline.
//!
//! This crate provides the shared domain types and configuration that all
//! other Rostermark crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration error types using thiserror
//! - [`config`] - TOML-based configuration with env overrides
//! - [`types`] - Shared domain records (`RowKey`, `CandidateProfile`,
//!   `ResolutionResult`, `RowStatus`, `ResultColumn`)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, BackfillConfig, BrowserConfig, ScrapingConfig, CONFIG_FILE_NAME};
pub use error::{ConfigError, ConfigResult};
pub use types::{
    CandidateProfile, ColumnSet, ResolutionResult, ResultColumn, RowKey, RowStatus,
    TIMESTAMP_FORMAT,
};
