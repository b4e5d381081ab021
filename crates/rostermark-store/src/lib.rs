//! Persisted result table for the Rostermark pipeline.
//!
//! A CSV-backed repository with seed initialization, point updates,
//! backfill merges, and atomic checkpoint flushes.

pub mod error;
pub mod repository;
pub mod table;

pub use error::{Result, StoreError};
pub use repository::{ValueRepository, OUTPUT_FILE};
pub use table::{is_blank, ResultRow};
