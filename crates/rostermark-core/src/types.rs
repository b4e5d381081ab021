//! Shared types used across the Rostermark pipeline.
//!
//! This module defines the domain records that flow between the scan,
//! store, and app layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Timestamp format used in the persisted `Updated At` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Stable identity for one input roster entry.
///
/// `index` is the 0-based row index in the input roster and keys the
/// persisted result table. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowKey {
    /// Player name as it appears in the roster
    pub player: String,
    /// Squad/club name as it appears in the roster
    pub squad: String,
    /// Original 0-based row index
    pub index: usize,
}

impl RowKey {
    /// Create a new row key.
    #[must_use]
    pub fn new(player: impl Into<String>, squad: impl Into<String>, index: usize) -> Self {
        Self {
            player: player.into(),
            squad: squad.into(),
            index,
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} ({})", self.index + 1, self.player, self.squad)
    }
}

/// One search hit considered for matching.
///
/// Ephemeral: produced by an acquisition tier and consumed within a single
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateProfile {
    /// Player name as displayed in the search result
    pub display_name: String,
    /// Club label attached to the search result (may be empty)
    pub club_name: String,
    /// Absolute URL of the player profile page
    pub profile_url: String,
    /// Inline market-value text, when the search result carries one
    pub raw_value_text: Option<String>,
}

/// Terminal status of one row resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    /// Profile matched and a market value was parsed
    Ok,
    /// Profile matched but no usable value was found in either tier
    ValueNotFound,
    /// No search candidate cleared the acceptance threshold
    NoMatch,
    /// Acquisition failed before any candidate list was available
    Error,
    /// Row has not been processed yet
    Pending,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::ValueNotFound => "value_not_found",
            Self::NoMatch => "no_match",
            Self::Error => "error",
            Self::Pending => "pending",
        };
        write!(f, "{s}")
    }
}

impl RowStatus {
    /// Parse from the persisted string representation.
    ///
    /// Unknown or blank values map to `Pending` so a hand-edited table
    /// stays loadable.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "ok" => Self::Ok,
            "value_not_found" => Self::ValueNotFound,
            "no_match" => Self::NoMatch,
            "error" => Self::Error,
            _ => Self::Pending,
        }
    }
}

/// Outcome of one resolver run for one row.
///
/// Produced exactly once per row per pass; immutable once emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    /// Club label of the accepted candidate
    pub matched_club: Option<String>,
    /// Profile URL of the accepted candidate
    pub profile_url: Option<String>,
    /// Market-value text exactly as scraped
    pub raw_value: Option<String>,
    /// Market value parsed to a plain integer (euros)
    pub parsed_value: Option<u64>,
    /// Terminal status of the resolution
    pub status: RowStatus,
    /// When the resolution finished
    pub updated_at: DateTime<Utc>,
}

impl ResolutionResult {
    /// Result for a row where no candidate cleared the threshold.
    #[must_use]
    pub fn no_match() -> Self {
        Self::terminal(RowStatus::NoMatch)
    }

    /// Result for a row whose acquisition failed outright.
    #[must_use]
    pub fn error() -> Self {
        Self::terminal(RowStatus::Error)
    }

    fn terminal(status: RowStatus) -> Self {
        Self {
            matched_club: None,
            profile_url: None,
            raw_value: None,
            parsed_value: None,
            status,
            updated_at: Utc::now(),
        }
    }

    /// Result for a matched candidate, with status derived from whether a
    /// usable value was obtained.
    ///
    /// Raw text that could not be parsed still counts as not found; the
    /// text is kept for inspection.
    #[must_use]
    pub fn matched(
        matched_club: String,
        profile_url: String,
        raw_value: Option<String>,
        parsed_value: Option<u64>,
    ) -> Self {
        let status = if parsed_value.is_some() {
            RowStatus::Ok
        } else {
            RowStatus::ValueNotFound
        };
        Self {
            matched_club: Some(matched_club),
            profile_url: Some(profile_url),
            raw_value,
            parsed_value,
            status,
            updated_at: Utc::now(),
        }
    }
}

/// One writable column of the persisted result table.
///
/// `Player` and `Squad` are seed columns and never written by the
/// pipeline, so they are not represented here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultColumn {
    /// `Matched Club`
    MatchedClub,
    /// `Profile URL`
    ProfileUrl,
    /// `Market Value (raw)`
    ValueRaw,
    /// `Market Value (int)`
    ValueInt,
    /// `Updated At`
    UpdatedAt,
    /// `Status`
    Status,
}

impl ResultColumn {
    /// All writable columns, in persisted order.
    pub const ALL: [Self; 6] = [
        Self::MatchedClub,
        Self::ProfileUrl,
        Self::ValueRaw,
        Self::ValueInt,
        Self::UpdatedAt,
        Self::Status,
    ];

    /// The persisted CSV header for this column.
    #[must_use]
    pub fn header(&self) -> &'static str {
        match self {
            Self::MatchedClub => "Matched Club",
            Self::ProfileUrl => "Profile URL",
            Self::ValueRaw => "Market Value (raw)",
            Self::ValueInt => "Market Value (int)",
            Self::UpdatedAt => "Updated At",
            Self::Status => "Status",
        }
    }

    /// Resolve a column from its persisted header, case-insensitively.
    #[must_use]
    pub fn from_header(header: &str) -> Option<Self> {
        let wanted = header.trim();
        Self::ALL
            .into_iter()
            .find(|col| col.header().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for ResultColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

/// Set of result columns an update is allowed to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet(HashSet<ResultColumn>);

impl ColumnSet {
    /// Every writable column.
    #[must_use]
    pub fn all() -> Self {
        Self(ResultColumn::ALL.into_iter().collect())
    }

    /// A restricted selection of columns.
    #[must_use]
    pub fn selected(columns: impl IntoIterator<Item = ResultColumn>) -> Self {
        Self(columns.into_iter().collect())
    }

    /// Whether a column may be written.
    #[must_use]
    pub fn contains(&self, column: ResultColumn) -> bool {
        self.0.contains(&column)
    }

    /// Whether the selection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
