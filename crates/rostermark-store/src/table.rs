//! Row-level representation and update semantics of the result table.

use rostermark_core::{
    ColumnSet, ResolutionResult, ResultColumn, RowStatus, TIMESTAMP_FORMAT,
};
use serde::{Deserialize, Serialize};

/// True when a persisted cell is empty or null-like.
///
/// Tables that passed through spreadsheet tools can carry literal
/// `nan`/`null` markers; those count as blank for merge purposes.
#[must_use]
pub fn is_blank(value: &str) -> bool {
    let s = value.trim();
    s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("none")
        || s.eq_ignore_ascii_case("null")
}

/// One persisted row of the result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Player name from the input roster
    #[serde(rename = "Player")]
    pub player: String,
    /// Squad name from the input roster
    #[serde(rename = "Squad")]
    pub squad: String,
    /// Club label of the matched profile
    #[serde(rename = "Matched Club")]
    pub matched_club: String,
    /// URL of the matched profile
    #[serde(rename = "Profile URL")]
    pub profile_url: String,
    /// Market value text exactly as scraped
    #[serde(rename = "Market Value (raw)")]
    pub value_raw: String,
    /// Market value parsed to an integer
    #[serde(rename = "Market Value (int)")]
    pub value_int: Option<u64>,
    /// When the row was last written
    #[serde(rename = "Updated At")]
    pub updated_at: String,
    /// Resolution status (`ok`, `value_not_found`, `no_match`, `error`,
    /// `pending`)
    #[serde(rename = "Status")]
    pub status: String,
}

impl ResultRow {
    /// A fresh row seeded from the input roster, with empty result fields.
    #[must_use]
    pub fn seed(player: impl Into<String>, squad: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            squad: squad.into(),
            matched_club: String::new(),
            profile_url: String::new(),
            value_raw: String::new(),
            value_int: None,
            updated_at: String::new(),
            status: RowStatus::Pending.to_string(),
        }
    }

    /// The row's status as a typed value.
    #[must_use]
    pub fn status(&self) -> RowStatus {
        RowStatus::parse(&self.status)
    }

    /// True when the row still lacks a profile URL or a parsed value, the
    /// condition the backfill pass selects on.
    #[must_use]
    pub fn needs_backfill(&self) -> bool {
        is_blank(&self.profile_url) || self.value_int.is_none()
    }

    /// Overwrite the row from a resolution result, restricted to the
    /// selected columns.
    ///
    /// Selected columns are written unconditionally, including empty
    /// values; unselected columns are left untouched.
    pub fn apply(&mut self, result: &ResolutionResult, columns: &ColumnSet) {
        if columns.contains(ResultColumn::MatchedClub) {
            self.matched_club = result.matched_club.clone().unwrap_or_default();
        }
        if columns.contains(ResultColumn::ProfileUrl) {
            self.profile_url = result.profile_url.clone().unwrap_or_default();
        }
        if columns.contains(ResultColumn::ValueRaw) {
            self.value_raw = result.raw_value.clone().unwrap_or_default();
        }
        if columns.contains(ResultColumn::ValueInt) {
            self.value_int = result.parsed_value;
        }
        if columns.contains(ResultColumn::UpdatedAt) {
            self.updated_at = result.updated_at.format(TIMESTAMP_FORMAT).to_string();
        }
        if columns.contains(ResultColumn::Status) {
            self.status = result.status.to_string();
        }
    }

    /// Fill only blank fields from a resolution result, then recompute the
    /// status from what the row now holds.
    ///
    /// Existing non-blank values are never replaced, so the number of
    /// non-blank fields can only grow. Returns `true` when any field was
    /// filled.
    pub fn merge_missing(&mut self, result: &ResolutionResult) -> bool {
        let mut filled = false;

        if is_blank(&self.matched_club) {
            if let Some(club) = result.matched_club.as_deref().filter(|v| !is_blank(v)) {
                self.matched_club = club.to_string();
                filled = true;
            }
        }
        if is_blank(&self.profile_url) {
            if let Some(url) = result.profile_url.as_deref().filter(|v| !is_blank(v)) {
                self.profile_url = url.to_string();
                filled = true;
            }
        }
        if is_blank(&self.value_raw) {
            if let Some(raw) = result.raw_value.as_deref().filter(|v| !is_blank(v)) {
                self.value_raw = raw.to_string();
                filled = true;
            }
        }
        if self.value_int.is_none() {
            if let Some(parsed) = result.parsed_value {
                self.value_int = Some(parsed);
                filled = true;
            }
        }
        if is_blank(&self.updated_at) {
            self.updated_at = result.updated_at.format(TIMESTAMP_FORMAT).to_string();
            filled = true;
        }

        if !is_blank(&self.value_raw) {
            self.status = RowStatus::Ok.to_string();
        } else if !is_blank(&self.profile_url) {
            self.status = RowStatus::ValueNotFound.to_string();
        }

        filled
    }

    /// Number of non-blank fields, used to check merge monotonicity.
    #[must_use]
    pub fn filled_field_count(&self) -> usize {
        [
            &self.matched_club,
            &self.profile_url,
            &self.value_raw,
            &self.updated_at,
        ]
        .into_iter()
        .filter(|v| !is_blank(v))
        .count()
            + usize::from(self.value_int.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_result() -> ResolutionResult {
        ResolutionResult::matched(
            "Aston Villa".to_string(),
            "https://example.com/profil/spieler/123".to_string(),
            Some("€25.00m".to_string()),
            Some(25_000_000),
        )
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("   "));
        assert!(is_blank("NaN"));
        assert!(is_blank("null"));
        assert!(!is_blank("Aston Villa"));
    }

    #[test]
    fn test_seed_row_is_pending() {
        let row = ResultRow::seed("Emi Buendía", "Aston Villa");
        assert_eq!(row.status(), RowStatus::Pending);
        assert!(row.needs_backfill());
        assert_eq!(row.filled_field_count(), 0);
    }

    #[test]
    fn test_apply_all_columns() {
        let mut row = ResultRow::seed("Emi Buendía", "Aston Villa");
        row.apply(&full_result(), &ColumnSet::all());

        assert_eq!(row.matched_club, "Aston Villa");
        assert_eq!(row.value_int, Some(25_000_000));
        assert_eq!(row.status(), RowStatus::Ok);
        assert!(!row.needs_backfill());
    }

    #[test]
    fn test_apply_respects_column_selection() {
        let mut row = ResultRow::seed("Emi Buendía", "Aston Villa");
        let columns = ColumnSet::selected([ResultColumn::ProfileUrl, ResultColumn::Status]);
        row.apply(&full_result(), &columns);

        assert_eq!(row.profile_url, "https://example.com/profil/spieler/123");
        assert_eq!(row.status(), RowStatus::Ok);
        // Everything outside the selection stays untouched.
        assert!(row.matched_club.is_empty());
        assert!(row.value_raw.is_empty());
        assert_eq!(row.value_int, None);
    }

    #[test]
    fn test_apply_overwrites_with_empty() {
        let mut row = ResultRow::seed("Emi Buendía", "Aston Villa");
        row.apply(&full_result(), &ColumnSet::all());
        row.apply(&ResolutionResult::no_match(), &ColumnSet::all());

        assert!(row.matched_club.is_empty());
        assert_eq!(row.value_int, None);
        assert_eq!(row.status(), RowStatus::NoMatch);
    }

    #[test]
    fn test_merge_fills_only_blanks() {
        let mut row = ResultRow::seed("Emi Buendía", "Aston Villa");
        row.matched_club = "Norwich City".to_string();

        row.merge_missing(&full_result());

        // Pre-existing value survives; blanks are filled.
        assert_eq!(row.matched_club, "Norwich City");
        assert_eq!(row.profile_url, "https://example.com/profil/spieler/123");
        assert_eq!(row.value_int, Some(25_000_000));
        assert_eq!(row.status(), RowStatus::Ok);
    }

    #[test]
    fn test_merge_is_monotonic() {
        let mut row = ResultRow::seed("Emi Buendía", "Aston Villa");
        row.apply(&full_result(), &ColumnSet::all());
        let before = row.filled_field_count();

        row.merge_missing(&ResolutionResult::error());

        assert!(row.filled_field_count() >= before);
        assert_eq!(row.value_raw, "€25.00m");
    }

    #[test]
    fn test_merge_recomputes_status_from_url_only() {
        let mut row = ResultRow::seed("Emi Buendía", "Aston Villa");
        let url_only = ResolutionResult::matched(
            "Aston Villa".to_string(),
            "https://example.com/profil/spieler/123".to_string(),
            None,
            None,
        );
        let filled = row.merge_missing(&url_only);

        assert!(filled);
        assert_eq!(row.status(), RowStatus::ValueNotFound);
    }
}
