//! Candidate scoring and selection.
//!
//! Pure functions that compare search candidates against a roster entry.
//! No I/O; everything here is deterministic and unit-testable offline.

use rostermark_core::{CandidateProfile, RowKey};
use strsim::normalized_levenshtein;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Weight of the name similarity in the combined score.
pub const NAME_WEIGHT: f64 = 0.7;

/// Weight of the club similarity in the combined score.
pub const CLUB_WEIGHT: f64 = 0.3;

/// Minimum combined score a candidate must reach to be accepted.
pub const ACCEPT_THRESHOLD: f64 = 0.60;

/// Minimum name similarity regardless of how well the club matches,
/// so a same-club namesake cannot be accepted on club alone.
pub const NAME_FLOOR: f64 = 0.50;

/// Weight of the family-name part within the name similarity.
const FAMILY_WEIGHT: f64 = 0.7;

/// Weight of the given-name part within the name similarity.
const GIVEN_WEIGHT: f64 = 0.3;

/// Club containment (abbreviation, sponsor affix) is a strong signal but
/// not a perfect match.
const CLUB_CONTAINMENT_SCORE: f64 = 0.85;

/// Token-overlap club evidence stays below containment evidence.
const CLUB_OVERLAP_WEIGHT: f64 = 0.8;

/// Given-name prefix truncation ("Emi" for "Emiliano").
const GIVEN_PREFIX_SCORE: f64 = 0.9;

/// Bare initial agreement ("K." for "Kevin").
const GIVEN_INITIAL_SCORE: f64 = 0.6;

/// Similarity of one candidate against the target row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    /// Player-name similarity in `[0, 1]`
    pub name_similarity: f64,
    /// Club similarity in `[0, 1]`
    pub club_similarity: f64,
    /// `NAME_WEIGHT * name + CLUB_WEIGHT * club`
    pub combined: f64,
}

impl MatchScore {
    /// Whether this score clears the fixed acceptance bar.
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.combined >= ACCEPT_THRESHOLD && self.name_similarity >= NAME_FLOOR
    }
}

/// Normalize text for fuzzy comparison: NFKD-decompose and drop combining
/// marks (so "Buendía" equals "Buendia"), lowercase, collapse whitespace.
#[must_use]
pub fn normalize(text: &str) -> String {
    let stripped: String = text.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn token_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        1.0
    } else {
        normalized_levenshtein(a, b)
    }
}

/// Given names tolerate truncation: a short form scores almost as well as
/// the full form, a bare initial still counts for something.
fn given_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a_clean: String = a.chars().filter(char::is_ascii_alphanumeric).collect();
    let b_clean: String = b.chars().filter(char::is_ascii_alphanumeric).collect();
    if a_clean.is_empty() || b_clean.is_empty() {
        return 0.0;
    }
    let min_len = a_clean.len().min(b_clean.len());
    if min_len >= 2 && (a_clean.starts_with(&b_clean) || b_clean.starts_with(&a_clean)) {
        return GIVEN_PREFIX_SCORE;
    }
    if a_clean.chars().next() == b_clean.chars().next() {
        return GIVEN_INITIAL_SCORE.max(normalized_levenshtein(&a_clean, &b_clean));
    }
    normalized_levenshtein(&a_clean, &b_clean)
}

/// Name similarity between a roster player name and a candidate display
/// name. Exact normalized equality is 1.0; otherwise the family name
/// (last token) dominates and the given name (first token) tolerates
/// truncation.
#[must_use]
pub fn name_similarity(target: &str, candidate: &str) -> f64 {
    let t = normalize(target);
    let c = normalize(candidate);
    if t.is_empty() || c.is_empty() {
        return 0.0;
    }
    if t == c {
        return 1.0;
    }

    let t_tokens: Vec<&str> = t.split(' ').collect();
    let c_tokens: Vec<&str> = c.split(' ').collect();

    // A single-token side has no given/family split; take the best
    // pairwise token similarity instead.
    if t_tokens.len() < 2 || c_tokens.len() < 2 {
        return t_tokens
            .iter()
            .flat_map(|a| c_tokens.iter().map(move |b| token_similarity(a, b)))
            .fold(0.0, f64::max);
    }

    let family = token_similarity(
        t_tokens[t_tokens.len() - 1],
        c_tokens[c_tokens.len() - 1],
    );
    let given = given_similarity(t_tokens[0], c_tokens[0]);
    FAMILY_WEIGHT * family + GIVEN_WEIGHT * given
}

/// Club similarity between a roster squad name and a candidate club label.
/// Containment after normalization (abbreviations, sponsor affixes) is a
/// strong positive; otherwise word-token overlap.
#[must_use]
pub fn club_similarity(target: &str, candidate: &str) -> f64 {
    let t = normalize(target);
    let c = normalize(candidate);
    if t.is_empty() || c.is_empty() {
        return 0.0;
    }
    if t == c {
        return 1.0;
    }
    if t.contains(&c) || c.contains(&t) {
        return CLUB_CONTAINMENT_SCORE;
    }

    let t_tokens: std::collections::HashSet<&str> = t.split(' ').collect();
    let c_tokens: std::collections::HashSet<&str> = c.split(' ').collect();
    let intersection = t_tokens.intersection(&c_tokens).count();
    let union = t_tokens.union(&c_tokens).count();
    if union == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let jaccard = intersection as f64 / union as f64;
    jaccard * CLUB_OVERLAP_WEIGHT
}

/// Score one candidate against the target row.
#[must_use]
pub fn score(candidate: &CandidateProfile, target: &RowKey) -> MatchScore {
    let name = name_similarity(&target.player, &candidate.display_name);
    let club = club_similarity(&target.squad, &candidate.club_name);
    MatchScore {
        name_similarity: name,
        club_similarity: club,
        combined: NAME_WEIGHT * name + CLUB_WEIGHT * club,
    }
}

/// Pick the candidate with the highest combined score, provided it clears
/// the acceptance bar.
///
/// Ties keep the first-seen candidate: deterministic, but otherwise
/// arbitrary.
#[must_use]
pub fn select_best<'a>(
    candidates: &'a [CandidateProfile],
    target: &RowKey,
) -> Option<&'a CandidateProfile> {
    let mut best: Option<(&CandidateProfile, MatchScore)> = None;
    for candidate in candidates {
        let candidate_score = score(candidate, target);
        let better = match &best {
            Some((_, best_score)) => candidate_score.combined > best_score.combined,
            None => true,
        };
        if better {
            best = Some((candidate, candidate_score));
        }
    }
    best.filter(|(_, s)| s.accepted()).map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, club: &str) -> CandidateProfile {
        CandidateProfile {
            display_name: name.to_string(),
            club_name: club.to_string(),
            profile_url: format!("https://example.com/{}", normalize(name).replace(' ', "-")),
            raw_value_text: None,
        }
    }

    #[test]
    fn test_self_match_is_perfect() {
        let target = RowKey::new("Emiliano Buendía", "Aston Villa", 0);
        let result = score(&candidate("Emiliano Buendía", "Aston Villa"), &target);
        assert!((result.name_similarity - 1.0).abs() < f64::EPSILON);
        assert!((result.club_similarity - 1.0).abs() < f64::EPSILON);
        assert!((result.combined - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_diacritics_fold_to_equality() {
        assert!((name_similarity("Emiliano Buendia", "Emiliano Buendía") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_truncated_given_name_clears_threshold() {
        let target = RowKey::new("Emi Buendía", "Aston Villa", 5);
        let result = score(&candidate("Emiliano Buendía", "Aston Villa"), &target);
        assert!(result.accepted(), "combined score was {}", result.combined);
        assert!(result.name_similarity > 0.9);
    }

    #[test]
    fn test_initial_only_given_name() {
        let sim = name_similarity("Kevin De Bruyne", "K. De Bruyne");
        assert!(sim > 0.7);
    }

    #[test]
    fn test_unrelated_name_is_rejected() {
        let target = RowKey::new("Emi Buendía", "Aston Villa", 5);
        let result = score(&candidate("Douglas Luiz", "Aston Villa"), &target);
        assert!(!result.accepted());
    }

    #[test]
    fn test_club_containment_is_strong_not_perfect() {
        let sim = club_similarity("Bayern", "FC Bayern München");
        assert!((sim - CLUB_CONTAINMENT_SCORE).abs() < f64::EPSILON);
        assert!(sim < 1.0);
    }

    #[test]
    fn test_club_token_overlap() {
        let sim = club_similarity("Man City", "Manchester City");
        assert!(sim > 0.0);
        assert!(sim < CLUB_CONTAINMENT_SCORE);
    }

    #[test]
    fn test_select_best_empty_input() {
        let target = RowKey::new("Emi Buendía", "Aston Villa", 5);
        assert!(select_best(&[], &target).is_none());
    }

    #[test]
    fn test_select_best_prefers_matching_club() {
        let target = RowKey::new("Emiliano Buendía", "Aston Villa", 5);
        let candidates = vec![
            candidate("Emiliano Buendía", "Norwich City"),
            candidate("Emiliano Buendía", "Aston Villa"),
        ];
        let best = select_best(&candidates, &target).expect("one candidate accepted");
        assert_eq!(best.club_name, "Aston Villa");
    }

    #[test]
    fn test_select_best_ties_keep_first_seen() {
        let target = RowKey::new("Emiliano Buendía", "Aston Villa", 5);
        let first = candidate("Emiliano Buendía", "Aston Villa");
        let second = CandidateProfile {
            profile_url: "https://example.com/other".to_string(),
            ..candidate("Emiliano Buendía", "Aston Villa")
        };
        let candidates = [first.clone(), second];
        let best = select_best(&candidates, &target).expect("accepted");
        assert_eq!(best.profile_url, first.profile_url);
    }

    #[test]
    fn test_select_best_rejects_below_threshold() {
        let target = RowKey::new("Emi Buendía", "Aston Villa", 5);
        let candidates = vec![candidate("John Smith", "Leeds United")];
        assert!(select_best(&candidates, &target).is_none());
    }

    #[test]
    fn test_name_floor_blocks_club_only_matches() {
        let target = RowKey::new("Emi Buendía", "Aston Villa", 5);
        // Same club, wrong player: combined could approach 0.3 + name
        // weight on a weak name score, but the floor keeps it out.
        let result = score(&candidate("Ollie Watkins", "Aston Villa"), &target);
        assert!(result.name_similarity < NAME_FLOOR);
        assert!(!result.accepted());
    }
}
