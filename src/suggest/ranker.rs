//! Tiered ranking of identifier suggestions.
//!
//! Candidates are identifiers containing the query (case-insensitive). They are
//! ordered by tier, then lexicographically:
//!
//! 1. **Exact** - identifier equals the query
//! 2. **Prefix** - identifier starts with the query
//! 3. **Suffix** - identifier ends with the query ("last four digits" lookups)
//! 4. **Interior** - query appears only inside the identifier
//!
//! Identifiers not containing the query are never returned.

use crate::suggest::index::IdentifierIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Maximum number of suggestions returned for one query
pub const MAX_SUGGESTIONS: usize = 100;

/// Relevance tier of a candidate; lower sorts first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionTier {
    Exact,
    Prefix,
    Suffix,
    Interior,
}

impl SuggestionTier {
    /// Tier of `identifier` for `query`, both already lowercased.
    /// `None` when the identifier does not contain the query.
    pub fn classify(identifier: &str, query: &str) -> Option<Self> {
        if identifier == query {
            Some(SuggestionTier::Exact)
        } else if identifier.starts_with(query) {
            Some(SuggestionTier::Prefix)
        } else if identifier.ends_with(query) {
            Some(SuggestionTier::Suffix)
        } else if identifier.contains(query) {
            Some(SuggestionTier::Interior)
        } else {
            None
        }
    }
}

/// One autocomplete suggestion with its owning documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// The identifier as stored in the index
    pub text: String,
    pub document_count: usize,
    pub documents: Vec<String>,
}

/// A candidate before materialization
struct Candidate<'a> {
    tier: SuggestionTier,
    lowered: String,
    text: &'a str,
    documents: &'a [String],
}

impl Candidate<'_> {
    fn rank_cmp(&self, other: &Self) -> Ordering {
        self.tier
            .cmp(&other.tier)
            .then_with(|| self.lowered.cmp(&other.lowered))
            .then_with(|| self.text.cmp(other.text))
    }
}

/// Return up to `limit` suggestions for `query`, best first.
///
/// An empty query yields no suggestions.
pub fn rank_suggestions(index: &IdentifierIndex, query: &str, limit: usize) -> Vec<Suggestion> {
    if query.is_empty() || limit == 0 {
        return Vec::new();
    }

    let query = query.to_lowercase();
    let mut candidates: Vec<Candidate<'_>> = index
        .iter()
        .filter_map(|(text, documents)| {
            let lowered = text.to_lowercase();
            SuggestionTier::classify(&lowered, &query).map(|tier| Candidate {
                tier,
                lowered,
                text,
                documents,
            })
        })
        .collect();

    // Partial selection keeps large candidate sets cheap; only the top `limit` get sorted
    if candidates.len() > limit {
        candidates.select_nth_unstable_by(limit - 1, |a, b| a.rank_cmp(b));
        candidates.truncate(limit);
    }
    candidates.sort_unstable_by(|a, b| a.rank_cmp(b));

    candidates
        .into_iter()
        .map(|c| Suggestion {
            text: c.text.to_string(),
            document_count: c.documents.len(),
            documents: c.documents.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(ids: &[&str]) -> IdentifierIndex {
        IdentifierIndex::from_entries(
            ids.iter()
                .map(|id| (id.to_string(), vec![format!("{}.pdf", id)])),
        )
    }

    fn texts(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_tier_order() {
        let idx = index(&["12345", "123", "xx123yy"]);
        let got = rank_suggestions(&idx, "123", MAX_SUGGESTIONS);
        assert_eq!(texts(&got), vec!["123", "12345", "xx123yy"]);
    }

    #[test]
    fn test_suffix_before_interior() {
        let idx = index(&["xx123yy", "y123", "123", "12345"]);
        let got = rank_suggestions(&idx, "123", MAX_SUGGESTIONS);
        assert_eq!(texts(&got), vec!["123", "12345", "y123", "xx123yy"]);
    }

    #[test]
    fn test_lexicographic_within_tier() {
        let idx = index(&["1239", "1230", "1235", "91230", "81230"]);
        let got = rank_suggestions(&idx, "123", MAX_SUGGESTIONS);
        assert_eq!(texts(&got), vec!["1230", "1235", "1239", "81230", "91230"]);
    }

    #[test]
    fn test_non_matching_excluded() {
        let idx = index(&["55500001", "99998888", "12345678"]);
        let got = rank_suggestions(&idx, "555", MAX_SUGGESTIONS);
        assert_eq!(texts(&got), vec!["55500001"]);
        assert!(got.iter().all(|s| s.text.to_lowercase().contains("555")));
    }

    #[test]
    fn test_case_insensitive() {
        let idx = index(&["TM555-A", "tm555-b", "XTM555"]);
        let got = rank_suggestions(&idx, "Tm555", MAX_SUGGESTIONS);
        assert_eq!(texts(&got), vec!["TM555-A", "tm555-b", "XTM555"]);
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let idx = index(&["123", "456"]);
        assert!(rank_suggestions(&idx, "", MAX_SUGGESTIONS).is_empty());
    }

    #[test]
    fn test_limit_keeps_best() {
        let ids: Vec<String> = (0..250).map(|i| format!("x{:03}42y", i)).collect();
        let mut refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
        refs.push("z42");
        refs.push("42");
        let idx = index(&refs);

        let got = rank_suggestions(&idx, "42", MAX_SUGGESTIONS);

        assert_eq!(got.len(), MAX_SUGGESTIONS);
        assert_eq!(got[0].text, "42");
        assert_eq!(got[1].text, "z42");
        assert_eq!(got[2].text, "x00042y");
        assert_eq!(got[99].text, "x09742y");
    }

    #[test]
    fn test_limit_truncation_is_deterministic() {
        // Every id ends with "77", so all land in the suffix tier
        let ids: Vec<String> = (0..300).rev().map(|i| format!("{:03}77", i)).collect();
        let refs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
        let idx = index(&refs);

        let got = rank_suggestions(&idx, "77", 10);

        let mut expected = ids.clone();
        expected.sort();
        expected.truncate(10);
        assert_eq!(texts(&got), expected.iter().map(|s| s.as_str()).collect::<Vec<_>>());
    }

    #[test]
    fn test_suggestion_carries_documents() {
        let idx = IdentifierIndex::from_entries([(
            "99998888".to_string(),
            vec!["a.pdf".to_string(), "b.pdf".to_string()],
        )]);
        let got = rank_suggestions(&idx, "9999", MAX_SUGGESTIONS);

        assert_eq!(got[0].document_count, 2);
        assert_eq!(got[0].documents, vec!["a.pdf", "b.pdf"]);

        let json = serde_json::to_value(&got[0]).unwrap();
        assert_eq!(json["documentCount"], 2);
    }

    #[test]
    fn test_classify() {
        assert_eq!(SuggestionTier::classify("123", "123"), Some(SuggestionTier::Exact));
        assert_eq!(SuggestionTier::classify("1234", "123"), Some(SuggestionTier::Prefix));
        assert_eq!(SuggestionTier::classify("0123", "123"), Some(SuggestionTier::Suffix));
        assert_eq!(SuggestionTier::classify("01234", "123"), Some(SuggestionTier::Interior));
        assert_eq!(SuggestionTier::classify("0124", "123"), None);
        // Prefix beats suffix when both apply
        assert_eq!(SuggestionTier::classify("123x123", "123"), Some(SuggestionTier::Prefix));
    }
}
