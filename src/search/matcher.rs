//! Per-page term matching
//!
//! Two passes: a verbatim substring test, then the same test with all whitespace
//! removed from both sides. The second pass recovers terms that extraction split
//! across lines or table cells (`5550\n0001`).

use memchr::memmem;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a page matched the search term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// The term occurs verbatim in the page text
    Exact,
    /// The term occurs only once whitespace is removed
    Normalized,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::Exact => write!(f, "exact"),
            MatchType::Normalized => write!(f, "normalized"),
        }
    }
}

/// Remove every whitespace character (spaces, tabs, newlines, Unicode spaces)
pub fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// A search term prepared for matching many pages.
///
/// The whitespace-free form of the term and the substring finders are built once.
pub struct PageMatcher {
    exact: memmem::Finder<'static>,
    normalized: Option<memmem::Finder<'static>>,
}

impl PageMatcher {
    pub fn new(term: &str) -> Self {
        let stripped = strip_whitespace(term);
        let normalized = if stripped.is_empty() {
            None
        } else {
            Some(memmem::Finder::new(stripped.as_bytes()).into_owned())
        };

        Self {
            exact: memmem::Finder::new(term.as_bytes()).into_owned(),
            normalized,
        }
    }

    /// Classify one page. Exact always wins over normalized; at most one result.
    pub fn match_page(&self, text: &str) -> Option<MatchType> {
        if self.exact.find(text.as_bytes()).is_some() {
            return Some(MatchType::Exact);
        }

        let finder = self.normalized.as_ref()?;
        let stripped = strip_whitespace(text);
        finder
            .find(stripped.as_bytes())
            .map(|_| MatchType::Normalized)
    }
}

/// One-shot form of [`PageMatcher::match_page`]
pub fn match_page(text: &str, term: &str) -> Option<MatchType> {
    PageMatcher::new(term).match_page(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(
            match_page("Invoice 55500001 due", "55500001"),
            Some(MatchType::Exact)
        );
    }

    #[test]
    fn test_exact_is_case_sensitive() {
        assert_eq!(match_page("Order REF-77", "ref-77"), None);
        assert_eq!(match_page("Order REF-77", "REF-77"), Some(MatchType::Exact));
    }

    #[test]
    fn test_normalized_match_across_lines() {
        assert_eq!(
            match_page("Invoice 5550\n0001 due", "55500001"),
            Some(MatchType::Normalized)
        );
        assert_eq!(
            match_page("5 5 5\t0 0 0 0 1", "55500001"),
            Some(MatchType::Normalized)
        );
    }

    #[test]
    fn test_term_with_internal_whitespace() {
        // Term spacing differs from the page; only the normalized pass finds it
        assert_eq!(
            match_page("Ref: 1234 5678", "12345 678"),
            Some(MatchType::Normalized)
        );
    }

    #[test]
    fn test_exact_takes_precedence() {
        // Both passes would match; exact is reported
        assert_eq!(match_page("abc 123 def", "123"), Some(MatchType::Exact));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(match_page("Invoice 55500002 due", "55500001"), None);
        assert_eq!(match_page("", "1"), None);
    }

    #[test]
    fn test_whitespace_only_term_never_normalizes() {
        let matcher = PageMatcher::new("  ");
        assert_eq!(matcher.match_page("nothing here"), None);
        assert_eq!(matcher.match_page("two  spaces"), Some(MatchType::Exact));
    }

    #[test]
    fn test_unicode_whitespace_is_stripped() {
        assert_eq!(strip_whitespace("12\u{00a0}34\u{2003}56\r\n"), "123456");
    }

    #[test]
    fn test_match_type_serde() {
        assert_eq!(serde_json::to_string(&MatchType::Exact).unwrap(), "\"exact\"");
        assert_eq!(
            serde_json::from_str::<MatchType>("\"normalized\"").unwrap(),
            MatchType::Normalized
        );
        assert_eq!(MatchType::Normalized.to_string(), "normalized");
    }
}
