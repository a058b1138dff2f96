//! Identifier suggestions.
//!
//! - [`index`] - the persisted identifier snapshot and its live, swappable holder
//! - [`ranker`] - tiered ranking (exact, prefix, suffix, interior)
//! - [`builder`] - snapshot builders and background refresh

pub mod builder;
pub mod index;
pub mod ranker;

pub use builder::{
    refresh, spawn_refresh, CommandIndexBuilder, IndexBuilder, NumberIndexBuilder,
    DEFAULT_IDENTIFIER_PATTERN,
};
pub use index::{IdentifierIndex, SuggestionIndex};
pub use ranker::{rank_suggestions, Suggestion, SuggestionTier, MAX_SUGGESTIONS};
