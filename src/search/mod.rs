pub mod executor;
pub mod matcher;

pub use executor::{DocumentSearcher, SearchConfig, SearchResult};
pub use matcher::{match_page, strip_whitespace, MatchType, PageMatcher};
