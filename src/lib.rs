//! # pagex - page-level document search
//!
//! pagex answers two questions about a collection of documents (PDFs and
//! form-feed paginated text files):
//!
//! - **Where does this term appear?** Every page containing the term, either
//!   verbatim or once whitespace is ignored (terms split across lines or table
//!   cells by text extraction still match).
//! - **Which identifiers look like what I am typing?** Ranked autocomplete over a
//!   prebuilt snapshot mapping identifiers (part numbers, invoice numbers) to the
//!   documents that contain them.
//!
//! ## Architecture
//!
//! - [`document`] - discovery, text extraction backends, page partitioning and single-page PDF export
//! - [`search`] - per-page matching and the parallel search executor
//! - [`suggest`] - identifier snapshot, ranking and index builders
//! - [`library`] - the managed documents directory
//! - [`server`] - Unix daemon keeping the snapshot warm (Unix only)
//! - [`output`] - terminal formatting
//! - [`utils`] - configuration and progress reporting
//!
//! ## Quick Start
//!
//! ```no_run
//! use pagex::search::DocumentSearcher;
//! use pagex::suggest::SuggestionIndex;
//! use std::path::Path;
//!
//! let searcher = DocumentSearcher::with_defaults()?;
//! for hit in searcher.search("TM-555", Path::new("assets"))? {
//!     println!("{}:{} ({})", hit.document_name, hit.page, hit.match_type);
//! }
//!
//! let index = SuggestionIndex::new("search_index.json");
//! index.reload()?;
//! for suggestion in index.suggest("0001", 10) {
//!     println!("{} in {} documents", suggestion.text, suggestion.document_count);
//! }
//! # Ok::<(), pagex::error::PagexError>(())
//! ```

pub mod document;
pub mod error;
pub mod library;
pub mod output;
pub mod search;
#[cfg(unix)]
pub mod server;
pub mod suggest;
pub mod utils;

pub use error::{PagexError, Result};
