//! Document discovery, text extraction and page partitioning.
//!
//! - [`discover`] - recursive document discovery with dependency-directory skipping
//! - [`extract`] - extraction backends producing page-marked text
//! - [`pages`] - splitting page-marked text back into per-page records
//! - [`page_export`] - copying a single PDF page into its own file

pub mod discover;
pub mod extract;
pub mod page_export;
pub mod pages;

#[cfg(test)]
pub(crate) mod test_support;

pub use discover::{discover_documents, DiscoveryOptions};
pub use extract::{
    ExtractorSet, FallbackExtractor, LopdfExtractor, PdftotextExtractor, PlainTextExtractor,
    TextExtractor,
};
pub use page_export::{export_file_name, export_page, PageExport};
pub use pages::{collect_pages, page_marker, partition_pages, Page, PageRecord};
