use crate::document::{discover_documents, partition_pages, DiscoveryOptions, ExtractorSet};
use crate::error::{PagexError, Result};
use crate::search::matcher::{MatchType, PageMatcher};
use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Default cap on the size of a single document (256 MiB)
pub const DEFAULT_MAX_DOCUMENT_SIZE: u64 = 256 * 1024 * 1024;

/// A page of a document that matched the search term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// File name of the document
    pub document_name: String,
    /// Full path of the document as discovered
    pub document_path: PathBuf,
    /// 1-based page number
    pub page: u32,
    pub match_type: MatchType,
}

/// Configuration for [`DocumentSearcher`]
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Worker threads for document processing (0 = available parallelism)
    pub threads: usize,
    /// Documents larger than this are skipped
    pub max_document_size: u64,
    pub discovery: DiscoveryOptions,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
            discovery: DiscoveryOptions::default(),
        }
    }
}

/// Searches every document under a root directory, page by page.
///
/// Documents are processed on a bounded worker pool. Results come back in
/// discovery order, then page order, exactly as a sequential scan would produce.
pub struct DocumentSearcher {
    extractors: ExtractorSet,
    config: SearchConfig,
    pool: ThreadPool,
}

impl DocumentSearcher {
    pub fn new(extractors: ExtractorSet, config: SearchConfig) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("pagex-search-{}", i))
            .build()
            .map_err(|e| PagexError::Io(std::io::Error::other(e)))?;

        Ok(Self {
            extractors,
            config,
            pool,
        })
    }

    /// Searcher with the default extractors and configuration
    pub fn with_defaults() -> Result<Self> {
        Self::new(ExtractorSet::default(), SearchConfig::default())
    }

    /// Find every page under `root` containing `term`.
    ///
    /// Fails fast on an empty (or whitespace-only) term and on a missing root.
    /// A document that cannot be read or extracted is logged and skipped.
    pub fn search(&self, term: &str, root: &Path) -> Result<Vec<SearchResult>> {
        if term.trim().is_empty() {
            return Err(PagexError::invalid_argument("search term must not be empty"));
        }
        if !root.is_dir() {
            return Err(PagexError::NotFound(root.to_path_buf()));
        }

        let start = Instant::now();
        let documents: Vec<PathBuf> = discover_documents(root, &self.config.discovery)?
            .into_iter()
            .filter(|path| self.extractors.supports(path))
            .collect();

        info!(
            "searching for \"{}\" in {} documents under {}",
            term,
            documents.len(),
            root.display()
        );

        let matcher = PageMatcher::new(term);

        // Indexed collect keeps discovery order regardless of completion order
        let per_document: Vec<Vec<SearchResult>> = self.pool.install(|| {
            documents
                .par_iter()
                .map(|path| match self.search_document(path, &matcher) {
                    Ok(results) => results,
                    Err(e) => {
                        warn!("skipping {}: {}", path.display(), e);
                        Vec::new()
                    }
                })
                .collect()
        });

        let results: Vec<SearchResult> = per_document.into_iter().flatten().collect();

        debug!(
            "search for \"{}\" finished: {} matches in {:.1}ms",
            term,
            results.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(results)
    }

    /// Extract, partition and match a single document
    fn search_document(&self, path: &Path, matcher: &PageMatcher) -> Result<Vec<SearchResult>> {
        let size = fs::metadata(path)?.len();
        if size > self.config.max_document_size {
            return Err(PagexError::extraction(
                path,
                format!(
                    "document is {} bytes, over the {} byte limit",
                    size, self.config.max_document_size
                ),
            ));
        }

        let text = self.extractors.extract_file(path)?;
        let document_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let results = partition_pages(&text)
            .filter_map(|page| {
                matcher.match_page(page.text).map(|match_type| SearchResult {
                    document_name: document_name.clone(),
                    document_path: path.to_path_buf(),
                    page: page.page_number,
                    match_type,
                })
            })
            .collect();

        Ok(results)
    }
}
