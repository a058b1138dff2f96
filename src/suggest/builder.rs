//! Identifier index builders and background refresh
//!
//! A builder scans a documents directory and writes the identifier snapshot.
//! [`spawn_refresh`] runs one on a background thread and reloads the live
//! [`SuggestionIndex`] when it finishes.

use crate::document::{discover_documents, partition_pages, DiscoveryOptions, ExtractorSet};
use crate::error::{PagexError, Result};
use crate::suggest::index::{IdentifierIndex, SuggestionIndex};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Identifiers indexed by default: standalone runs of 8 to 13 digits
pub const DEFAULT_IDENTIFIER_PATTERN: &str = r"\b\d{8,13}\b";

/// Writes an identifier snapshot for a documents directory
pub trait IndexBuilder: Send + Sync {
    /// Scan `documents_dir` and write the snapshot to `output`.
    /// Returns the number of identifiers written.
    fn build(&self, documents_dir: &Path, output: &Path) -> Result<usize>;
}

/// In-process builder extracting identifiers with a regular expression
pub struct NumberIndexBuilder {
    extractors: ExtractorSet,
    pattern: Regex,
    discovery: DiscoveryOptions,
}

impl NumberIndexBuilder {
    pub fn new(extractors: ExtractorSet, pattern: &str, discovery: DiscoveryOptions) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            PagexError::invalid_argument(format!("bad identifier pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            extractors,
            pattern,
            discovery,
        })
    }

    /// Builder with default extractors, pattern and discovery rules
    pub fn with_defaults() -> Result<Self> {
        Self::new(
            ExtractorSet::default(),
            DEFAULT_IDENTIFIER_PATTERN,
            DiscoveryOptions::default(),
        )
    }

    /// Unique identifiers of one document, in order of first appearance
    fn document_identifiers(&self, path: &Path) -> Result<Vec<String>> {
        let text = self.extractors.extract_file(path)?;
        let mut seen = HashSet::new();
        let mut identifiers = Vec::new();

        for page in partition_pages(&text) {
            for m in self.pattern.find_iter(page.text) {
                if seen.insert(m.as_str()) {
                    identifiers.push(m.as_str().to_string());
                }
            }
        }

        Ok(identifiers)
    }

    /// Build the snapshot in memory without writing it
    pub fn collect(&self, documents_dir: &Path) -> Result<IdentifierIndex> {
        let documents: Vec<PathBuf> = discover_documents(documents_dir, &self.discovery)?
            .into_iter()
            .filter(|p| self.extractors.supports(p))
            .collect();

        info!(
            "indexing identifiers in {} documents under {}",
            documents.len(),
            documents_dir.display()
        );

        let per_document: Vec<Option<Vec<String>>> = documents
            .par_iter()
            .map(|path| match self.document_identifiers(path) {
                Ok(ids) => Some(ids),
                Err(e) => {
                    warn!("error reading {}: {}", path.display(), e);
                    None
                }
            })
            .collect();

        // Merge sequentially so document lists follow discovery order
        let mut index = IdentifierIndex::new();
        for (path, identifiers) in documents.iter().zip(per_document) {
            let Some(identifiers) = identifiers else {
                continue;
            };
            let reference = document_reference(documents_dir, path);
            for identifier in &identifiers {
                index.insert(identifier, &reference);
            }
        }

        Ok(index)
    }
}

impl IndexBuilder for NumberIndexBuilder {
    fn build(&self, documents_dir: &Path, output: &Path) -> Result<usize> {
        let start = Instant::now();
        let index = self.collect(documents_dir)?;
        index.save(output)?;

        info!(
            "indexing complete: {} unique identifiers written to {} in {:.1}s",
            index.len(),
            output.display(),
            start.elapsed().as_secs_f64()
        );
        Ok(index.len())
    }
}

/// Path of `document` relative to `documents_dir`, with `/` separators
fn document_reference(documents_dir: &Path, document: &Path) -> String {
    let rel = document.strip_prefix(documents_dir).unwrap_or(document);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Argument replaced by the documents directory in an external indexer command
pub const DIR_PLACEHOLDER: &str = "{dir}";

/// Argument replaced by the snapshot path in an external indexer command
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// Builder delegating to an external program.
///
/// When no argument mentions [`DIR_PLACEHOLDER`] or [`OUTPUT_PLACEHOLDER`] the
/// program is invoked as `<program> <args..> <documents_dir> <output>`. Otherwise
/// only the placeholders are substituted, so an indexer that takes just a
/// directory and writes to a fixed location runs unchanged (point `index_file`
/// at that location). Either way it must exit with status 0 after writing the
/// snapshot.
#[derive(Debug, Clone)]
pub struct CommandIndexBuilder {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandIndexBuilder {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn is_templated(&self) -> bool {
        self.args
            .iter()
            .any(|a| a.contains(DIR_PLACEHOLDER) || a.contains(OUTPUT_PLACEHOLDER))
    }

    /// Command line arguments for one run
    fn command_args(&self, documents_dir: &Path, output: &Path) -> Vec<OsString> {
        if !self.is_templated() {
            let mut args: Vec<OsString> = self.args.iter().map(OsString::from).collect();
            args.push(documents_dir.into());
            args.push(output.into());
            return args;
        }

        self.args
            .iter()
            .map(|arg| match arg.as_str() {
                DIR_PLACEHOLDER => documents_dir.into(),
                OUTPUT_PLACEHOLDER => output.into(),
                _ => arg
                    .replace(DIR_PLACEHOLDER, &documents_dir.to_string_lossy())
                    .replace(OUTPUT_PLACEHOLDER, &output.to_string_lossy())
                    .into(),
            })
            .collect()
    }
}

impl IndexBuilder for CommandIndexBuilder {
    fn build(&self, documents_dir: &Path, output: &Path) -> Result<usize> {
        let args = self.command_args(documents_dir, output);
        debug!("running external indexer {} {:?}", self.program, args);
        let result = Command::new(&self.program).args(&args).output()?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        if !stderr.trim().is_empty() {
            warn!("indexer stderr: {}", stderr.trim());
        }
        if !result.status.success() {
            return Err(PagexError::Io(std::io::Error::other(format!(
                "indexer {} exited with {}",
                self.program, result.status
            ))));
        }

        debug!("indexer output: {}", String::from_utf8_lossy(&result.stdout).trim());
        Ok(IdentifierIndex::load(output)?.len())
    }
}

/// Rebuild the snapshot for `documents_dir` and reload `index` from it.
///
/// A failed build leaves the live snapshot untouched.
pub fn refresh(
    builder: &dyn IndexBuilder,
    documents_dir: &Path,
    index: &SuggestionIndex,
) -> Result<usize> {
    builder.build(documents_dir, index.path())?;
    index.reload()
}

/// Run [`refresh`] on a background thread
pub fn spawn_refresh(
    builder: Arc<dyn IndexBuilder>,
    documents_dir: PathBuf,
    index: Arc<SuggestionIndex>,
) -> std::io::Result<JoinHandle<Result<usize>>> {
    thread::Builder::new()
        .name("pagex-indexer".to_string())
        .spawn(move || {
            let result = refresh(builder.as_ref(), &documents_dir, &index);
            if let Err(ref e) = result {
                error!("index refresh for {} failed: {}", documents_dir.display(), e);
            }
            result
        })
}
