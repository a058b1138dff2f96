//! Document discovery under a root directory

use crate::error::{PagexError, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use log::warn;
use std::path::{Path, PathBuf};

/// Directories that never contain searchable documents
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    "venv",
];

/// Options controlling which files count as documents
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// File name globs a document must match (case-insensitive)
    pub include_globs: Vec<String>,
    /// Directory names that are not descended into
    pub skip_dirs: Vec<String>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            include_globs: vec!["*.pdf".to_string(), "*.txt".to_string()],
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DiscoveryOptions {
    fn build_globset(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.include_globs {
            let glob = GlobBuilder::new(pattern)
                .case_insensitive(true)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    PagexError::invalid_argument(format!("bad include glob '{}': {}", pattern, e))
                })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| PagexError::invalid_argument(format!("bad include globs: {}", e)))
    }
}

/// Recursively find all documents under `root`, sorted by path.
///
/// Fails with [`PagexError::NotFound`] when `root` is not an existing directory.
pub fn discover_documents(root: &Path, options: &DiscoveryOptions) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(PagexError::NotFound(root.to_path_buf()));
    }

    let globs = options.build_globset()?;
    let skip_dirs = options.skip_dirs.clone();

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .sort_by_file_path(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !skip_dirs.iter().any(|skip| skip == name.as_ref())
        })
        .build();

    let mut documents = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let matches = entry
            .path()
            .file_name()
            .is_some_and(|name| globs.is_match(Path::new(name)));
        if matches {
            documents.push(entry.into_path());
        }
    }

    Ok(documents)
}
