//! Managed documents directory: listing, importing and deleting documents

use crate::error::{PagexError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// File extensions the library manages
const LIBRARY_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// A document stored in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    /// Creation time (modification time where unsupported), seconds since epoch
    pub created: u64,
}

/// Outcome of a bulk delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub deleted: usize,
    /// Names that existed but could not be removed
    pub failed: Vec<String>,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether the identifier index should be rebuilt after this delete.
    ///
    /// A partial failure leaves the index alone, so the caller can retry the
    /// failed names before paying for a rebuild.
    pub fn needs_reindex(&self) -> bool {
        self.deleted > 0 && self.is_complete()
    }
}

/// The directory holding managed documents
#[derive(Debug, Clone)]
pub struct Library {
    dir: PathBuf,
}

impl Library {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Top-level documents, sorted by name. A missing directory is empty.
    pub fn list(&self) -> Result<Vec<LibraryEntry>> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let path = entry.path();
            if !is_library_document(&path) {
                continue;
            }

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);

            entries.push(LibraryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size: metadata.len(),
                created,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Copy `source` into the library under `name` (or the source's own name).
    ///
    /// Only the final path component of `name` is used. Existing documents with the
    /// same name are replaced.
    pub fn import(&self, source: &Path, name: Option<&str>) -> Result<LibraryEntry> {
        if !source.is_file() {
            return Err(PagexError::NotFound(source.to_path_buf()));
        }

        let requested = match name {
            Some(n) => n.to_string(),
            None => source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let safe_name = base_name(&requested).ok_or_else(|| {
            PagexError::invalid_argument(format!("invalid document name '{}'", requested))
        })?;

        let target = self.dir.join(&safe_name);
        if !is_library_document(&target) {
            return Err(PagexError::invalid_argument(format!(
                "unsupported document type: {}",
                safe_name
            )));
        }

        fs::create_dir_all(&self.dir)?;
        let size = fs::copy(source, &target)?;
        info!("imported {} into {}", safe_name, self.dir.display());

        Ok(LibraryEntry {
            name: safe_name,
            path: target,
            size,
            created: 0,
        })
    }

    /// Delete documents by name. Names that do not exist are skipped.
    pub fn delete<S: AsRef<str>>(&self, names: &[S]) -> Result<DeleteReport> {
        if names.is_empty() {
            return Err(PagexError::invalid_argument(
                "at least one document name is required",
            ));
        }

        let mut report = DeleteReport::default();
        for name in names {
            let name = name.as_ref();
            let Some(safe_name) = base_name(name) else {
                warn!("refusing to delete invalid name '{}'", name);
                report.failed.push(name.to_string());
                continue;
            };

            match fs::remove_file(self.dir.join(&safe_name)) {
                Ok(()) => report.deleted += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("error deleting {}: {}", safe_name, e);
                    report.failed.push(name.to_string());
                }
            }
        }

        info!(
            "deleted {} documents from {} ({} failed)",
            report.deleted,
            self.dir.display(),
            report.failed.len()
        );
        Ok(report)
    }
}

/// Final component of `name`, rejecting empty names and `.`/`..`
fn base_name(name: &str) -> Option<String> {
    let base = Path::new(name).file_name()?.to_string_lossy().into_owned();
    (!base.is_empty()).then_some(base)
}

fn is_library_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            LIBRARY_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}
