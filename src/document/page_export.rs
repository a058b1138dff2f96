//! Single-page PDF export
//!
//! Copies one page of a PDF into a new document, named `page_{n}_{source}` unless
//! the caller picks a name.

use crate::error::{PagexError, Result};
use log::info;
use lopdf::Document;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A page written by [`export_page`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageExport {
    pub path: PathBuf,
    pub page: u32,
    /// Pages in the source document
    pub page_count: u32,
}

/// File name for page `page` of `source`.
///
/// A custom name is reduced to its base name and gets a `.pdf` extension if it
/// lacks one. A blank custom name falls back to the default.
pub fn export_file_name(source: &Path, page: u32, custom: Option<&str>) -> String {
    let custom = custom
        .and_then(|name| Path::new(name.trim()).file_name())
        .map(|name| name.to_string_lossy().into_owned());

    match custom {
        Some(name) if name.to_ascii_lowercase().ends_with(".pdf") => name,
        Some(name) => format!("{}.pdf", name),
        None => {
            let base = source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("page_{}_{}", page, base)
        }
    }
}

/// Write page `page` (1-based) of the PDF at `source` into `output_dir`.
///
/// Fails with `NotFound` when `source` does not exist and with `InvalidArgument`
/// when it is not a file or `page` is outside `1..=page_count`.
pub fn export_page(
    source: &Path,
    page: u32,
    output_dir: &Path,
    custom_name: Option<&str>,
) -> Result<PageExport> {
    if !source.exists() {
        return Err(PagexError::NotFound(source.to_path_buf()));
    }
    if !source.is_file() {
        return Err(PagexError::invalid_argument(format!(
            "{} is not a file",
            source.display()
        )));
    }
    if page == 0 {
        return Err(PagexError::invalid_argument("page numbers start at 1"));
    }

    let mut document = Document::load(source)
        .map_err(|e| PagexError::extraction(source, format!("unreadable PDF: {}", e)))?;

    let pages = document.get_pages();
    let page_count = pages.len() as u32;
    if page > page_count {
        return Err(PagexError::invalid_argument(format!(
            "page {} is out of range, {} has {} pages",
            page,
            source.display(),
            page_count
        )));
    }

    let others: Vec<u32> = pages.into_keys().filter(|&n| n != page).collect();
    document.delete_pages(&others);
    document.prune_objects();
    document.renumber_objects();
    document.compress();

    let mut bytes = Vec::new();
    document
        .save_to(&mut bytes)
        .map_err(|e| PagexError::Io(std::io::Error::other(e.to_string())))?;

    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(export_file_name(source, page, custom_name));
    fs::write(&path, bytes)?;

    info!(
        "exported page {} of {} to {}",
        page,
        source.display(),
        path.display()
    );
    Ok(PageExport {
        path,
        page,
        page_count,
    })
}
