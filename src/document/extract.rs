//! Text extraction backends
//!
//! A backend turns raw document bytes into one string where every page is
//! preceded by a page marker (see [`page_marker`]). The partitioner in
//! [`crate::document::pages`] relies on nothing else.
//!
//! PDFs are read in-process with `lopdf`. Documents it cannot make sense of are
//! handed to poppler's `pdftotext` when that is installed.

use crate::document::pages::{page_marker, partition_pages};
use crate::error::{PagexError, Result};
use log::debug;
use lopdf::Document;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

/// Form feed, the page separator used by pdftotext and paginated text files
const FORM_FEED: char = '\x0c';

/// Produces marker-delimited page text from a document's bytes
pub trait TextExtractor: Send + Sync {
    /// Extract text; `path` is only used for diagnostics
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String>;
}

/// Join page texts into a single marker-delimited stream.
///
/// Pages are numbered from 1 in iteration order.
pub fn paginate<'a>(pages: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for (i, page) in pages.into_iter().enumerate() {
        out.push('\n');
        out.push_str(&page_marker(i as u32 + 1));
        out.push('\n');
        out.push_str(page);
    }
    out
}

/// Split form-feed separated output into pages.
///
/// A single trailing form feed terminates the last page rather than opening an
/// empty one. Empty input has no pages.
fn split_form_feeds(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let body = text.strip_suffix(FORM_FEED).unwrap_or(text);
    body.split(FORM_FEED).collect()
}

/// In-process PDF extraction, page by page, with `lopdf`.
///
/// Page numbers come from the document's page tree. A page whose content
/// cannot be decoded is kept as an empty page so numbering stays intact.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String> {
        let document = Document::load_mem(bytes)
            .map_err(|e| PagexError::extraction(path, format!("unreadable PDF: {}", e)))?;

        let mut out = String::new();
        for page_number in document.get_pages().into_keys() {
            out.push('\n');
            out.push_str(&page_marker(page_number));
            out.push('\n');
            match document.extract_text(&[page_number]) {
                Ok(text) => out.push_str(&text),
                Err(e) => debug!("no text on page {} of {}: {}", page_number, path.display(), e),
            }
        }
        Ok(out)
    }
}

/// PDF extraction through poppler's `pdftotext`.
///
/// The PDF is streamed on stdin and the layout-preserving text read from stdout,
/// so nothing touches the disk.
#[derive(Debug, Clone)]
pub struct PdftotextExtractor {
    program: PathBuf,
}

impl Default for PdftotextExtractor {
    fn default() -> Self {
        Self {
            program: PathBuf::from("pdftotext"),
        }
    }
}

impl PdftotextExtractor {
    /// Use a specific `pdftotext` binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl TextExtractor for PdftotextExtractor {
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(["-layout", "-enc", "UTF-8", "-", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                PagexError::extraction(path, format!("failed to run {}: {}", self.program.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PagexError::extraction(path, "pdftotext stdin unavailable"))?;

        // Feed stdin from a second thread; pdftotext may fill its stdout pipe
        // before it has consumed all input.
        let output = thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(bytes));
            let output = child.wait_with_output();
            if let Ok(Err(e)) = writer.join() {
                debug!("pdftotext stdin closed early for {}: {}", path.display(), e);
            }
            output
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PagexError::extraction(
                path,
                format!("pdftotext exited with {}: {}", output.status, stderr.trim()),
            ));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|e| PagexError::extraction(path, format!("non UTF-8 output: {}", e)))?;

        Ok(paginate(split_form_feeds(&text)))
    }
}

/// Tries `primary` first and `fallback` when it fails or finds no text at all.
///
/// If `primary` produced pages without text and `fallback` fails, the empty
/// pages are kept.
pub struct FallbackExtractor {
    primary: Box<dyn TextExtractor>,
    fallback: Box<dyn TextExtractor>,
}

impl FallbackExtractor {
    pub fn new(primary: impl TextExtractor + 'static, fallback: impl TextExtractor + 'static) -> Self {
        Self {
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        }
    }
}

impl TextExtractor for FallbackExtractor {
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String> {
        match self.primary.extract(path, bytes) {
            Ok(text) if has_page_text(&text) => Ok(text),
            Ok(text) => match self.fallback.extract(path, bytes) {
                Ok(fallback) => Ok(fallback),
                Err(e) => {
                    debug!("fallback extraction of {} failed: {}", path.display(), e);
                    Ok(text)
                }
            },
            Err(e) => {
                debug!("{}, trying fallback extractor", e);
                self.fallback.extract(path, bytes)
            }
        }
    }
}

fn has_page_text(text: &str) -> bool {
    partition_pages(text).any(|page| !page.text.trim().is_empty())
}

/// Plain UTF-8 text documents, paginated by form feeds
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| PagexError::extraction(path, format!("invalid UTF-8: {}", e)))?;
        Ok(paginate(split_form_feeds(text)))
    }
}

/// Extractors keyed by lowercase file extension
pub struct ExtractorSet {
    by_extension: HashMap<String, Box<dyn TextExtractor>>,
}

impl Default for ExtractorSet {
    fn default() -> Self {
        let mut set = Self::empty();
        set.register(
            "pdf",
            FallbackExtractor::new(LopdfExtractor, PdftotextExtractor::default()),
        );
        set.register("txt", PlainTextExtractor);
        set
    }
}

impl ExtractorSet {
    /// A set with no extractors registered
    pub fn empty() -> Self {
        Self {
            by_extension: HashMap::new(),
        }
    }

    /// Register (or replace) the extractor for `extension`
    pub fn register(&mut self, extension: &str, extractor: impl TextExtractor + 'static) {
        self.by_extension
            .insert(extension.to_ascii_lowercase(), Box::new(extractor));
    }

    /// Extractor responsible for `path`, by extension
    pub fn for_path(&self, path: &Path) -> Option<&dyn TextExtractor> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        self.by_extension.get(&ext).map(|e| e.as_ref())
    }

    /// Whether any extractor handles `path`
    pub fn supports(&self, path: &Path) -> bool {
        self.for_path(path).is_some()
    }

    /// Read `path` from disk and extract it
    pub fn extract_file(&self, path: &Path) -> Result<String> {
        let extractor = self
            .for_path(path)
            .ok_or_else(|| PagexError::extraction(path, "unsupported document type"))?;
        let bytes = fs::read(path)?;
        extractor.extract(path, &bytes)
    }
}
