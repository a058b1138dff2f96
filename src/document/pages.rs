//! Page partitioning of extracted document text
//!
//! Extraction backends emit one string per document with a
//! `<<PAGE_BREAK_NUM_{n}>>` marker in front of every page. This module turns that
//! stream back into `(page number, page text)` records.

use regex::{CaptureMatches, Regex};
use serde::{Deserialize, Serialize};
use std::iter::Peekable;
use std::sync::OnceLock;

/// Marker prefix written by extraction backends
const MARKER_PREFIX: &str = "<<PAGE_BREAK_NUM_";

/// Marker suffix written by extraction backends
const MARKER_SUFFIX: &str = ">>";

/// Build the marker that precedes page `page_number` (1-based)
pub fn page_marker(page_number: u32) -> String {
    format!("{MARKER_PREFIX}{page_number}{MARKER_SUFFIX}")
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"<<PAGE_BREAK_NUM_(\d+)>>").expect("valid marker regex"))
}

/// One page of a document's extracted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based page number taken from the marker
    pub page_number: u32,
    /// Text between this marker and the next one
    pub text: String,
}

/// Borrowed page produced by [`Pages`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'t> {
    pub page_number: u32,
    pub text: &'t str,
}

impl Page<'_> {
    pub fn to_record(&self) -> PageRecord {
        PageRecord {
            page_number: self.page_number,
            text: self.text.to_string(),
        }
    }
}

/// A marker whose page number parsed successfully
#[derive(Debug, Clone, Copy)]
struct Marker {
    start: usize,
    end: usize,
    page_number: u32,
}

/// Lazy iterator over the pages of one extracted document, in document order.
///
/// Text before the first marker is dropped. Markers whose number does not fit in a
/// `u32` are not page boundaries and stay part of the surrounding page text.
pub struct Pages<'r, 't> {
    text: &'t str,
    markers: Peekable<CaptureMatches<'r, 't>>,
}

impl<'r, 't> Pages<'r, 't> {
    fn next_marker(&mut self) -> Option<Marker> {
        for caps in self.markers.by_ref() {
            let whole = caps.get(0)?;
            if let Some(page_number) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                return Some(Marker {
                    start: whole.start(),
                    end: whole.end(),
                    page_number,
                });
            }
        }
        None
    }

    fn peek_boundary(&mut self) -> Option<usize> {
        // Skip over unparsable markers without consuming the next real one
        while let Some(caps) = self.markers.peek() {
            let parses = caps
                .get(1)
                .is_some_and(|m| m.as_str().parse::<u32>().is_ok());
            if parses {
                return caps.get(0).map(|m| m.start());
            }
            self.markers.next();
        }
        None
    }
}

impl<'t> Iterator for Pages<'_, 't> {
    type Item = Page<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let marker = self.next_marker()?;
        let end = self.peek_boundary().unwrap_or(self.text.len());
        debug_assert!(marker.start < marker.end);

        Some(Page {
            page_number: marker.page_number,
            text: &self.text[marker.end..end],
        })
    }
}

/// Split an extracted document into its pages.
///
/// A document without any marker yields no pages.
pub fn partition_pages(text: &str) -> Pages<'static, '_> {
    Pages {
        text,
        markers: marker_regex().captures_iter(text).peekable(),
    }
}

/// Convenience wrapper collecting owned [`PageRecord`]s
pub fn collect_pages(text: &str) -> Vec<PageRecord> {
    partition_pages(text).map(|p| p.to_record()).collect()
}
