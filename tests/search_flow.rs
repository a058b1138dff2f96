//! End-to-end library tests: extraction backend → partitioner → matcher, and
//! builder → snapshot → ranker.

mod common;

use common::sample_pdf;
use pagex::document::{collect_pages, page_marker, ExtractorSet, TextExtractor};
use pagex::search::{DocumentSearcher, MatchType, SearchConfig};
use pagex::suggest::{refresh, NumberIndexBuilder, SuggestionIndex, SuggestionTier};
use pagex::{PagexError, Result};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Backend emitting hand-written marker text, as a PDF converter would
struct MarkerPassthrough;

impl TextExtractor for MarkerPassthrough {
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| PagexError::extraction(path, e.to_string()))
    }
}

fn marker_searcher() -> DocumentSearcher {
    let mut extractors = ExtractorSet::empty();
    extractors.register("txt", MarkerPassthrough);
    DocumentSearcher::new(extractors, SearchConfig::default()).unwrap()
}

#[test]
fn test_backend_marker_contract() {
    let raw = format!(
        "preamble is dropped{}\nfirst{}\nsecond",
        page_marker(1),
        page_marker(2)
    );
    let pages = collect_pages(&raw);

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].page_number, 1);
    assert_eq!(pages[0].text.trim(), "first");
    assert_eq!(pages[1].text.trim(), "second");
}

#[test]
fn test_backend_page_numbers_are_trusted() {
    let dir = TempDir::new().unwrap();
    let raw = format!("{}\nalpha\n{}\nbeta needle", page_marker(10), page_marker(20));
    fs::write(dir.path().join("doc.txt"), raw).unwrap();

    let results = marker_searcher().search("needle", dir.path()).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].page, 20);
}

#[test]
fn test_one_result_per_page_exact_preferred() {
    let dir = TempDir::new().unwrap();
    let raw = format!(
        "{}\nTM-555 and TM-5\n55 and TM-555 again",
        page_marker(1)
    );
    fs::write(dir.path().join("doc.txt"), raw).unwrap();

    let results = marker_searcher().search("TM-555", dir.path()).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].match_type, MatchType::Exact);
}

#[test]
fn test_default_searcher_reads_pdfs() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("invoice.pdf"), sample_pdf(&["Invoice 55500001"])).unwrap();

    let results = DocumentSearcher::with_defaults()
        .unwrap()
        .search("55500001", dir.path())
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document_name, "invoice.pdf");
    assert_eq!(results[0].page, 1);
    assert_eq!(results[0].match_type, MatchType::Exact);
}

#[test]
fn test_search_is_deterministic_across_thread_counts() {
    let dir = TempDir::new().unwrap();
    for i in 0..24 {
        let pages: Vec<String> = (0..5)
            .map(|p| if (i + p) % 3 == 0 { format!("needle {}", p) } else { "hay".to_string() })
            .collect();
        fs::write(dir.path().join(format!("doc{:02}.txt", i)), pages.join("\x0c")).unwrap();
    }

    let run = |threads: usize| {
        DocumentSearcher::new(
            ExtractorSet::default(),
            SearchConfig {
                threads,
                ..Default::default()
            },
        )
        .unwrap()
        .search("needle", dir.path())
        .unwrap()
    };

    let sequential = run(1);
    assert!(!sequential.is_empty());
    assert_eq!(sequential, run(8));
}

#[test]
fn test_built_index_drives_suggestions() {
    let docs = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();
    fs::write(docs.path().join("a.txt"), "PN 123400009\x0cPN 400012345").unwrap();
    fs::write(docs.path().join("b.txt"), "PN 98761234").unwrap();

    let index = SuggestionIndex::new(state.path().join("search_index.json"));
    let builder = NumberIndexBuilder::with_defaults().unwrap();
    refresh(&builder, docs.path(), &index).unwrap();

    let got = index.suggest("1234", 10);
    let texts: Vec<&str> = got.iter().map(|s| s.text.as_str()).collect();
    // Prefix, then suffix, then interior
    assert_eq!(texts, vec!["123400009", "98761234", "400012345"]);

    assert_eq!(
        SuggestionTier::classify(&got[1].text, "1234"),
        Some(SuggestionTier::Suffix)
    );
    assert_eq!(got[1].documents, vec!["b.txt"]);
}
