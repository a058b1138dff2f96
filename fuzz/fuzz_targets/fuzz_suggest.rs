#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pagex::suggest::{rank_suggestions, IdentifierIndex, SuggestionTier};

#[derive(Arbitrary, Debug)]
struct Input {
    identifiers: Vec<String>,
    query: String,
    limit: u8,
}

fuzz_target!(|input: Input| {
    let index = IdentifierIndex::from_entries(
        input
            .identifiers
            .into_iter()
            .map(|id| (id, vec!["doc.pdf".to_string()])),
    );

    let got = rank_suggestions(&index, &input.query, input.limit as usize);
    assert!(got.len() <= input.limit as usize);

    // Every suggestion contains the query and tiers never go backwards
    let query = input.query.to_lowercase();
    let tiers: Vec<SuggestionTier> = got
        .iter()
        .map(|s| SuggestionTier::classify(&s.text.to_lowercase(), &query).unwrap())
        .collect();
    assert!(tiers.windows(2).all(|w| w[0] <= w[1]));
});
