#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Arbitrary backend output must partition and match without panicking
    for page in pagex::document::partition_pages(data) {
        let _ = pagex::search::match_page(page.text, "TM-555");
        let _ = pagex::search::match_page(page.text, data);
    }
});
