#![no_main]

//! Fuzz target for flow export parsing.
//!
//! Arbitrary text must either fail with `MalformedInputError` or load into a collection that
//! renders back to the exact input.

use flowpatch_types::FieldNames;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(collection) = flowpatch_records::parse_records(s, &FieldNames::default()) else {
        return;
    };

    // Unmodified collections render verbatim.
    let rendered = flowpatch_records::render_records(&collection).expect("render");
    assert_eq!(rendered, s);

    // Re-serializing a touched collection must stay parseable with the same identifiers.
    let mut touched = collection.clone();
    if touched.set_body(0, "fuzz".to_string()) {
        let rendered = flowpatch_records::render_records(&touched).expect("render");
        let reparsed =
            flowpatch_records::parse_records(&rendered, &FieldNames::default()).expect("reparse");
        let before: Vec<_> = collection.iter().map(|r| r.identifier()).collect();
        let after: Vec<_> = reparsed.iter().map(|r| r.identifier()).collect();
        assert_eq!(before, after);
    }
});
