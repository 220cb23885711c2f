#![no_main]

use arbitrary::Arbitrary;
use flowpatch_types::{AnchorMatch, InsertPolicy, PatchRule};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    body: String,
    anchor: String,
    insertion: String,
    policy: u8,
    unique: bool,
}

fuzz_target!(|input: Input| {
    let policy = match input.policy % 3 {
        0 => InsertPolicy::InsertBefore,
        1 => InsertPolicy::InsertAfter,
        _ => InsertPolicy::Replace,
    };
    let anchor_match = if input.unique {
        AnchorMatch::Unique
    } else {
        AnchorMatch::First
    };
    let rule = PatchRule::new("fuzz", &input.anchor, &input.insertion, policy)
        .with_anchor_match(anchor_match);

    let Ok(edit) = flowpatch_edit::patch_body(&input.body, &rule) else {
        return;
    };

    // Only the anchor site changes: the text around it is kept byte for byte.
    let anchor_len = input.anchor.len();
    assert_eq!(&edit.text[..edit.offset], &input.body[..edit.offset]);
    let tail = &input.body[edit.offset + anchor_len..];
    assert!(edit.text.ends_with(tail));

    let expected_len = match policy {
        InsertPolicy::Replace => input.body.len() - anchor_len + input.insertion.len(),
        _ => input.body.len() + input.insertion.len(),
    };
    assert_eq!(edit.text.len(), expected_len);
});
