#![no_main]
use arbitrary::Arbitrary;
use iam_drift::iam::{aggregate, compare, normalize_document, PolicyDocument, Principal};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    principal: &'a str,
    document: &'a [u8],
}

fuzz_target!(|input: Input| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(input.document) else {
        return;
    };
    let Ok(principal) = Principal::user(input.principal) else {
        return;
    };

    // Any JSON value normalizes without panicking
    let document = PolicyDocument::from_value(&value);
    let records = normalize_document(&principal, "Fuzz", "Inline", &document);
    let matrix = aggregate(&records);

    assert!(compare(&matrix, &matrix).is_empty());
});
