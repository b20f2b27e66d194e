#![no_main]
use iam_drift::core::report::{matrix_from_csv, matrix_to_csv};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Malformed input is rejected with an error, never a panic
    if let Ok(matrix) = matrix_from_csv("fuzz.csv", data) {
        let rendered = matrix_to_csv(&matrix);
        let reparsed = matrix_from_csv("fuzz.csv", &rendered).expect("rendered CSV parses");
        assert_eq!(reparsed, matrix);
    }
});
