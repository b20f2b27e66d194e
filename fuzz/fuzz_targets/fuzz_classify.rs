#![no_main]
use iam_drift::iam::{classify, AccessLevel, ALL_SERVICES, UNKNOWN_SERVICE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|action: &str| {
    let result = classify(action);

    if action == "*" {
        assert_eq!(result.service, ALL_SERVICES);
        assert_eq!(result.level, AccessLevel::Admin);
    }
    if result.service == UNKNOWN_SERVICE {
        assert_eq!(result.level, AccessLevel::Unknown);
    }
    assert!(!result.service.is_empty());
});
