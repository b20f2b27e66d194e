//! IAM policy analysis
//!
//! Turns raw policy grants into a per-service access picture:
//! - Action classification into service and access level
//! - Statement normalization into one record per action
//! - Matrix aggregation per (principal, principal type, service)
//! - Drift comparison between two matrices

mod cache;
mod classify;
mod drift;
mod matrix;
mod normalize;
mod policy;
mod principal;

pub use cache::{ClassificationCache, DEFAULT_CACHE_CAPACITY};
pub use classify::{
    classify, AccessLevel, Classification, ClassificationRule, OperationMatcher, ALL_SERVICES,
    OPERATION_RULES, UNKNOWN_SERVICE,
};
pub use drift::{compare, compare_rows, ChangeType, DriftRecord, DriftSummary};
pub use matrix::{
    aggregate, parse_flag, render_flag, render_levels, render_sources, AccessMatrix,
    MatrixAggregator, MatrixEntry, MatrixKey, MatrixRow, ResourceScope, NONE_SENTINEL,
};
pub use normalize::{normalize_document, ActionRecord, Normalizer, PolicyAttachment};
pub use policy::{Effect, PolicyDocument, PolicyStatement};
pub use principal::{Principal, PrincipalType};
