//! # iam-drift - IAM Service Access Matrices and Drift Detection
//!
//! `iam-drift` turns raw IAM policy grants into a per-service access picture
//! and reports how that picture changes between two snapshots:
//!
//! - **Action classification** of `service:Operation` strings into a service
//!   and an access level (Read, List, Write, Tagging, PermissionsManagement,
//!   Admin, Unknown)
//! - **Statement normalization** into one record per granted action
//! - **Matrix aggregation** per (principal, principal type, service) with
//!   deny-wins semantics, resource scope and contributing policies
//! - **Drift comparison** of two matrices into Added/Removed/Modified rows
//!
//! ## Quick Start
//!
//! ```rust
//! use iam_drift::iam::{aggregate, compare, normalize_document, PolicyDocument, Principal};
//! use serde_json::json;
//!
//! # fn main() -> iam_drift::Result<()> {
//! let alice = Principal::user("alice")?;
//!
//! let day1 = PolicyDocument::from_value(&json!({
//!     "Statement": [{ "Effect": "Allow", "Action": "s3:GetObject", "Resource": "*" }]
//! }));
//! let day2 = PolicyDocument::from_value(&json!({
//!     "Statement": [{ "Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"], "Resource": "*" }]
//! }));
//!
//! let before = aggregate(&normalize_document(&alice, "S3", "Inline", &day1));
//! let after = aggregate(&normalize_document(&alice, "S3", "Inline", &day2));
//!
//! let drift = compare(&before, &after);
//! assert_eq!(drift.len(), 1);
//! assert_eq!(drift[0].day2, "Read,Write | AllResources | False");
//! # Ok(())
//! # }
//! ```
//!
//! ## Jobs
//!
//! ```rust,no_run
//! use iam_drift::{AccessAnalyzer, DirectoryStore, DriftConfig, MatrixConfig, MatrixOutcome, Result};
//!
//! # fn main() -> Result<()> {
//! let mut analyzer = AccessAnalyzer::new(DirectoryStore::new("/data/iam"));
//!
//! let config = MatrixConfig::default()
//!     .with_users("users.jsonl")
//!     .with_roles("roles.jsonl")
//!     .with_output_prefix("day2/");
//!
//! if let MatrixOutcome::Written(report) = analyzer.matrix_job(&config)? {
//!     println!("{} matrix rows", report.matrix_rows);
//! }
//!
//! let drift = analyzer.drift_job(&DriftConfig::default())?;
//! println!("{}", drift.summary);
//! # Ok(())
//! # }
//! ```

pub mod core;

// Re-export core modules so crate:: paths in core resolve
#[allow(unused_imports)]
pub(crate) use crate::core::{config, error, ingest, pipeline, report, store};

pub use crate::core::{iam, validation};

// Re-export types that users need
pub use crate::core::{
    error::{IamDriftError, Result},
    iam::{
        classify, AccessLevel, AccessMatrix, ActionRecord, ChangeType, DriftRecord, DriftSummary,
        Effect, MatrixRow, PolicyAttachment, PolicyDocument, Principal, PrincipalType,
        ResourceScope,
    },
    AccessAnalyzer, Config, DirectoryStore, DriftConfig, DriftReport, InMemoryPolicySource,
    MatrixConfig, MatrixOutcome, MatrixReport, MemoryStore, PolicySource, RecordStore,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
