//! IAM access analysis core
//!
//! - [`error`] - Error types for analysis jobs
//! - [`validation`] - Principal names and collection paths
//! - [`iam`] - Classification, normalization, aggregation and drift
//! - [`ingest`] - Collector JSONL ingestion
//! - [`report`] - CSV and JSONL rendering and parsing
//! - [`store`] - Policy source and record store capabilities
//! - [`config`] - TOML job configuration
//! - [`pipeline`] - Matrix and drift jobs
//!
//! ## Data flow
//!
//! ```text
//! collector JSONL ──ingest──▶ PrincipalPolicies
//!                                   │ normalize
//!                                   ▼
//!                              ActionRecord ──▶ principal_action_detail.csv
//!                                   │ aggregate
//!                                   ▼
//!                             AccessMatrix ──▶ service_access_matrix.{csv,jsonl}
//!                                   │ compare(day1, day2)
//!                                   ▼
//!                              DriftRecord ──▶ service_access_drift_report.csv
//! ```

pub mod config;
pub mod error;
pub mod iam;
pub mod ingest;
pub mod pipeline;
pub mod report;
pub mod store;
pub mod validation;

pub use config::{Config, DriftConfig, MatrixConfig};
pub use error::{IamDriftError, Result};
pub use pipeline::{AccessAnalyzer, DriftReport, MatrixOutcome, MatrixReport};
pub use store::{DirectoryStore, InMemoryPolicySource, MemoryStore, PolicySource, RecordStore};
