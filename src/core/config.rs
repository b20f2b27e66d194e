//! Job configuration
//!
//! Loaded from TOML and validated before any job runs:
//!
//! ```toml
//! [matrix]
//! users = "users.jsonl"
//! groups = "groups.jsonl"
//! roles = "roles.jsonl"
//! output_prefix = "reports/2024-05-01/"
//!
//! [drift]
//! day1_matrix = "reports/2024-05-01/service_access_matrix.csv"
//! day2_matrix = "reports/2024-05-02/service_access_matrix.csv"
//! output = "drift/service_access_drift_report.csv"
//! ```

use crate::error::{IamDriftError, Result};
use crate::iam::DEFAULT_CACHE_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::{Validate, ValidationError, ValidationErrors};

/// Upper bound on the classification cache
pub const MAX_CACHE_CAPACITY: usize = 1_000_000;

/// Collection holding the per-action detail rows
pub const DETAIL_COLLECTION: &str = "principal_action_detail.csv";

/// Collection holding the matrix in CSV form
pub const MATRIX_CSV_COLLECTION: &str = "service_access_matrix.csv";

/// Collection holding the matrix in JSONL form
pub const MATRIX_JSONL_COLLECTION: &str = "service_access_matrix.jsonl";

/// Default drift report collection
pub const DRIFT_COLLECTION: &str = "drift/service_access_drift_report.csv";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub matrix: Option<MatrixConfig>,

    #[validate(nested)]
    pub drift: Option<DriftConfig>,
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Run validation rules, mapping failures into the crate error
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(config_error)
    }

    pub fn matrix(&self) -> Result<&MatrixConfig> {
        self.matrix
            .as_ref()
            .ok_or_else(|| IamDriftError::Config("missing [matrix] section".to_string()))
    }

    pub fn drift(&self) -> Result<&DriftConfig> {
        self.drift
            .as_ref()
            .ok_or_else(|| IamDriftError::Config("missing [drift] section".to_string()))
    }
}

fn config_error(errors: ValidationErrors) -> IamDriftError {
    IamDriftError::Config(errors.to_string())
}

/// Inputs and outputs of a matrix job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "require_some_input"))]
pub struct MatrixConfig {
    #[validate(length(min = 1))]
    pub users: Option<String>,

    #[validate(length(min = 1))]
    pub groups: Option<String>,

    #[validate(length(min = 1))]
    pub roles: Option<String>,

    /// Prepended verbatim to every output collection name
    pub output_prefix: String,

    #[validate(range(min = 1, max = 1_000_000))]
    pub classification_cache_capacity: usize,

    /// Also write the per-action detail collection
    pub write_detail: bool,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        MatrixConfig {
            users: None,
            groups: None,
            roles: None,
            output_prefix: String::new(),
            classification_cache_capacity: DEFAULT_CACHE_CAPACITY,
            write_detail: true,
        }
    }
}

impl MatrixConfig {
    /// Run validation rules, mapping failures into the crate error
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(config_error)
    }

    pub fn with_users(mut self, name: impl Into<String>) -> Self {
        self.users = Some(name.into());
        self
    }

    pub fn with_groups(mut self, name: impl Into<String>) -> Self {
        self.groups = Some(name.into());
        self
    }

    pub fn with_roles(mut self, name: impl Into<String>) -> Self {
        self.roles = Some(name.into());
        self
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    /// Input collections in users, groups, roles order
    pub fn inputs(&self) -> impl Iterator<Item = &str> {
        [&self.users, &self.groups, &self.roles]
            .into_iter()
            .filter_map(|name| name.as_deref())
    }

    pub fn detail_output(&self) -> String {
        format!("{}{}", self.output_prefix, DETAIL_COLLECTION)
    }

    pub fn matrix_csv_output(&self) -> String {
        format!("{}{}", self.output_prefix, MATRIX_CSV_COLLECTION)
    }

    pub fn matrix_jsonl_output(&self) -> String {
        format!("{}{}", self.output_prefix, MATRIX_JSONL_COLLECTION)
    }
}

fn require_some_input(config: &MatrixConfig) -> std::result::Result<(), ValidationError> {
    if config.inputs().next().is_none() {
        let mut error = ValidationError::new("no_inputs");
        error.message = Some("at least one of users, groups or roles is required".into());
        return Err(error);
    }
    Ok(())
}

/// Inputs and output of a drift job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "output_is_not_an_input"))]
pub struct DriftConfig {
    #[validate(length(min = 1))]
    pub day1_matrix: String,

    #[validate(length(min = 1))]
    pub day2_matrix: String,

    #[validate(length(min = 1))]
    pub output: String,
}

impl Default for DriftConfig {
    fn default() -> Self {
        DriftConfig {
            day1_matrix: format!("day1/{}", MATRIX_CSV_COLLECTION),
            day2_matrix: format!("day2/{}", MATRIX_CSV_COLLECTION),
            output: DRIFT_COLLECTION.to_string(),
        }
    }
}

impl DriftConfig {
    pub fn new(
        day1_matrix: impl Into<String>,
        day2_matrix: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        DriftConfig {
            day1_matrix: day1_matrix.into(),
            day2_matrix: day2_matrix.into(),
            output: output.into(),
        }
    }

    /// Run validation rules, mapping failures into the crate error
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(config_error)
    }
}

fn output_is_not_an_input(config: &DriftConfig) -> std::result::Result<(), ValidationError> {
    if config.output == config.day1_matrix || config.output == config.day2_matrix {
        let mut error = ValidationError::new("output_overwrites_input");
        error.message = Some(
            format!("drift output {} would overwrite an input matrix", config.output).into(),
        );
        return Err(error);
    }
    Ok(())
}
