//! Matrix and drift jobs
//!
//! [`AccessAnalyzer`] ties ingestion, normalization, aggregation and drift
//! comparison to a [`RecordStore`]. Each job reads its inputs, writes its
//! outputs and returns a summary of what it did.

use crate::config::{DriftConfig, MatrixConfig};
use crate::error::Result;
use crate::iam::{
    aggregate, compare, AccessMatrix, ActionRecord, DriftRecord, DriftSummary, Normalizer,
};
use crate::ingest::parse_collector_jsonl;
use crate::report::{
    action_detail_to_csv, drift_to_csv, matrix_from_csv, matrix_from_jsonl, matrix_to_csv,
    matrix_to_jsonl,
};
use crate::store::{InMemoryPolicySource, PolicySource, RecordStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// Result of a matrix job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum MatrixOutcome {
    /// The inputs produced no action records; nothing was written
    NoPolicies,
    Written(MatrixReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixReport {
    pub detail_file: Option<String>,
    pub matrix_file: String,
    pub matrix_jsonl_file: String,
    pub principals: usize,
    pub action_records: usize,
    pub matrix_rows: usize,
    pub generated_at: DateTime<Utc>,
}

/// Result of a drift job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriftReport {
    pub output_file: String,
    pub summary: DriftSummary,
    #[serde(skip)]
    pub records: Vec<DriftRecord>,
    pub generated_at: DateTime<Utc>,
}

impl DriftReport {
    pub fn drift_records(&self) -> usize {
        self.records.len()
    }
}

/// Runs matrix and drift jobs against a record store
pub struct AccessAnalyzer<S: RecordStore> {
    store: S,
    normalizer: Normalizer,
}

impl<S: RecordStore> AccessAnalyzer<S> {
    pub fn new(store: S) -> Self {
        AccessAnalyzer {
            store,
            normalizer: Normalizer::default(),
        }
    }

    /// Replace the normalizer with one whose cache holds `capacity` actions
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.normalizer = Normalizer::new(capacity);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Load and ingest collector output from the named collections
    pub fn load_policies<'a>(
        &self,
        collections: impl IntoIterator<Item = &'a str>,
    ) -> Result<InMemoryPolicySource> {
        let mut source = InMemoryPolicySource::default();
        for name in collections {
            let text = self.store.load(name)?;
            let entries = parse_collector_jsonl(&text)?;
            info!("Loaded {} principals from {}", entries.len(), name);
            for entry in entries {
                source.push(entry);
            }
        }
        Ok(source)
    }

    /// Action records for every principal the source knows about
    pub fn analyze(&mut self, source: &impl PolicySource) -> Result<Vec<ActionRecord>> {
        let mut records = Vec::new();
        for principal in source.principals() {
            let policies = source.policies_for(&principal)?;
            let before = records.len();
            records.extend(self.normalizer.normalize_principal(&principal, &policies));
            debug!(
                "{}: {} policies, {} action records",
                principal,
                policies.len(),
                records.len() - before
            );
        }
        Ok(records)
    }

    /// Build the detail rows and access matrix and write them to the store
    ///
    /// The configuration is validated first; a job with no inputs is an error.
    pub fn matrix_job(&mut self, config: &MatrixConfig) -> Result<MatrixOutcome> {
        config.check()?;

        if config.classification_cache_capacity != self.normalizer.cache().capacity() {
            self.normalizer = Normalizer::new(config.classification_cache_capacity);
        }

        let source = self.load_policies(config.inputs())?;
        let records = self.analyze(&source)?;
        if records.is_empty() {
            info!("No policies found across {} principals", source.principals().len());
            return Ok(MatrixOutcome::NoPolicies);
        }

        let matrix = aggregate(&records);

        let detail_file = if config.write_detail {
            let name = config.detail_output();
            self.store.save(&name, &action_detail_to_csv(&records))?;
            Some(name)
        } else {
            None
        };

        let matrix_file = config.matrix_csv_output();
        self.store.save(&matrix_file, &matrix_to_csv(&matrix))?;

        let matrix_jsonl_file = config.matrix_jsonl_output();
        self.store.save(&matrix_jsonl_file, &matrix_to_jsonl(&matrix)?)?;

        let (hits, misses) = self.normalizer.cache().stats();
        info!(
            "Wrote {} action records and {} matrix rows to {} (classification cache {} hits, {} misses)",
            records.len(),
            matrix.len(),
            matrix_file,
            hits,
            misses
        );

        Ok(MatrixOutcome::Written(MatrixReport {
            detail_file,
            matrix_file,
            matrix_jsonl_file,
            principals: source.principals().len(),
            action_records: records.len(),
            matrix_rows: matrix.len(),
            generated_at: Utc::now(),
        }))
    }

    /// Load a matrix, choosing the format by the collection's extension
    pub fn load_matrix(&self, name: &str) -> Result<AccessMatrix> {
        let text = self.store.load(name)?;
        let matrix = if name.ends_with(".jsonl") {
            matrix_from_jsonl(&text)?
        } else {
            matrix_from_csv(name, &text)?
        };
        debug!("Loaded {} matrix rows from {}", matrix.len(), name);
        Ok(matrix)
    }

    /// Compare two stored matrices and write the drift report
    ///
    /// Rejects a configuration whose output names either input matrix.
    pub fn drift_job(&self, config: &DriftConfig) -> Result<DriftReport> {
        config.check()?;

        let day1 = self.load_matrix(&config.day1_matrix)?;
        let day2 = self.load_matrix(&config.day2_matrix)?;

        let records = compare(&day1, &day2);
        let summary = DriftSummary::from_records(&records);
        self.store.save(&config.output, &drift_to_csv(&records))?;

        info!("Drift {} -> {}: {}", config.day1_matrix, config.day2_matrix, summary);

        Ok(DriftReport {
            output_file: config.output.clone(),
            summary,
            records,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IamDriftError;
    use crate::iam::ChangeType;
    use crate::report::NO_DRIFT_BODY;
    use crate::store::MemoryStore;

    const USERS: &str = r#"{"Principal":"alice","PrincipalType":"User","Policies":[{"PolicyName":"S3Read","PolicyType":"Inline","PolicyDocument":{"Statement":[{"Effect":"Allow","Action":"s3:GetObject","Resource":"*"}]}}]}"#;
    const ROLES: &str = r#"{"PrincipalName":"deploy","PrincipalType":"Role","PolicyType":"Attached","PolicyName":"Admin","PolicyArn":"arn:aws:iam::aws:policy/AdministratorAccess","PolicyDocument":{"Statement":{"Action":"*"}}}"#;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.save("users.jsonl", USERS).unwrap();
        store.save("roles.jsonl", ROLES).unwrap();
        store
    }

    #[test]
    fn test_matrix_job_writes_outputs() {
        let mut analyzer = AccessAnalyzer::new(seeded_store());
        let config = MatrixConfig::default()
            .with_users("users.jsonl")
            .with_roles("roles.jsonl")
            .with_output_prefix("day1/");

        let report = match analyzer.matrix_job(&config).unwrap() {
            MatrixOutcome::Written(report) => report,
            MatrixOutcome::NoPolicies => panic!("expected output"),
        };

        assert_eq!(report.principals, 2);
        assert_eq!(report.action_records, 2);
        assert_eq!(report.matrix_rows, 2);
        assert_eq!(report.detail_file.as_deref(), Some("day1/principal_action_detail.csv"));

        let store = analyzer.store();
        let csv = store.load("day1/service_access_matrix.csv").unwrap();
        assert!(csv.contains("deploy,Role,ALL_SERVICES,Admin,AllResources,False,Admin"));
        assert!(csv.contains("alice,User,s3,Read,AllResources,False,S3Read"));

        let detail = store.load("day1/principal_action_detail.csv").unwrap();
        assert!(detail.contains("arn:aws:iam::aws:policy/AdministratorAccess"));
        assert!(store.exists("day1/service_access_matrix.jsonl").unwrap());
    }

    #[test]
    fn test_matrix_job_without_detail() {
        let mut analyzer = AccessAnalyzer::new(seeded_store());
        let mut config = MatrixConfig::default().with_users("users.jsonl");
        config.write_detail = false;

        let outcome = analyzer.matrix_job(&config).unwrap();
        assert!(matches!(
            outcome,
            MatrixOutcome::Written(MatrixReport { detail_file: None, .. })
        ));
        assert!(!analyzer.store().exists("principal_action_detail.csv").unwrap());
    }

    #[test]
    fn test_matrix_job_no_policies() {
        let store = MemoryStore::new();
        store
            .save("groups.jsonl", r#"{"Principal":"empty","PrincipalType":"Group","Policies":[]}"#)
            .unwrap();

        let mut analyzer = AccessAnalyzer::new(store);
        let config = MatrixConfig::default().with_groups("groups.jsonl");

        assert_eq!(analyzer.matrix_job(&config).unwrap(), MatrixOutcome::NoPolicies);
        assert_eq!(analyzer.store().names(), vec!["groups.jsonl".to_string()]);
    }

    #[test]
    fn test_matrix_job_missing_input() {
        let mut analyzer = AccessAnalyzer::new(MemoryStore::new());
        let config = MatrixConfig::default().with_users("nope.jsonl");
        assert!(analyzer.matrix_job(&config).is_err());
    }

    #[test]
    fn test_matrix_job_rejects_missing_inputs() {
        let mut analyzer = AccessAnalyzer::new(seeded_store());
        assert!(matches!(
            analyzer.matrix_job(&MatrixConfig::default()),
            Err(IamDriftError::Config(_))
        ));
        assert_eq!(analyzer.store().names().len(), 2);
    }

    #[test]
    fn test_drift_job_rejects_output_over_input() {
        let mut analyzer = AccessAnalyzer::new(seeded_store());
        analyzer
            .matrix_job(&MatrixConfig::default().with_users("users.jsonl"))
            .unwrap();
        let before = analyzer.store().load("service_access_matrix.csv").unwrap();

        let config = DriftConfig::new(
            "service_access_matrix.csv",
            "service_access_matrix.jsonl",
            "service_access_matrix.csv",
        );
        assert!(matches!(
            analyzer.drift_job(&config),
            Err(IamDriftError::Config(_))
        ));
        assert_eq!(
            analyzer.store().load("service_access_matrix.csv").unwrap(),
            before
        );
    }

    #[test]
    fn test_drift_job_csv_and_jsonl() {
        let store = seeded_store();
        store
            .save(
                "users2.jsonl",
                r#"{"Principal":"alice","PrincipalType":"User","Policies":[{"PolicyName":"S3Write","PolicyType":"Inline","PolicyDocument":{"Statement":[{"Action":["s3:GetObject","s3:PutObject"],"Resource":"arn:aws:s3:::b/*"}]}}]}"#,
            )
            .unwrap();

        let mut analyzer = AccessAnalyzer::new(store);
        analyzer
            .matrix_job(&MatrixConfig::default().with_users("users.jsonl").with_output_prefix("day1/"))
            .unwrap();
        analyzer
            .matrix_job(&MatrixConfig::default().with_users("users2.jsonl").with_output_prefix("day2/"))
            .unwrap();

        let config = DriftConfig::new(
            "day1/service_access_matrix.csv",
            "day2/service_access_matrix.jsonl",
            "drift.csv",
        );
        let report = analyzer.drift_job(&config).unwrap();

        assert_eq!(report.drift_records(), 1);
        assert_eq!(report.records[0].change_type, ChangeType::Modified);
        assert_eq!(report.records[0].day1, "Read | AllResources | False");
        assert_eq!(report.records[0].day2, "Read,Write | Scoped | False");

        let written = analyzer.store().load("drift.csv").unwrap();
        assert!(written.starts_with("Principal,PrincipalType,Service,ChangeType,Day1,Day2\n"));
    }

    #[test]
    fn test_drift_job_no_drift() {
        let mut analyzer = AccessAnalyzer::new(seeded_store());
        analyzer
            .matrix_job(&MatrixConfig::default().with_users("users.jsonl"))
            .unwrap();

        let config = DriftConfig::new(
            "service_access_matrix.csv",
            "service_access_matrix.jsonl",
            "drift.csv",
        );
        let report = analyzer.drift_job(&config).unwrap();

        assert!(report.summary.is_empty());
        assert_eq!(analyzer.store().load("drift.csv").unwrap(), NO_DRIFT_BODY);
    }
}
