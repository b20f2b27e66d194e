//! Drift detection between two access matrices
//!
//! Compares a day-1 and a day-2 matrix key by key. A record is emitted only
//! when a key appears on one side alone or its finalized fields differ.

use super::matrix::{AccessMatrix, MatrixKey, MatrixRow, NONE_SENTINEL};
use super::principal::PrincipalType;
use crate::validation::PrincipalName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Kind of change for a matrix key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "Added",
            ChangeType::Removed => "Removed",
            ChangeType::Modified => "Modified",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One changed matrix key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriftRecord {
    pub principal: PrincipalName,
    pub principal_type: PrincipalType,
    pub service: String,
    pub change_type: ChangeType,
    /// Day-1 side: `"None"`, bare access levels, or the modified summary
    #[serde(rename = "Day1")]
    pub day1: String,
    #[serde(rename = "Day2")]
    pub day2: String,
}

impl DriftRecord {
    fn new(key: &MatrixKey, change_type: ChangeType, day1: String, day2: String) -> Self {
        DriftRecord {
            principal: key.principal.clone(),
            principal_type: key.principal_type,
            service: key.service.clone(),
            change_type,
            day1,
            day2,
        }
    }

    pub fn key(&self) -> MatrixKey {
        MatrixKey::new(self.principal.clone(), self.principal_type, self.service.clone())
    }
}

/// Compare one key across both days
pub fn compare_rows(
    key: &MatrixKey,
    day1: Option<&MatrixRow>,
    day2: Option<&MatrixRow>,
) -> Option<DriftRecord> {
    match (day1, day2) {
        (Some(before), None) => Some(DriftRecord::new(
            key,
            ChangeType::Removed,
            before.access_levels.clone(),
            NONE_SENTINEL.to_string(),
        )),
        (None, Some(after)) => Some(DriftRecord::new(
            key,
            ChangeType::Added,
            NONE_SENTINEL.to_string(),
            after.access_levels.clone(),
        )),
        (Some(before), Some(after)) if !before.same_access(after) => Some(DriftRecord::new(
            key,
            ChangeType::Modified,
            before.summary(),
            after.summary(),
        )),
        _ => None,
    }
}

/// Drift records for the union of both matrices' keys, in key order
///
/// # Examples
///
/// ```
/// use iam_drift::iam::{compare, AccessMatrix};
///
/// let empty = AccessMatrix::new();
/// assert!(compare(&empty, &empty).is_empty());
/// ```
pub fn compare(day1: &AccessMatrix, day2: &AccessMatrix) -> Vec<DriftRecord> {
    let keys: BTreeSet<&MatrixKey> = day1.keys().chain(day2.keys()).collect();

    keys.into_iter()
        .filter_map(|key| compare_rows(key, day1.get(key), day2.get(key)))
        .collect()
}

/// Counts per change type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DriftSummary {
    pub fn from_records(records: &[DriftRecord]) -> Self {
        let mut summary = DriftSummary::default();
        for record in records {
            match record.change_type {
                ChangeType::Added => summary.added += 1,
                ChangeType::Removed => summary.removed += 1,
                ChangeType::Modified => summary.modified += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.added + self.removed + self.modified
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for DriftSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} modified",
            self.added, self.removed, self.modified
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iam::ResourceScope;

    fn row(
        principal: &str,
        service: &str,
        levels: &str,
        scope: ResourceScope,
        deny: bool,
    ) -> MatrixRow {
        MatrixRow {
            principal: PrincipalName::new(principal).unwrap(),
            principal_type: PrincipalType::User,
            service: service.to_string(),
            access_levels: levels.to_string(),
            resource_scope: scope,
            has_explicit_deny: deny,
            sources: "P".to_string(),
        }
    }

    fn matrix(rows: Vec<MatrixRow>) -> AccessMatrix {
        AccessMatrix::from_rows(rows).unwrap()
    }

    #[test]
    fn test_removed_key() {
        let day1 = matrix(vec![row("bob", "ec2", "Read", ResourceScope::Scoped, false)]);
        let day2 = AccessMatrix::new();

        let drift = compare(&day1, &day2);
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].change_type, ChangeType::Removed);
        assert_eq!(drift[0].day1, "Read");
        assert_eq!(drift[0].day2, "None");
    }

    #[test]
    fn test_added_key() {
        let day1 = AccessMatrix::new();
        let day2 = matrix(vec![row("bob", "s3", "List,Read", ResourceScope::Mixed, false)]);

        let drift = compare(&day1, &day2);
        assert_eq!(drift[0].change_type, ChangeType::Added);
        assert_eq!(drift[0].day1, "None");
        assert_eq!(drift[0].day2, "List,Read");
    }

    #[test]
    fn test_deny_flip_is_modified() {
        let day1 = matrix(vec![row("bob", "s3", "Read", ResourceScope::AllResources, false)]);
        let day2 = matrix(vec![row("bob", "s3", "Read", ResourceScope::AllResources, true)]);

        let drift = compare(&day1, &day2);
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].change_type, ChangeType::Modified);
        assert_eq!(drift[0].day1, "Read | AllResources | False");
        assert_eq!(drift[0].day2, "Read | AllResources | True");
    }

    #[test]
    fn test_scope_change_is_modified() {
        let day1 = matrix(vec![row("bob", "s3", "Read", ResourceScope::Scoped, false)]);
        let day2 = matrix(vec![row("bob", "s3", "Read", ResourceScope::Mixed, false)]);
        assert_eq!(compare(&day1, &day2)[0].change_type, ChangeType::Modified);
    }

    #[test]
    fn test_sources_change_is_ignored() {
        let day1 = matrix(vec![row("bob", "s3", "Read", ResourceScope::Scoped, false)]);
        let mut changed = row("bob", "s3", "Read", ResourceScope::Scoped, false);
        changed.sources = "Other;P".to_string();
        let day2 = matrix(vec![changed]);
        assert!(compare(&day1, &day2).is_empty());
    }

    #[test]
    fn test_identical_matrices_have_no_drift() {
        let m = matrix(vec![
            row("a", "s3", "Read", ResourceScope::Scoped, false),
            row("b", "iam", "Write", ResourceScope::AllResources, true),
        ]);
        assert!(compare(&m, &m).is_empty());
    }

    #[test]
    fn test_swap_symmetry() {
        let day1 = matrix(vec![
            row("a", "s3", "Read", ResourceScope::Scoped, false),
            row("b", "ec2", "List", ResourceScope::Scoped, false),
        ]);
        let day2 = matrix(vec![
            row("a", "s3", "Read,Write", ResourceScope::Scoped, false),
            row("c", "sqs", "Write", ResourceScope::AllResources, false),
        ]);

        let forward = compare(&day1, &day2);
        let backward = compare(&day2, &day1);

        let flip = |c: ChangeType| match c {
            ChangeType::Added => ChangeType::Removed,
            ChangeType::Removed => ChangeType::Added,
            ChangeType::Modified => ChangeType::Modified,
        };
        let forward_kinds: Vec<(MatrixKey, ChangeType)> =
            forward.iter().map(|r| (r.key(), flip(r.change_type))).collect();
        let backward_kinds: Vec<(MatrixKey, ChangeType)> =
            backward.iter().map(|r| (r.key(), r.change_type)).collect();
        assert_eq!(forward_kinds, backward_kinds);
    }

    #[test]
    fn test_output_is_key_ordered() {
        let day1 = matrix(vec![row("z", "s3", "Read", ResourceScope::Scoped, false)]);
        let day2 = matrix(vec![row("a", "s3", "Read", ResourceScope::Scoped, false)]);
        let drift = compare(&day1, &day2);
        let names: Vec<&str> = drift.iter().map(|r| r.principal.as_str()).collect();
        assert_eq!(names, vec!["a", "z"]);
    }

    #[test]
    fn test_summary_counts() {
        let day1 = matrix(vec![
            row("a", "s3", "Read", ResourceScope::Scoped, false),
            row("b", "s3", "Read", ResourceScope::Scoped, false),
        ]);
        let day2 = matrix(vec![
            row("a", "s3", "Write", ResourceScope::Scoped, false),
            row("c", "s3", "Read", ResourceScope::Scoped, false),
        ]);
        let summary = DriftSummary::from_records(&compare(&day1, &day2));
        assert_eq!(
            summary,
            DriftSummary {
                added: 1,
                removed: 1,
                modified: 1
            }
        );
        assert_eq!(summary.to_string(), "1 added, 1 removed, 1 modified");
    }

    #[test]
    fn test_record_field_names() {
        let day1 = matrix(vec![row("bob", "ec2", "Read", ResourceScope::Scoped, false)]);
        let drift = compare(&day1, &AccessMatrix::new());
        let value = serde_json::to_value(&drift[0]).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "Principal": "bob",
                "PrincipalType": "User",
                "Service": "ec2",
                "ChangeType": "Removed",
                "Day1": "Read",
                "Day2": "None"
            })
        );
    }
}
