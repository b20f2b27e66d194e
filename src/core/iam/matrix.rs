//! Service access matrix
//!
//! Folds action records into one entry per (principal, principal type,
//! service), then finalizes each entry into a [`MatrixRow`]: the effective
//! access levels (allowed minus denied), a coarse resource scope, and the
//! policies that contributed.

use super::classify::AccessLevel;
use super::normalize::ActionRecord;
use super::policy::Effect;
use super::principal::PrincipalType;
use crate::error::{IamDriftError, Result};
use crate::validation::PrincipalName;
use ahash::AHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Rendering used when no access level survives, and for absent drift sides
pub const NONE_SENTINEL: &str = "None";

/// Natural key of a matrix entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatrixKey {
    pub principal: PrincipalName,
    pub principal_type: PrincipalType,
    pub service: String,
}

impl MatrixKey {
    pub fn new(
        principal: PrincipalName,
        principal_type: PrincipalType,
        service: impl Into<String>,
    ) -> Self {
        MatrixKey {
            principal,
            principal_type,
            service: service.into(),
        }
    }
}

impl fmt::Display for MatrixKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.principal, self.principal_type, self.service)
    }
}

/// How broadly a service's access applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceScope {
    /// The only resource is `*`
    AllResources,
    /// `*` alongside specific resources
    Mixed,
    /// No `*` at all
    Scoped,
}

impl ResourceScope {
    /// Classify a deduplicated resource set
    pub fn classify<S: AsRef<str> + Ord>(unique_resources: &BTreeSet<S>) -> Self {
        let has_wildcard = unique_resources.iter().any(|r| r.as_ref() == "*");
        match (has_wildcard, unique_resources.len()) {
            (true, 1) => ResourceScope::AllResources,
            (true, _) => ResourceScope::Mixed,
            (false, _) => ResourceScope::Scoped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceScope::AllResources => "AllResources",
            ResourceScope::Mixed => "Mixed",
            ResourceScope::Scoped => "Scoped",
        }
    }
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceScope {
    type Err = IamDriftError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AllResources" => Ok(ResourceScope::AllResources),
            "Mixed" => Ok(ResourceScope::Mixed),
            "Scoped" => Ok(ResourceScope::Scoped),
            other => Err(IamDriftError::InvalidResourceScope(other.to_string())),
        }
    }
}

impl Serialize for ResourceScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Accumulated state for one matrix key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixEntry {
    allowed: BTreeSet<AccessLevel>,
    denied: BTreeSet<AccessLevel>,
    resources: Vec<String>,
    has_explicit_deny: bool,
    sources: BTreeSet<String>,
}

impl MatrixEntry {
    /// Fold one record into this entry
    pub fn absorb(&mut self, record: &ActionRecord) {
        match &record.effect {
            Effect::Allow => {
                self.allowed.insert(record.access_level);
            }
            Effect::Deny => {
                self.denied.insert(record.access_level);
                self.has_explicit_deny = true;
            }
            Effect::Unrecognized(_) => {}
        }

        self.resources.extend(record.resources.iter().cloned());
        self.sources.insert(record.policy_name.clone());
    }

    pub fn allowed(&self) -> &BTreeSet<AccessLevel> {
        &self.allowed
    }

    pub fn denied(&self) -> &BTreeSet<AccessLevel> {
        &self.denied
    }

    /// Resources in arrival order, duplicates included
    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn has_explicit_deny(&self) -> bool {
        self.has_explicit_deny
    }

    pub fn sources(&self) -> &BTreeSet<String> {
        &self.sources
    }

    /// Allowed levels minus denied levels
    pub fn effective_levels(&self) -> BTreeSet<AccessLevel> {
        self.allowed.difference(&self.denied).copied().collect()
    }

    pub fn unique_resources(&self) -> BTreeSet<&str> {
        self.resources.iter().map(String::as_str).collect()
    }

    pub fn resource_scope(&self) -> ResourceScope {
        ResourceScope::classify(&self.unique_resources())
    }

    /// Produce the persisted row for this entry
    pub fn finalize(&self, key: &MatrixKey) -> MatrixRow {
        MatrixRow {
            principal: key.principal.clone(),
            principal_type: key.principal_type,
            service: key.service.clone(),
            access_levels: render_levels(&self.effective_levels()),
            resource_scope: self.resource_scope(),
            has_explicit_deny: self.has_explicit_deny,
            sources: render_sources(self.sources.iter().map(String::as_str)),
        }
    }
}

/// Sorted comma-joined level names, or `"None"` when empty
pub fn render_levels(levels: &BTreeSet<AccessLevel>) -> String {
    if levels.is_empty() {
        return NONE_SENTINEL.to_string();
    }
    let mut names: Vec<&str> = levels.iter().map(AccessLevel::as_str).collect();
    names.sort_unstable();
    names.join(",")
}

/// Sorted semicolon-joined policy names
pub fn render_sources<'a>(sources: impl IntoIterator<Item = &'a str>) -> String {
    let mut names: Vec<&str> = sources.into_iter().collect();
    names.sort_unstable();
    names.dedup();
    names.join(";")
}

/// Finalized matrix entry, the persisted contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MatrixRow {
    pub principal: PrincipalName,
    pub principal_type: PrincipalType,
    pub service: String,
    pub access_levels: String,
    pub resource_scope: ResourceScope,
    pub has_explicit_deny: bool,
    /// Optional on input, as in matrix CSV
    #[serde(default)]
    pub sources: String,
}

impl MatrixRow {
    pub fn key(&self) -> MatrixKey {
        MatrixKey::new(self.principal.clone(), self.principal_type, self.service.clone())
    }

    /// `"<levels> | <scope> | <deny>"`, the form used for modified drift entries
    pub fn summary(&self) -> String {
        format!(
            "{} | {} | {}",
            self.access_levels,
            self.resource_scope,
            render_flag(self.has_explicit_deny)
        )
    }

    /// True when levels, scope and explicit-deny all match
    pub fn same_access(&self, other: &MatrixRow) -> bool {
        self.access_levels == other.access_levels
            && self.resource_scope == other.resource_scope
            && self.has_explicit_deny == other.has_explicit_deny
    }
}

/// Boolean spelling used in CSV reports and drift summaries
pub fn render_flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Parse a boolean written as `True`/`False` (any case)
pub fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// A finalized matrix: unique rows ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessMatrix {
    rows: BTreeMap<MatrixKey, MatrixRow>,
}

impl AccessMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted rows. Duplicate keys are a contract violation.
    pub fn from_rows(rows: impl IntoIterator<Item = MatrixRow>) -> Result<Self> {
        let mut matrix = AccessMatrix::new();
        for row in rows {
            let key = row.key();
            if matrix.rows.contains_key(&key) {
                return Err(IamDriftError::DuplicateMatrixKey(key.to_string()));
            }
            matrix.rows.insert(key, row);
        }
        Ok(matrix)
    }

    pub fn get(&self, key: &MatrixKey) -> Option<&MatrixRow> {
        self.rows.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &MatrixKey> {
        self.rows.keys()
    }

    /// Rows in key order
    pub fn rows(&self) -> impl Iterator<Item = &MatrixRow> {
        self.rows.values()
    }

    pub fn into_rows(self) -> Vec<MatrixRow> {
        self.rows.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Single-pass fold of action records into matrix entries
#[derive(Debug, Default)]
pub struct MatrixAggregator {
    entries: AHashMap<MatrixKey, MatrixEntry>,
}

impl MatrixAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get-or-create the entry for the record's key and fold the record in
    pub fn add(&mut self, record: &ActionRecord) {
        let key = MatrixKey::new(
            record.principal.clone(),
            record.principal_type,
            record.service.clone(),
        );
        self.entries.entry(key).or_default().absorb(record);
    }

    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a ActionRecord>) {
        for record in records {
            self.add(record);
        }
    }

    /// Entry accumulated so far for a key
    pub fn entry(&self, key: &MatrixKey) -> Option<&MatrixEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Finalize every entry
    pub fn finish(self) -> AccessMatrix {
        let rows = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.finalize(key)))
            .collect();
        AccessMatrix { rows }
    }
}

/// Aggregate a complete set of action records
///
/// # Examples
///
/// ```
/// use iam_drift::iam::{aggregate, normalize_document, PolicyDocument, Principal};
/// use serde_json::json;
///
/// let doc = PolicyDocument::from_value(&json!({
///     "Statement": [{ "Effect": "Allow", "Action": "s3:GetObject", "Resource": "*" }]
/// }));
/// let alice = Principal::user("alice").unwrap();
/// let records = normalize_document(&alice, "S3Read", "Inline", &doc);
///
/// let matrix = aggregate(&records);
/// let row = matrix.rows().next().unwrap();
/// assert_eq!(row.access_levels, "Read");
/// assert_eq!(row.resource_scope.as_str(), "AllResources");
/// ```
pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a ActionRecord>) -> AccessMatrix {
    let mut aggregator = MatrixAggregator::new();
    aggregator.extend(records);
    aggregator.finish()
}
