//! Statement normalization
//!
//! Expands each statement of each policy attached to a principal into one
//! flat [`ActionRecord`] per action.

use super::cache::ClassificationCache;
use super::classify::AccessLevel;
use super::policy::{Effect, PolicyDocument, PolicyStatement};
use super::principal::{Principal, PrincipalType};
use crate::validation::PrincipalName;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A policy attached to (or inherited by) a principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyAttachment {
    /// Policy name, reported in the matrix `Sources` column
    #[serde(rename = "PolicyName", default)]
    pub name: String,

    /// Free-form label such as Inline, Attached, UserAttached or GroupInherited
    #[serde(default)]
    pub policy_type: String,

    /// ARN of a managed policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_arn: Option<String>,

    /// Value of the collector's tag key on the principal that owns the policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_value: Option<String>,

    #[serde(rename = "PolicyDocument", default)]
    pub document: PolicyDocument,
}

impl PolicyAttachment {
    pub fn new(
        name: impl Into<String>,
        policy_type: impl Into<String>,
        document: PolicyDocument,
    ) -> Self {
        PolicyAttachment {
            name: name.into(),
            policy_type: policy_type.into(),
            policy_arn: None,
            tag_value: None,
            document,
        }
    }

    pub fn with_arn(mut self, arn: impl Into<String>) -> Self {
        self.policy_arn = Some(arn.into());
        self
    }

    pub fn with_tag_value(mut self, tag_value: impl Into<String>) -> Self {
        self.tag_value = Some(tag_value.into());
        self
    }
}

/// One (statement, action) pair with its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionRecord {
    pub principal: PrincipalName,
    pub principal_type: PrincipalType,
    pub policy_name: String,
    pub policy_type: String,
    #[serde(default)]
    pub policy_arn: Option<String>,
    #[serde(default)]
    pub tag_value: Option<String>,
    pub effect: Effect,
    pub action: String,
    pub service: String,
    pub access_level: AccessLevel,
    pub resources: Vec<String>,
    pub condition: Value,
}

/// Expands policies into action records, memoizing classification
#[derive(Default)]
pub struct Normalizer {
    cache: ClassificationCache,
}

impl Normalizer {
    /// Create a normalizer whose classification cache holds `cache_capacity` actions
    pub fn new(cache_capacity: usize) -> Self {
        Normalizer {
            cache: ClassificationCache::new(cache_capacity),
        }
    }

    /// One record per action in the statement; an empty action list yields none
    pub fn normalize_statement(
        &mut self,
        principal: &Principal,
        policy: &PolicyAttachment,
        statement: &PolicyStatement,
    ) -> Vec<ActionRecord> {
        statement
            .actions
            .iter()
            .map(|action| {
                let classification = self.cache.classify(action);
                ActionRecord {
                    principal: principal.name.clone(),
                    principal_type: principal.kind,
                    policy_name: policy.name.clone(),
                    policy_type: policy.policy_type.clone(),
                    policy_arn: policy.policy_arn.clone(),
                    tag_value: policy.tag_value.clone(),
                    effect: statement.effect.clone(),
                    action: action.clone(),
                    service: classification.service,
                    access_level: classification.level,
                    resources: statement.resources.clone(),
                    condition: statement.condition.clone(),
                }
            })
            .collect()
    }

    /// Records for every statement of one policy, in document order
    pub fn normalize_policy(
        &mut self,
        principal: &Principal,
        policy: &PolicyAttachment,
    ) -> Vec<ActionRecord> {
        let records: Vec<ActionRecord> = policy
            .document
            .statement
            .iter()
            .flat_map(|statement| self.normalize_statement(principal, policy, statement))
            .collect();

        debug!(
            "Normalized policy '{}' for {}: {} statements, {} action records",
            policy.name,
            principal,
            policy.document.statement.len(),
            records.len()
        );

        records
    }

    /// Records for every policy of one principal
    pub fn normalize_principal(
        &mut self,
        principal: &Principal,
        policies: &[PolicyAttachment],
    ) -> Vec<ActionRecord> {
        policies
            .iter()
            .flat_map(|policy| self.normalize_policy(principal, policy))
            .collect()
    }

    /// Classification cache used by this normalizer
    pub fn cache(&self) -> &ClassificationCache {
        &self.cache
    }
}

/// Normalize a single document without a long-lived cache
pub fn normalize_document(
    principal: &Principal,
    policy_name: &str,
    policy_type: &str,
    document: &PolicyDocument,
) -> Vec<ActionRecord> {
    let policy = PolicyAttachment::new(policy_name, policy_type, document.clone());
    Normalizer::new(document.statement.len().max(1)).normalize_policy(principal, &policy)
}
