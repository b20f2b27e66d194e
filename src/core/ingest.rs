//! Collector output ingestion
//!
//! The policy collector writes one JSON object per line in one of two shapes:
//!
//! - grouped: `{"Principal", "PrincipalType", "Policies": [{"PolicyName", "PolicyType", "PolicyDocument"}]}`
//! - flat: `{"PrincipalName", "PrincipalType", "PolicyType", "PolicyName", "PolicyArn", "PolicyDocument", "TagValue"}`
//!
//! Both are folded into [`PrincipalPolicies`]. Policy documents are parsed
//! permissively; the principal envelope is not.

use crate::error::{IamDriftError, Result};
use crate::iam::{PolicyAttachment, Principal, PrincipalType};
use crate::report::jsonl_values;
use ahash::AHashMap;
use serde_json::{Map, Value};
use tracing::{debug, info};

/// All policies collected for one principal
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalPolicies {
    pub principal: Principal,
    pub policies: Vec<PolicyAttachment>,
}

impl PrincipalPolicies {
    pub fn new(principal: Principal) -> Self {
        PrincipalPolicies {
            principal,
            policies: Vec::new(),
        }
    }
}

/// Parse collector JSONL, grouping policies by principal in first-seen order
pub fn parse_collector_jsonl(text: &str) -> Result<Vec<PrincipalPolicies>> {
    let mut grouped: Vec<PrincipalPolicies> = Vec::new();
    let mut index: AHashMap<Principal, usize> = AHashMap::new();

    for (line, value) in jsonl_values(text)? {
        let Value::Object(object) = value else {
            return Err(IamDriftError::MalformedRecord {
                line,
                reason: "expected a JSON object".to_string(),
            });
        };

        let principal = principal_from(&object, line)?;
        let policies = policies_from(&object, line)?;
        debug!(
            "Line {}: {} with {} policies",
            line,
            principal,
            policies.len()
        );

        let slot = *index.entry(principal.clone()).or_insert_with(|| {
            grouped.push(PrincipalPolicies::new(principal));
            grouped.len() - 1
        });
        grouped[slot].policies.extend(policies);
    }

    info!("Ingested {} principals", grouped.len());
    Ok(grouped)
}

fn principal_from(object: &Map<String, Value>, line: usize) -> Result<Principal> {
    let name = match object.get("Principal").or_else(|| object.get("PrincipalName")) {
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            return Err(IamDriftError::InvalidPrincipalName(format!(
                "line {}: expected a string, found {}",
                line, other
            )))
        }
        None => {
            return Err(IamDriftError::MissingPrincipal(format!(
                "line {}: no Principal or PrincipalName field",
                line
            )))
        }
    };

    let kind: PrincipalType = match object.get("PrincipalType") {
        Some(Value::String(kind)) => kind.parse()?,
        Some(other) => return Err(IamDriftError::InvalidPrincipalType(other.to_string())),
        None => {
            return Err(IamDriftError::MissingPrincipal(format!(
                "line {}: no PrincipalType field",
                line
            )))
        }
    };

    Principal::new(name, kind)
}

fn policies_from(object: &Map<String, Value>, line: usize) -> Result<Vec<PolicyAttachment>> {
    let malformed = |e: serde_json::Error| IamDriftError::MalformedRecord {
        line,
        reason: e.to_string(),
    };

    match object.get("Policies") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| serde_json::from_value(item.clone()).map_err(malformed))
            .collect(),
        Some(Value::Null) => Ok(Vec::new()),
        Some(other) => Err(IamDriftError::MalformedRecord {
            line,
            reason: format!("Policies must be a list, found {}", other),
        }),
        None => {
            let flat: PolicyAttachment =
                serde_json::from_value(Value::Object(object.clone())).map_err(malformed)?;
            Ok(vec![flat])
        }
    }
}
