//! IAM policy document structure
//!
//! Documents arrive as externally authored JSON, so ingestion is permissive:
//! every string-or-list field is coerced once here and malformed pieces fall
//! back to defaults instead of failing the whole document.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tracing::warn;

/// Effect of a policy statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Effect {
    /// Allow the action
    #[default]
    Allow,
    /// Deny the action (subtracted from the allowed set during aggregation)
    Deny,
    /// Any other effect text, kept verbatim for the detail report
    Unrecognized(String),
}

impl Effect {
    /// Parse an effect string. Only the exact spellings `Allow` and `Deny` are recognized.
    pub fn parse(text: &str) -> Self {
        match text {
            "Allow" => Effect::Allow,
            "Deny" => Effect::Deny,
            other => Effect::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
            Effect::Unrecognized(text) => text,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Effect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Effect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Effect::parse(&text))
    }
}

/// A single, already-coerced policy statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    /// Effect of this statement
    pub effect: Effect,

    /// Actions this statement applies to, in document order
    #[serde(rename = "Action")]
    pub actions: Vec<String>,

    /// Resources this statement applies to, in document order
    #[serde(rename = "Resource")]
    pub resources: Vec<String>,

    /// Opaque condition block (empty object when absent)
    pub condition: Value,
}

impl PolicyStatement {
    /// Create a new statement with no condition
    pub fn new(effect: Effect, actions: Vec<String>, resources: Vec<String>) -> Self {
        PolicyStatement {
            effect,
            actions,
            resources,
            condition: Value::Object(Map::new()),
        }
    }

    /// Attach a condition block
    pub fn with_condition(mut self, condition: Value) -> Self {
        self.condition = condition;
        self
    }

    /// Coerce one raw statement object.
    ///
    /// - missing `Effect` defaults to `Allow`
    /// - `Action` may be a string or a list; any other shape yields no actions
    /// - missing `Resource` defaults to `["*"]`; a bare string becomes a one-element list
    /// - missing `Condition` defaults to `{}`
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let effect = match object.get("Effect") {
            None => Effect::Allow,
            Some(Value::String(text)) => Effect::parse(text),
            Some(other) => Effect::Unrecognized(other.to_string()),
        };
        if let Effect::Unrecognized(text) = &effect {
            warn!("Unrecognized statement effect {:?}", text);
        }

        let actions = match object.get("Action") {
            Some(value) => string_list(value, "Action").unwrap_or_default(),
            None => Vec::new(),
        };

        let resources = object
            .get("Resource")
            .and_then(|value| string_list(value, "Resource"))
            .unwrap_or_else(|| vec!["*".to_string()]);

        let condition = object
            .get("Condition")
            .filter(|value| !value.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        PolicyStatement {
            effect,
            actions,
            resources,
            condition,
        }
    }
}

/// Coerce a string-or-list JSON value into a list of strings.
///
/// Returns `None` when the value is neither a string nor a list. Non-string
/// list elements are dropped.
fn string_list(value: &Value, field: &str) -> Option<Vec<String>> {
    match value {
        Value::String(single) => Some(vec![single.clone()]),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    other => {
                        warn!("Skipping non-string {} element: {}", field, other);
                        None
                    }
                })
                .collect(),
        ),
        _ => None,
    }
}

/// Policy document: an ordered list of statements
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    /// Policy language version, if the document carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// List of policy statements
    pub statement: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement to this document
    pub fn add_statement(&mut self, statement: PolicyStatement) {
        self.statement.push(statement);
    }

    /// Build a document from raw JSON. Never fails.
    ///
    /// A `Statement` that is a single object is treated as a one-element list.
    /// Anything that is not an object (the document itself or a statement
    /// entry) contributes nothing.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            if !value.is_null() {
                warn!("Policy document is not a JSON object; treating as empty");
            }
            return Self::default();
        };

        let version = object
            .get("Version")
            .and_then(Value::as_str)
            .map(str::to_string);

        let statement = match object.get("Statement") {
            Some(Value::Object(single)) => vec![PolicyStatement::from_object(single)],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(stmt) => Some(PolicyStatement::from_object(stmt)),
                    other => {
                        warn!("Skipping non-object statement: {}", other);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        };

        PolicyDocument { version, statement }
    }

    /// Parse a document from a JSON string
    ///
    /// Only invalid JSON is an error; any valid JSON value becomes a document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(json)?;
        Ok(Self::from_value(&value))
    }
}

impl<'de> Deserialize<'de> for PolicyDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(PolicyDocument::from_value(&value))
    }
}
