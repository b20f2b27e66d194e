//! Action classification
//!
//! Maps an action string such as `s3:GetObject` to its service and a coarse
//! access level. Operation rules are an ordered table evaluated first-match-wins:
//! `CreatePolicy` and `PutPolicy` satisfy the Write prefixes before the
//! PermissionsManagement rule is reached, so they classify as Write.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Service reported for the bare `*` action
pub const ALL_SERVICES: &str = "ALL_SERVICES";

/// Service reported for actions that do not look like `service:operation`
pub const UNKNOWN_SERVICE: &str = "UNKNOWN";

/// Coarse privilege tier assigned to an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AccessLevel {
    Admin,
    List,
    PermissionsManagement,
    Read,
    Tagging,
    Unknown,
    Write,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Admin => "Admin",
            AccessLevel::List => "List",
            AccessLevel::PermissionsManagement => "PermissionsManagement",
            AccessLevel::Read => "Read",
            AccessLevel::Tagging => "Tagging",
            AccessLevel::Unknown => "Unknown",
            AccessLevel::Write => "Write",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(AccessLevel::Admin),
            "List" => Ok(AccessLevel::List),
            "PermissionsManagement" => Ok(AccessLevel::PermissionsManagement),
            "Read" => Ok(AccessLevel::Read),
            "Tagging" => Ok(AccessLevel::Tagging),
            "Unknown" => Ok(AccessLevel::Unknown),
            "Write" => Ok(AccessLevel::Write),
            other => Err(format!("unknown access level '{}'", other)),
        }
    }
}

/// How a rule tests the operation part of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMatcher {
    /// Operation equals the literal
    Exact(&'static str),
    /// Operation starts with any of the prefixes
    AnyPrefix(&'static [&'static str]),
    /// Always matches
    Always,
}

impl OperationMatcher {
    pub fn matches(&self, operation: &str) -> bool {
        match self {
            OperationMatcher::Exact(literal) => operation == *literal,
            OperationMatcher::AnyPrefix(prefixes) => {
                prefixes.iter().any(|prefix| operation.starts_with(prefix))
            }
            OperationMatcher::Always => true,
        }
    }
}

/// One entry of the operation rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRule {
    /// Position in the overall rule order (rules 1-3 are structural)
    pub priority: u8,
    pub matcher: OperationMatcher,
    pub level: AccessLevel,
}

/// Operation rules in evaluation order
pub const OPERATION_RULES: &[ClassificationRule] = &[
    ClassificationRule {
        priority: 4,
        matcher: OperationMatcher::Exact("*"),
        level: AccessLevel::Admin,
    },
    ClassificationRule {
        priority: 5,
        matcher: OperationMatcher::AnyPrefix(&["Get", "Head", "Read"]),
        level: AccessLevel::Read,
    },
    ClassificationRule {
        priority: 6,
        matcher: OperationMatcher::AnyPrefix(&["List", "Describe"]),
        level: AccessLevel::List,
    },
    ClassificationRule {
        priority: 7,
        matcher: OperationMatcher::AnyPrefix(&[
            "Create", "Put", "Delete", "Update", "Start", "Stop", "Invoke",
        ]),
        level: AccessLevel::Write,
    },
    ClassificationRule {
        priority: 8,
        matcher: OperationMatcher::AnyPrefix(&["Tag", "Untag"]),
        level: AccessLevel::Tagging,
    },
    ClassificationRule {
        priority: 9,
        matcher: OperationMatcher::AnyPrefix(&[
            "PassRole",
            "Attach",
            "Detach",
            "CreatePolicy",
            "PutPolicy",
            "SetPolicy",
            "AddUserToGroup",
            "RemoveUserFromGroup",
        ]),
        level: AccessLevel::PermissionsManagement,
    },
    ClassificationRule {
        priority: 10,
        matcher: OperationMatcher::Always,
        level: AccessLevel::Read,
    },
];

/// Result of classifying one action
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Classification {
    pub service: String,
    pub level: AccessLevel,
    /// Priority of the rule that produced this result (1-10)
    pub rule: u8,
}

impl Classification {
    fn new(service: impl Into<String>, level: AccessLevel, rule: u8) -> Self {
        Classification {
            service: service.into(),
            level,
            rule,
        }
    }

    /// The `(service, level)` pair
    pub fn pair(&self) -> (&str, AccessLevel) {
        (&self.service, self.level)
    }
}

fn action_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    // `.` stops at a newline, so only the first line of the operation counts
    SHAPE.get_or_init(|| Regex::new(r"^([a-z0-9-]+):(.*)").expect("action shape regex is valid"))
}

/// Classify an action string. Never fails.
///
/// # Examples
///
/// ```
/// use iam_drift::iam::{classify, AccessLevel};
///
/// assert_eq!(classify("s3:GetObject").pair(), ("s3", AccessLevel::Read));
/// assert_eq!(classify("iam:PassRole").pair(), ("iam", AccessLevel::PermissionsManagement));
/// assert_eq!(classify("*").pair(), ("ALL_SERVICES", AccessLevel::Admin));
/// ```
pub fn classify(action: &str) -> Classification {
    if action == "*" {
        return Classification::new(ALL_SERVICES, AccessLevel::Admin, 1);
    }

    let Some(captures) = action_shape().captures(action) else {
        return Classification::new(UNKNOWN_SERVICE, AccessLevel::Unknown, 2);
    };
    let service = &captures[1];
    let operation = captures.get(2).map_or("", |m| m.as_str());

    // The table ends with an Always rule, so a match is guaranteed
    let rule = OPERATION_RULES
        .iter()
        .find(|rule| rule.matcher.matches(operation))
        .unwrap_or(&OPERATION_RULES[OPERATION_RULES.len() - 1]);

    Classification::new(service, rule.level, rule.priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_action() {
        let c = classify("*");
        assert_eq!(c.pair(), (ALL_SERVICES, AccessLevel::Admin));
        assert_eq!(c.rule, 1);
    }

    #[test]
    fn test_service_wildcard() {
        assert_eq!(classify("s3:*").pair(), ("s3", AccessLevel::Admin));
    }

    #[test]
    fn test_prefix_levels() {
        assert_eq!(classify("s3:GetObject").pair(), ("s3", AccessLevel::Read));
        assert_eq!(classify("s3:HeadBucket").pair(), ("s3", AccessLevel::Read));
        assert_eq!(classify("s3:ListBucket").pair(), ("s3", AccessLevel::List));
        assert_eq!(
            classify("ec2:DescribeInstances").pair(),
            ("ec2", AccessLevel::List)
        );
        assert_eq!(
            classify("lambda:InvokeFunction").pair(),
            ("lambda", AccessLevel::Write)
        );
        assert_eq!(
            classify("ec2:StopInstances").pair(),
            ("ec2", AccessLevel::Write)
        );
        assert_eq!(
            classify("s3:TagResource").pair(),
            ("s3", AccessLevel::Tagging)
        );
        assert_eq!(
            classify("s3:UntagResource").pair(),
            ("s3", AccessLevel::Tagging)
        );
    }

    #[test]
    fn test_permissions_management() {
        assert_eq!(
            classify("iam:PassRole").pair(),
            ("iam", AccessLevel::PermissionsManagement)
        );
        assert_eq!(
            classify("iam:AttachRolePolicy").pair(),
            ("iam", AccessLevel::PermissionsManagement)
        );
        assert_eq!(
            classify("iam:DetachUserPolicy").pair(),
            ("iam", AccessLevel::PermissionsManagement)
        );
        assert_eq!(
            classify("iam:AddUserToGroup").pair(),
            ("iam", AccessLevel::PermissionsManagement)
        );
        assert_eq!(
            classify("s3:SetPolicy").pair(),
            ("s3", AccessLevel::PermissionsManagement)
        );
    }

    #[test]
    fn test_write_shadows_permissions_management() {
        let create = classify("iam:CreatePolicy");
        assert_eq!(create.pair(), ("iam", AccessLevel::Write));
        assert_eq!(create.rule, 7);

        let put = classify("iam:PutPolicy");
        assert_eq!(put.pair(), ("iam", AccessLevel::Write));
        assert_eq!(put.rule, 7);
    }

    #[test]
    fn test_fallback_is_read() {
        let c = classify("sts:AssumeRole");
        assert_eq!(c.pair(), ("sts", AccessLevel::Read));
        assert_eq!(c.rule, 10);
    }

    #[test]
    fn test_unknown_shapes() {
        assert_eq!(
            classify("not-an-action").pair(),
            (UNKNOWN_SERVICE, AccessLevel::Unknown)
        );
        assert_eq!(classify("").pair(), (UNKNOWN_SERVICE, AccessLevel::Unknown));
        assert_eq!(
            classify("S3:GetObject").pair(),
            (UNKNOWN_SERVICE, AccessLevel::Unknown)
        );
        assert_eq!(
            classify(":GetObject").pair(),
            (UNKNOWN_SERVICE, AccessLevel::Unknown)
        );
    }

    #[test]
    fn test_splits_on_first_colon() {
        let c = classify("s3:Get:Object");
        assert_eq!(c.pair(), ("s3", AccessLevel::Read));
    }

    #[test]
    fn test_empty_operation_falls_back() {
        assert_eq!(classify("s3:").pair(), ("s3", AccessLevel::Read));
    }

    #[test]
    fn test_rule_table_order() {
        let priorities: Vec<u8> = OPERATION_RULES.iter().map(|r| r.priority).collect();
        assert_eq!(priorities, vec![4, 5, 6, 7, 8, 9, 10]);
        assert_eq!(
            OPERATION_RULES.last().map(|r| r.matcher),
            Some(OperationMatcher::Always)
        );
    }

    #[test]
    fn test_level_ordering_is_lexicographic() {
        let mut levels = vec![
            AccessLevel::Write,
            AccessLevel::Unknown,
            AccessLevel::Tagging,
            AccessLevel::Read,
            AccessLevel::PermissionsManagement,
            AccessLevel::List,
            AccessLevel::Admin,
        ];
        levels.sort();
        let names: Vec<&str> = levels.iter().map(|l| l.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!("Tagging".parse::<AccessLevel>(), Ok(AccessLevel::Tagging));
        assert!("tagging".parse::<AccessLevel>().is_err());
    }
}
