//! Validation for principal names and record collection names
//!
//! Policy document contents are accepted permissively, but the envelope around
//! them is not: a principal without a usable name, or a collection name that
//! would escape its store root, is rejected here.

use crate::error::{IamDriftError, Result};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Validated principal name
///
/// # Rules
/// - Not empty
/// - No leading or trailing whitespace
/// - No control characters
/// - Length: 1-512 characters
///
/// # Examples
///
/// ```
/// use iam_drift::validation::PrincipalName;
///
/// let name = PrincipalName::new("alice").unwrap();
/// assert_eq!(name.as_str(), "alice");
///
/// assert!(PrincipalName::new("").is_err());
/// assert!(PrincipalName::new(" alice").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrincipalName(String);

impl PrincipalName {
    /// Maximum length accepted for a principal name
    const MAX_LENGTH: usize = 512;

    /// Create a new validated principal name
    ///
    /// # Errors
    ///
    /// Returns `MissingPrincipal` for an empty name and `InvalidPrincipalName`
    /// for any other rule violation.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate_name(&name)?;
        Ok(PrincipalName(name))
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(IamDriftError::MissingPrincipal(
                "principal name cannot be empty".to_string(),
            ));
        }

        if name.chars().count() > Self::MAX_LENGTH {
            return Err(IamDriftError::InvalidPrincipalName(format!(
                "name too long (max {} characters)",
                Self::MAX_LENGTH
            )));
        }

        if name.trim() != name {
            return Err(IamDriftError::InvalidPrincipalName(format!(
                "'{}' has leading or trailing whitespace",
                name
            )));
        }

        if name.chars().any(char::is_control) {
            return Err(IamDriftError::InvalidPrincipalName(format!(
                "{:?} contains control characters",
                name
            )));
        }

        Ok(())
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for PrincipalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PrincipalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for PrincipalName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PrincipalName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PrincipalName::new(s).map_err(serde::de::Error::custom)
    }
}

/// Pattern for record collection names: relative paths of plain segments
const COLLECTION_PATTERN: &str = r"^[A-Za-z0-9._-]+(/[A-Za-z0-9._-]+)*$";

fn collection_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(COLLECTION_PATTERN).expect("collection pattern is valid"))
}

/// Resolve a record collection name beneath a store root
///
/// Names are relative, `/`-separated and may not contain `.` or `..`
/// segments, so the result always stays under `root`.
///
/// # Examples
///
/// ```
/// use iam_drift::validation::resolve_collection_path;
/// use std::path::Path;
///
/// let path = resolve_collection_path(Path::new("/data"), "day1/service_access_matrix.csv").unwrap();
/// assert_eq!(path, Path::new("/data/day1/service_access_matrix.csv"));
///
/// assert!(resolve_collection_path(Path::new("/data"), "../etc/passwd").is_err());
/// assert!(resolve_collection_path(Path::new("/data"), "/abs.csv").is_err());
/// ```
pub fn resolve_collection_path(root: &Path, name: &str) -> Result<PathBuf> {
    if !collection_regex().is_match(name) {
        return Err(IamDriftError::InvalidCollectionName(format!(
            "'{}' must be a relative path of letters, digits, '.', '_', '-'",
            name
        )));
    }

    let relative = Path::new(name);
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(IamDriftError::InvalidCollectionName(format!(
            "'{}' may not contain '.' or '..' segments",
            name
        )));
    }

    Ok(root.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(PrincipalName::new("alice").is_ok());
        assert!(PrincipalName::new("svc-deploy@example.com").is_ok());
        assert!(PrincipalName::new("Build Role").is_ok());
        assert!(PrincipalName::new("a").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            PrincipalName::new(""),
            Err(IamDriftError::MissingPrincipal(_))
        ));
        assert!(PrincipalName::new(" alice").is_err()); // leading space
        assert!(PrincipalName::new("alice\n").is_err()); // trailing newline
        assert!(PrincipalName::new("al\u{7}ice").is_err()); // control char
        assert!(PrincipalName::new("x".repeat(513)).is_err()); // too long
    }

    #[test]
    fn test_deserialize_rejects_empty() {
        let parsed: std::result::Result<PrincipalName, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());

        let parsed: PrincipalName = serde_json::from_str("\"bob\"").unwrap();
        assert_eq!(parsed.as_str(), "bob");
    }

    #[test]
    fn test_collection_paths() {
        let root = Path::new("/store");
        assert_eq!(
            resolve_collection_path(root, "users.jsonl").unwrap(),
            Path::new("/store/users.jsonl")
        );
        assert_eq!(
            resolve_collection_path(root, "reports/output/service_access_matrix.csv").unwrap(),
            Path::new("/store/reports/output/service_access_matrix.csv")
        );
    }

    #[test]
    fn test_collection_path_rejects_traversal() {
        let root = Path::new("/store");
        assert!(resolve_collection_path(root, "").is_err());
        assert!(resolve_collection_path(root, "..").is_err());
        assert!(resolve_collection_path(root, "a/../b").is_err());
        assert!(resolve_collection_path(root, "./a").is_err());
        assert!(resolve_collection_path(root, "/etc/passwd").is_err());
        assert!(resolve_collection_path(root, "a//b").is_err());
        assert!(resolve_collection_path(root, "a b.csv").is_err());
    }
}
