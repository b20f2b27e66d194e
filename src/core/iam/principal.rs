//! Principal identities
//!
//! A principal is the envelope every permission is reported under. Unlike the
//! policy documents it carries, the envelope is strict: unknown types and
//! empty names are rejected.

use crate::error::{IamDriftError, Result};
use crate::validation::PrincipalName;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Kind of identity holding permissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrincipalType {
    User,
    Group,
    Role,
}

impl PrincipalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalType::User => "User",
            PrincipalType::Group => "Group",
            PrincipalType::Role => "Role",
        }
    }
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalType {
    type Err = IamDriftError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "User" => Ok(PrincipalType::User),
            "Group" => Ok(PrincipalType::Group),
            "Role" => Ok(PrincipalType::Role),
            other => Err(IamDriftError::InvalidPrincipalType(other.to_string())),
        }
    }
}

impl Serialize for PrincipalType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PrincipalType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A named principal of a given type
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub name: PrincipalName,
    pub kind: PrincipalType,
}

impl Principal {
    /// Create a principal, validating the name
    pub fn new(name: impl Into<String>, kind: PrincipalType) -> Result<Self> {
        Ok(Principal {
            name: PrincipalName::new(name)?,
            kind,
        })
    }

    pub fn user(name: impl Into<String>) -> Result<Self> {
        Self::new(name, PrincipalType::User)
    }

    pub fn group(name: impl Into<String>) -> Result<Self> {
        Self::new(name, PrincipalType::Group)
    }

    pub fn role(name: impl Into<String>) -> Result<Self> {
        Self::new(name, PrincipalType::Role)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}
