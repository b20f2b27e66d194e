//! Collaborator capabilities
//!
//! The engine never talks to an identity provider or object store directly.
//! Callers inject:
//! - a [`PolicySource`] that returns the policies attached to a principal
//! - a [`RecordStore`] that reads and writes named record collections

use crate::error::{IamDriftError, Result};
use crate::iam::{PolicyAttachment, Principal};
use crate::ingest::PrincipalPolicies;
use crate::validation::resolve_collection_path;
use ahash::AHashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fetches raw policy documents for a principal
pub trait PolicySource {
    /// Every principal this source knows about, in a stable order
    fn principals(&self) -> Vec<Principal>;

    /// Policies attached to or inherited by `principal`
    fn policies_for(&self, principal: &Principal) -> Result<Vec<PolicyAttachment>>;
}

/// Reads and writes named record collections
pub trait RecordStore {
    fn load(&self, name: &str) -> Result<String>;

    fn save(&self, name: &str, contents: &str) -> Result<()>;

    fn exists(&self, name: &str) -> Result<bool>;
}

/// Policy source backed by already-ingested collector output
///
/// Entries for the same principal are merged under one key, keeping the
/// order principals were first pushed in.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPolicySource {
    order: Vec<Principal>,
    policies: AHashMap<Principal, Vec<PolicyAttachment>>,
    entries: usize,
}

impl InMemoryPolicySource {
    pub fn new(entries: Vec<PrincipalPolicies>) -> Self {
        let mut source = Self::default();
        for entry in entries {
            source.push(entry);
        }
        source
    }

    pub fn push(&mut self, entry: PrincipalPolicies) {
        self.entries += 1;
        match self.policies.get_mut(&entry.principal) {
            Some(policies) => policies.extend(entry.policies),
            None => {
                self.order.push(entry.principal.clone());
                self.policies.insert(entry.principal, entry.policies);
            }
        }
    }

    /// Number of entries pushed, before merging
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

impl PolicySource for InMemoryPolicySource {
    fn principals(&self) -> Vec<Principal> {
        self.order.clone()
    }

    fn policies_for(&self, principal: &Principal) -> Result<Vec<PolicyAttachment>> {
        Ok(self.policies.get(principal).cloned().unwrap_or_default())
    }
}

/// Record store mapping collection names to files under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        resolve_collection_path(&self.root, name)
    }
}

impl RecordStore for DirectoryStore {
    fn load(&self, name: &str) -> Result<String> {
        let path = self.path_for(name)?;
        debug!("Loading {} from {:?}", name, path);
        fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => IamDriftError::CollectionNotFound(name.to_string()),
            _ => IamDriftError::Io(e),
        })
    }

    fn save(&self, name: &str, contents: &str) -> Result<()> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!("Writing {} bytes to {:?}", contents.len(), path);
        fs::write(&path, contents)?;
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name)?.is_file())
    }
}

/// Record store kept in memory, shareable across threads
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all stored collections, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, name: &str) -> Result<String> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| IamDriftError::CollectionNotFound(name.to_string()))
    }

    fn save(&self, name: &str, contents: &str) -> Result<()> {
        self.collections
            .write()
            .insert(name.to_string(), contents.to_string());
        Ok(())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }
}
