//! LRU cache for action classification results
//!
//! Policy sets repeat the same handful of action strings across many
//! principals; the cache skips the regex match for those repeats.

use super::classify::{classify, Classification};
use lru::LruCache;
use std::num::NonZeroUsize;

/// Default number of cached action strings
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// LRU cache for classification results
pub struct ClassificationCache {
    cache: LruCache<String, Classification>,
    hits: u64,
    misses: u64,
}

impl ClassificationCache {
    /// Create a new classification cache with given capacity (0 is treated as 1)
    pub fn new(capacity: usize) -> Self {
        ClassificationCache {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
            hits: 0,
            misses: 0,
        }
    }

    /// Classify through the cache
    pub fn classify(&mut self, action: &str) -> Classification {
        if let Some(cached) = self.cache.get(action) {
            self.hits += 1;
            return cached.clone();
        }

        self.misses += 1;
        let result = classify(action);
        self.cache.put(action.to_string(), result.clone());
        result
    }

    /// Clear the cache and its counters
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Number of cached action strings
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Maximum number of cached action strings
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// (hits, misses) since creation or the last clear
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

impl Default for ClassificationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::iam::AccessLevel;

    #[test]
    fn test_cache_basic() {
        let mut cache = ClassificationCache::new(10);
        assert!(cache.is_empty());

        assert_eq!(cache.classify("s3:GetObject").level, AccessLevel::Read);
        assert_eq!(cache.classify("s3:GetObject").level, AccessLevel::Read);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_cache_lru_eviction() {
        let mut cache = ClassificationCache::new(2);

        cache.classify("s3:GetObject");
        cache.classify("s3:PutObject");
        cache.classify("s3:ListBucket"); // Should evict s3:GetObject

        assert_eq!(cache.len(), 2);
        cache.classify("s3:GetObject");
        assert_eq!(cache.stats(), (0, 4));
    }

    #[test]
    fn test_cache_matches_uncached() {
        let mut cache = ClassificationCache::new(4);
        for action in ["*", "iam:CreatePolicy", "bogus", "iam:PassRole"] {
            assert_eq!(cache.classify(action), classify(action));
        }
    }

    #[test]
    fn test_zero_capacity() {
        let mut cache = ClassificationCache::new(0);
        cache.classify("s3:GetObject");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_clear() {
        let mut cache = ClassificationCache::default();
        cache.classify("s3:GetObject");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), (0, 0));
    }
}
