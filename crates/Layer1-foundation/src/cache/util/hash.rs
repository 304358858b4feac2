//! Hashing utilities for cache keys

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Compute a hash for any hashable value
pub fn compute_hash<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// A cache key combining multiple components
///
/// Each component is hashed on its own, then the component list is hashed
/// again, so `("ab", "c")` and `("a", "bc")` produce different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeKey {
    components: Vec<u64>,
}

impl CompositeKey {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            components: Vec::with_capacity(capacity),
        }
    }

    pub fn push<T: Hash + ?Sized>(&mut self, value: &T) {
        self.components.push(compute_hash(value));
    }

    pub fn push_str(&mut self, s: &str) {
        self.components.push(compute_hash(s));
    }

    /// Build a single hash from all components
    pub fn finalize(&self) -> u64 {
        compute_hash(&self.components)
    }

    /// Fixed-width (16 hex digit) rendering of [`finalize`](Self::finalize)
    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.finalize())
    }
}

impl Default for CompositeKey {
    fn default() -> Self {
        Self::new()
    }
}
