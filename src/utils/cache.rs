//! Public Key Cache
//!
//! Key resolution is deterministic, so entries never expire. Concurrent
//! inserts for the same key id store identical values.

use crate::crypto::{Address, RawPublicKey};
use std::collections::HashMap;
use std::sync::RwLock;

/// Resolved key material for one key id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedKey {
    pub public_key: RawPublicKey,
    pub address: Address,
}

/// Process-local `key id -> (public key, address)` cache.
#[derive(Debug, Default)]
pub struct KeyCache {
    entries: RwLock<HashMap<String, CachedKey>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key_id: &str) -> Option<CachedKey> {
        // Inserts are single calls; a poisoned map is still consistent.
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key_id).copied()
    }

    pub fn insert(&self, key_id: impl Into<String>, entry: CachedKey) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key_id.into(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_address;

    fn entry(fill: u8) -> CachedKey {
        let public_key = RawPublicKey([fill; 64]);
        CachedKey {
            public_key,
            address: derive_address(&public_key),
        }
    }

    #[test]
    fn test_cache_basic() {
        let cache = KeyCache::new();
        assert!(cache.is_empty());

        cache.insert("key1", entry(1));
        assert_eq!(cache.get("key1"), Some(entry(1)));
        assert_eq!(cache.get("key2"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_reinsert_is_idempotent() {
        let cache = KeyCache::new();
        cache.insert("key1", entry(1));
        cache.insert("key1", entry(1));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("key1"), Some(entry(1)));
    }

    #[test]
    fn test_cache_shared_across_threads() {
        let cache = std::sync::Arc::new(KeyCache::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.insert("shared", entry(7)))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.get("shared"), Some(entry(7)));
    }
}
