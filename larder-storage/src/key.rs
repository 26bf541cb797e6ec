//! Store-scoped binary keys for the LMDB backend.
//!
//! Every LMDB key carries its store name as a prefix, so one flat database
//! can hold all stores while range scans still operate on a single store.

use larder_core::{RequestIdentity, StoreName};

/// Separator byte between the store name and the entry key.
///
/// 0xFF never occurs in UTF-8 text, so the separator cannot collide with a
/// byte of the store name or the identity key.
const SEPARATOR: u8 = 0xFF;

/// A cache key scoped to a specific store.
///
/// # Binary Format
///
/// - Store marker: `[store name bytes][0xFF]` (empty suffix). Written at
///   `open()` so that empty stores remain enumerable and deletable.
/// - Entry key: `[store name bytes][0xFF][identity key bytes]`.
///
/// Keys sort by store name first, so a prefix scan visits exactly one
/// store's entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StoreScopedKey {
    store: StoreName,
    suffix: Vec<u8>,
}

impl StoreScopedKey {
    /// Key for an entry in `store`.
    pub(crate) fn entry(store: &StoreName, identity: &RequestIdentity) -> Self {
        Self {
            store: store.clone(),
            suffix: identity.key().into_bytes(),
        }
    }

    /// The marker key that records a store's existence.
    pub(crate) fn marker(store: &StoreName) -> Self {
        Self {
            store: store.clone(),
            suffix: Vec::new(),
        }
    }

    pub(crate) fn encode(&self) -> Vec<u8> {
        let mut bytes = store_prefix(&self.store);
        bytes.extend_from_slice(&self.suffix);
        bytes
    }
}

/// Prefix shared by a store's marker and all its entry keys.
pub(crate) fn store_prefix(store: &StoreName) -> Vec<u8> {
    let name = store.as_str().as_bytes();
    let mut bytes = Vec::with_capacity(name.len() + 1);
    bytes.extend_from_slice(name);
    bytes.push(SEPARATOR);
    bytes
}

/// Extract the store name from a raw key.
pub(crate) fn decode_store_name(key: &[u8]) -> Option<StoreName> {
    let sep = key.iter().position(|&b| b == SEPARATOR)?;
    let name = std::str::from_utf8(&key[..sep]).ok()?;
    Some(StoreName::new(name))
}

/// Extract the entry key from a raw key. Returns None for store markers.
pub(crate) fn decode_entry_key(key: &[u8]) -> Option<String> {
    let sep = key.iter().position(|&b| b == SEPARATOR)?;
    let suffix = &key[sep + 1..];
    if suffix.is_empty() {
        return None;
    }
    std::str::from_utf8(suffix).ok().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StoreName {
        StoreName::new("app-cache-v1.3.0")
    }

    #[test]
    fn test_entry_key_round_trip() {
        let identity = RequestIdentity::get("/index.html");
        let encoded = StoreScopedKey::entry(&store(), &identity).encode();

        assert_eq!(decode_store_name(&encoded), Some(store()));
        assert_eq!(decode_entry_key(&encoded), Some("GET /index.html".to_string()));
    }

    #[test]
    fn test_marker_has_empty_suffix() {
        let encoded = StoreScopedKey::marker(&store()).encode();
        assert_eq!(decode_store_name(&encoded), Some(store()));
        assert_eq!(decode_entry_key(&encoded), None);
    }

    #[test]
    fn test_entry_key_starts_with_store_prefix() {
        let identity = RequestIdentity::get("/app.css");
        let encoded = StoreScopedKey::entry(&store(), &identity).encode();
        let prefix = store_prefix(&store());
        assert!(encoded.starts_with(&prefix));
    }

    #[test]
    fn test_prefixes_of_distinct_stores_do_not_overlap() {
        // "app-cache-v1.3.0" must not be treated as a prefix of entries in
        // a hypothetical "app-cache-v1.3.01" store.
        let a = store_prefix(&StoreName::new("app-cache-v1.3.0"));
        let b = store_prefix(&StoreName::new("app-cache-v1.3.01"));
        assert!(!b.starts_with(&a));
    }
}
