//! A content-addressed map from raw public-key bytes to validator indices.
//!
//! Used to resolve a validator's public key to its registry index during state transition,
//! where lookups are hot and keys arrive as borrowed byte slices from deserialized objects.
//! Equality is by byte content, never by buffer identity: two distinct buffers holding the same
//! bytes are the same key.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::borrow::Borrow;
use std::collections::HashMap;

/// Compressed BLS public keys are 48 bytes; keys up to this length are stored inline.
pub const PUBKEY_BYTES_LEN: usize = 48;

/// The wire-level encoding of "absent" used by FFI-style consumers of this map. The in-process
/// API returns `Option<u32>` instead; callers must never store an index with this value.
pub const NOT_FOUND_INDEX: u32 = u32::MAX;

/// Key storage. Hashing and equality delegate to the byte slice, so lookups can borrow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct PubkeyBytes(SmallVec<[u8; PUBKEY_BYTES_LEN]>);

impl Borrow<[u8]> for PubkeyBytes {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for PubkeyBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(SmallVec::from_slice(bytes))
    }
}

/// A single-owner map from public-key bytes to validator index.
///
/// `clone` produces a fully independent deep copy; there is no shared state between a map and
/// its clones. The map is not internally synchronized: concurrent mutation requires external
/// locking or per-thread instances.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct PubkeyIndexMap {
    map: HashMap<PubkeyBytes, u32>,
}

impl PubkeyIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys currently present.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Inserts or overwrites the index stored for `pubkey`. Re-inserting an existing key
    /// replaces its value without growing the map.
    pub fn insert(&mut self, pubkey: &[u8], index: u32) {
        self.map.insert(PubkeyBytes::from(pubkey), index);
    }

    /// Looks up a validator index by public key.
    pub fn get(&self, pubkey: &[u8]) -> Option<u32> {
        self.map.get(pubkey).copied()
    }

    pub fn contains_key(&self, pubkey: &[u8]) -> bool {
        self.map.contains_key(pubkey)
    }

    /// Removes `pubkey`, returning the index it mapped to.
    pub fn remove(&mut self, pubkey: &[u8]) -> Option<u32> {
        self.map.remove(pubkey)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pubkey(fill: u8) -> Vec<u8> {
        vec![fill; PUBKEY_BYTES_LEN]
    }

    #[test]
    fn equal_bytes_are_one_key() {
        let mut map = PubkeyIndexMap::new();
        let k1 = pubkey(0xaa);
        // A separate allocation with the same content.
        let k2 = k1.clone();

        map.insert(&k1, 1);
        map.insert(&k2, 2);

        assert_eq!(map.get(&k1), Some(2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn get_and_has_on_absent_key() {
        let map = PubkeyIndexMap::new();
        assert_eq!(map.get(&pubkey(0x01)), None);
        assert!(!map.contains_key(&pubkey(0x01)));
        assert!(map.is_empty());
    }

    #[test]
    fn remove_reports_presence() {
        let mut map = PubkeyIndexMap::new();
        map.insert(&pubkey(0x01), 7);

        assert_eq!(map.remove(&pubkey(0x01)), Some(7));
        assert_eq!(map.remove(&pubkey(0x01)), None);
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn clear_resets_the_map() {
        let mut map = PubkeyIndexMap::new();
        for i in 0..10 {
            map.insert(&pubkey(i), u32::from(i));
        }
        assert_eq!(map.len(), 10);

        map.clear();

        assert_eq!(map.len(), 0);
        for i in 0..10 {
            assert_eq!(map.get(&pubkey(i)), None);
        }
    }

    #[test]
    fn clone_is_independent() {
        let mut map = PubkeyIndexMap::new();
        map.insert(&pubkey(0x01), 1);

        let mut cloned = map.clone();
        cloned.insert(&pubkey(0x01), 99);
        cloned.insert(&pubkey(0x02), 2);

        assert_eq!(map.get(&pubkey(0x01)), Some(1));
        assert_eq!(map.len(), 1);
        assert_eq!(cloned.get(&pubkey(0x01)), Some(99));
        assert_eq!(cloned.len(), 2);
    }

    #[test]
    fn keys_longer_than_the_inline_capacity_spill() {
        let mut map = PubkeyIndexMap::new();
        let long_key = vec![0xcd; PUBKEY_BYTES_LEN * 2];
        map.insert(&long_key, 3);
        assert_eq!(map.get(&long_key), Some(3));
    }
}
