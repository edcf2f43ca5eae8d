//! Fast hash map and hash set type aliases.
//!
//! The Fx hash function (from `rustc-hash`) is used for every internal map
//! in the workspace. Keys are resource identifiers and file paths, neither of
//! which needs denial-of-service resistance.

use std::hash::{Hash, Hasher};

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;

/// Hashes file contents for cheap change detection.
///
/// The watcher uses this to suppress update events whose content did not
/// actually change (editors frequently rewrite files byte-for-byte).
///
/// # Examples
///
/// ```
/// use sa_core::content_hash;
///
/// assert_eq!(content_hash("const a = 1;"), content_hash("const a = 1;"));
/// assert_ne!(content_hash("const a = 1;"), content_hash("const a = 2;"));
/// ```
#[inline]
#[must_use]
pub fn content_hash(content: &str) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    content.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_hash_map_operations() {
        let mut map: FxHashMap<&str, i32> = FxHashMap::default();
        map.insert("one", 1);
        assert_eq!(map.get("one"), Some(&1));
        assert_eq!(map.get("two"), None);
    }

    #[test]
    fn test_content_hash_is_stable() {
        let source = "app.get('/users', (c) => c.json([]));";
        assert_eq!(content_hash(source), content_hash(source));
    }

    #[test]
    fn test_content_hash_detects_change() {
        assert_ne!(content_hash(""), content_hash(" "));
    }
}
