//! The in-memory configuration store mirrored to durable storage.

use serde_json::Value;
use tracing::debug;

use crate::document::{shallow_merge, ConfigDocument};
use crate::error::DbStashError;
use crate::storage::DurableStore;
use crate::Result;

/// A nested key-value store persisted synchronously on every mutation.
///
/// The store exclusively owns its in-memory document; the bound
/// [`DurableStore`] is a passive transfer surface. Mutations are applied to a
/// scratch copy, persisted, and only then committed to memory, so a failed
/// persist never leaves memory and durable storage diverged.
///
/// # Example
/// ```rust
/// use dbstash_core::config::ConfigStore;
/// use dbstash_core::storage::MemoryStore;
/// use serde_json::json;
///
/// let mut store = ConfigStore::open(MemoryStore::new())?;
/// store.set("log_level", json!(20))?;
/// assert_eq!(store.get("log_level")?, &json!(20));
/// # Ok::<(), dbstash_core::DbStashError>(())
/// ```
#[derive(Debug)]
pub struct ConfigStore<S> {
    doc: ConfigDocument,
    store: S,
}

impl<S: DurableStore> ConfigStore<S> {
    /// Opens the store, loading the current document from `store`.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` or `Serialization` if the backing record
    /// exists but cannot be loaded.
    pub fn open(store: S) -> Result<Self> {
        let doc = store.load()?;
        Ok(Self { doc, store })
    }

    /// Replaces the in-memory document with a fresh load from storage.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` or `Serialization` on load failure; the
    /// in-memory document is unchanged in that case.
    pub fn reload(&mut self) -> Result<()> {
        self.doc = self.store.load()?;
        Ok(())
    }

    /// The full in-memory document.
    ///
    /// Read-only view: mutating a clone of the returned document does not
    /// persist anything.
    pub fn all(&self) -> &ConfigDocument {
        &self.doc
    }

    /// Returns the value at top-level `key`.
    ///
    /// # Errors
    /// Returns `KeyNotFound` if `key` is absent.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.doc
            .get(key)
            .ok_or_else(|| DbStashError::key_not_found(key))
    }

    /// Returns the value at top-level `key`, or `default` if absent.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.doc.get(key).cloned().unwrap_or(default)
    }

    /// Top-level keys, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.doc.keys().cloned().collect()
    }

    /// Keys of the nested document at `key`.
    ///
    /// # Errors
    /// Returns `KeyNotFound` if `key` is absent, `NotAMapping` if its value is
    /// not a nested mapping.
    pub fn keys_of(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key)? {
            Value::Object(nested) => Ok(nested.keys().cloned().collect()),
            _ => Err(DbStashError::not_a_mapping(key)),
        }
    }

    /// Unconditionally overwrites `key` with `value` (replace, not merge),
    /// then persists.
    ///
    /// # Errors
    /// Returns the persist error; the in-memory document is unchanged then.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let mut next = self.doc.clone();
        next.insert(key.to_string(), value);
        self.persist_and_commit(next)
    }

    /// Merges `value` into the mapping at `key`, then persists.
    ///
    /// When both the current value and `value` are mappings, `value` is
    /// shallow-merged in (matching keys overwritten, siblings untouched).
    /// Otherwise behaves like [`set`](Self::set). Creates `key` if absent.
    ///
    /// # Errors
    /// Returns the persist error; the in-memory document is unchanged then.
    pub fn update(&mut self, key: &str, value: Value) -> Result<()> {
        let mut next = self.doc.clone();
        let merged = match (next.get(key), value) {
            (Some(Value::Object(current)), Value::Object(incoming)) => {
                let mut current = current.clone();
                shallow_merge(&mut current, incoming);
                Value::Object(current)
            }
            (_, value) => value,
        };
        next.insert(key.to_string(), merged);
        self.persist_and_commit(next)
    }

    /// Removes `key` if present, then persists. Deleting an absent key is a
    /// no-op, not an error.
    ///
    /// # Errors
    /// Returns the persist error; the in-memory document is unchanged then.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let mut next = self.doc.clone();
        if next.shift_remove(key).is_none() {
            debug!(key, "delete of absent key ignored");
        }
        self.persist_and_commit(next)
    }

    /// Replaces the whole top-level document with `doc`, then persists.
    ///
    /// # Errors
    /// Returns the persist error; the in-memory document is unchanged then.
    pub fn set_all(&mut self, doc: ConfigDocument) -> Result<()> {
        self.persist_and_commit(doc)
    }

    /// Shallow-merges `doc` into the top-level document, then persists.
    ///
    /// # Errors
    /// Returns the persist error; the in-memory document is unchanged then.
    pub fn update_all(&mut self, doc: ConfigDocument) -> Result<()> {
        let mut next = self.doc.clone();
        shallow_merge(&mut next, doc);
        self.persist_and_commit(next)
    }

    /// Replaces the document with an empty one, then persists.
    ///
    /// # Errors
    /// Returns the persist error; the in-memory document is unchanged then.
    pub fn reset(&mut self) -> Result<()> {
        self.persist_and_commit(ConfigDocument::new())
    }

    // Persist-then-commit: exactly one synchronous save per mutation, and
    // memory only changes once the save succeeded.
    fn persist_and_commit(&mut self, next: ConfigDocument) -> Result<()> {
        self.store.save(&next)?;
        self.doc = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn store_with(doc: Value) -> ConfigStore<MemoryStore> {
        let backing = MemoryStore::new();
        match doc {
            Value::Object(map) => backing.save(&map).unwrap(),
            other => panic!("expected object, got {other}"),
        }
        ConfigStore::open(backing).unwrap()
    }

    /// A store whose saves always fail, for persist-failure atomicity tests.
    struct BrokenStore;

    impl DurableStore for BrokenStore {
        fn load(&self) -> Result<ConfigDocument> {
            Ok(ConfigDocument::new())
        }

        fn save(&self, _doc: &ConfigDocument) -> Result<()> {
            Err(DbStashError::storage_unavailable(
                "/nowhere",
                "broken on purpose",
                std::io::Error::other("save failed"),
            ))
        }
    }

    #[test]
    fn test_get_missing_key_fails_without_default() {
        let store = store_with(json!({}));
        let err = store.get("missing").unwrap_err();
        assert!(matches!(err, DbStashError::KeyNotFound { .. }));
    }

    #[test]
    fn test_get_or_returns_default_for_missing_key() {
        let store = store_with(json!({}));
        assert_eq!(store.get_or("missing", Value::Null), Value::Null);
        assert_eq!(store.get_or("missing", json!(20)), json!(20));
    }

    #[test]
    fn test_set_replaces_wholesale() {
        let mut store = store_with(json!({"v2": {"a": 1, "b": 3}}));
        store.set("v2", json!({"b": 2})).unwrap();
        assert_eq!(store.get("v2").unwrap(), &json!({"b": 2}));
    }

    #[test]
    fn test_update_merges_and_preserves_siblings() {
        let mut store = store_with(json!({"v2": {"a": 1, "b": 3}}));
        store.update("v2", json!({"b": 2})).unwrap();
        assert_eq!(store.get("v2").unwrap(), &json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_update_replaces_when_either_side_is_scalar() {
        let mut store = store_with(json!({"v1": 7}));
        store.update("v1", json!({"a": 1})).unwrap();
        assert_eq!(store.get("v1").unwrap(), &json!({"a": 1}));

        store.update("v1", json!(9)).unwrap();
        assert_eq!(store.get("v1").unwrap(), &json!(9));
    }

    #[test]
    fn test_update_creates_absent_key() {
        let mut store = store_with(json!({}));
        store.update("fresh", json!({"a": 1})).unwrap();
        assert_eq!(store.get("fresh").unwrap(), &json!({"a": 1}));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = store_with(json!({"keep": 1}));
        store.delete("absent").unwrap();
        store.delete("absent").unwrap();
        assert_eq!(store.keys(), vec!["keep"]);
    }

    #[test]
    fn test_delete_removes_present_key() {
        let mut store = store_with(json!({"gone": 1, "keep": 2}));
        store.delete("gone").unwrap();
        assert_eq!(store.keys(), vec!["keep"]);
    }

    #[test]
    fn test_keys_of_nested_mapping() {
        let store = store_with(json!({"nested": {"x": 1, "y": 2}, "scalar": 3}));
        assert_eq!(store.keys_of("nested").unwrap(), vec!["x", "y"]);

        let err = store.keys_of("scalar").unwrap_err();
        assert!(matches!(err, DbStashError::NotAMapping { .. }));

        let err = store.keys_of("absent").unwrap_err();
        assert!(matches!(err, DbStashError::KeyNotFound { .. }));
    }

    #[test]
    fn test_set_all_and_reset() {
        let mut store = store_with(json!({"old": 1}));

        let next = match json!({"new": 2}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        store.set_all(next).unwrap();
        assert_eq!(store.keys(), vec!["new"]);

        store.reset().unwrap();
        assert!(store.all().is_empty());
    }

    #[test]
    fn test_update_all_merges_top_level() {
        let mut store = store_with(json!({"a": 1, "b": 3}));

        let incoming = match json!({"b": 2, "c": 4}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        store.update_all(incoming).unwrap();
        assert_eq!(
            Value::Object(store.all().clone()),
            json!({"a": 1, "b": 2, "c": 4})
        );
    }

    #[test]
    fn test_mutation_persists_to_backing_store() {
        let backing = MemoryStore::new();
        let mut store = ConfigStore::open(backing.clone()).unwrap();
        store.set("k", json!("v")).unwrap();

        let reloaded = ConfigStore::open(backing).unwrap();
        assert_eq!(reloaded.get("k").unwrap(), &json!("v"));
    }

    #[test]
    fn test_failed_persist_leaves_memory_unchanged() {
        let mut store = ConfigStore::open(BrokenStore).unwrap();
        let err = store.set("k", json!("v")).unwrap_err();
        assert!(matches!(err, DbStashError::StorageUnavailable { .. }));
        assert!(store.all().is_empty());
    }
}
