//! The nested key-value document that every store persists.

use serde_json::Value;

/// Nested string-keyed mapping, the unit of persistence.
///
/// Values are JSON scalars or nested objects. Top-level key order is insertion
/// order (via `serde_json`'s `preserve_order` feature) but carries no meaning.
pub type ConfigDocument = serde_json::Map<String, Value>;

/// Shallow-merges `incoming` into `current`.
///
/// Keys present in `incoming` overwrite matching keys in `current`; other keys
/// are untouched. Nested objects are replaced wholesale, not merged.
pub fn shallow_merge(current: &mut ConfigDocument, incoming: ConfigDocument) {
    for (key, value) in incoming {
        current.insert(key, value);
    }
}
