//! Named connection-URL templates, keyed by driver identifier.

use serde_json::Value;
use tracing::debug;

use crate::config::ConfigStore;
use crate::error::DbStashError;
use crate::storage::DurableStore;
use crate::Result;

/// The conventional SQLAlchemy-style template most drivers follow.
///
/// Offered for callers registering drivers explicitly; lookups never fall
/// back to it.
pub const DEFAULT_URL_TEMPLATE: &str = "{driver}://{user}:{password}@{host}/{database}";

/// A [`ConfigStore`] specialized to hold URL templates per driver.
///
/// Templates contain `{placeholder}` tokens that are matched against profile
/// parameters at resolution time; a template is not validated at registration.
#[derive(Debug)]
pub struct DriverRegistry<S> {
    store: ConfigStore<S>,
}

impl<S: DurableStore> DriverRegistry<S> {
    /// Opens the registry over `store`.
    ///
    /// # Errors
    /// Propagates load failures from the backing store.
    pub fn open(store: S) -> Result<Self> {
        Ok(Self {
            store: ConfigStore::open(store)?,
        })
    }

    /// Registers `url_template` under `name`, replacing any existing template.
    ///
    /// # Errors
    /// Returns the persist error; the registry is unchanged then.
    pub fn set_driver(&mut self, name: &str, url_template: &str) -> Result<()> {
        self.store.set(name, Value::String(url_template.to_string()))?;
        debug!(driver = name, "driver template stored");
        Ok(())
    }

    /// Returns the URL template registered under `name`.
    ///
    /// # Errors
    /// Returns `DriverNotFound` if `name` is absent.
    pub fn get_driver(&self, name: &str) -> Result<String> {
        let value = self
            .store
            .get(name)
            .map_err(|_| DbStashError::driver_not_found(name))?;

        serde_json::from_value(value.clone()).map_err(|e| {
            DbStashError::serialization(format!("invalid driver template '{name}'"), e)
        })
    }

    /// Names of all registered drivers, in insertion order.
    pub fn drivers(&self) -> Vec<String> {
        self.store.keys()
    }

    /// Removes the template under `name`; absent names are a no-op.
    ///
    /// # Errors
    /// Returns the persist error; the registry is unchanged then.
    pub fn delete_driver(&mut self, name: &str) -> Result<()> {
        self.store.delete(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_set_get_round_trip() {
        let mut registry = DriverRegistry::open(MemoryStore::new()).unwrap();
        registry.set_driver("sqlite", "{driver}://{database}").unwrap();
        assert_eq!(
            registry.get_driver("sqlite").unwrap(),
            "{driver}://{database}"
        );
    }

    #[test]
    fn test_missing_driver_fails_with_driver_not_found() {
        let registry = DriverRegistry::open(MemoryStore::new()).unwrap();
        let err = registry.get_driver("pg").unwrap_err();
        assert!(matches!(err, DbStashError::DriverNotFound { .. }));
    }

    #[test]
    fn test_default_template_must_be_registered_explicitly() {
        let mut registry = DriverRegistry::open(MemoryStore::new()).unwrap();
        registry.set_driver("postgres", DEFAULT_URL_TEMPLATE).unwrap();
        assert_eq!(
            registry.get_driver("postgres").unwrap(),
            "{driver}://{user}:{password}@{host}/{database}"
        );
    }

    #[test]
    fn test_list_and_delete() {
        let mut registry = DriverRegistry::open(MemoryStore::new()).unwrap();
        registry.set_driver("a", "{driver}://a").unwrap();
        registry.set_driver("b", "{driver}://b").unwrap();
        assert_eq!(registry.drivers(), vec!["a", "b"]);

        registry.delete_driver("a").unwrap();
        assert_eq!(registry.drivers(), vec!["b"]);
    }
}
