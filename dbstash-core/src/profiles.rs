//! Named connection profiles: driver reference, connection parameters, and an
//! optional credential reference.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigStore;
use crate::error::DbStashError;
use crate::storage::DurableStore;
use crate::Result;

/// A named bundle of driver reference plus connection parameters.
///
/// The well-known fields cover the common placeholder set; anything
/// driver-specific goes into `extra`. `driver` and `login` are references into
/// the driver registry and the credential vault; neither is checked at
/// registration time, only at resolution.
///
/// # Example
/// ```rust
/// use dbstash_core::profiles::ConnectionProfile;
///
/// let profile = ConnectionProfile::new("postgres")
///     .with_login("svc")
///     .with_host("db.internal")
///     .with_database("core")
///     .with_param("sslmode", "require");
/// assert_eq!(profile.driver, "postgres");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    /// Driver identifier, resolved against the driver registry
    pub driver: String,
    /// Optional credential reference, resolved against the vault
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Driver-dependent free-form parameters
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ConnectionProfile {
    /// Creates a profile referencing `driver`, with no other parameters.
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            login: None,
            host: None,
            database: None,
            schema: None,
            warehouse: None,
            role: None,
            extra: BTreeMap::new(),
        }
    }

    /// Builder method to set the credential reference.
    #[must_use]
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    /// Builder method to set the host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Builder method to set the database name.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Builder method to set the schema.
    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Builder method to set the warehouse.
    #[must_use]
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        self.warehouse = Some(warehouse.into());
        self
    }

    /// Builder method to set the role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Builder method to add a driver-dependent parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A [`ConfigStore`] specialized to hold named connection profiles.
#[derive(Debug)]
pub struct ConnectionProfileStore<S> {
    store: ConfigStore<S>,
}

impl<S: DurableStore> ConnectionProfileStore<S> {
    /// Opens the profile store over `store`.
    ///
    /// # Errors
    /// Propagates load failures from the backing store.
    pub fn open(store: S) -> Result<Self> {
        Ok(Self {
            store: ConfigStore::open(store)?,
        })
    }

    /// Stores `profile` under `name`, replacing any existing profile.
    ///
    /// # Errors
    /// Returns the persist error; the store is unchanged then.
    pub fn set_profile(&mut self, name: &str, profile: &ConnectionProfile) -> Result<()> {
        let value = serde_json::to_value(profile)
            .map_err(|e| DbStashError::serialization("failed to encode profile", e))?;
        self.store.set(name, value)?;
        debug!(profile = name, driver = %profile.driver, "profile stored");
        Ok(())
    }

    /// Returns the profile stored under `name`.
    ///
    /// # Errors
    /// Returns `ProfileNotFound` if `name` is absent.
    pub fn get_profile(&self, name: &str) -> Result<ConnectionProfile> {
        let value = self
            .store
            .get(name)
            .map_err(|_| DbStashError::profile_not_found(name))?;

        serde_json::from_value(value.clone())
            .map_err(|e| DbStashError::serialization(format!("invalid profile '{name}'"), e))
    }

    /// Names of all stored profiles, in insertion order.
    pub fn profiles(&self) -> Vec<String> {
        self.store.keys()
    }

    /// Removes the profile under `name`; absent names are a no-op.
    ///
    /// # Errors
    /// Returns the persist error; the store is unchanged then.
    pub fn delete_profile(&mut self, name: &str) -> Result<()> {
        self.store.delete(name)
    }
}
