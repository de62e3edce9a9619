//! The top-level façade wiring the three stores over one config directory.

use std::path::{Path, PathBuf};

use crate::drivers::DriverRegistry;
use crate::profiles::ConnectionProfileStore;
use crate::resolver::{ConnectionDescriptor, ConnectionResolver};
use crate::storage::{JsonFileStore, DEFAULT_DIR};
use crate::vault::CredentialVault;
use crate::Result;

const LOGINS_FILE: &str = "logins";
const DRIVERS_FILE: &str = "drivers";
const PROFILES_FILE: &str = "profiles";

/// The credential vault, driver registry, and profile store over a shared
/// directory, with resolution on top.
///
/// Each store owns one JSON file in the directory (`logins.json`,
/// `drivers.json`, `profiles.json`). The default directory is `~/.dbstash`.
///
/// # Example
/// ```rust,no_run
/// use dbstash_core::Stash;
///
/// let mut stash = Stash::open_default(true)?;
/// stash.drivers_mut().set_driver("sqlite", "{driver}://{database}")?;
/// # Ok::<(), dbstash_core::DbStashError>(())
/// ```
#[derive(Debug)]
pub struct Stash {
    vault: CredentialVault<JsonFileStore>,
    drivers: DriverRegistry<JsonFileStore>,
    profiles: ConnectionProfileStore<JsonFileStore>,
}

impl Stash {
    /// Opens a stash rooted at `dir`, creating the directory if needed.
    /// `obfuscate` controls how new credential entries are written at rest.
    ///
    /// # Errors
    /// Propagates storage and serialization failures from the three stores.
    pub fn open(dir: impl AsRef<Path>, obfuscate: bool) -> Result<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            vault: CredentialVault::open(JsonFileStore::new(dir, LOGINS_FILE)?, obfuscate)?,
            drivers: DriverRegistry::open(JsonFileStore::new(dir, DRIVERS_FILE)?)?,
            profiles: ConnectionProfileStore::open(JsonFileStore::new(dir, PROFILES_FILE)?)?,
        })
    }

    /// Opens a stash rooted at `~/.dbstash`.
    ///
    /// # Errors
    /// Returns `Configuration` if the home directory cannot be determined,
    /// plus anything [`open`](Self::open) returns.
    pub fn open_default(obfuscate: bool) -> Result<Self> {
        let home = std::env::home_dir().ok_or_else(|| {
            crate::error::DbStashError::configuration(
                "could not determine the user's home directory",
            )
        })?;
        Self::open(home.join(DEFAULT_DIR), obfuscate)
    }

    /// The credential vault.
    pub fn vault(&self) -> &CredentialVault<JsonFileStore> {
        &self.vault
    }

    /// The credential vault, for mutation.
    pub fn vault_mut(&mut self) -> &mut CredentialVault<JsonFileStore> {
        &mut self.vault
    }

    /// The driver registry.
    pub fn drivers(&self) -> &DriverRegistry<JsonFileStore> {
        &self.drivers
    }

    /// The driver registry, for mutation.
    pub fn drivers_mut(&mut self) -> &mut DriverRegistry<JsonFileStore> {
        &mut self.drivers
    }

    /// The connection profile store.
    pub fn profiles(&self) -> &ConnectionProfileStore<JsonFileStore> {
        &self.profiles
    }

    /// The connection profile store, for mutation.
    pub fn profiles_mut(&mut self) -> &mut ConnectionProfileStore<JsonFileStore> {
        &mut self.profiles
    }

    /// Resolves the named profile against current store state.
    ///
    /// # Errors
    /// See [`ConnectionResolver::resolve`].
    pub fn resolve(&self, profile_name: &str) -> Result<ConnectionDescriptor> {
        ConnectionResolver::new(&self.vault, &self.drivers, &self.profiles).resolve(profile_name)
    }

    /// The default stash directory, when a home directory exists.
    pub fn default_dir() -> Option<PathBuf> {
        std::env::home_dir().map(|home| home.join(DEFAULT_DIR))
    }
}
