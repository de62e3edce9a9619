//! Named credential storage.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ConfigStore;
use crate::error::DbStashError;
use crate::obfuscate;
use crate::storage::DurableStore;
use crate::Result;

/// A credential as seen by callers: always cleartext in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub user: String,
    pub password: String,
}

/// The persisted shape of a credential entry.
///
/// `obfuscated` is recorded per entry so a vault reads entries written under
/// either setting correctly.
#[derive(Debug, Serialize, Deserialize)]
struct StoredLogin {
    user: String,
    password: String,
    #[serde(default)]
    obfuscated: bool,
}

/// A [`ConfigStore`] specialized to hold named user/password entries.
///
/// When constructed with obfuscation on, passwords are base64-obfuscated at
/// the storage boundary. That is a reversible encoding, NOT encryption; see
/// [`crate::obfuscate`].
///
/// # Example
/// ```rust
/// use dbstash_core::storage::MemoryStore;
/// use dbstash_core::vault::CredentialVault;
///
/// let mut vault = CredentialVault::open(MemoryStore::new(), true)?;
/// vault.set_login("svc", "u", "p")?;
/// assert_eq!(vault.get_login("svc")?.password, "p");
/// # Ok::<(), dbstash_core::DbStashError>(())
/// ```
#[derive(Debug)]
pub struct CredentialVault<S> {
    store: ConfigStore<S>,
    obfuscate: bool,
}

impl<S: DurableStore> CredentialVault<S> {
    /// Opens the vault over `store`. `obfuscate` controls how new entries are
    /// written; existing entries are read according to their own marker.
    ///
    /// # Errors
    /// Propagates load failures from the backing store.
    pub fn open(store: S, obfuscate: bool) -> Result<Self> {
        Ok(Self {
            store: ConfigStore::open(store)?,
            obfuscate,
        })
    }

    /// Stores `{user, password}` under `name`, replacing any existing entry.
    ///
    /// # Errors
    /// Returns the persist error; the vault is unchanged then.
    pub fn set_login(&mut self, name: &str, user: &str, password: &str) -> Result<()> {
        let stored = StoredLogin {
            user: user.to_string(),
            password: if self.obfuscate {
                obfuscate::encode(password)
            } else {
                password.to_string()
            },
            obfuscated: self.obfuscate,
        };

        let value = serde_json::to_value(&stored)
            .map_err(|e| DbStashError::serialization("failed to encode login entry", e))?;
        self.store.set(name, value)?;
        debug!(login = name, "login stored");
        Ok(())
    }

    /// Returns the cleartext credential stored under `name`.
    ///
    /// # Errors
    /// Returns `CredentialNotFound` if `name` is absent, `Obfuscation` if a
    /// marked entry cannot be decoded.
    pub fn get_login(&self, name: &str) -> Result<Login> {
        let value = self
            .store
            .get(name)
            .map_err(|_| DbStashError::credential_not_found(name))?;

        let stored: StoredLogin = serde_json::from_value(value.clone())
            .map_err(|e| DbStashError::serialization(format!("invalid login entry '{name}'"), e))?;

        let password = if stored.obfuscated {
            obfuscate::decode(&stored.password)?
        } else {
            stored.password
        };

        Ok(Login {
            user: stored.user,
            password,
        })
    }

    /// Names of all stored logins, in insertion order.
    pub fn logins(&self) -> Vec<String> {
        self.store.keys()
    }

    /// Removes the entry under `name`; absent names are a no-op.
    ///
    /// # Errors
    /// Returns the persist error; the vault is unchanged then.
    pub fn delete_login(&mut self, name: &str) -> Result<()> {
        self.store.delete(name)
    }
}
