//! Connection resolution: profile + driver template + credential → URL.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::drivers::DriverRegistry;
use crate::error::{redact_database_url, DbStashError};
use crate::profiles::ConnectionProfileStore;
use crate::storage::DurableStore;
use crate::vault::CredentialVault;
use crate::Result;

// The pattern is a literal; compilation cannot fail at runtime.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(\w+)\}").expect("placeholder pattern is a valid regex")
});

/// A resolved connection: the driver name and the fully substituted URL.
///
/// The URL may contain a cleartext password. `Display` redacts it; use
/// [`url`](Self::url) only where the cleartext is actually needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub driver: String,
    pub url: String,
}

impl ConnectionDescriptor {
    /// The URL with any password masked, safe for logs and display.
    pub fn redacted(&self) -> String {
        redact_database_url(&self.url)
    }
}

impl std::fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.driver, self.redacted())
    }
}

/// Composes the vault, driver registry, and profile store to materialize
/// connection URLs.
///
/// Resolution never caches: every call re-reads current store state, so
/// updated credentials, templates, or profiles take effect on the next call.
#[derive(Debug)]
pub struct ConnectionResolver<'a, S> {
    vault: &'a CredentialVault<S>,
    drivers: &'a DriverRegistry<S>,
    profiles: &'a ConnectionProfileStore<S>,
}

impl<'a, S: DurableStore> ConnectionResolver<'a, S> {
    /// Creates a resolver over the three stores.
    pub fn new(
        vault: &'a CredentialVault<S>,
        drivers: &'a DriverRegistry<S>,
        profiles: &'a ConnectionProfileStore<S>,
    ) -> Self {
        Self {
            vault,
            drivers,
            profiles,
        }
    }

    /// Materializes a connection descriptor for the named profile.
    ///
    /// Looks up the profile, its driver template, and (when the profile
    /// references one) its credential, then substitutes every `{placeholder}`
    /// in the template. Substitution values the template does not use are
    /// ignored, tolerating driver-specific parameter subsets.
    ///
    /// # Errors
    /// * `ProfileNotFound` / `DriverNotFound` / `CredentialNotFound` when the
    ///   named entity or a reference it carries is absent
    /// * `UnresolvedPlaceholder` when the template names a token the profile
    ///   (plus credential) does not supply
    pub fn resolve(&self, profile_name: &str) -> Result<ConnectionDescriptor> {
        let profile = self.profiles.get_profile(profile_name)?;
        let template = self.drivers.get_driver(&profile.driver)?;

        let mut substitutions = BTreeMap::new();
        substitutions.insert("driver".to_string(), profile.driver.clone());

        let fields = [
            ("host", &profile.host),
            ("database", &profile.database),
            ("schema", &profile.schema),
            ("warehouse", &profile.warehouse),
            ("role", &profile.role),
        ];
        for (token, value) in fields {
            if let Some(value) = value {
                substitutions.insert(token.to_string(), value.clone());
            }
        }
        for (token, value) in &profile.extra {
            substitutions.insert(token.clone(), value.clone());
        }

        // Credentials splice in last so a vault entry wins over any free-form
        // user/password parameter.
        if let Some(login) = &profile.login {
            let login = self.vault.get_login(login)?;
            substitutions.insert("user".to_string(), login.user);
            substitutions.insert("password".to_string(), login.password);
        }

        for caps in PLACEHOLDER.captures_iter(&template) {
            let token = &caps[1];
            if !substitutions.contains_key(token) {
                return Err(DbStashError::unresolved_placeholder(token, &profile.driver));
            }
        }

        let url = PLACEHOLDER
            .replace_all(&template, |caps: &regex::Captures<'_>| {
                substitutions.get(&caps[1]).cloned().unwrap_or_default()
            })
            .into_owned();

        debug!(profile = profile_name, driver = %profile.driver,
               url = %redact_database_url(&url), "profile resolved");

        Ok(ConnectionDescriptor {
            driver: profile.driver,
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::ConnectionProfile;
    use crate::storage::MemoryStore;

    struct Fixture {
        vault: CredentialVault<MemoryStore>,
        drivers: DriverRegistry<MemoryStore>,
        profiles: ConnectionProfileStore<MemoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                vault: CredentialVault::open(MemoryStore::new(), true).unwrap(),
                drivers: DriverRegistry::open(MemoryStore::new()).unwrap(),
                profiles: ConnectionProfileStore::open(MemoryStore::new()).unwrap(),
            }
        }

        fn resolver(&self) -> ConnectionResolver<'_, MemoryStore> {
            ConnectionResolver::new(&self.vault, &self.drivers, &self.profiles)
        }
    }

    #[test]
    fn test_resolve_without_credentials() {
        let mut fx = Fixture::new();
        fx.drivers.set_driver("sqlite", "{driver}://{database}").unwrap();
        fx.profiles
            .set_profile("mem", &ConnectionProfile::new("sqlite").with_database(""))
            .unwrap();

        let descriptor = fx.resolver().resolve("mem").unwrap();
        assert_eq!(descriptor.driver, "sqlite");
        assert_eq!(descriptor.url, "sqlite://");
    }

    #[test]
    fn test_resolve_with_credentials() {
        let mut fx = Fixture::new();
        fx.vault.set_login("svc", "u", "p").unwrap();
        fx.drivers
            .set_driver("pg", "{driver}://{user}:{password}@{host}/{database}")
            .unwrap();
        fx.profiles
            .set_profile(
                "db1",
                &ConnectionProfile::new("pg")
                    .with_login("svc")
                    .with_host("h")
                    .with_database("d"),
            )
            .unwrap();

        let descriptor = fx.resolver().resolve("db1").unwrap();
        assert_eq!(descriptor.url, "pg://u:p@h/d");
    }

    #[test]
    fn test_extra_params_substitute_into_template() {
        let mut fx = Fixture::new();
        fx.drivers
            .set_driver("odbc", "{driver}://{host}?account={account}")
            .unwrap();
        fx.profiles
            .set_profile(
                "acct",
                &ConnectionProfile::new("odbc")
                    .with_host("h")
                    .with_param("account", "ac-123"),
            )
            .unwrap();

        let descriptor = fx.resolver().resolve("acct").unwrap();
        assert_eq!(descriptor.url, "odbc://h?account=ac-123");
    }

    #[test]
    fn test_unused_profile_fields_are_ignored() {
        let mut fx = Fixture::new();
        fx.drivers.set_driver("sqlite", "{driver}://{database}").unwrap();
        fx.profiles
            .set_profile(
                "mem",
                &ConnectionProfile::new("sqlite")
                    .with_database("file.db")
                    .with_host("ignored")
                    .with_role("also-ignored"),
            )
            .unwrap();

        assert_eq!(fx.resolver().resolve("mem").unwrap().url, "sqlite://file.db");
    }

    #[test]
    fn test_missing_placeholder_is_an_error_not_a_malformed_url() {
        let mut fx = Fixture::new();
        fx.drivers.set_driver("pg", "{driver}://{host}/{database}").unwrap();
        fx.profiles
            .set_profile("db1", &ConnectionProfile::new("pg").with_host("h"))
            .unwrap();

        let err = fx.resolver().resolve("db1").unwrap_err();
        match err {
            DbStashError::UnresolvedPlaceholder {
                placeholder,
                driver,
            } => {
                assert_eq!(placeholder, "database");
                assert_eq!(driver, "pg");
            }
            other => panic!("expected UnresolvedPlaceholder, got {other}"),
        }
    }

    #[test]
    fn test_missing_references_fail_with_distinct_kinds() {
        let mut fx = Fixture::new();

        let err = fx.resolver().resolve("nope").unwrap_err();
        assert!(matches!(err, DbStashError::ProfileNotFound { .. }));

        fx.profiles
            .set_profile("db1", &ConnectionProfile::new("pg"))
            .unwrap();
        let err = fx.resolver().resolve("db1").unwrap_err();
        assert!(matches!(err, DbStashError::DriverNotFound { .. }));

        fx.drivers.set_driver("pg", "{driver}://{host}").unwrap();
        fx.profiles
            .set_profile(
                "db1",
                &ConnectionProfile::new("pg").with_login("ghost").with_host("h"),
            )
            .unwrap();
        let err = fx.resolver().resolve("db1").unwrap_err();
        assert!(matches!(err, DbStashError::CredentialNotFound { .. }));
    }

    #[test]
    fn test_resolution_sees_updates_without_invalidation() {
        let mut fx = Fixture::new();
        fx.drivers.set_driver("sqlite", "{driver}://{database}").unwrap();
        fx.profiles
            .set_profile("mem", &ConnectionProfile::new("sqlite").with_database("a.db"))
            .unwrap();
        assert_eq!(fx.resolver().resolve("mem").unwrap().url, "sqlite://a.db");

        fx.profiles
            .set_profile("mem", &ConnectionProfile::new("sqlite").with_database("b.db"))
            .unwrap();
        assert_eq!(fx.resolver().resolve("mem").unwrap().url, "sqlite://b.db");
    }

    #[test]
    fn test_descriptor_display_redacts_password() {
        let descriptor = ConnectionDescriptor {
            driver: "pg".to_string(),
            url: "pg://u:secret@h/d".to_string(),
        };

        let shown = descriptor.to_string();
        assert!(!shown.contains("secret"));
        assert!(shown.contains("****"));
    }
}
