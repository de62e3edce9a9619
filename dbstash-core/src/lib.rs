//! Layered configuration and credential store for database connections.
//!
//! This crate provides the pieces a data tool needs to remember how to reach
//! its databases: a nested key-value [`ConfigStore`](config::ConfigStore)
//! persisted to a JSON file on every mutation, a
//! [`CredentialVault`](vault::CredentialVault) for named user/password
//! entries, a [`DriverRegistry`](drivers::DriverRegistry) for connection-URL
//! templates, a [`ConnectionProfileStore`](profiles::ConnectionProfileStore)
//! for named profiles, and a [`ConnectionResolver`](resolver::ConnectionResolver)
//! that combines the three into a ready-to-use connection URL. [`Stash`] wires
//! all of them over one config directory.
//!
//! Opening a connection and executing queries is out of scope; the crate's
//! obligation ends at producing a correctly substituted URL.
//!
//! # Security notes
//! - Password obfuscation at rest is a reversible base64 encoding, NOT
//!   encryption. See [`obfuscate`].
//! - Resolved URLs carry cleartext passwords; everything this crate logs or
//!   displays goes through [`error::redact_database_url`].
//!
//! # Concurrency
//! Everything is synchronous and single-threaded. The backing files are
//! shared mutable state with no locking: concurrent writers are last-writer-
//! wins per file. Callers needing multi-process safety must serialize access
//! externally.

pub mod config;
pub mod document;
pub mod drivers;
pub mod error;
pub mod logging;
pub mod obfuscate;
pub mod profiles;
pub mod resolver;
pub mod stash;
pub mod storage;
pub mod vault;

// Re-export commonly used types
pub use config::ConfigStore;
pub use document::ConfigDocument;
pub use drivers::{DriverRegistry, DEFAULT_URL_TEMPLATE};
pub use error::{DbStashError, Result};
pub use logging::init_logging;
pub use profiles::{ConnectionProfile, ConnectionProfileStore};
pub use resolver::{ConnectionDescriptor, ConnectionResolver};
pub use stash::Stash;
pub use storage::{DurableStore, JsonFileStore, MemoryStore};
pub use vault::{CredentialVault, Login};
