//! Durable storage for configuration documents.
//!
//! A [`DurableStore`] is a passive transfer surface: it loads and saves one
//! whole [`ConfigDocument`] and owns nothing. The JSON-file implementation is
//! what production callers use; [`MemoryStore`] backs tests and ephemeral
//! stores.
//!
//! The backing record is shared mutable state between processes. There is no
//! locking: two writers against the same file are last-writer-wins at the
//! granularity of a full-document save. Callers needing multi-process safety
//! must serialize access externally.

use std::cell::RefCell;
use std::fs;
use std::rc::Rc;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::ConfigDocument;
use crate::error::DbStashError;
use crate::Result;

/// Default dot-prefixed directory under the user's home.
pub const DEFAULT_DIR: &str = ".dbstash";

/// Loads and saves a whole configuration document to one durable record.
pub trait DurableStore {
    /// Loads the document; an absent backing record yields an empty document.
    fn load(&self) -> Result<ConfigDocument>;

    /// Overwrites the backing record with `doc`.
    ///
    /// The write must be atomic from a concurrent loader's perspective: a
    /// partial write never leaves a truncated record readable.
    fn save(&self, doc: &ConfigDocument) -> Result<()>;
}

/// A [`DurableStore`] backed by a single JSON file.
///
/// # Example
/// ```rust,no_run
/// use dbstash_core::storage::JsonFileStore;
///
/// let store = JsonFileStore::new("/tmp/dbstash-demo", "drivers")?;
/// # Ok::<(), dbstash_core::DbStashError>(())
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store for `<dir>/<name>.json`, creating `dir` if needed.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` if the directory cannot be created.
    pub fn new(dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| {
            DbStashError::storage_unavailable(dir, "failed to create config directory", e)
        })?;

        Ok(Self {
            path: dir.join(format!("{name}.json")),
        })
    }

    /// Creates a store for `~/.dbstash/<name>.json`.
    ///
    /// # Errors
    /// Returns `Configuration` if the home directory cannot be determined, or
    /// `StorageUnavailable` if the directory cannot be created.
    pub fn open_default(name: &str) -> Result<Self> {
        let home = std::env::home_dir().ok_or_else(|| {
            DbStashError::configuration("could not determine the user's home directory")
        })?;
        Self::new(home.join(DEFAULT_DIR), name)
    }

    /// The path of the backing record.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DurableStore for JsonFileStore {
    fn load(&self) -> Result<ConfigDocument> {
        if !self.path.is_file() {
            debug!(path = %self.path.display(), "no backing record, starting empty");
            return Ok(ConfigDocument::new());
        }

        let text = fs::read_to_string(&self.path).map_err(|e| {
            DbStashError::storage_unavailable(&self.path, "failed to read config file", e)
        })?;

        let doc: ConfigDocument = serde_json::from_str(&text).map_err(|e| {
            DbStashError::serialization(
                format!("invalid config document at {}", self.path.display()),
                e,
            )
        })?;

        debug!(path = %self.path.display(), "config file read");
        Ok(doc)
    }

    fn save(&self, doc: &ConfigDocument) -> Result<()> {
        let text = serde_json::to_string_pretty(doc)
            .map_err(|e| DbStashError::serialization("failed to encode config document", e))?;

        // Write to a temp sibling then rename so a concurrent loader never
        // observes a truncated record.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| {
            DbStashError::storage_unavailable(&tmp, "failed to write config file", e)
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            DbStashError::storage_unavailable(&self.path, "failed to replace config file", e)
        })?;

        debug!(path = %self.path.display(), "config file saved");
        Ok(())
    }
}

/// An in-memory [`DurableStore`] for tests and ephemeral stores.
///
/// Clones share the same record, so a retained handle observes saves made
/// through another.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    doc: Rc<RefCell<ConfigDocument>>,
}

impl MemoryStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn load(&self) -> Result<ConfigDocument> {
        Ok(self.doc.borrow().clone())
    }

    fn save(&self, doc: &ConfigDocument) -> Result<()> {
        *self.doc.borrow_mut() = doc.clone();
        Ok(())
    }
}
