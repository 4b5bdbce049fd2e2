//! The library service: one instance per root directory.
//!
//! Built once at startup and shared by reference (or `Arc`) with every caller.
//! Registry operations live in `registry`, entry operations in `entries`.

use crate::config::ServiceConfig;
use crate::error::LibraryError;
use crate::guard::LockArena;
use crate::store::LibraryStore;
use bibshelf_record::StorageFormat;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug)]
pub struct LibraryService {
    store: LibraryStore,
    locks: LockArena,
}

impl LibraryService {
    /// Open the root named by `config`, creating the directory if needed.
    pub fn open(config: &ServiceConfig) -> Result<Self, LibraryError> {
        fs::create_dir_all(&config.root).map_err(|e| LibraryError::io(&config.root, e))?;
        info!(
            root = %config.root.display(),
            format = %config.format,
            "opened library root"
        );
        Ok(Self::new(LibraryStore::new(&config.root, config.format)))
    }

    /// Wrap an existing store without touching the filesystem.
    pub fn new(store: LibraryStore) -> Self {
        Self {
            store,
            locks: LockArena::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn format(&self) -> StorageFormat {
        self.store.format()
    }

    pub fn store(&self) -> &LibraryStore {
        &self.store
    }

    pub(crate) fn locks(&self) -> &LockArena {
        &self.locks
    }
}
