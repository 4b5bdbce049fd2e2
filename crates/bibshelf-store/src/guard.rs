//! Lock-scoped load/mutate/save cycles, one exclusive lock per library name.
//!
//! A library's unit of durability is "rewrite the whole file", so readers take
//! the same exclusive lock as writers. Locks are created on first use and
//! never removed; names that were never touched cost nothing.

use crate::error::LibraryError;
use crate::registry::validate_library_name;
use crate::service::LibraryService;
use bibshelf_record::BibEntry;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct LockArena {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `name`, created on first request.
    pub fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    /// Run `f` while holding `name`'s lock.
    pub fn with_library<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(name);
        let _guard = lock.lock();
        f()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

impl LibraryService {
    /// Execute one lock-scoped mutation against an existing library.
    ///
    /// The mutator returns `(value, changed)` where:
    /// - `value` is returned to the caller
    /// - `changed=true` persists the library before the lock is released.
    pub(crate) fn mutate_library<T, F>(&self, name: &str, mutator: F) -> Result<T, LibraryError>
    where
        F: FnOnce(&mut Vec<BibEntry>) -> Result<(T, bool), LibraryError>,
    {
        validate_library_name(name)?;
        self.locks().with_library(name, || {
            let mut entries = self.load_existing(name)?;
            let (value, changed) = mutator(&mut entries)?;
            if changed {
                self.store().save(name, &entries)?;
            }
            Ok(value)
        })
    }

    /// Load an existing library under its lock and hand the entries to `reader`.
    pub(crate) fn read_library<T, F>(&self, name: &str, reader: F) -> Result<T, LibraryError>
    where
        F: FnOnce(Vec<BibEntry>) -> T,
    {
        validate_library_name(name)?;
        self.locks()
            .with_library(name, || self.load_existing(name).map(reader))
    }

    fn load_existing(&self, name: &str) -> Result<Vec<BibEntry>, LibraryError> {
        if !self.store().exists(name) {
            return Err(LibraryError::LibraryNotFound(name.to_string()));
        }
        self.store().load(name)
    }
}
