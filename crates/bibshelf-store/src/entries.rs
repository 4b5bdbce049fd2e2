//! Entry operations on one named library.
//!
//! Citation keys are not unique within a library. Every key-based operation
//! acts on the **first** entry, in persisted order, whose key matches.

use crate::error::LibraryError;
use crate::service::LibraryService;
use bibshelf_record::{BibEntry, EntryId};
use std::collections::BTreeMap;
use tracing::info;

/// First entry (in persisted order) carrying `cite_key`.
fn first_match(entries: &[BibEntry], cite_key: &str) -> Option<EntryId> {
    entries
        .iter()
        .find(|entry| entry.citation_key() == cite_key)
        .map(BibEntry::id)
}

impl LibraryService {
    /// All entries of `library`, in persisted order.
    pub fn list_entries(&self, library: &str) -> Result<Vec<BibEntry>, LibraryError> {
        self.read_library(library, |entries| entries)
    }

    /// The first entry whose citation key equals `cite_key`, if any.
    ///
    /// Later entries sharing the key are not reachable through this call.
    pub fn find_by_cite_key(
        &self,
        library: &str,
        cite_key: &str,
    ) -> Result<Option<BibEntry>, LibraryError> {
        self.read_library(library, |entries| {
            entries
                .into_iter()
                .find(|entry| entry.citation_key() == cite_key)
        })
    }

    /// Append `entry` to the end of `library`. Duplicate keys are allowed.
    pub fn add_entry(&self, library: &str, entry: BibEntry) -> Result<(), LibraryError> {
        let cite_key = entry.citation_key().to_string();
        self.mutate_library(library, |entries| {
            entries.push(entry);
            Ok(((), true))
        })?;
        info!(library, cite_key = %cite_key, "added entry");
        Ok(())
    }

    /// Replace the first entry matching `cite_key` with `entry`, in place.
    ///
    /// Fails with [`LibraryError::EntryNotFound`] when no entry matches; the
    /// library is left untouched in that case.
    pub fn update_entry(
        &self,
        library: &str,
        cite_key: &str,
        entry: BibEntry,
    ) -> Result<(), LibraryError> {
        self.mutate_library(library, |entries| {
            let target = first_match(entries, cite_key).ok_or_else(|| {
                LibraryError::EntryNotFound {
                    library: library.to_string(),
                    cite_key: cite_key.to_string(),
                }
            })?;
            if let Some(slot) = entries.iter_mut().find(|e| e.id() == target) {
                *slot = entry;
            }
            Ok(((), true))
        })?;
        info!(library, cite_key, "updated entry");
        Ok(())
    }

    /// Remove the first entry matching `cite_key`.
    ///
    /// Returns `false` when no entry matched; nothing is written then.
    pub fn delete_by_cite_key(&self, library: &str, cite_key: &str) -> Result<bool, LibraryError> {
        let removed = self.mutate_library(library, |entries| {
            let Some(target) = first_match(entries, cite_key) else {
                return Ok((false, false));
            };
            entries.retain(|entry| entry.id() != target);
            Ok((true, true))
        })?;
        if removed {
            info!(library, cite_key, "deleted entry");
        }
        Ok(removed)
    }

    /// Entries of every library, keyed by library name.
    ///
    /// Libraries deleted between listing and loading are skipped.
    pub fn list_all_entries(&self) -> Result<BTreeMap<String, Vec<BibEntry>>, LibraryError> {
        let mut all = BTreeMap::new();
        for name in self.list_names()? {
            match self.list_entries(&name) {
                Ok(entries) => {
                    all.insert(name, entries);
                }
                Err(LibraryError::LibraryNotFound(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(all)
    }
}
