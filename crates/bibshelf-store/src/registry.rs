//! Library registry: which names exist, creation, and deletion.
//!
//! A library name is also its file stem, so names are restricted to a
//! portable character set that cannot escape the root directory.

use crate::error::LibraryError;
use crate::service::LibraryService;
use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

pub const MAX_LIBRARY_NAME_LEN: usize = 128;

static LIBRARY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._ -]*$").expect("library name pattern is valid")
});

/// Check that `name` can be used as a library file stem.
pub fn validate_library_name(name: &str) -> Result<(), LibraryError> {
    let invalid = |reason: &str| LibraryError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_LIBRARY_NAME_LEN {
        return Err(invalid("name is longer than 128 bytes"));
    }
    if !LIBRARY_NAME.is_match(name) {
        return Err(invalid(
            "use letters, digits, `_`, `-`, `.` and spaces, not starting with `.` or a space",
        ));
    }
    if name.ends_with(['.', ' ']) {
        return Err(invalid("name must not end with `.` or a space"));
    }
    Ok(())
}

impl LibraryService {
    /// Names of all persisted libraries, sorted.
    ///
    /// Takes no lock: a create or delete racing with this call may or may not
    /// be reflected.
    pub fn list_names(&self) -> Result<Vec<String>, LibraryError> {
        let mut names = self.store().list_stems()?;
        names.retain(|name| validate_library_name(name).is_ok());
        Ok(names)
    }

    /// Whether a library named `name` is persisted. Invalid names never exist.
    pub fn exists(&self, name: &str) -> bool {
        validate_library_name(name).is_ok() && self.store().exists(name)
    }

    /// Create an empty library.
    ///
    /// Fails with [`LibraryError::LibraryExists`] if the name is taken. The
    /// empty file is written atomically, so `exists` never sees a partial one.
    pub fn create(&self, name: &str) -> Result<(), LibraryError> {
        validate_library_name(name)?;
        self.locks().with_library(name, || {
            if self.store().exists(name) {
                return Err(LibraryError::LibraryExists(name.to_string()));
            }
            self.store().save(name, &[])?;
            info!(library = name, "created library");
            Ok(())
        })
    }

    /// Delete a library and its file.
    ///
    /// Returns `false` when there was nothing to delete.
    pub fn delete(&self, name: &str) -> Result<bool, LibraryError> {
        validate_library_name(name)?;
        self.locks().with_library(name, || {
            let removed = self.store().delete_file(name)?;
            if removed {
                info!(library = name, "deleted library");
            }
            Ok(removed)
        })
    }
}
