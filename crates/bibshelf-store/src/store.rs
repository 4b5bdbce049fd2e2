//! Library files: one codec-encoded file per library under a root directory.
//!
//! Writes go to a sibling temp file that is fsynced and renamed over the
//! target, so readers see either the old file or the new one, never a
//! truncated mix. Callers serialize access per library (see `guard`).

use crate::error::LibraryError;
use bibshelf_record::{BibEntry, StorageFormat, decode_substrate};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

static TMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct LibraryStore {
    root: PathBuf,
    format: StorageFormat,
}

impl LibraryStore {
    pub fn new(root: impl Into<PathBuf>, format: StorageFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> StorageFormat {
        self.format
    }

    /// `<root>/<name>.<ext>`
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root
            .join(format!("{name}.{}", self.format.codec().extension()))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// File stems of every library file under the root, sorted.
    ///
    /// Temp files and files of the other format are ignored.
    pub fn list_stems(&self) -> Result<Vec<String>, LibraryError> {
        let extension = self.format.codec().extension();
        let dir = fs::read_dir(&self.root).map_err(|e| LibraryError::io(&self.root, e))?;

        let mut names = Vec::new();
        for item in dir {
            let item = item.map_err(|e| LibraryError::io(&self.root, e))?;
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
                continue;
            }
            let is_file = item
                .file_type()
                .map_err(|e| LibraryError::io(&path, e))?
                .is_file();
            if !is_file {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read and parse one library.
    pub fn load(&self, name: &str) -> Result<Vec<BibEntry>, LibraryError> {
        let path = self.path_for(name);
        let bytes = fs::read(&path).map_err(|e| LibraryError::io(&path, e))?;
        let text = decode_substrate(&bytes).map_err(|e| LibraryError::codec(&path, e))?;
        let entries = self
            .format
            .codec()
            .parse(text)
            .map_err(|e| LibraryError::codec(&path, e))?;
        debug!(library = name, entries = entries.len(), "loaded library");
        Ok(entries)
    }

    /// Encode and atomically replace one library file.
    ///
    /// Encoding happens before any file is touched, so an unencodable record
    /// leaves the previous file intact.
    pub fn save(&self, name: &str, entries: &[BibEntry]) -> Result<(), LibraryError> {
        let path = self.path_for(name);
        let text = self
            .format
            .codec()
            .format(entries)
            .map_err(|e| LibraryError::codec(&path, e))?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| LibraryError::io(parent, e))?;
        }

        let tmp_path = tmp_write_path(&path);
        let write_result = (|| -> Result<(), LibraryError> {
            let file = File::create(&tmp_path).map_err(|e| LibraryError::io(&tmp_path, e))?;
            let mut writer = BufWriter::new(file);
            writer
                .write_all(text.as_bytes())
                .map_err(|e| LibraryError::io(&tmp_path, e))?;
            writer.flush().map_err(|e| LibraryError::io(&tmp_path, e))?;
            let file = writer
                .into_inner()
                .map_err(|e| LibraryError::io(&tmp_path, e))?;
            file.sync_all().map_err(|e| LibraryError::io(&tmp_path, e))?;
            Ok(())
        })();

        if let Err(error) = write_result {
            remove_tmp(&tmp_path);
            return Err(error);
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            remove_tmp(&tmp_path);
            LibraryError::Io {
                path: path.display().to_string(),
                message: format!("rename from {}: {e}", tmp_path.display()),
            }
        })?;

        sync_parent_dir(&path)?;
        debug!(library = name, entries = entries.len(), "saved library");
        Ok(())
    }

    /// Remove one library file. Returns `false` if it was already absent.
    pub fn delete_file(&self, name: &str) -> Result<bool, LibraryError> {
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                sync_parent_dir(&path)?;
                Ok(true)
            }
            Err(err) if err.kind() == IoErrorKind::NotFound => Ok(false),
            Err(err) => Err(LibraryError::io(&path, err)),
        }
    }
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = TMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{unique}.{seq}", std::process::id()));
    PathBuf::from(tmp)
}

fn remove_tmp(tmp_path: &Path) {
    if let Err(err) = fs::remove_file(tmp_path)
        && err.kind() != IoErrorKind::NotFound
    {
        warn!(path = %tmp_path.display(), error = %err, "could not remove temp file");
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<(), LibraryError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent).map_err(|e| LibraryError::io(parent, e))?;
        dir.sync_all().map_err(|e| LibraryError::io(parent, e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<(), LibraryError> {
    Ok(())
}
