//! # bibshelf-store
//!
//! Persistence and entry management for named bibliographic libraries.
//!
//! This crate provides:
//! - `LibraryStore`: one file per library, atomic temp-file-and-rename saves
//! - `LockArena`: one exclusive lock per library name
//! - `LibraryService`: registry operations (list/exists/create/delete) and
//!   entry operations (list/find/add/update/delete by citation key)
//! - `ServiceConfig`: root directory and storage format
//!
//! ## Control flow
//!
//! ```text
//! caller → LibraryService::<op>(library, ..)
//!     → LockArena lock(library)
//!     → LibraryStore::load → mutate in memory → LibraryStore::save
//!     → unlock → Ok(value) | Err(LibraryError)
//! ```

pub mod config;
pub mod entries;
pub mod error;
pub mod guard;
pub mod registry;
pub mod service;
pub mod store;

pub use config::{ConfigError, DEFAULT_ROOT, ServiceConfig};
pub use error::{ErrorKind, LibraryError};
pub use guard::LockArena;
pub use registry::{MAX_LIBRARY_NAME_LEN, validate_library_name};
pub use service::LibraryService;
pub use store::LibraryStore;

pub use bibshelf_record::{BibEntry, EntryId, StorageFormat};
