//! # bibshelf-record
//!
//! Record layer for bibliographic libraries.
//!
//! This crate provides:
//! - `BibEntry` (entry type, citation key, fields) and its JSON wire shape
//! - `RecordCodec` implementations for BibTeX and JSONL text
//! - `StorageFormat` to pick a codec from configuration
//!
//! It does no file I/O. Persistence, locking, and library naming live in
//! `bibshelf-store`.
//!
//! ## Data model
//!
//! ```text
//! <name>.bib / <name>.jsonl (on disk, one library per file)
//!     ↕  RecordCodec::parse / RecordCodec::format
//! Vec<BibEntry> (persisted order, duplicates allowed)
//! ```

pub mod bibtex;
pub mod codec;
pub mod entry;
pub mod jsonl;

pub use codec::{
    BibtexCodec, CodecError, JsonlCodec, RecordCodec, StorageFormat, decode_substrate,
};
pub use entry::{BibEntry, EntryId};
