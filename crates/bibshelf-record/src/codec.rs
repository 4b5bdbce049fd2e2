//! Codec seam between in-memory entries and their persisted text.

use crate::bibtex;
use crate::entry::BibEntry;
use crate::jsonl;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Errors from parsing or formatting a library's text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("line {line}: parse error: {message}")]
    Parse { line: usize, message: String },

    #[error("corrupted substrate: {0}")]
    Corrupt(String),

    #[error("entry `{cite_key}` cannot be encoded: {reason}")]
    Unencodable { cite_key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialize(String),
}

impl CodecError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn unencodable(entry: &BibEntry, reason: impl Into<String>) -> Self {
        Self::Unencodable {
            cite_key: entry.citation_key().to_string(),
            reason: reason.into(),
        }
    }
}

/// A text serialization for a sequence of entries.
///
/// `format` must only produce text that `parse` accepts and that parses back
/// to entries equal to the input; records that cannot meet that are rejected
/// with [`CodecError::Unencodable`].
pub trait RecordCodec: Send + Sync {
    /// File extension (without the dot) for libraries in this format.
    fn extension(&self) -> &'static str;

    fn parse(&self, text: &str) -> Result<Vec<BibEntry>, CodecError>;

    fn format(&self, entries: &[BibEntry]) -> Result<String, CodecError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BibtexCodec;

impl RecordCodec for BibtexCodec {
    fn extension(&self) -> &'static str {
        "bib"
    }

    fn parse(&self, text: &str) -> Result<Vec<BibEntry>, CodecError> {
        bibtex::parse(text)
    }

    fn format(&self, entries: &[BibEntry]) -> Result<String, CodecError> {
        bibtex::format(entries)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlCodec;

impl RecordCodec for JsonlCodec {
    fn extension(&self) -> &'static str {
        "jsonl"
    }

    fn parse(&self, text: &str) -> Result<Vec<BibEntry>, CodecError> {
        jsonl::read_entries(text.as_bytes())
    }

    fn format(&self, entries: &[BibEntry]) -> Result<String, CodecError> {
        let mut buf = Vec::new();
        jsonl::write_entries(&mut buf, entries)?;
        String::from_utf8(buf).map_err(|e| CodecError::Serialize(e.to_string()))
    }
}

/// On-disk format of every library under one root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageFormat {
    #[default]
    Bibtex,
    Jsonl,
}

impl StorageFormat {
    pub fn codec(self) -> &'static dyn RecordCodec {
        match self {
            Self::Bibtex => &BibtexCodec,
            Self::Jsonl => &JsonlCodec,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bibtex => "bibtex",
            Self::Jsonl => "jsonl",
        }
    }
}

impl Display for StorageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bibtex" | "bib" => Ok(Self::Bibtex),
            "jsonl" => Ok(Self::Jsonl),
            other => Err(format!(
                "unknown storage format `{other}` (expected bibtex or jsonl)"
            )),
        }
    }
}

/// Check raw file bytes before handing them to a codec.
///
/// Both formats are UTF-8 text; NUL bytes only appear in torn or foreign
/// files.
pub fn decode_substrate(bytes: &[u8]) -> Result<&str, CodecError> {
    if bytes.contains(&0) {
        return Err(CodecError::Corrupt("contains NUL byte(s)".to_string()));
    }
    std::str::from_utf8(bytes)
        .map_err(|_| CodecError::Corrupt("contains non-UTF-8 byte sequence(s)".to_string()))
}
