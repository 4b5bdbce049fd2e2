//! Error taxonomy for library operations.

use bibshelf_record::CodecError;
use serde::Serialize;
use std::path::Path;

/// Coarse failure class surfaced to dispatch layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Storage unreadable, unwritable, or corrupt.
    Io,
    /// Library (or entry, for updates) absent.
    NotFound,
    /// Library name already in use.
    Conflict,
    /// Request can never succeed as given (bad name, unencodable record).
    InvalidInput,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Io => "io",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::InvalidInput => "invalid_input",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    #[error("{path}: {source}")]
    Codec { path: String, source: CodecError },

    #[error("library not found: {0}")]
    LibraryNotFound(String),

    #[error("no entry with citation key `{cite_key}` in library {library}")]
    EntryNotFound { library: String, cite_key: String },

    #[error("library already exists: {0}")]
    LibraryExists(String),

    #[error("invalid library name `{name}`: {reason}")]
    InvalidName { name: String, reason: String },

    #[error(transparent)]
    InvalidRecord(CodecError),
}

impl LibraryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } | Self::Codec { .. } => ErrorKind::Io,
            Self::LibraryNotFound(_) | Self::EntryNotFound { .. } => ErrorKind::NotFound,
            Self::LibraryExists(_) => ErrorKind::Conflict,
            Self::InvalidName { .. } | Self::InvalidRecord(_) => ErrorKind::InvalidInput,
        }
    }

    pub(crate) fn io(path: &Path, err: impl ToString) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn codec(path: &Path, source: CodecError) -> Self {
        match source {
            CodecError::Unencodable { .. } => Self::InvalidRecord(source),
            source => Self::Codec {
                path: path.display().to_string(),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unencodable_records_are_invalid_input_not_io() {
        let err = LibraryError::codec(
            Path::new("refs.bib"),
            CodecError::Unencodable {
                cite_key: "k".to_string(),
                reason: "bad".to_string(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = LibraryError::codec(
            Path::new("refs.bib"),
            CodecError::Parse {
                line: 3,
                message: "expected `=`".to_string(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.to_string(), "refs.bib: line 3: parse error: expected `=`");
    }
}
