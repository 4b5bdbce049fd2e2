//! JSONL codec: one JSON object per entry, one entry per line.

use crate::codec::CodecError;
use crate::entry::BibEntry;
use std::io::{BufRead, Write};

/// Read entries from a JSONL reader.
///
/// Blank lines and `#` comment lines are skipped.
pub fn read_entries(reader: impl BufRead) -> Result<Vec<BibEntry>, CodecError> {
    let mut entries = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CodecError::parse(line_no + 1, e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if trimmed.contains('\0') {
            return Err(CodecError::Corrupt(format!(
                "line {}: contains NUL byte(s)",
                line_no + 1
            )));
        }
        let entry: BibEntry = serde_json::from_str(trimmed)
            .map_err(|e| CodecError::parse(line_no + 1, e.to_string()))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Write entries to a JSONL writer.
pub fn write_entries(writer: &mut impl Write, entries: &[BibEntry]) -> Result<(), CodecError> {
    for entry in entries {
        let line =
            serde_json::to_string(entry).map_err(|e| CodecError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| CodecError::Serialize(e.to_string()))?;
    }
    Ok(())
}
