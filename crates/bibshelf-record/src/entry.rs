//! BibEntry: one bibliographic record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Process-local handle assigned when an entry is built or parsed.
///
/// Never persisted and never part of the wire form. Two loads of the same
/// library produce different ids for the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A bibliographic record: entry type, citation key, and fields.
///
/// Entry types and field names are case-insensitive in BibTeX and are kept
/// lowercase here so that a record compares equal to itself after a
/// persistence round trip. Field values are stored verbatim.
///
/// Equality ignores [`EntryId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "EntryRepr", into = "EntryRepr")]
pub struct BibEntry {
    id: EntryId,
    entry_type: String,
    citation_key: String,
    fields: BTreeMap<String, String>,
}

impl BibEntry {
    pub fn new(entry_type: impl AsRef<str>, citation_key: impl Into<String>) -> Self {
        Self {
            id: EntryId::fresh(),
            entry_type: normalize_name(entry_type.as_ref()),
            citation_key: citation_key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn entry_type(&self) -> &str {
        &self.entry_type
    }

    pub fn set_entry_type(&mut self, entry_type: impl AsRef<str>) {
        self.entry_type = normalize_name(entry_type.as_ref());
    }

    pub fn citation_key(&self) -> &str {
        &self.citation_key
    }

    pub fn set_citation_key(&mut self, citation_key: impl Into<String>) {
        self.citation_key = citation_key.into();
    }

    /// Lookup one field value by (case-insensitive) name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(&normalize_name(name)).map(String::as_str)
    }

    /// Insert or replace a field. Returns the previous value if present.
    pub fn set_field(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(normalize_name(name.as_ref()), value.into())
    }

    pub fn remove_field(&mut self, name: &str) -> Option<String> {
        self.fields.remove(&normalize_name(name))
    }

    /// Iterate fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl PartialEq for BibEntry {
    fn eq(&self, other: &Self) -> bool {
        self.entry_type == other.entry_type
            && self.citation_key == other.citation_key
            && self.fields == other.fields
    }
}

impl Eq for BibEntry {}

fn normalize_name(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Wire shape: `{"entryType", "citationKey", "fields"}`. No id.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRepr {
    entry_type: String,
    #[serde(default)]
    citation_key: String,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

impl From<EntryRepr> for BibEntry {
    fn from(repr: EntryRepr) -> Self {
        let mut entry = BibEntry::new(repr.entry_type, repr.citation_key);
        for (name, value) in repr.fields {
            entry.set_field(name, value);
        }
        entry
    }
}

impl From<BibEntry> for EntryRepr {
    fn from(entry: BibEntry) -> Self {
        Self {
            entry_type: entry.entry_type,
            citation_key: entry.citation_key,
            fields: entry.fields,
        }
    }
}
