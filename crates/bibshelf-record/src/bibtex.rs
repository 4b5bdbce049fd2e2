//! BibTeX codec.
//!
//! Reads the dialect reference managers write:
//! - `@type{key, name = value, ...}` with `{}` or `()` delimiters
//! - brace values (nested braces kept verbatim), quoted values, bare numbers
//! - `@string` macros and `#` concatenation, expanded on read
//! - `@comment` / `@preamble` blocks and `%` line comments, skipped
//!
//! Writes one canonical layout: fields in name order, brace-delimited values,
//! one blank line between entries.

use crate::codec::CodecError;
use crate::entry::BibEntry;
use std::collections::HashMap;

const RESERVED_TYPES: [&str; 3] = ["comment", "preamble", "string"];
const KEY_FORBIDDEN: &[u8] = b",{}()\"";

/// Parse BibTeX text into entries, in file order.
pub fn parse(text: &str) -> Result<Vec<BibEntry>, CodecError> {
    Parser::new(text).run()
}

/// Render entries as canonical BibTeX.
///
/// An empty slice renders as the empty string.
pub fn format(entries: &[BibEntry]) -> Result<String, CodecError> {
    let mut out = String::new();
    for (index, entry) in entries.iter().enumerate() {
        validate(entry)?;
        if index > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "@{}{{{},\n",
            entry.entry_type(),
            entry.citation_key()
        ));
        let body: Vec<String> = entry
            .fields()
            .map(|(name, value)| format!("  {name} = {{{value}}}"))
            .collect();
        if !body.is_empty() {
            out.push_str(&body.join(",\n"));
            out.push('\n');
        }
        out.push_str("}\n");
    }
    Ok(out)
}

fn validate(entry: &BibEntry) -> Result<(), CodecError> {
    let entry_type = entry.entry_type();
    if entry_type.is_empty() || !entry_type.bytes().all(is_type_byte) {
        return Err(CodecError::unencodable(
            entry,
            format!("entry type `{entry_type}` is not a plain identifier"),
        ));
    }
    if RESERVED_TYPES.contains(&entry_type) {
        return Err(CodecError::unencodable(
            entry,
            format!("entry type `{entry_type}` is reserved"),
        ));
    }

    let key = entry.citation_key();
    if key.contains('\0') {
        return Err(CodecError::unencodable(entry, "citation key contains a NUL byte"));
    }
    if key
        .bytes()
        .any(|b| b.is_ascii_whitespace() || KEY_FORBIDDEN.contains(&b))
    {
        return Err(CodecError::unencodable(
            entry,
            "citation key contains whitespace or one of , { } ( ) \"",
        ));
    }

    for (name, value) in entry.fields() {
        if name.is_empty() || !name.bytes().all(is_name_byte) {
            return Err(CodecError::unencodable(
                entry,
                format!("field name `{name}` is not a plain identifier"),
            ));
        }
        if value.contains('\0') {
            return Err(CodecError::unencodable(
                entry,
                format!("field `{name}` contains a NUL byte"),
            ));
        }
        if !braces_balanced(value) {
            return Err(CodecError::unencodable(
                entry,
                format!("field `{name}` has unbalanced braces"),
            ));
        }
    }
    Ok(())
}

fn braces_balanced(value: &str) -> bool {
    let mut depth: usize = 0;
    for b in value.bytes() {
        match b {
            b'{' => depth += 1,
            b'}' => match depth.checked_sub(1) {
                Some(next) => depth = next,
                None => return false,
            },
            _ => {}
        }
    }
    depth == 0
}

fn is_type_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':' | b'+')
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    macros: HashMap<String, String>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            macros: HashMap::new(),
        }
    }

    fn run(mut self) -> Result<Vec<BibEntry>, CodecError> {
        let mut entries = Vec::new();
        while self.seek_entry() {
            self.pos += 1;
            self.skip_ws();
            let kind = self.take_while(is_type_byte).to_ascii_lowercase();
            if kind.is_empty() {
                return Err(self.unexpected("entry type after `@`"));
            }
            self.skip_ws();
            let (open, close) = match self.peek() {
                Some(b'{') => (b'{', b'}'),
                Some(b'(') => (b'(', b')'),
                _ => return Err(self.unexpected(&format!("`{{` or `(` after `@{kind}`"))),
            };
            self.pos += 1;

            match kind.as_str() {
                "comment" | "preamble" => self.skip_block(&kind, open, close)?,
                "string" => self.string_definition(close)?,
                _ => entries.push(self.entry(&kind, close)?),
            }
        }
        Ok(entries)
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn line(&self) -> usize {
        let end = self.pos.min(self.src.len());
        self.src.as_bytes()[..end]
            .iter()
            .filter(|b| **b == b'\n')
            .count()
            + 1
    }

    fn error(&self, message: impl Into<String>) -> CodecError {
        CodecError::parse(self.line(), message)
    }

    fn unexpected(&self, what: &str) -> CodecError {
        match self.src.get(self.pos..).and_then(|rest| rest.chars().next()) {
            Some(found) => self.error(format!("expected {what}, found `{found}`")),
            None => self.error(format!("expected {what}, found end of input")),
        }
    }

    /// Advance to the next `@`, skipping free text and `%` comment lines.
    fn seek_entry(&mut self) -> bool {
        while let Some(b) = self.peek() {
            match b {
                b'@' => return true,
                b'%' => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => self.pos += 1,
            }
        }
        false
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let src = self.src;
        let start = self.pos;
        while matches!(self.peek(), Some(b) if pred(b)) {
            self.pos += 1;
        }
        &src[start..self.pos]
    }

    fn expect(&mut self, want: u8) -> Result<(), CodecError> {
        if self.peek() == Some(want) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{}`", want as char)))
        }
    }

    fn skip_block(&mut self, kind: &str, open: u8, close: u8) -> Result<(), CodecError> {
        let start_line = self.line();
        let mut depth = 1usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == open {
                depth += 1;
            } else if b == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            }
        }
        Err(CodecError::parse(
            start_line,
            format!("unterminated @{kind} block"),
        ))
    }

    fn string_definition(&mut self, close: u8) -> Result<(), CodecError> {
        self.skip_ws();
        let name = self.take_while(is_name_byte).to_ascii_lowercase();
        if name.is_empty() {
            return Err(self.unexpected("macro name in @string"));
        }
        self.skip_ws();
        self.expect(b'=')?;
        self.skip_ws();
        let value = self.value()?;
        self.skip_ws();
        self.expect(close)?;
        self.macros.insert(name, value);
        Ok(())
    }

    fn entry(&mut self, kind: &str, close: u8) -> Result<BibEntry, CodecError> {
        self.skip_ws();
        let key = self.citation_key(close)?;
        let mut entry = BibEntry::new(kind, key);

        self.skip_ws();
        match self.peek() {
            Some(b',') => self.pos += 1,
            Some(b) if b == close => {
                self.pos += 1;
                return Ok(entry);
            }
            _ => return Err(self.unexpected("`,` after citation key")),
        }

        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(entry);
            }

            let name = self.take_while(is_name_byte);
            if name.is_empty() {
                return Err(self.unexpected("field name"));
            }
            self.skip_ws();
            self.expect(b'=')?;
            self.skip_ws();
            let value = self.value()?;
            // Duplicate field names: last value wins.
            entry.set_field(name, value);

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b) if b == close => {
                    self.pos += 1;
                    return Ok(entry);
                }
                _ => {
                    return Err(self.unexpected(&format!(
                        "`,` or `{}` after field `{name}`",
                        close as char
                    )));
                }
            }
        }
    }

    fn citation_key(&mut self, close: u8) -> Result<String, CodecError> {
        let src = self.src;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b',' || b == close || b.is_ascii_whitespace() {
                break;
            }
            if KEY_FORBIDDEN.contains(&b) {
                return Err(self.unexpected("citation key character"));
            }
            self.pos += 1;
        }
        Ok(src[start..self.pos].to_string())
    }

    /// One value, with `#` concatenation.
    fn value(&mut self) -> Result<String, CodecError> {
        let mut out = self.value_part()?;
        loop {
            self.skip_ws();
            if self.peek() != Some(b'#') {
                return Ok(out);
            }
            self.pos += 1;
            self.skip_ws();
            out.push_str(&self.value_part()?);
        }
    }

    fn value_part(&mut self) -> Result<String, CodecError> {
        match self.peek() {
            Some(b'{') => {
                self.pos += 1;
                self.delimited(b'}')
            }
            Some(b'"') => {
                self.pos += 1;
                self.delimited(b'"')
            }
            Some(b) if is_name_byte(b) => {
                let word = self.take_while(is_name_byte);
                if word.bytes().all(|b| b.is_ascii_digit()) {
                    return Ok(word.to_string());
                }
                // Unknown macros (e.g. month abbreviations) are kept as text.
                Ok(self
                    .macros
                    .get(&word.to_ascii_lowercase())
                    .cloned()
                    .unwrap_or_else(|| word.to_string()))
            }
            _ => Err(self.unexpected("field value")),
        }
    }

    /// Read up to the matching `end`; the opening delimiter is already consumed.
    fn delimited(&mut self, end: u8) -> Result<String, CodecError> {
        let src = self.src;
        let start_line = self.line();
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'{' => depth += 1,
                b'}' if depth > 0 => depth -= 1,
                b'}' if end == b'}' => {
                    let value = src[start..self.pos].to_string();
                    self.pos += 1;
                    return Ok(value);
                }
                b'}' => return Err(self.error("unbalanced `}` in quoted value")),
                b'"' if end == b'"' && depth == 0 => {
                    let value = src[start..self.pos].to_string();
                    self.pos += 1;
                    return Ok(value);
                }
                _ => {}
            }
            self.pos += 1;
        }
        Err(CodecError::parse(start_line, "unterminated field value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_value_forms() {
        let text = r#"
% exported by hand
@String{acm = "ACM Press"}

@Article{knuth84,
  Author    = {Donald E. Knuth},
  title     = "Literate {P}rogramming",
  journal   = {The Computer Journal},
  year      = 1984,
  publisher = acm # { (reprint)},
  month     = may,
}
"#;
        let entries = parse(text).expect("bibtex should parse");
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.entry_type(), "article");
        assert_eq!(entry.citation_key(), "knuth84");
        assert_eq!(entry.field("author"), Some("Donald E. Knuth"));
        assert_eq!(entry.field("title"), Some("Literate {P}rogramming"));
        assert_eq!(entry.field("year"), Some("1984"));
        assert_eq!(entry.field("publisher"), Some("ACM Press (reprint)"));
        assert_eq!(entry.field("month"), Some("may"));
    }

    #[test]
    fn skips_comment_and_preamble_blocks() {
        let text = "@comment{jabref-meta: databaseType:bibtex;}\n\
                    @preamble{\"\\newcommand{\\noop}[1]{}\"}\n\
                    @misc(paren, note = {round delimiters})\n";
        let entries = parse(text).expect("bibtex should parse");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].citation_key(), "paren");
        assert_eq!(entries[0].field("note"), Some("round delimiters"));
    }

    #[test]
    fn keeps_duplicate_keys_in_file_order() {
        let text = "@book{dup, title = {One}}\n@book{dup, title = {Two}}\n";
        let entries = parse(text).expect("bibtex should parse");
        let titles: Vec<_> = entries.iter().filter_map(|e| e.field("title")).collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }

    #[test]
    fn duplicate_field_names_keep_last_value() {
        let entries = parse("@misc{k, note = {a}, NOTE = {b}}").expect("bibtex should parse");
        assert_eq!(entries[0].field("note"), Some("b"));
        assert_eq!(entries[0].field_count(), 1);
    }

    #[test]
    fn empty_input_has_no_entries() {
        assert_eq!(parse("").expect("empty parses"), Vec::new());
        assert_eq!(parse("\n  \n% nothing\n").expect("blank parses"), Vec::new());
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        let text = "@misc{ok,\n}\n\n@article{bad,\n  title = {unterminated\n";
        match parse(text) {
            Err(CodecError::Parse { line, message }) => {
                assert_eq!(line, 5);
                assert!(message.contains("unterminated"), "{message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }

        match parse("@article{k,\n  title {x}\n}") {
            Err(CodecError::Parse { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("expected `=`"), "{message}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_entry_without_delimiter() {
        assert!(matches!(
            parse("@article knuth84"),
            Err(CodecError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn format_renders_canonical_layout() {
        let entries = vec![
            BibEntry::new("article", "knuth84")
                .with_field("title", "Literate Programming")
                .with_field("author", "Donald E. Knuth"),
            BibEntry::new("misc", "empty"),
        ];
        let text = format(&entries).expect("entries should format");
        insta::assert_snapshot!(text, @r"
@article{knuth84,
  author = {Donald E. Knuth},
  title = {Literate Programming}
}

@misc{empty,
}
");
        assert_eq!(parse(&text).expect("formatted text parses"), entries);
    }

    #[test]
    fn format_of_nothing_is_empty() {
        assert_eq!(format(&[]).expect("empty formats"), "");
    }

    #[test]
    fn format_rejects_values_that_would_not_parse_back() {
        let unbalanced = BibEntry::new("misc", "k").with_field("title", "a } b {");
        assert!(matches!(
            format(&[unbalanced]),
            Err(CodecError::Unencodable { cite_key, .. }) if cite_key == "k"
        ));

        let spaced_key = BibEntry::new("misc", "two words");
        assert!(matches!(
            format(&[spaced_key]),
            Err(CodecError::Unencodable { .. })
        ));

        let reserved = BibEntry::new("comment", "k");
        assert!(matches!(
            format(&[reserved]),
            Err(CodecError::Unencodable { reason, .. }) if reason.contains("reserved")
        ));
    }

    #[test]
    fn format_rejects_nul_bytes() {
        let nul_value = BibEntry::new("misc", "k").with_field("note", "a\0b");
        assert!(matches!(
            format(&[nul_value]),
            Err(CodecError::Unencodable { reason, .. }) if reason.contains("note")
        ));

        let nul_key = BibEntry::new("misc", "k\0");
        assert!(matches!(
            format(&[nul_key]),
            Err(CodecError::Unencodable { .. })
        ));
    }

    #[test]
    fn empty_citation_key_round_trips() {
        let entries = vec![BibEntry::new("misc", "").with_field("note", "anonymous")];
        let text = format(&entries).expect("entries should format");
        assert_eq!(parse(&text).expect("formatted text parses"), entries);
    }
}
