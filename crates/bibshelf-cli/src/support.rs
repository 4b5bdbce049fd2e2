use crate::cli::EntryInput;
use bibshelf_record::{BibEntry, StorageFormat, bibtex};
use bibshelf_store::{LibraryError, LibraryService, ServiceConfig};
use serde_json::Value;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the stderr subscriber. `RUST_LOG` overrides the `warn` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

pub fn fail(message: impl Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn or_exit<T>(result: Result<T, LibraryError>) -> T {
    result.unwrap_or_else(|e| fail(e))
}

/// Config file first, then `--root` / `--format` on top.
pub fn resolve_config_or_exit(
    config_path: Option<&Path>,
    root: Option<PathBuf>,
    format: Option<StorageFormat>,
) -> ServiceConfig {
    let mut config = match config_path {
        Some(path) => ServiceConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => ServiceConfig::default(),
    };
    if let Some(root) = root {
        config.root = root;
    }
    if let Some(format) = format {
        config.format = format;
    }
    config
}

pub fn open_service_or_exit(
    config_path: Option<&Path>,
    root: Option<PathBuf>,
    format: Option<StorageFormat>,
) -> LibraryService {
    let config = resolve_config_or_exit(config_path, root, format);
    LibraryService::open(&config).unwrap_or_else(|e| {
        fail(format!(
            "failed to open library root {}: {e}",
            config.root.display()
        ))
    })
}

pub fn parse_entry_or_exit(input: &EntryInput) -> BibEntry {
    if let Some(text) = &input.bibtex {
        let mut entries =
            bibtex::parse(text).unwrap_or_else(|e| fail(format!("invalid --bibtex: {e}")));
        if entries.len() != 1 {
            fail(format!(
                "--bibtex must hold exactly one entry (found {})",
                entries.len()
            ));
        }
        return entries.remove(0);
    }
    let Some(text) = &input.json_entry else {
        fail("one of --bibtex or --json-entry is required");
    };
    serde_json::from_str(text).unwrap_or_else(|e| fail(format!("invalid --json-entry: {e}")))
}

pub fn print_json(payload: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}

/// One-line summary used by the text listings.
pub fn entry_line(entry: &BibEntry) -> String {
    match entry.field("title") {
        Some(title) => format!("{} [{}] {}", entry.citation_key(), entry.entry_type(), title),
        None => format!("{} [{}]", entry.citation_key(), entry.entry_type()),
    }
}
