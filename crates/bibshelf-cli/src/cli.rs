use bibshelf_record::StorageFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "bibshelf",
    about = "bibshelf: named BibTeX libraries with atomic, lock-scoped persistence",
    version
)]
pub struct Cli {
    /// Path to a TOML config file (`root`, `format`)
    #[arg(long, global = true, env = "BIBSHELF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Library root directory (overrides the config file)
    #[arg(long, global = true, env = "BIBSHELF_ROOT")]
    pub root: Option<PathBuf>,

    /// Storage format: bibtex or jsonl (overrides the config file)
    #[arg(long, global = true)]
    pub format: Option<StorageFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create, list, and delete libraries
    Library {
        #[command(subcommand)]
        command: LibraryCommands,
    },

    /// Read and modify entries inside one library
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },

    /// List the entries of every library
    All {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Dispatch one action through the JSON transport surface
    Dispatch {
        /// Action name, e.g. `library.create` or `entry.get`
        #[arg(long)]
        action: String,

        /// JSON payload for the action
        #[arg(long, default_value = "{}")]
        payload: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum LibraryCommands {
    /// List library names
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create an empty library
    Create {
        /// Library name (also the file stem)
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a library and its file
    Delete {
        /// Library name
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum EntryCommands {
    /// List entries in persisted order
    List {
        /// Library name
        library: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the first entry with a citation key
    Get {
        /// Library name
        library: String,

        /// Citation key
        cite_key: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Append an entry
    Add {
        /// Library name
        library: String,

        #[command(flatten)]
        input: EntryInput,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace the first entry with a citation key
    Update {
        /// Library name
        library: String,

        /// Citation key of the entry to replace
        cite_key: String,

        #[command(flatten)]
        input: EntryInput,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the first entry with a citation key
    Delete {
        /// Library name
        library: String,

        /// Citation key
        cite_key: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// One entry, given either as BibTeX or as wire JSON.
#[derive(Args, Clone, Debug)]
#[group(required = true, multiple = false)]
pub struct EntryInput {
    /// Entry as BibTeX text (exactly one entry)
    #[arg(long)]
    pub bibtex: Option<String>,

    /// Entry as JSON: {"entryType", "citationKey", "fields"}
    #[arg(long = "json-entry")]
    pub json_entry: Option<String>,
}
