use crate::cli::{EntryCommands, EntryInput};
use crate::support::{entry_line, fail, or_exit, parse_entry_or_exit, print_json};
use bibshelf_record::bibtex;
use bibshelf_store::LibraryService;
use serde_json::json;

pub fn run(service: &LibraryService, command: EntryCommands) {
    match command {
        EntryCommands::List { library, json } => run_list(service, library, json),

        EntryCommands::Get {
            library,
            cite_key,
            json,
        } => run_get(service, library, cite_key, json),

        EntryCommands::Add {
            library,
            input,
            json,
        } => run_add(service, library, input, json),

        EntryCommands::Update {
            library,
            cite_key,
            input,
            json,
        } => run_update(service, library, cite_key, input, json),

        EntryCommands::Delete {
            library,
            cite_key,
            json,
        } => run_delete(service, library, cite_key, json),
    }
}

fn run_list(service: &LibraryService, library: String, json_output: bool) {
    let entries = or_exit(service.list_entries(&library));

    if json_output {
        print_json(&json!({
            "action": "entry.list",
            "library": library,
            "count": entries.len(),
            "entries": entries,
        }));
    } else {
        println!(
            "bibshelf entry list\n  Library: {library}\n  Count: {}",
            entries.len()
        );
        for entry in &entries {
            println!("  - {}", entry_line(entry));
        }
    }
}

fn run_get(service: &LibraryService, library: String, cite_key: String, json_output: bool) {
    let Some(entry) = or_exit(service.find_by_cite_key(&library, &cite_key)) else {
        fail(format!(
            "no entry with citation key `{cite_key}` in library {library}"
        ));
    };

    if json_output {
        print_json(&json!({
            "action": "entry.get",
            "library": library,
            "entry": entry,
        }));
    } else {
        // BibTeX when the entry can be written as BibTeX; JSONL roots may
        // hold entries that cannot.
        match bibtex::format(std::slice::from_ref(&entry)) {
            Ok(text) => print!("{text}"),
            Err(_) => {
                println!("bibshelf entry get\n  Library: {library}");
                println!("  - {}", entry_line(&entry));
                for (name, value) in entry.fields() {
                    println!("    {name}: {value:?}");
                }
            }
        }
    }
}

fn run_add(service: &LibraryService, library: String, input: EntryInput, json_output: bool) {
    let entry = parse_entry_or_exit(&input);
    let cite_key = entry.citation_key().to_string();
    or_exit(service.add_entry(&library, entry));

    if json_output {
        print_json(&json!({
            "action": "entry.add",
            "library": library,
            "citationKey": cite_key,
        }));
    } else {
        println!("bibshelf entry add\n  Library: {library}\n  Citation key: {cite_key}");
    }
}

fn run_update(
    service: &LibraryService,
    library: String,
    cite_key: String,
    input: EntryInput,
    json_output: bool,
) {
    let entry = parse_entry_or_exit(&input);
    let new_key = entry.citation_key().to_string();
    or_exit(service.update_entry(&library, &cite_key, entry));

    if json_output {
        print_json(&json!({
            "action": "entry.update",
            "library": library,
            "citationKey": cite_key,
            "newCitationKey": new_key,
        }));
    } else {
        println!(
            "bibshelf entry update\n  Library: {library}\n  Citation key: {cite_key} -> {new_key}"
        );
    }
}

fn run_delete(service: &LibraryService, library: String, cite_key: String, json_output: bool) {
    let deleted = or_exit(service.delete_by_cite_key(&library, &cite_key));

    if json_output {
        print_json(&json!({
            "action": "entry.delete",
            "library": library,
            "citationKey": cite_key,
            "deleted": deleted,
        }));
    } else {
        let outcome = if deleted {
            "yes"
        } else {
            "no (no entry with that citation key)"
        };
        println!(
            "bibshelf entry delete\n  Library: {library}\n  Citation key: {cite_key}\n  Deleted: {outcome}"
        );
    }
}
