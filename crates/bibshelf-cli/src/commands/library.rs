use crate::cli::LibraryCommands;
use crate::support::{or_exit, print_json};
use bibshelf_store::LibraryService;
use serde_json::json;

pub fn run(service: &LibraryService, command: LibraryCommands) {
    match command {
        LibraryCommands::List { json } => run_list(service, json),
        LibraryCommands::Create { name, json } => run_create(service, name, json),
        LibraryCommands::Delete { name, json } => run_delete(service, name, json),
    }
}

fn run_list(service: &LibraryService, json_output: bool) {
    let names = or_exit(service.list_names());

    if json_output {
        print_json(&json!({
            "action": "library.list",
            "root": service.root().display().to_string(),
            "format": service.format().as_str(),
            "count": names.len(),
            "libraries": names,
        }));
    } else {
        println!(
            "bibshelf library list\n  Root: {}\n  Count: {}",
            service.root().display(),
            names.len()
        );
        for name in names {
            println!("  - {name}");
        }
    }
}

fn run_create(service: &LibraryService, name: String, json_output: bool) {
    or_exit(service.create(&name));
    let path = service.store().path_for(&name);

    if json_output {
        print_json(&json!({
            "action": "library.create",
            "library": name,
            "path": path.display().to_string(),
        }));
    } else {
        println!(
            "bibshelf library create\n  Library: {name}\n  Path: {}",
            path.display()
        );
    }
}

fn run_delete(service: &LibraryService, name: String, json_output: bool) {
    let deleted = or_exit(service.delete(&name));

    if json_output {
        print_json(&json!({
            "action": "library.delete",
            "library": name,
            "deleted": deleted,
        }));
    } else if deleted {
        println!("bibshelf library delete\n  Library: {name}\n  Deleted: yes");
    } else {
        println!(
            "bibshelf library delete\n  Library: {name}\n  Deleted: no (library does not exist)"
        );
    }
}
