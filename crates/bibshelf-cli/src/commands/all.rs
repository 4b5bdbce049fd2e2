use crate::support::{entry_line, or_exit, print_json};
use bibshelf_store::LibraryService;
use serde_json::json;

pub fn run(service: &LibraryService, json_output: bool) {
    let all = or_exit(service.list_all_entries());
    let count: usize = all.values().map(Vec::len).sum();

    if json_output {
        print_json(&json!({
            "action": "entry.all",
            "libraryCount": all.len(),
            "count": count,
            "libraries": all,
        }));
        return;
    }

    println!(
        "bibshelf all\n  Libraries: {}\n  Count: {count}",
        all.len()
    );
    for (library, entries) in &all {
        println!("  {library} ({})", entries.len());
        for entry in entries {
            println!("    - {}", entry_line(entry));
        }
    }
}
