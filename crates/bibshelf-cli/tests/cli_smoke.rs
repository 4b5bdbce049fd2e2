use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn run_bibshelf<I, S>(root: &Path, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_bibshelf");
    Command::new(bin)
        .env_remove("BIBSHELF_CONFIG")
        .env_remove("RUST_LOG")
        .env("BIBSHELF_ROOT", root)
        .args(args)
        .output()
        .expect("bibshelf command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
        panic!(
            "stdout should be valid json: {err}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

const KNUTH: &str = "@book{knuth1984,\n  title = {The {TeX}book},\n  author = {Donald Knuth},\n  year = 1984\n}";

#[test]
fn library_create_list_delete_json() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();

    let created = run_bibshelf(root, ["library", "create", "refs", "--json"]);
    assert_success(&created);
    let payload = parse_json_stdout(&created);
    assert_eq!(payload["action"], "library.create");
    assert!(root.join("refs.bib").exists());

    let again = run_bibshelf(root, ["library", "create", "refs"]);
    assert_failure(&again);
    let stderr = String::from_utf8_lossy(&again.stderr);
    assert!(stderr.contains("error:"), "stderr: {stderr}");

    let listed = run_bibshelf(root, ["library", "list", "--json"]);
    assert_success(&listed);
    let payload = parse_json_stdout(&listed);
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["libraries"][0], "refs");

    let deleted = run_bibshelf(root, ["library", "delete", "refs", "--json"]);
    assert_success(&deleted);
    assert_eq!(parse_json_stdout(&deleted)["deleted"], true);
    assert!(!root.join("refs.bib").exists());

    let missing = run_bibshelf(root, ["library", "delete", "refs", "--json"]);
    assert_success(&missing);
    assert_eq!(parse_json_stdout(&missing)["deleted"], false);
}

#[test]
fn entry_lifecycle_with_bibtex_input() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    assert_success(&run_bibshelf(root, ["library", "create", "refs"]));

    let added = run_bibshelf(root, ["entry", "add", "refs", "--bibtex", KNUTH, "--json"]);
    assert_success(&added);
    assert_eq!(parse_json_stdout(&added)["citationKey"], "knuth1984");

    let got = run_bibshelf(root, ["entry", "get", "refs", "knuth1984", "--json"]);
    assert_success(&got);
    let payload = parse_json_stdout(&got);
    assert_eq!(payload["entry"]["entryType"], "book");
    assert_eq!(payload["entry"]["fields"]["title"], "The {TeX}book");
    assert_eq!(payload["entry"]["fields"]["year"], "1984");

    let updated = run_bibshelf(
        root,
        [
            "entry",
            "update",
            "refs",
            "knuth1984",
            "--json-entry",
            r#"{"entryType":"book","citationKey":"knuth1986","fields":{"title":"The TeXbook, 2nd"}}"#,
            "--json",
        ],
    );
    assert_success(&updated);
    assert_eq!(parse_json_stdout(&updated)["newCitationKey"], "knuth1986");

    let listed = run_bibshelf(root, ["entry", "list", "refs", "--json"]);
    assert_success(&listed);
    let payload = parse_json_stdout(&listed);
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["entries"][0]["citationKey"], "knuth1986");

    let stale = run_bibshelf(root, ["entry", "get", "refs", "knuth1984"]);
    assert_failure(&stale);

    let removed = run_bibshelf(root, ["entry", "delete", "refs", "knuth1986", "--json"]);
    assert_success(&removed);
    assert_eq!(parse_json_stdout(&removed)["deleted"], true);

    let noop = run_bibshelf(root, ["entry", "delete", "refs", "knuth1986", "--json"]);
    assert_success(&noop);
    assert_eq!(parse_json_stdout(&noop)["deleted"], false);

    let text = fs::read_to_string(root.join("refs.bib")).expect("library file");
    assert!(text.is_empty(), "library file should be empty: {text:?}");
}

#[test]
fn entry_get_text_output_renders_bibtex() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    assert_success(&run_bibshelf(root, ["library", "create", "refs"]));
    assert_success(&run_bibshelf(root, ["entry", "add", "refs", "--bibtex", KNUTH]));

    let got = run_bibshelf(root, ["entry", "get", "refs", "knuth1984"]);
    assert_success(&got);
    let stdout = String::from_utf8_lossy(&got.stdout);
    assert!(stdout.starts_with("@book{knuth1984,"), "stdout: {stdout}");
    assert!(stdout.contains("author = {Donald Knuth}"), "stdout: {stdout}");
}

#[test]
fn entry_get_text_output_handles_entries_bibtex_cannot_hold() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    let jsonl = ["--format", "jsonl"];
    assert_success(&run_bibshelf(
        root,
        jsonl.iter().copied().chain(["library", "create", "refs"]),
    ));
    assert_success(&run_bibshelf(
        root,
        jsonl.iter().copied().chain([
            "entry",
            "add",
            "refs",
            "--json-entry",
            r#"{"entryType":"misc","citationKey":"two words","fields":{"title":"Spaced"}}"#,
        ]),
    ));

    let got = run_bibshelf(
        root,
        jsonl.iter().copied().chain(["entry", "get", "refs", "two words"]),
    );
    assert_success(&got);
    let stdout = String::from_utf8_lossy(&got.stdout);
    assert!(stdout.contains("two words [misc] Spaced"), "stdout: {stdout}");
}

#[test]
fn entry_operations_on_missing_library_fail() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();

    let listed = run_bibshelf(root, ["entry", "list", "ghost"]);
    assert_failure(&listed);
    let stderr = String::from_utf8_lossy(&listed.stderr);
    assert!(stderr.contains("ghost"), "stderr: {stderr}");

    let added = run_bibshelf(root, ["entry", "add", "ghost", "--bibtex", KNUTH]);
    assert_failure(&added);
    assert!(!root.join("ghost.bib").exists());
}

#[test]
fn invalid_inputs_are_rejected() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();

    assert_failure(&run_bibshelf(root, ["library", "create", "../escape"]));
    assert!(!root.join("..").join("escape.bib").exists());

    assert_success(&run_bibshelf(root, ["library", "create", "refs"]));
    let two = format!("{KNUTH}\n{KNUTH}");
    assert_failure(&run_bibshelf(root, ["entry", "add", "refs", "--bibtex", &two]));
    assert_failure(&run_bibshelf(
        root,
        ["entry", "add", "refs", "--json-entry", "{not json"],
    ));
    // Exactly one of --bibtex / --json-entry.
    assert_failure(&run_bibshelf(root, ["entry", "add", "refs"]));
}

#[test]
fn all_groups_entries_by_library() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    assert_success(&run_bibshelf(root, ["library", "create", "a"]));
    assert_success(&run_bibshelf(root, ["library", "create", "b"]));
    assert_success(&run_bibshelf(root, ["entry", "add", "b", "--bibtex", KNUTH]));

    let all = run_bibshelf(root, ["all", "--json"]);
    assert_success(&all);
    let payload = parse_json_stdout(&all);
    assert_eq!(payload["libraryCount"], 2);
    assert_eq!(payload["count"], 1);
    assert_eq!(payload["libraries"]["a"], Value::Array(Vec::new()));
    assert_eq!(payload["libraries"]["b"][0]["citationKey"], "knuth1984");
}

#[test]
fn jsonl_format_flag_selects_file_extension() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();

    assert_success(&run_bibshelf(
        root,
        ["--format", "jsonl", "library", "create", "refs"],
    ));
    assert!(root.join("refs.jsonl").exists());
    assert!(!root.join("refs.bib").exists());

    // The bibtex view of the same root does not see jsonl libraries.
    let listed = run_bibshelf(root, ["library", "list", "--json"]);
    assert_success(&listed);
    assert_eq!(parse_json_stdout(&listed)["count"], 0);
}

#[test]
fn config_file_sets_root_and_format() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config_path = tmp.path().join("bibshelf.toml");
    fs::write(&config_path, "root = \"libs\"\nformat = \"jsonl\"\n").expect("write config");

    let bin = env!("CARGO_BIN_EXE_bibshelf");
    let output = Command::new(bin)
        .env_remove("BIBSHELF_ROOT")
        .env_remove("RUST_LOG")
        .env("BIBSHELF_CONFIG", &config_path)
        .args(["library", "create", "refs"])
        .output()
        .expect("bibshelf command should execute");
    assert_success(&output);
    assert!(tmp.path().join("libs").join("refs.jsonl").exists());
}

#[test]
fn dispatch_returns_transport_envelope() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();

    let created = run_bibshelf(
        root,
        [
            "dispatch",
            "--action",
            "library.create",
            "--payload",
            r#"{"library":"refs"}"#,
            "--json",
        ],
    );
    assert_success(&created);
    let payload = parse_json_stdout(&created);
    assert_eq!(payload["result"], "accepted");
    assert_eq!(payload["status"], 200);

    let conflict = run_bibshelf(
        root,
        [
            "dispatch",
            "--action",
            "library.create",
            "--payload",
            r#"{"library":"refs"}"#,
            "--json",
        ],
    );
    assert_success(&conflict);
    let payload = parse_json_stdout(&conflict);
    assert_eq!(payload["result"], "rejected");
    assert_eq!(payload["status"], 409);
    assert_eq!(payload["failureClass"], "conflict");

    let bad = run_bibshelf(root, ["dispatch", "--action", "entry.list", "--payload", "{"]);
    assert_failure(&bad);
}
