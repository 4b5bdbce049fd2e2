use crate::support::{fail, print_json};
use bibshelf_store::LibraryService;
use bibshelf_transport::dispatch_json;
use serde_json::{Value, json};

pub fn run(service: &LibraryService, action: String, payload: String, json_output: bool) {
    let action_trimmed = action.trim();
    if action_trimmed.is_empty() {
        fail("--action is required");
    }

    let payload_value: Value = serde_json::from_str(&payload)
        .unwrap_or_else(|err| fail(format!("failed to parse --payload JSON: {err}")));

    let request = json!({
        "action": action_trimmed,
        "payload": payload_value,
    });
    let request_json = serde_json::to_string(&request)
        .unwrap_or_else(|err| fail(format!("failed to serialize dispatch request: {err}")));

    let response_json = dispatch_json(service, &request_json);
    let response: Value = serde_json::from_str(&response_json)
        .unwrap_or_else(|err| fail(format!("failed to parse dispatch response: {err}")));

    if json_output {
        print_json(&response);
        return;
    }

    let result = response
        .get("result")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let status = response.get("status").and_then(Value::as_u64).unwrap_or(0);
    println!("bibshelf dispatch");
    println!("  Action: {action_trimmed}");
    println!("  Result: {result}");
    println!("  Status: {status}");
    if let Some(diagnostic) = response.get("diagnostic").and_then(Value::as_str) {
        println!("  Diagnostic: {diagnostic}");
    }
    if let Some(payload) = response.get("payload") {
        println!("  Payload: {payload}");
    }
}
