//! JSON dispatch over library operations.
//!
//! One request is `{"action": "...", "payload": {...}}`; one response is a
//! `DispatchResponse` envelope whose `status` follows HTTP conventions so a
//! server front end can pass it through unchanged.

use bibshelf_record::BibEntry;
use bibshelf_store::{ErrorKind, LibraryError, LibraryService};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

pub const DISPATCH_SCHEMA: u32 = 1;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_NOT_FOUND: u16 = 404;
pub const STATUS_CONFLICT: u16 = 409;
pub const STATUS_GONE: u16 = 410;
pub const STATUS_INTERNAL: u16 = 500;

const RESULT_ACCEPTED: &str = "accepted";
const RESULT_REJECTED: &str = "rejected";

const FAILURE_IO: &str = "io_failure";
const FAILURE_NOT_FOUND: &str = "not_found";
const FAILURE_CONFLICT: &str = "conflict";
const FAILURE_INVALID_INPUT: &str = "invalid_input";
const FAILURE_GONE: &str = "gone";
const FAILURE_INVALID_PAYLOAD: &str = "invalid_payload";
const FAILURE_INVALID_REQUEST: &str = "invalid_request";
const FAILURE_UNKNOWN_ACTION: &str = "unknown_action";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    ServerStatus,
    LibraryList,
    LibraryCreate,
    LibraryDelete,
    EntryList,
    EntryAll,
    EntryGet,
    EntryAdd,
    EntryUpdate,
    EntryDelete,
}

const ACTIONS: [(Action, &str); 10] = [
    (Action::ServerStatus, "server.status"),
    (Action::LibraryList, "library.list"),
    (Action::LibraryCreate, "library.create"),
    (Action::LibraryDelete, "library.delete"),
    (Action::EntryList, "entry.list"),
    (Action::EntryAll, "entry.all"),
    (Action::EntryGet, "entry.get"),
    (Action::EntryAdd, "entry.add"),
    (Action::EntryUpdate, "entry.update"),
    (Action::EntryDelete, "entry.delete"),
];

impl Action {
    fn from_action(value: &str) -> Option<Self> {
        let action = value.trim();
        ACTIONS
            .iter()
            .find(|(_, name)| *name == action)
            .map(|(id, _)| *id)
    }
}

/// Names of every supported action, in registry order.
pub fn action_names() -> Vec<&'static str> {
    ACTIONS.iter().map(|(_, name)| *name).collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchRequest {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResponse {
    pub schema: u32,
    pub action: String,
    pub result: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl DispatchResponse {
    fn accepted(action: &str, payload: Value) -> Self {
        Self {
            schema: DISPATCH_SCHEMA,
            action: action.to_string(),
            result: RESULT_ACCEPTED.to_string(),
            status: STATUS_OK,
            failure_class: None,
            diagnostic: None,
            payload: Some(payload),
        }
    }

    fn rejected(
        action: &str,
        status: u16,
        failure_class: &str,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            schema: DISPATCH_SCHEMA,
            action: action.to_string(),
            result: RESULT_REJECTED.to_string(),
            status,
            failure_class: Some(failure_class.to_string()),
            diagnostic: Some(diagnostic.into()),
            payload: None,
        }
    }

    fn from_error(action: &str, err: &LibraryError) -> Self {
        let (status, failure_class) = match err.kind() {
            ErrorKind::Io => (STATUS_INTERNAL, FAILURE_IO),
            ErrorKind::NotFound => (STATUS_NOT_FOUND, FAILURE_NOT_FOUND),
            ErrorKind::Conflict => (STATUS_CONFLICT, FAILURE_CONFLICT),
            ErrorKind::InvalidInput => (STATUS_BAD_REQUEST, FAILURE_INVALID_INPUT),
        };
        Self::rejected(action, status, failure_class, err.to_string())
    }

    pub fn is_accepted(&self) -> bool {
        self.result == RESULT_ACCEPTED
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct LibraryPayload {
    library: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EntryKeyPayload {
    library: String,
    citation_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EntryAddPayload {
    library: String,
    entry: BibEntry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EntryUpdatePayload {
    library: String,
    citation_key: String,
    entry: BibEntry,
}

/// Dispatch one parsed request against `service`.
pub fn dispatch(service: &LibraryService, request: DispatchRequest) -> DispatchResponse {
    let action = request.action.trim().to_string();
    let Some(action_id) = Action::from_action(&action) else {
        return DispatchResponse::rejected(
            &action,
            STATUS_BAD_REQUEST,
            FAILURE_UNKNOWN_ACTION,
            format!(
                "unsupported action: {action} (expected one of: {})",
                action_names().join(", ")
            ),
        );
    };

    let response = dispatch_action(service, &action, action_id, request.payload)
        .unwrap_or_else(|rejected| rejected);
    debug!(
        action = %action,
        status = response.status,
        result = %response.result,
        "dispatched"
    );
    response
}

/// Dispatch one JSON-encoded request and return the JSON-encoded response.
pub fn dispatch_json(service: &LibraryService, request_json: &str) -> String {
    let response = match serde_json::from_str::<DispatchRequest>(request_json) {
        Ok(request) => dispatch(service, request),
        Err(source) => DispatchResponse::rejected(
            "dispatch",
            STATUS_BAD_REQUEST,
            FAILURE_INVALID_REQUEST,
            format!("invalid dispatch request: {source}"),
        ),
    };
    serde_json::to_string(&response).expect("dispatch response should serialize")
}

fn parse_payload<T: DeserializeOwned>(action: &str, payload: Value) -> Result<T, DispatchResponse> {
    serde_json::from_value(payload).map_err(|source| {
        DispatchResponse::rejected(
            action,
            STATUS_BAD_REQUEST,
            FAILURE_INVALID_PAYLOAD,
            format!("invalid {action} payload: {source}"),
        )
    })
}

fn dispatch_action(
    service: &LibraryService,
    action: &str,
    action_id: Action,
    payload: Value,
) -> Result<DispatchResponse, DispatchResponse> {
    let fail = |err: LibraryError| DispatchResponse::from_error(action, &err);

    let response = match action_id {
        Action::ServerStatus => {
            let names = service.list_names().map_err(fail)?;
            DispatchResponse::accepted(
                action,
                json!({
                    "running": true,
                    "format": service.format().as_str(),
                    "libraryCount": names.len(),
                }),
            )
        }

        Action::LibraryList => {
            let names = service.list_names().map_err(fail)?;
            DispatchResponse::accepted(action, json!({ "libraries": names }))
        }

        Action::LibraryCreate => {
            let request: LibraryPayload = parse_payload(action, payload)?;
            service.create(&request.library).map_err(fail)?;
            DispatchResponse::accepted(
                action,
                json!({
                    "library": request.library,
                    "message": format!("Library with name {} created.", request.library),
                }),
            )
        }

        Action::LibraryDelete => {
            let request: LibraryPayload = parse_payload(action, payload)?;
            if !service.delete(&request.library).map_err(fail)? {
                return Err(DispatchResponse::rejected(
                    action,
                    STATUS_GONE,
                    FAILURE_GONE,
                    format!("library does not exist: {}", request.library),
                ));
            }
            DispatchResponse::accepted(
                action,
                json!({ "library": request.library, "deleted": true }),
            )
        }

        Action::EntryList => {
            let request: LibraryPayload = parse_payload(action, payload)?;
            let entries = service.list_entries(&request.library).map_err(fail)?;
            DispatchResponse::accepted(
                action,
                json!({
                    "library": request.library,
                    "count": entries.len(),
                    "entries": entries,
                }),
            )
        }

        Action::EntryAll => {
            let all = service.list_all_entries().map_err(fail)?;
            let count: usize = all.values().map(Vec::len).sum();
            DispatchResponse::accepted(action, json!({ "count": count, "libraries": all }))
        }

        Action::EntryGet => {
            let request: EntryKeyPayload = parse_payload(action, payload)?;
            let found = service
                .find_by_cite_key(&request.library, &request.citation_key)
                .map_err(fail)?;
            match found {
                Some(entry) => DispatchResponse::accepted(
                    action,
                    json!({ "library": request.library, "entry": entry }),
                ),
                None => DispatchResponse::rejected(
                    action,
                    STATUS_NOT_FOUND,
                    FAILURE_NOT_FOUND,
                    format!(
                        "no entry with citation key `{}` in library {}",
                        request.citation_key, request.library
                    ),
                ),
            }
        }

        Action::EntryAdd => {
            let request: EntryAddPayload = parse_payload(action, payload)?;
            let citation_key = request.entry.citation_key().to_string();
            service
                .add_entry(&request.library, request.entry)
                .map_err(fail)?;
            DispatchResponse::accepted(
                action,
                json!({ "library": request.library, "citationKey": citation_key }),
            )
        }

        Action::EntryUpdate => {
            let request: EntryUpdatePayload = parse_payload(action, payload)?;
            service
                .update_entry(&request.library, &request.citation_key, request.entry)
                .map_err(fail)?;
            DispatchResponse::accepted(
                action,
                json!({ "library": request.library, "citationKey": request.citation_key }),
            )
        }

        Action::EntryDelete => {
            let request: EntryKeyPayload = parse_payload(action, payload)?;
            let deleted = service
                .delete_by_cite_key(&request.library, &request.citation_key)
                .map_err(fail)?;
            let message = if deleted {
                "Entry deleted."
            } else {
                "No entry with the specified citation key."
            };
            DispatchResponse::accepted(
                action,
                json!({
                    "library": request.library,
                    "citationKey": request.citation_key,
                    "deleted": deleted,
                    "message": message,
                }),
            )
        }
    };
    Ok(response)
}
