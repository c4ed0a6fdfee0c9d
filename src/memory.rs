// In-process stand-in for the remote contents endpoint.
//
// `MemoryTransport` keeps files in a sorted map and answers requests the way
// the hosted store does: directories exist only while some file lives under
// them, overwrites and deletes require the current version token, a stale
// token yields `409` and a missing one `422`. Faults can be queued per
// method and path, and every request is recorded for inspection.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use crate::error::Result;
use crate::transport::{normalize_path as normalize, ApiResponse, Transport};

/// A request as seen by the memory store.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// Version token attached to a mutation, if any.
    pub fn sha(&self) -> Option<&str> {
        self.body.as_ref()?.get("sha")?.as_str()
    }
}

#[derive(Debug, Clone)]
struct StoredFile {
    content: Vec<u8>,
    sha: String,
}

#[derive(Debug)]
struct Fault {
    method: Method,
    path: String,
    status: StatusCode,
    message: String,
}

#[derive(Debug, Default)]
struct State {
    files: BTreeMap<String, StoredFile>,
    revision: u64,
    faults: VecDeque<Fault>,
    requests: Vec<RecordedRequest>,
}

impl State {
    fn next_sha(&mut self, tag: &str) -> String {
        self.revision += 1;
        format!("{:08x}{:032x}", fnv1a(tag.as_bytes()), self.revision)
    }

    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.files.keys().any(|k| k.starts_with(&format!("{path}/")))
    }
}

#[derive(Debug, Default)]
pub struct MemoryTransport {
    state: Mutex<State>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock only happens inside a failing test.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Place a file directly, bypassing version checks. Returns its token.
    pub fn insert(&self, path: &str, content: impl Into<Vec<u8>>) -> String {
        let path = normalize(path);
        let mut state = self.lock();
        let sha = state.next_sha(&path);
        state.files.insert(
            path,
            StoredFile {
                content: content.into(),
                sha: sha.clone(),
            },
        );
        sha
    }

    /// Current content of a file, if present.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .files
            .get(&normalize(path))
            .map(|f| f.content.clone())
    }

    pub fn version(&self, path: &str) -> Option<String> {
        self.lock().files.get(&normalize(path)).map(|f| f.sha.clone())
    }

    /// All stored file paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.lock().files.keys().cloned().collect()
    }

    /// Answer the next `method` request on `path` with `status` instead of
    /// serving it.
    pub fn fail_next(&self, method: Method, path: &str, status: StatusCode, message: &str) {
        self.lock().faults.push_back(Fault {
            method,
            path: normalize(path),
            status,
            message: message.to_string(),
        });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }
}

impl Transport for MemoryTransport {
    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let path = normalize(path);
        let mut state = self.lock();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            body: body.cloned(),
        });

        let queued = state
            .faults
            .iter()
            .position(|f| f.method == method && f.path == path);
        if let Some(fault) = queued.and_then(|pos| state.faults.remove(pos)) {
            return Ok(reply(fault.status, json!({ "message": fault.message })));
        }

        let body = body.cloned().unwrap_or(Value::Null);
        let response = match method {
            Method::GET => get(&state, &path),
            Method::PUT => put(&mut state, &path, &body),
            Method::DELETE => delete(&mut state, &path, &body),
            _ => reply(
                StatusCode::METHOD_NOT_ALLOWED,
                json!({ "message": "Method Not Allowed" }),
            ),
        };
        Ok(response)
    }
}

fn get(state: &State, path: &str) -> ApiResponse {
    if let Some(file) = state.files.get(path) {
        return reply(StatusCode::OK, file_json(path, file));
    }
    if !state.is_dir(path) {
        return not_found();
    }

    let prefix = if path.is_empty() {
        String::new()
    } else {
        format!("{path}/")
    };
    let mut children: BTreeMap<&str, Value> = BTreeMap::new();
    for (key, file) in state.files.range(prefix.clone()..) {
        let Some(rest) = key.strip_prefix(&prefix) else {
            break;
        };
        match rest.split_once('/') {
            None => {
                children.insert(rest, entry_json(key, "file", &file.sha, file.content.len()));
            }
            Some((dir, _)) => {
                let dir_path = format!("{prefix}{dir}");
                children
                    .entry(dir)
                    .or_insert_with(|| entry_json(&dir_path, "dir", &tree_sha(&dir_path), 0));
            }
        }
    }
    reply(StatusCode::OK, Value::Array(children.into_values().collect()))
}

fn put(state: &mut State, path: &str, body: &Value) -> ApiResponse {
    if path.is_empty() || state.is_dir(path) {
        return unprocessable(&format!("path {path} is a directory"));
    }
    let Some(encoded) = body.get("content").and_then(Value::as_str) else {
        return unprocessable("Invalid request.\n\n\"content\" wasn't supplied.");
    };
    let Ok(content) = STANDARD.decode(encoded) else {
        return unprocessable("content is not valid Base64");
    };
    let message = body.get("message").and_then(Value::as_str).unwrap_or("");
    let supplied = body.get("sha").and_then(Value::as_str);

    let created = match (state.files.get(path), supplied) {
        (Some(_), None) => {
            return unprocessable("Invalid request.\n\n\"sha\" wasn't supplied.");
        }
        (Some(existing), Some(sha)) if existing.sha != sha => {
            return conflict(path, sha);
        }
        (None, Some(sha)) => return conflict(path, sha),
        (Some(_), Some(_)) => false,
        (None, None) => true,
    };

    let sha = state.next_sha(path);
    let file = StoredFile { content, sha };
    let entry = entry_json(path, "file", &file.sha, file.content.len());
    state.files.insert(path.to_string(), file);
    let commit = commit_json(state, message);

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    reply(status, json!({ "content": entry, "commit": commit }))
}

fn delete(state: &mut State, path: &str, body: &Value) -> ApiResponse {
    let Some(existing) = state.files.get(path) else {
        return not_found();
    };
    let Some(sha) = body.get("sha").and_then(Value::as_str) else {
        return unprocessable("Invalid request.\n\n\"sha\" wasn't supplied.");
    };
    if existing.sha != sha {
        return conflict(path, sha);
    }
    let message = body.get("message").and_then(Value::as_str).unwrap_or("");
    state.files.remove(path);
    let commit = commit_json(state, message);
    reply(StatusCode::OK, json!({ "content": null, "commit": commit }))
}

fn name_of(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn entry_json(path: &str, kind: &str, sha: &str, size: usize) -> Value {
    json!({
        "name": name_of(path),
        "path": path,
        "sha": sha,
        "size": size,
        "type": kind,
    })
}

/// The hosted store wraps base64 payloads at 60 columns; do the same so the
/// client has to cope with embedded newlines.
fn file_json(path: &str, file: &StoredFile) -> Value {
    let encoded = STANDARD.encode(&file.content);
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / 60 + 1);
    for chunk in encoded.as_bytes().chunks(60) {
        wrapped.push_str(&String::from_utf8_lossy(chunk));
        wrapped.push('\n');
    }
    let mut value = entry_json(path, "file", &file.sha, file.content.len());
    value["content"] = Value::String(wrapped);
    value["encoding"] = Value::String("base64".into());
    value
}

fn commit_json(state: &mut State, message: &str) -> Value {
    json!({ "sha": state.next_sha(message), "message": message })
}

fn tree_sha(path: &str) -> String {
    format!("{:040x}", fnv1a(path.as_bytes()))
}

fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5u32, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(0x0100_0193)
    })
}

fn reply(status: StatusCode, body: Value) -> ApiResponse {
    ApiResponse { status, body }
}

fn not_found() -> ApiResponse {
    reply(StatusCode::NOT_FOUND, json!({ "message": "Not Found" }))
}

fn unprocessable(message: &str) -> ApiResponse {
    reply(StatusCode::UNPROCESSABLE_ENTITY, json!({ "message": message }))
}

fn conflict(path: &str, sha: &str) -> ApiResponse {
    reply(
        StatusCode::CONFLICT,
        json!({ "message": format!("{path} does not match {sha}") }),
    )
}
