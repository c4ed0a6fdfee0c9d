// API client module: `ContentsClient` turns each file/directory operation
// into the short sequence of contents-endpoint calls it needs and maps the
// responses onto typed results. It is synchronous and keeps no state besides
// the transport, so every mutating call re-resolves the version token first.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::{
    CommitInfo, CommitResponse, DirEntry, DirectoryRemoval, EntryType, FileContent, WriteOutcome,
};
use crate::transport::{normalize_path, HttpTransport, Transport};

/// Placeholder that keeps an otherwise empty directory visible.
pub const MARKER_FILE: &str = ".gitkeep";
pub const MARKER_CONTENT: &[u8] = b" ";

pub const DEFAULT_WRITE_MESSAGE: &str = "File updated/created.";
pub const DEFAULT_DELETE_MESSAGE: &str = "File deleted.";
pub const DEFAULT_DIR_DELETE_MESSAGE: &str = "Directory deleted.";
pub const PING_MESSAGE: &str = "Activate Ping. (Ignore this, just a repo board activation)";

/// Client for the contents of one repository.
#[derive(Clone)]
pub struct ContentsClient<T = HttpTransport> {
    transport: T,
}

impl ContentsClient<HttpTransport> {
    /// Build a client talking HTTP to the configured API host.
    pub fn new(settings: &Settings) -> Result<Self> {
        let transport = HttpTransport::new(&settings.api_url, &settings.credentials)?;
        Ok(Self::with_transport(transport))
    }
}

impl<T: Transport> ContentsClient<T> {
    pub fn with_transport(transport: T) -> Self {
        ContentsClient { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one request and turn any non-success status into an error.
    fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<(StatusCode, Value)> {
        let resp = self.transport.send(method, path, body)?;
        if resp.status.is_success() {
            Ok((resp.status, resp.body))
        } else {
            Err(Error::from_response(path, resp.status, &resp.body))
        }
    }

    fn fetch(&self, path: &str) -> Result<Value> {
        self.call(Method::GET, path, None).map(|(_, body)| body)
    }

    /// `GET` a path that must be a file.
    fn fetch_file(&self, path: &str) -> Result<FileContent> {
        let body = self.fetch(path)?;
        if body.get("type").and_then(Value::as_str) != Some(EntryType::File.as_str()) {
            return Err(Error::NotAFile {
                path: path.to_string(),
            });
        }
        parse(path, body)
    }

    /// Current version token of the file at `path`, or `None` when there is
    /// no file there. Failures other than absence are propagated.
    pub fn resolve_version(&self, path: &str) -> Result<Option<String>> {
        match self.fetch_file(path) {
            Ok(file) => Ok(Some(file.meta.sha)),
            Err(Error::NotFound { .. }) | Err(Error::NotAFile { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Raw bytes of the file at `path`.
    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        let file = self.fetch_file(path)?;
        decode_content(path, &file)
    }

    pub fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|_| Error::NotText {
            path: path.to_string(),
        })
    }

    /// Save the file at `path` to `local_path`. Returns the number of bytes
    /// written.
    pub fn download(&self, path: &str, local_path: &Path) -> Result<usize> {
        let bytes = self.read(path)?;
        std::fs::write(local_path, &bytes).map_err(|source| Error::LocalIo {
            path: local_path.to_path_buf(),
            source,
        })?;
        Ok(bytes.len())
    }

    /// Create or update `path` with an explicit version token. `None` asks
    /// for a create; the store rejects it with a conflict if the file exists.
    pub fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        version: Option<&str>,
    ) -> Result<WriteOutcome> {
        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(content),
        });
        if let Some(sha) = version {
            body["sha"] = Value::String(sha.to_string());
        }

        let (status, resp) = self.call(Method::PUT, path, Some(&body))?;
        let resp: CommitResponse = parse(path, resp)?;
        let entry = resp.content.ok_or_else(|| Error::UnexpectedResponse {
            path: path.to_string(),
            reason: "write response carries no content metadata".into(),
        })?;
        debug!("wrote {} ({} bytes) -> {}", path, content.len(), entry.sha);

        Ok(WriteOutcome {
            created: status == StatusCode::CREATED,
            entry,
            commit: resp.commit,
        })
    }

    /// Create or overwrite `path`. The current version token is resolved
    /// right before the write; a concurrent edit in between surfaces as
    /// `Error::Conflict` and is not retried.
    pub fn write(&self, path: &str, content: &[u8], message: &str) -> Result<WriteOutcome> {
        let version = self.resolve_version(path)?;
        self.put_file(path, content, message, version.as_deref())
    }

    /// Write the bytes of a local file to `path`.
    pub fn upload(&self, local_path: &Path, path: &str, message: &str) -> Result<WriteOutcome> {
        let content = std::fs::read(local_path).map_err(|source| Error::LocalIo {
            path: local_path.to_path_buf(),
            source,
        })?;
        self.write(path, &content, message)
    }

    pub fn delete(&self, path: &str, message: &str) -> Result<CommitInfo> {
        let sha = self.resolve_version(path)?.ok_or_else(|| Error::NotFound {
            path: path.to_string(),
        })?;
        let body = json!({ "message": message, "sha": sha });
        let (_, resp) = self.call(Method::DELETE, path, Some(&body))?;
        let resp: CommitResponse = parse(path, resp)?;
        debug!("deleted {} in commit {}", path, resp.commit.sha);
        Ok(resp.commit)
    }

    /// Entries directly under `path`, in the order the store returns them.
    pub fn list(&self, path: &str) -> Result<Vec<DirEntry>> {
        let body = self.fetch(path)?;
        if !body.is_array() {
            return Err(Error::NotADirectory {
                path: path.to_string(),
            });
        }
        parse(path, body)
    }

    /// What lives at `path`, if anything. Every failure reads as absent.
    pub fn entry_type(&self, path: &str) -> Option<EntryType> {
        let body = match self.fetch(path) {
            Ok(body) => body,
            Err(e) => {
                debug!("entry_type({}) treated as absent: {}", path, e);
                return None;
            }
        };
        if body.is_array() {
            return Some(EntryType::Dir);
        }
        body.get("type")
            .cloned()
            .and_then(|kind| serde_json::from_value(kind).ok())
    }

    /// Make `path` show up as a directory by committing a marker file in it.
    pub fn create_directory(&self, path: &str) -> Result<WriteOutcome> {
        let marker = marker_path(path)?;
        let message = format!("Directory created: {}", path);
        let outcome = self.write(&marker, MARKER_CONTENT, &message)?;
        if outcome.entry.kind != EntryType::File {
            return Err(Error::UnexpectedResponse {
                path: marker,
                reason: format!("created entry has type {}", outcome.entry.kind),
            });
        }
        info!("created directory {}", path);
        Ok(outcome)
    }

    /// Remove the marker file of `path`. A missing marker is reported as
    /// `DirectoryRemoval::MarkerAbsent`, not as an error, and other files
    /// under `path` are left alone.
    pub fn delete_directory(&self, path: &str, message: &str) -> Result<DirectoryRemoval> {
        let marker = marker_path(path)?;
        match self.delete(&marker, message) {
            Ok(commit) => {
                info!("deleted directory marker {}", marker);
                Ok(DirectoryRemoval::Removed(commit))
            }
            Err(Error::NotFound { .. }) => {
                debug!("no marker at {}", marker);
                Ok(DirectoryRemoval::MarkerAbsent)
            }
            Err(e) => Err(e),
        }
    }

    /// Copy `old_path` to `new_path`, then delete `old_path`. When the copy
    /// fails nothing has changed; when only the delete fails the result is
    /// `Error::PartialMove` and both files exist. Moving a file onto itself
    /// is rejected before any request, since the delete would remove it.
    pub fn move_file(
        &self,
        old_path: &str,
        new_path: &str,
        message: Option<&str>,
    ) -> Result<WriteOutcome> {
        if normalize_path(old_path) == normalize_path(new_path) {
            return Err(Error::InvalidPath(format!(
                "{} (source and destination are the same file)",
                new_path
            )));
        }
        let content = self.read(old_path)?;
        let message = match message {
            Some(m) => m.to_string(),
            None => format!("Move: {} -> {}", old_path, new_path),
        };

        let outcome = self.write(new_path, &content, &message)?;
        if let Err(e) = self.delete(old_path, &message) {
            warn!(
                "moved {} to {} but the source could not be deleted: {}",
                old_path, new_path, e
            );
            return Err(Error::PartialMove {
                from: old_path.to_string(),
                to: new_path.to_string(),
                version: outcome.entry.sha,
                source: Box::new(e),
            });
        }
        info!("moved {} -> {}", old_path, new_path);
        Ok(outcome)
    }

    /// Commit and immediately delete a throwaway file at the repository root.
    /// Returns the name that was used.
    pub fn ping(&self) -> Result<String> {
        let name = format!(".{}.ping", rand::random_range(0..=1000u32));
        let content = rand::random::<f64>().to_string();
        self.write(&name, content.as_bytes(), PING_MESSAGE)?;
        self.delete(&name, DEFAULT_DELETE_MESSAGE)?;
        info!("ping {} committed and removed", name);
        Ok(name)
    }
}

fn parse<D: DeserializeOwned>(path: &str, body: Value) -> Result<D> {
    serde_json::from_value(body).map_err(|e| Error::UnexpectedResponse {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// The store wraps the base64 payload with newlines; strip all whitespace
/// before decoding.
fn decode_content(path: &str, file: &FileContent) -> Result<Vec<u8>> {
    if let Some(encoding) = file.encoding.as_deref() {
        if encoding != "base64" {
            return Err(Error::UnexpectedResponse {
                path: path.to_string(),
                reason: format!("content delivered with encoding '{}'", encoding),
            });
        }
    }
    let compact: String = file
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|e| Error::UnexpectedResponse {
            path: path.to_string(),
            reason: format!("content is not valid base64: {}", e),
        })
}

/// `<dir>/.gitkeep`; trailing slashes on `dir` are ignored.
pub fn marker_path(dir: &str) -> Result<String> {
    let dir = dir.trim_end_matches('/');
    if dir.trim_start_matches('/').is_empty() {
        return Err(Error::InvalidPath(dir.to_string()));
    }
    Ok(format!("{}/{}", dir, MARKER_FILE))
}
