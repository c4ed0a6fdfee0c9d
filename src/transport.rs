// Transport seam between `ContentsClient` and the remote contents endpoint.
//
// A transport takes a method, a repository-relative path and an optional
// JSON body, and hands back the status and JSON body of the response. It
// never interprets statuses; that is the client's job.

use std::time::Duration;

use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;
use tracing::debug;

use crate::config::Credentials;
use crate::error::{Error, Result};

pub const ACCEPT_HEADER: &str = "application/vnd.github+json";
pub const API_VERSION_HEADER: &str = "x-github-api-version";
pub const API_VERSION: &str = "2022-11-28";
pub const USER_AGENT: &str = concat!("ghrepo-cli/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    /// Parsed JSON body, `Value::Null` when the body was empty. A non-JSON
    /// error body is kept as `Value::String`.
    pub body: Value,
}

pub trait Transport {
    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        (**self).send(method, path, body)
    }
}

/// Blocking HTTP transport bound to one `(account, repository)` pair.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(api_url: &str, credentials: &Credentials) -> Result<Self> {
        let client = client_builder(&credentials.token)?.build()?;
        Self::with_client(client, api_url, credentials)
    }

    /// Use a preconfigured client. The caller is responsible for its headers.
    pub fn with_client(client: Client, api_url: &str, credentials: &Credentials) -> Result<Self> {
        Ok(HttpTransport {
            client,
            base_url: contents_base_url(api_url, credentials)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> Result<Url> {
        content_url(&self.base_url, path)
    }
}

impl Transport for HttpTransport {
    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let url = self.url_for(path)?;
        debug!("{} {}", method, url);

        let mut req = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            req = req.json(body);
        }
        let res = req.send()?;
        let status = res.status();
        let text = res.text()?;
        debug!("{} {} -> {}", method, url, status);

        let body = parse_body(path, status, &text)?;
        Ok(ApiResponse { status, body })
    }
}

/// Error pages from proxies and gateways are often HTML. Those are kept as
/// a raw string so the status still drives classification; only a success
/// response has to be JSON.
fn parse_body(path: &str, status: StatusCode, text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str(text) {
        Ok(body) => Ok(body),
        Err(_) if !status.is_success() => Ok(Value::String(text.to_string())),
        Err(e) => Err(Error::UnexpectedResponse {
            path: path.to_string(),
            reason: format!("response body is not JSON ({status}): {e}"),
        }),
    }
}

/// Client builder with the timeout, user agent and default headers every
/// request needs.
fn client_builder(token: &str) -> Result<ClientBuilder> {
    Ok(Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .default_headers(default_headers(token)?))
}

/// Authorization, accept and API version headers sent with every call.
pub fn default_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let auth = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| Error::InvalidToken)?;
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HEADER));
    headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
    Ok(headers)
}

/// `<api>/repos/<account>/<repository>/contents`
pub fn contents_base_url(api_url: &str, credentials: &Credentials) -> Result<Url> {
    let mut url =
        Url::parse(api_url).map_err(|e| Error::InvalidPath(format!("{api_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| Error::InvalidPath(api_url.to_string()))?
        .pop_if_empty()
        .extend([
            "repos",
            credentials.account.as_str(),
            credentials.repository.as_str(),
            "contents",
        ]);
    Ok(url)
}

/// Append a slash-separated repository path to the contents base, percent
/// encoding each segment. The empty path addresses the repository root.
pub fn content_url(base: &Url, path: &str) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| Error::InvalidPath(path.to_string()))?
        .extend(path_segments(path));
    Ok(url)
}

pub(crate) fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// `path` with empty segments dropped, so `/a//b/` and `a/b` compare equal.
pub(crate) fn normalize_path(path: &str) -> String {
    path_segments(path).collect::<Vec<_>>().join("/")
}
