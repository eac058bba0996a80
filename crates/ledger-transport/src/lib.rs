//! Ledger Transport — the URL request handler (C3).
//!
//! The original protocol correlates outgoing request ids to per-request
//! callbacks in a side table. `async`/`await` is the idiomatic Rust
//! replacement: callers simply `.await` a [`LedgerTransport::load_url`]
//! call instead of registering a continuation, so there is no explicit
//! correlation table here — the executor owns it. The transport itself
//! owns timeouts and reports them as `ok: false`, exactly as the
//! embedder contract in the design requires; it never propagates a
//! network error as a Rust `Err` to the caller, since every caller
//! branches on `ok` the same way the original branches on the
//! callback's boolean.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport build failed: {0}")]
    Build(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub content_type: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            content_type: None,
        }
    }

    pub fn post(url: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: HashMap::new(),
            body: Some(body),
            content_type: Some("application/json".to_string()),
        }
    }

    pub fn put(url: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            headers: HashMap::new(),
            body: Some(body),
            content_type: Some("application/json".to_string()),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub ok: bool,
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl HttpResponse {
    pub fn failed() -> Self {
        Self {
            ok: false,
            status: 0,
            body: String::new(),
            headers: HashMap::new(),
        }
    }
}

/// The embedder-provided `LoadURL` collaborator. Implementations never
/// time out the caller — they resolve with `ok: false` instead.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    async fn load_url(&self, request: HttpRequest) -> HttpResponse;
}

/// A `reqwest`-backed implementation talking to the operator over real
/// HTTP(S).
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new().expect("default reqwest client configuration is always valid")
    }
}

#[async_trait]
impl LedgerTransport for ReqwestTransport {
    async fn load_url(&self, request: HttpRequest) -> HttpResponse {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(content_type) = &request.content_type {
            builder = builder.header("content-type", content_type);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("request to {} failed: {e}", request.url);
                return HttpResponse::failed();
            }
        };

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("failed to read response body from {}: {e}", request.url);
                return HttpResponse::failed();
            }
        };

        HttpResponse {
            ok: status.is_success(),
            status: status.as_u16(),
            body,
            headers,
        }
    }
}

/// A scripted client for unit tests: responses are queued per URL-prefix
/// and popped in FIFO order, the way a fake surveyor/operator endpoint
/// would behave across a sequence of requests.
#[derive(Default)]
pub struct MockTransport {
    scripted: std::sync::Mutex<HashMap<String, std::collections::VecDeque<HttpResponse>>>,
    pub requests: std::sync::Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, url_prefix: impl Into<String>, response: HttpResponse) {
        self.scripted
            .lock()
            .unwrap()
            .entry(url_prefix.into())
            .or_default()
            .push_back(response);
    }
}

#[async_trait]
impl LedgerTransport for MockTransport {
    async fn load_url(&self, request: HttpRequest) -> HttpResponse {
        self.requests.lock().unwrap().push(request.clone());

        let mut scripted = self.scripted.lock().unwrap();
        let matching_prefix = scripted
            .keys()
            .filter(|prefix| request.url.starts_with(prefix.as_str()))
            .max_by_key(|prefix| prefix.len())
            .cloned();

        match matching_prefix.and_then(|prefix| scripted.get_mut(&prefix).and_then(|q| q.pop_front())) {
            Some(response) => response,
            None => HttpResponse::failed(),
        }
    }
}
