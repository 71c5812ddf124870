//! HTTP transport.
//!
//! Every request goes through the [`Transport`] trait so tests and callers can
//! swap the network layer. [`HttpTransport`] is the reqwest-backed default.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

use keysmith_core::{KeysmithError, Result, Sensitive};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://app.infisical.com/api";

/// Ceiling applied to every outbound call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const API_KEY_HEADER: &str = "X-API-KEY";
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// One API call, relative to the transport's base URL.
///
/// `path` is a `/`-separated literal route; `segments` are appended after it
/// and percent-encoded. A trailing `/` in `path` is kept.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub segments: Vec<String>,
    pub headers: Vec<(&'static str, Sensitive)>,
    pub query: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            segments: Vec::new(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append one encoded path segment, such as a secret key or folder id.
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<Sensitive>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn with_query(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.query.push((name, value.into()));
        self
    }

    pub fn with_json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Whether a header with `name` is attached.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// Status and body of a completed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx status into [`KeysmithError::Remote`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(KeysmithError::remote(self.status, self.body))
        }
    }

    /// Check the status and decode the JSON body.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        let response = self.error_for_status()?;
        Ok(serde_json::from_str(&response.body)?)
    }
}

/// Issues requests and returns whatever status the service answered with.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport with a fixed per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
    verbose: bool,
}

impl HttpTransport {
    /// Create a transport against `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| KeysmithError::Config {
            message: format!("invalid base URL '{}': {}", base_url, e),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(KeysmithError::Config {
                message: format!("base URL '{}' cannot carry a path", base_url),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| KeysmithError::Transport {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url,
            timeout,
            verbose: false,
        })
    }

    /// Dump request lines, statuses and response bodies at debug level.
    ///
    /// Headers are never dumped.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request's route against the base URL.
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| KeysmithError::Config {
                message: format!("base URL '{}' cannot carry a path", self.base_url),
            })?;
            path.pop_if_empty();
            let route = request.path.trim_start_matches('/');
            if !route.is_empty() {
                path.extend(route.split('/'));
            }
            path.extend(request.segments.iter());
        }
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(&request)?;
        if self.verbose {
            debug!(method = %request.method, url = %url, "Sending request");
        }

        let mut builder = self.http.request(request.method.clone(), url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value.expose());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                KeysmithError::Transport {
                    message: format!("{} {} timed out after {:?}", request.method, url, self.timeout),
                }
            } else {
                KeysmithError::Transport {
                    message: format!("{} {} failed: {}", request.method, url, e),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| KeysmithError::Transport {
            message: format!("failed to read response body: {}", e),
        })?;

        if self.verbose {
            debug!(status, body = %body, "Received response");
        }

        Ok(ApiResponse { status, body })
    }
}
