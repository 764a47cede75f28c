use crate::compare::{deep_equal, DeepEqual};
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DeepEqual for Method {
    fn deep_equal(&self, other: &Self) -> bool {
        self == other
    }
}

/// Options sent along with a request target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(self, method: Method) -> Self {
        RequestOptions { method, ..self }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(self, body: impl Into<String>) -> Self {
        RequestOptions {
            body: Some(body.into()),
            ..self
        }
    }

    /// Sets a JSON body and the matching content type.
    pub fn json(self, body: &Value) -> Self {
        self.header("Content-Type", "application/json")
            .body(body.to_string())
    }
}

impl DeepEqual for RequestOptions {
    fn deep_equal(&self, other: &Self) -> bool {
        deep_equal(&self.method, &other.method)
            && deep_equal(&self.headers, &other.headers)
            && deep_equal(&self.body, &other.body)
    }
}

/// A request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub options: RequestOptions,
}

impl Request {
    pub fn new(url: impl Into<String>, options: RequestOptions) -> Self {
        Request {
            url: url.into(),
            options,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, RequestOptions::default())
    }
}

/// A response as delivered by a [`Transport`].
///
/// Header names are stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Response {
            status,
            status_text: reason_phrase(status).to_string(),
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// A response carrying `body` serialized as JSON.
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body.to_string())
    }

    /// A `text/plain` response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let body: String = body.into();
        Self::new(status)
            .with_header("Content-Type", "text/plain")
            .with_body(body)
    }

    pub fn with_status_text(self, status_text: impl Into<String>) -> Self {
        Response {
            status_text: status_text.into(),
            ..self
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(self, body: impl Into<Vec<u8>>) -> Self {
        Response {
            body: body.into(),
            ..self
        }
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}

/// Canonical reason phrase for common statuses.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

/// Failures below the HTTP layer.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Sends requests and delivers responses.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>>;
}

#[cfg(feature = "http")]
pub use self::http::ReqwestTransport;

#[cfg(feature = "http")]
mod http {
    use super::{Request, Response, Transport, TransportError};
    use futures::future::BoxFuture;
    use futures::FutureExt;

    /// A [`Transport`] backed by a `reqwest` client.
    #[derive(Debug, Clone, Default)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
    }

    impl ReqwestTransport {
        pub fn new(client: reqwest::Client) -> Self {
            ReqwestTransport { client }
        }
    }

    impl Transport for ReqwestTransport {
        fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>> {
            let client = self.client.clone();
            async move {
                let method = reqwest::Method::from_bytes(request.options.method.as_str().as_bytes())
                    .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
                let mut builder = client.request(method, &request.url);
                for (name, value) in &request.options.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                if let Some(body) = request.options.body {
                    builder = builder.body(body);
                }

                let response = builder
                    .send()
                    .await
                    .map_err(|e| TransportError::Network(e.to_string()))?;
                let status = response.status();
                let headers = response
                    .headers()
                    .iter()
                    .filter_map(|(name, value)| {
                        value
                            .to_str()
                            .ok()
                            .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
                    })
                    .collect();
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| TransportError::Network(e.to_string()))?;

                Ok(Response {
                    status: status.as_u16(),
                    status_text: status.canonical_reason().unwrap_or_default().to_string(),
                    headers,
                    body: body.to_vec(),
                })
            }
            .boxed()
        }
    }
}
