use crate::fetch::body::Payload;
use crate::fetch::transport::TransportError;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Text error bodies up to this many characters are appended to the message.
pub const MAX_INLINE_ERROR_TEXT: usize = 100;

/// Field names never copied from a response body into an error.
const FORBIDDEN_FIELDS: &[&str] = &["__proto__"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// The request never produced a response.
    Transport,
    /// The server answered with a non-2xx status.
    Status,
}

/// Why a fetch ended in the error state.
///
/// Status errors carry the numeric status and status text, plus whatever
/// fields the server sent in a structured error body. Body fields never
/// replace the message, status or status text built from the response line;
/// a body `message` stays readable through [`field`](FetchError::field).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FetchError {
    kind: FetchErrorKind,
    status: Option<u16>,
    status_text: Option<String>,
    message: String,
    fields: Map<String, Value>,
}

impl FetchError {
    pub fn transport(error: TransportError) -> Self {
        FetchError {
            kind: FetchErrorKind::Transport,
            status: None,
            status_text: None,
            message: error.to_string(),
            fields: Map::new(),
        }
    }

    /// Builds the error for a non-2xx response from its parsed body.
    ///
    /// An object body is kept as [`fields`](FetchError::fields) without touching
    /// the `"{status}: {status_text}"` message. A short text body is appended to
    /// the message instead.
    pub fn from_response(status: u16, status_text: &str, payload: Payload) -> Self {
        let mut error = FetchError {
            kind: FetchErrorKind::Status,
            status: Some(status),
            status_text: Some(status_text.to_string()),
            message: format!("{status}: {status_text}"),
            fields: Map::new(),
        };
        match payload {
            Payload::Json(Value::Object(fields)) => error.merge_fields(fields),
            Payload::Json(Value::String(text)) | Payload::Text(text) => error.attach_text(text),
            Payload::Json(_) | Payload::Binary(_) => {}
        }
        error
    }

    fn merge_fields(&mut self, fields: Map<String, Value>) {
        for (name, value) in fields {
            if FORBIDDEN_FIELDS.contains(&name.as_str()) {
                warn!(field = %name, "dropping forbidden field from error body");
                continue;
            }
            self.fields.insert(name, value);
        }
    }

    fn attach_text(&mut self, text: String) {
        if !text.is_empty() && text.chars().count() <= MAX_INLINE_ERROR_TEXT {
            self.message.push_str(" - ");
            self.message.push_str(&text);
        }
        self.fields.insert("error".to_string(), Value::String(text));
    }

    pub fn kind(&self) -> FetchErrorKind {
        self.kind
    }

    pub fn is_transport(&self) -> bool {
        self.kind == FetchErrorKind::Transport
    }

    pub fn is_status(&self) -> bool {
        self.kind == FetchErrorKind::Status
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn status_text(&self) -> Option<&str> {
        self.status_text.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Fields supplied by the server's error body.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl From<TransportError> for FetchError {
    fn from(error: TransportError) -> Self {
        FetchError::transport(error)
    }
}
