use crate::fetch::transport::Response;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// A response body, parsed according to its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Deserializes a JSON or text payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            Payload::Json(value) => serde_json::from_value(value.clone()),
            Payload::Text(text) => serde_json::from_str(text),
            Payload::Binary(bytes) => serde_json::from_slice(bytes),
        }
    }
}

/// Parses `response`'s body by its content type.
///
/// Unlabeled and `application/json` bodies are parsed as JSON, anything
/// labeled `text` is kept as text, and everything else stays binary. A body
/// that fails to parse as JSON falls back to text.
pub fn parse_body(response: &Response) -> Payload {
    let content_type = response.content_type().unwrap_or_default();
    if content_type.is_empty() || content_type.contains("application/json") {
        match serde_json::from_slice(&response.body) {
            Ok(value) => Payload::Json(value),
            Err(error) => {
                debug!(%error, status = response.status, "body is not JSON, keeping it as text");
                Payload::Text(String::from_utf8_lossy(&response.body).into_owned())
            }
        }
    } else if content_type.contains("text") {
        Payload::Text(String::from_utf8_lossy(&response.body).into_owned())
    } else {
        Payload::Binary(response.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_json_content_type() {
        let response = Response::json(200, &json!({ "id": 1 }));
        assert_eq!(parse_body(&response), Payload::Json(json!({ "id": 1 })));
    }

    #[test]
    fn test_unlabeled_body_is_parsed_as_json() {
        let response = Response::new(200).with_body("[1,2]");
        assert_eq!(parse_body(&response), Payload::Json(json!([1, 2])));
    }

    #[test]
    fn test_text_content_type() {
        let response = Response::new(200)
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body("<p>hi</p>");
        assert_eq!(parse_body(&response).as_text(), Some("<p>hi</p>"));
    }

    #[test]
    fn test_other_content_types_are_binary() {
        let response = Response::new(200)
            .with_header("Content-Type", "image/png")
            .with_body(vec![0x89_u8, 0x50]);
        assert_eq!(parse_body(&response).as_bytes(), Some(&[0x89, 0x50][..]));
    }

    #[test]
    fn test_malformed_json_falls_back_to_text() {
        let response = Response::new(200)
            .with_header("Content-Type", "application/json")
            .with_body("{not json");
        assert_eq!(parse_body(&response), Payload::Text("{not json".to_string()));
    }

    #[test]
    fn test_decode() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Todo {
            id: u32,
            completed: bool,
        }
        let payload = Payload::Json(json!({ "id": 3, "completed": true }));
        assert_eq!(
            payload.decode::<Todo>().unwrap(),
            Todo {
                id: 3,
                completed: true
            }
        );
    }
}
