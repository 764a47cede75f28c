mod common;

use common::{todo, transport};
use easehooks::{Fetch, FetchErrorKind, RequestOptions, RequestStatus, Response};
use futures::StreamExt;
use futures_signals::signal::SignalExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Todo {
    user_id: u32,
    id: u32,
    title: String,
    completed: bool,
}

#[tokio::test]
async fn test_fetch_todo() {
    let transport = transport();
    transport.mock_json(200, &todo());

    let fetch = Fetch::new(
        transport.clone(),
        "https://jsonplaceholder.typicode.com/todos/1",
        RequestOptions::default(),
    );
    assert!(fetch.state().is_pending());

    let state = fetch.settled().await.unwrap();
    let item: Todo = state.data().unwrap().decode().unwrap();
    assert_eq!(
        item,
        Todo {
            user_id: 1,
            id: 1,
            title: "delectus aut autem".to_string(),
            completed: false,
        }
    );
    assert_eq!(
        transport.last_request().unwrap().url,
        "https://jsonplaceholder.typicode.com/todos/1"
    );
}

#[tokio::test]
async fn test_server_error_json_is_merged() {
    let transport = transport();
    transport.mock_json(500, &json!({"error": "Internal Server Error"}));

    let fetch = Fetch::new(transport, "/todos/1", RequestOptions::default());
    let state = fetch.settled().await.unwrap();

    assert!(state.data().is_none());
    let error = state.error().unwrap();
    assert!(error.message().contains("500"));
    assert_eq!(error.field("error"), Some(&json!("Internal Server Error")));
}

#[tokio::test]
async fn test_server_error_text_is_attached() {
    let transport = transport();
    transport.mock_response(Response::text(500, "Internal Server Error"));

    let fetch = Fetch::new(transport, "/boom", RequestOptions::default());
    let state = fetch.settled().await.unwrap();

    assert_eq!(state.status(), RequestStatus::Error);
    let error = state.error().unwrap();
    assert_eq!(error.kind(), FetchErrorKind::Status);
    assert_eq!(error.status(), Some(500));
    assert!(error.message().contains("500"));
    assert_eq!(
        error.field("error"),
        Some(&Value::String("Internal Server Error".to_string()))
    );
}

#[tokio::test]
async fn test_long_error_text_stays_out_of_the_message() {
    let body = "x".repeat(150);
    let transport = transport();
    transport.mock_response(Response::text(502, body.clone()));

    let fetch = Fetch::new(transport, "/gateway", RequestOptions::default());
    let state = fetch.settled().await.unwrap();

    let error = state.error().unwrap();
    assert_eq!(error.message(), "502: Bad Gateway");
    assert_eq!(error.field("error"), Some(&Value::String(body)));
}

#[tokio::test]
async fn test_json_error_fields_are_merged_without_proto() {
    let transport = transport();
    transport.mock_json(
        422,
        &json!({"code": "invalid", "detail": "title missing", "__proto__": {"admin": true}}),
    );

    let fetch = Fetch::new(transport, "/todos", RequestOptions::new().json(&json!({})));
    let state = fetch.settled().await.unwrap();

    let error = state.error().unwrap();
    assert_eq!(error.field("code"), Some(&json!("invalid")));
    assert_eq!(error.field("detail"), Some(&json!("title missing")));
    assert!(error.field("__proto__").is_none());
}

#[tokio::test]
async fn test_unchanged_target_does_not_refetch() {
    let transport = transport();
    transport.mock_with(|_| Ok(Response::json(200, &todo())));
    transport.set_delay(Duration::from_millis(5));

    let fetch = Fetch::new(transport.clone(), "/todos/1", RequestOptions::default());
    fetch.settled().await.unwrap();

    fetch.set_target("/todos/1".to_string());
    fetch.set_request("/todos/1", RequestOptions::default());
    assert_eq!(transport.request_count(), 1);

    fetch.set_target("/todos/2");
    assert!(fetch.await_state().await.unwrap().is_pending());
    fetch.settled().await.unwrap();
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn test_signal_reports_each_transition() {
    let transport = transport();
    transport.mock_json(200, &todo());

    let fetch = Fetch::new(transport, "/todos/1", RequestOptions::default());
    let statuses = fetch
        .to_signal()
        .map(|state| state.status())
        .to_stream();
    futures::pin_mut!(statuses);

    let mut seen = Vec::new();
    while let Some(status) = statuses.next().await {
        seen.push(status);
        if status != RequestStatus::Pending {
            break;
        }
    }
    assert_eq!(seen.last(), Some(&RequestStatus::Success));
}
