mod common;

use common::echo_transport;
use easehooks::{PageTarget, PaginatedFetch, PaginatedOptions, Payload};
use serde_json::json;

fn requested_url(state: &easehooks::FetchState) -> Option<String> {
    state
        .data()
        .and_then(Payload::as_json)
        .and_then(|body| body["url"].as_str())
        .map(str::to_string)
}

#[tokio::test]
async fn test_first_page_appends_query() {
    let transport = echo_transport();
    let pages = PaginatedFetch::new(
        transport.clone(),
        "/todos",
        PaginatedOptions::default().limit(10),
    );

    let state = pages.settled().await.unwrap();
    assert_eq!(pages.page(), 0);
    assert_eq!(requested_url(&state).as_deref(), Some("/todos?page=0&limit=10"));
}

#[tokio::test]
async fn test_prev_page_stops_at_the_first_page() {
    let transport = echo_transport();
    let pages = PaginatedFetch::new(transport.clone(), "/todos", PaginatedOptions::default());
    pages.settled().await.unwrap();

    pages.prev_page();
    pages.prev_page();
    assert_eq!(pages.page(), 0);
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_next_and_prev_page() {
    let transport = echo_transport();
    let pages = PaginatedFetch::new(
        transport.clone(),
        "/todos?sort=asc",
        PaginatedOptions::default().page_start(1).page_var_name("p"),
    );
    pages.settled().await.unwrap();

    pages.next_page();
    let state = pages.settled().await.unwrap();
    assert_eq!(pages.page(), 2);
    assert_eq!(requested_url(&state).as_deref(), Some("/todos?sort=asc&p=2"));

    pages.prev_page();
    pages.prev_page();
    let state = pages.settled().await.unwrap();
    assert_eq!(pages.page(), 1);
    assert_eq!(requested_url(&state).as_deref(), Some("/todos?sort=asc&p=1"));
}

#[tokio::test]
async fn test_set_page_clamps_to_min_page() {
    let transport = echo_transport();
    let pages = PaginatedFetch::new(
        transport.clone(),
        "/items",
        PaginatedOptions::default().page_start(3).min_page(2),
    );
    pages.settled().await.unwrap();

    pages.set_page(0);
    let state = pages.settled().await.unwrap();
    assert_eq!(pages.page(), 2);
    assert_eq!(requested_url(&state).as_deref(), Some("/items?page=2"));
}

#[tokio::test]
async fn test_builder_target() {
    let transport = echo_transport();
    let pages = PaginatedFetch::new(
        transport.clone(),
        PageTarget::build(|page, limit| format!("/search/{page}/{}", limit.unwrap_or(20))),
        PaginatedOptions::default(),
    );
    pages.next_page();

    let state = pages.settled().await.unwrap();
    assert_eq!(state.data().and_then(Payload::as_json), Some(&json!({"url": "/search/1/20"})));
    assert_eq!(transport.last_request().unwrap().url, "/search/1/20");
}
