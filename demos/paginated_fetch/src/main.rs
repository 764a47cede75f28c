use crate::tracing_setup::tracing_init;
use easehooks::{
    DelayedCallback, DelayedCallbackOptions, FetchState, PaginatedFetch, PaginatedOptions,
    Payload, StateStreamExt, TokioHost, Transport,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

mod tracing_setup;

const TODOS: &str = "https://jsonplaceholder.typicode.com/todos";

#[cfg(feature = "http")]
fn transport() -> Arc<dyn Transport> {
    Arc::new(easehooks::ReqwestTransport::new(Default::default()))
}

/// Serves two todos per page and fails past page 3.
#[cfg(not(feature = "http"))]
fn transport() -> Arc<dyn Transport> {
    use easehooks::mock::MockTransport;
    use easehooks::{Request, Response};
    use serde_json::json;

    let transport = MockTransport::new();
    transport.set_delay(Duration::from_millis(150));
    transport.mock_with(|request: &Request| {
        let page = query_value(&request.url, "_page").unwrap_or(1);
        if page > 3 {
            return Ok(Response::text(404, "no such page"));
        }
        let todos: Vec<_> = (1..=2)
            .map(|n| {
                let id = (page - 1) * 2 + n;
                json!({"userId": 1, "id": id, "title": format!("todo {id}"), "completed": id % 2 == 0})
            })
            .collect();
        Ok(Response::json(200, &json!(todos)))
    });
    Arc::new(transport)
}

#[cfg(not(feature = "http"))]
fn query_value(url: &str, name: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| value.parse().ok())
}

fn describe(state: &FetchState) -> String {
    match state {
        FetchState::Pending => "pending".to_string(),
        FetchState::Success(Payload::Json(todos)) => {
            let titles: Vec<_> = todos
                .as_array()
                .map(|todos| todos.iter().filter_map(|todo| todo["title"].as_str()).collect())
                .unwrap_or_default();
            format!("success {titles:?}")
        }
        FetchState::Success(other) => format!("success {other:?}"),
        FetchState::Error(error) => format!("error {error}"),
    }
}

async fn show_until_settled(pages: &PaginatedFetch) {
    pages
        .to_stream()
        .until_settled()
        .for_each(|state| async move {
            info!("  page state | {}", describe(&state));
        })
        .await;
}

#[tokio::main]
async fn main() {
    tracing_init();

    info!("==========================================");
    warn!("A. first page, then forward and back");

    let options = PaginatedOptions::default()
        .page_var_name("_page")
        .limit_var_name("_limit")
        .page_start(1)
        .limit(2);
    let pages = PaginatedFetch::new(transport(), TODOS, options);
    show_until_settled(&pages).await;

    pages.next_page();
    info!("moved to page {}", pages.page());
    show_until_settled(&pages).await;

    pages.prev_page();
    pages.prev_page();
    info!("back on page {}, the first one", pages.page());
    show_until_settled(&pages).await;

    info!("==========================================");
    warn!("B. a page past the end fails");

    pages.set_page(4);
    show_until_settled(&pages).await;

    info!("==========================================");
    warn!("C. delayed callbacks, one of them canceled");

    let host = Arc::new(TokioHost::new());
    let shout = DelayedCallback::new(
        host,
        DelayedCallbackOptions::timeout(Duration::from_millis(100)),
        |word: &'static str| word.to_uppercase(),
    )
    .named("shout");

    let kept = shout.call("kept");
    let dropped = shout.call("dropped");
    dropped.cancel();
    info!("{} has {} pending call(s)", shout.name(), shout.active_handles());

    match kept.await {
        Ok(word) => info!("  resolved | {word}"),
        Err(error) => warn!("  rejected | {error}"),
    }
    info!("  canceled call settled: {}", dropped.is_settled());
}
