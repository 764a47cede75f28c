use crate::{RequestAction, RequestState, StateStore, StateStreamExt, StoreError};
use futures::StreamExt;

type TextState = RequestState<String, String>;

#[tokio::test]
async fn test_initial_state() {
    let store = StateStore::new(TextState::default());
    assert!(store.get_state().is_pending());
}

#[tokio::test]
async fn test_reducers_apply_in_order() -> Result<(), StoreError> {
    let store = StateStore::new(TextState::default());
    store.set_state(|state| state.reduce(RequestAction::ReceiveResponse("first".to_string())))?;
    store.set_state(|state| state.reduce(RequestAction::Start))?;
    store.set_state(|state| state.reduce(RequestAction::ReceiveError("second".to_string())))?;

    let state = store.await_state().await?;
    assert_eq!(state, RequestState::Error("second".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_with_state_sees_earlier_reducers() -> Result<(), StoreError> {
    let store = StateStore::new(TextState::default());
    store.set_state(|state| state.reduce(RequestAction::ReceiveResponse("done".to_string())))?;

    let (tx, rx) = tokio::sync::oneshot::channel();
    store.with_state(move |state| {
        let _ = tx.send(state.into_data());
    })?;

    assert_eq!(rx.await.unwrap(), Some("done".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_stream_ends_once_settled() -> Result<(), StoreError> {
    let store = StateStore::new(TextState::default());
    let stream = store.to_stream().until_settled();

    store.set_state(|state| state.reduce(RequestAction::ReceiveResponse("ok".to_string())))?;
    let seen: Vec<TextState> = stream.collect().await;

    assert_eq!(seen.last(), Some(&RequestState::Success("ok".to_string())));
    assert!(seen[..seen.len() - 1].iter().all(|state| state.is_pending()));
    Ok(())
}

#[tokio::test]
async fn test_read_between_reducers_sees_only_earlier_ones() -> Result<(), StoreError> {
    let store = StateStore::new(TextState::default());
    let (tx, rx) = tokio::sync::oneshot::channel();

    store.set_state(|state| state.reduce(RequestAction::ReceiveResponse("first".to_string())))?;
    store.with_state(move |state| {
        let _ = tx.send(state);
    })?;
    store.set_state(|state| state.reduce(RequestAction::ReceiveError("second".to_string())))?;

    assert_eq!(rx.await.unwrap(), RequestState::Success("first".to_string()));
    assert_eq!(store.await_state().await?, RequestState::Error("second".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_next_settled_on_store_stream() -> Result<(), StoreError> {
    let store = StateStore::new(TextState::default());
    let mut states = store.to_stream();

    store.set_state(|state| state.reduce(RequestAction::ReceiveError("down".to_string())))?;
    assert_eq!(states.next_settled().await, Some(RequestState::Error("down".to_string())));
    Ok(())
}
