mod body;
mod error;
mod transport;

pub use body::*;
pub use error::*;
pub use transport::*;

use crate::memo::MemoCell;
use crate::request::{RequestAction, RequestState};
use crate::state_store::{StateSetter, StateStore};
use crate::stream_ext::StateStreamExt;
use crate::StoreError;
use futures_signals::signal::{MutableSignalCloned, SignalStream};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// State of a [`Fetch`].
pub type FetchState = RequestState<Payload, FetchError>;

/// Revisions of the inputs that produced the last issued request.
type RequestKey = (u64, u64, u64);

struct FetchInner {
    target: MemoCell<String>,
    options: MemoCell<RequestOptions>,
    retry: u64,
    issued: Option<RequestKey>,
    in_flight: Option<CancellationToken>,
}

/// Keeps a [`FetchState`] in sync with the request for its current target.
///
/// A new request goes out whenever the target or the options change by deep
/// equality, or when [`refetch`](Fetch::refetch) is called. Only the newest
/// request may write the state: a superseded request is canceled, and a
/// response that still arrives for it is dropped.
///
/// An empty target issues nothing and puts the state back to pending.
pub struct Fetch {
    store: StateStore<FetchState>,
    transport: Arc<dyn Transport>,
    inner: Mutex<FetchInner>,
    latest: Arc<AtomicU64>,
}

impl Fetch {
    /// Creates the fetch and sends the first request. Must run inside a tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, target: impl Into<String>, options: RequestOptions) -> Self {
        let fetch = Fetch {
            store: StateStore::new(RequestState::Pending),
            transport,
            inner: Mutex::new(FetchInner {
                target: MemoCell::new(target.into()),
                options: MemoCell::new(options),
                retry: 0,
                issued: None,
                in_flight: None,
            }),
            latest: Arc::new(AtomicU64::new(0)),
        };
        fetch.sync(&mut fetch.inner.lock());
        fetch
    }

    /// Points the fetch at a new target and options.
    pub fn set_request(&self, target: impl Into<String>, options: RequestOptions) {
        let mut inner = self.inner.lock();
        inner.target.update(target.into());
        inner.options.update(options);
        self.sync(&mut inner);
    }

    /// Points the fetch at a new target, keeping the current options.
    pub fn set_target(&self, target: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.target.update(target.into());
        self.sync(&mut inner);
    }

    pub fn set_options(&self, options: RequestOptions) {
        let mut inner = self.inner.lock();
        inner.options.update(options);
        self.sync(&mut inner);
    }

    /// Returns to pending and sends the current request again.
    pub fn refetch(&self) {
        let mut inner = self.inner.lock();
        if let Err(error) = self.store.set_state(|state| state.reduce(RequestAction::Reset)) {
            debug!(%error, "refetch on a closed fetch");
            return;
        }
        inner.retry = inner.retry.wrapping_add(1);
        self.sync(&mut inner);
    }

    pub fn target(&self) -> String {
        self.inner.lock().target.get().clone()
    }

    pub fn options(&self) -> RequestOptions {
        self.inner.lock().options.get().clone()
    }

    /// Snapshot of the state, ignoring transitions still queued.
    pub fn state(&self) -> FetchState {
        self.store.get_state()
    }

    /// The state after every transition queued so far has been applied.
    pub async fn await_state(&self) -> Result<FetchState, StoreError> {
        self.store.await_state().await
    }

    /// Waits until the current request has succeeded or failed.
    ///
    /// With an empty target nothing is in flight, so this returns the
    /// pending state straight away.
    pub async fn settled(&self) -> Result<FetchState, StoreError> {
        let idle = self.inner.lock().target.get().is_empty();
        let current = self.await_state().await?;
        if idle {
            return Ok(current);
        }
        let mut states = self.store.to_stream();
        states.next_settled().await.ok_or(StoreError::Closed)
    }

    pub fn to_signal(&self) -> MutableSignalCloned<FetchState> {
        self.store.to_signal()
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<FetchState>> {
        self.store.to_stream()
    }

    fn sync(&self, inner: &mut FetchInner) {
        let key = (inner.target.revision(), inner.options.revision(), inner.retry);
        if inner.issued == Some(key) {
            return;
        }
        inner.issued = Some(key);

        if let Some(token) = inner.in_flight.take() {
            token.cancel();
        }

        // Any response still on its way for an older request is now stale.
        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        let url = inner.target.get().clone();
        if url.is_empty() {
            trace!("no target, nothing to fetch");
            let _ = self.store.set_state(|state| state.reduce(RequestAction::Reset));
            return;
        }

        if self
            .store
            .set_state(|state| state.reduce(RequestAction::Start))
            .is_err()
        {
            return;
        }

        let token = CancellationToken::new();
        inner.in_flight = Some(token.clone());
        let request = Request::new(url, inner.options.get().clone());
        debug!(seq, url = %request.url, method = %request.options.method, "sending request");

        let response = self.transport.send(request);
        let setter = self.store.setter();
        let latest = self.latest.clone();
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(seq, "request superseded before completion");
                    return;
                }
                outcome = receive(response) => outcome,
            };
            apply_outcome(&setter, &latest, seq, outcome);
        });
    }
}

async fn receive(
    response: futures::future::BoxFuture<'static, Result<Response, TransportError>>,
) -> Result<Payload, FetchError> {
    let response = response.await?;
    let payload = parse_body(&response);
    if !response.ok() {
        return Err(FetchError::from_response(
            response.status,
            &response.status_text,
            payload,
        ));
    }
    Ok(payload)
}

fn apply_outcome(
    setter: &StateSetter<FetchState>,
    latest: &Arc<AtomicU64>,
    seq: u64,
    outcome: Result<Payload, FetchError>,
) {
    let latest = latest.clone();
    let _ = setter.set_state(move |state| {
        if latest.load(Ordering::SeqCst) != seq {
            trace!(seq, "dropping stale response");
            return state;
        }
        match outcome {
            Ok(payload) => state.reduce(RequestAction::ReceiveResponse(payload)),
            Err(error) => {
                debug!(seq, %error, "request failed");
                state.reduce(RequestAction::ReceiveError(error))
            }
        }
    });
}

impl Drop for Fetch {
    fn drop(&mut self) {
        if let Some(token) = self.inner.lock().in_flight.take() {
            token.cancel();
        }
    }
}

impl fmt::Debug for Fetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Fetch")
            .field("target", inner.target.get())
            .field("options", inner.options.get())
            .field("retry", &inner.retry)
            .field("status", &self.store.get_state().status())
            .finish()
    }
}
