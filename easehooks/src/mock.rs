//! Deterministic stand-ins for the host environment, used by tests and demos.

use crate::battery::{BatteryConnection, BatteryData, BatterySource, BatteryUpdate};
use crate::fetch::{Request, Response, Transport, TransportError};
use crate::host::{Callback, Handle, Host};
use crate::permissions::{PermissionConnection, PermissionSource, PermissionState};
use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

type Responder = Arc<dyn Fn(&Request) -> Result<Response, TransportError> + Send + Sync>;

struct MockedReply {
    result: Result<Response, TransportError>,
    delay: Option<Duration>,
}

/// A [`Transport`] that answers from a queue of preset replies.
///
/// Queued replies are used first, in order. Once the queue is empty the
/// responder set with [`mock_with`](MockTransport::mock_with) answers, and
/// without one every request fails with a network error.
pub struct MockTransport {
    replies: Mutex<VecDeque<MockedReply>>,
    responder: Mutex<Option<Responder>>,
    requests: Mutex<Vec<Request>>,
    delay: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            replies: Mutex::new(VecDeque::new()),
            responder: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    pub fn mock_response(&self, response: Response) {
        self.push(Ok(response), None);
    }

    pub fn mock_json(&self, status: u16, body: &Value) {
        self.mock_response(Response::json(status, body));
    }

    pub fn mock_sequence(&self, responses: Vec<Response>) {
        for response in responses {
            self.mock_response(response);
        }
    }

    pub fn mock_error(&self, error: TransportError) {
        self.push(Err(error), None);
    }

    /// Queues a response that arrives `delay` after the request.
    pub fn mock_delayed_response(&self, response: Response, delay: Duration) {
        self.push(Ok(response), Some(delay));
    }

    /// Answers every request not covered by the queue.
    pub fn mock_with<F>(&self, responder: F)
    where
        F: Fn(&Request) -> Result<Response, TransportError> + Send + Sync + 'static,
    {
        *self.responder.lock() = Some(Arc::new(responder));
    }

    /// Delay applied to replies that have none of their own.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.requests.lock().last().cloned()
    }

    fn push(&self, result: Result<Response, TransportError>, delay: Option<Duration>) {
        self.replies.lock().push_back(MockedReply { result, delay });
    }

    fn next_reply(&self, request: &Request) -> MockedReply {
        if let Some(reply) = self.replies.lock().pop_front() {
            return reply;
        }
        let responder = self.responder.lock().clone();
        let result = match responder {
            Some(responder) => responder(request),
            None => Err(TransportError::Network(format!(
                "no mocked response for {}",
                request.url
            ))),
        };
        MockedReply {
            result,
            delay: None,
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>> {
        let reply = self.next_reply(&request);
        let delay = reply.delay.or(*self.delay.lock());
        self.requests.lock().push(request);
        async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            reply.result
        }
        .boxed()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued", &self.replies.lock().len())
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

/// A host primitive invocation recorded by [`ManualHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    RequestIdle { timeout: Option<Duration> },
    CancelIdle(Handle),
    RequestAnimationFrame,
    CancelAnimationFrame(Handle),
    SetTimeout { delay: Duration },
    ClearTimeout(Handle),
    QueueMicrotask,
}

struct Queued {
    handle: Option<Handle>,
    callback: Callback,
}

/// A [`Host`] that only runs callbacks when told to.
///
/// Every primitive call is recorded. Requested callbacks, whatever their
/// kind, wait in one queue until [`run_pending`](ManualHost::run_pending).
pub struct ManualHost {
    next_handle: AtomicU64,
    calls: Mutex<Vec<HostCall>>,
    queue: Mutex<Vec<Queued>>,
}

impl ManualHost {
    pub fn new() -> Self {
        ManualHost {
            next_handle: AtomicU64::new(1),
            calls: Mutex::new(Vec::new()),
            queue: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs every callback queued so far and returns how many ran.
    ///
    /// Callbacks queued while running wait for the next call.
    pub fn run_pending(&self) -> usize {
        let queued = std::mem::take(&mut *self.queue.lock());
        let count = queued.len();
        for entry in queued {
            (entry.callback)();
        }
        count
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }

    fn enqueue(&self, callback: Callback) -> Handle {
        let handle = Handle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.queue.lock().push(Queued {
            handle: Some(handle),
            callback,
        });
        handle
    }

    fn dequeue(&self, handle: Handle) {
        self.queue.lock().retain(|entry| entry.handle != Some(handle));
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for ManualHost {
    fn request_idle_callback(&self, callback: Callback, timeout: Option<Duration>) -> Handle {
        self.record(HostCall::RequestIdle { timeout });
        self.enqueue(callback)
    }

    fn cancel_idle_callback(&self, handle: Handle) {
        self.record(HostCall::CancelIdle(handle));
        self.dequeue(handle);
    }

    fn request_animation_frame(&self, callback: Callback) -> Handle {
        self.record(HostCall::RequestAnimationFrame);
        self.enqueue(callback)
    }

    fn cancel_animation_frame(&self, handle: Handle) {
        self.record(HostCall::CancelAnimationFrame(handle));
        self.dequeue(handle);
    }

    fn set_timeout(&self, callback: Callback, delay: Duration) -> Handle {
        self.record(HostCall::SetTimeout { delay });
        self.enqueue(callback)
    }

    fn clear_timeout(&self, handle: Handle) {
        self.record(HostCall::ClearTimeout(handle));
        self.dequeue(handle);
    }

    fn queue_microtask(&self, callback: Callback) {
        self.record(HostCall::QueueMicrotask);
        self.queue.lock().push(Queued {
            handle: None,
            callback,
        });
    }
}

impl fmt::Debug for ManualHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualHost")
            .field("calls", &self.calls.lock().len())
            .field("pending", &self.queue.lock().len())
            .finish()
    }
}

/// A [`BatterySource`] fed by hand through a channel.
pub struct ChannelBatterySource {
    connection: Mutex<Option<(BatteryData, mpsc::UnboundedReceiver<BatteryUpdate>)>>,
    supported: bool,
}

impl ChannelBatterySource {
    /// A supported source reporting `initial`, plus the sender for later updates.
    pub fn new(initial: BatteryData) -> (Self, mpsc::UnboundedSender<BatteryUpdate>) {
        let (tx, rx) = mpsc::unbounded();
        let source = ChannelBatterySource {
            connection: Mutex::new(Some((initial, rx))),
            supported: true,
        };
        (source, tx)
    }

    /// A source for a platform without a battery API.
    pub fn unsupported() -> Self {
        ChannelBatterySource {
            connection: Mutex::new(None),
            supported: false,
        }
    }
}

impl BatterySource for ChannelBatterySource {
    fn connect(&self) -> Option<BoxFuture<'static, BatteryConnection>> {
        if !self.supported {
            return None;
        }
        let connection = match self.connection.lock().take() {
            Some((initial, updates)) => BatteryConnection {
                initial,
                updates: updates.boxed(),
            },
            None => return None,
        };
        Some(futures::future::ready(connection).boxed())
    }
}

impl fmt::Debug for ChannelBatterySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelBatterySource")
            .field("supported", &self.supported)
            .finish()
    }
}

/// A [`PermissionSource`] answering every query with one hand-fed state.
pub struct ChannelPermissionSource {
    connection: Mutex<Option<(PermissionState, mpsc::UnboundedReceiver<PermissionState>)>>,
    queried: Mutex<Vec<String>>,
    supported: bool,
}

impl ChannelPermissionSource {
    /// A source answering `initial`, plus the sender for later changes.
    pub fn new(initial: PermissionState) -> (Self, mpsc::UnboundedSender<PermissionState>) {
        let (tx, rx) = mpsc::unbounded();
        let source = ChannelPermissionSource {
            connection: Mutex::new(Some((initial, rx))),
            queried: Mutex::new(Vec::new()),
            supported: true,
        };
        (source, tx)
    }

    /// A source for a platform without a permissions API.
    pub fn unsupported() -> Self {
        ChannelPermissionSource {
            connection: Mutex::new(None),
            queried: Mutex::new(Vec::new()),
            supported: false,
        }
    }

    /// Names queried so far, in order.
    pub fn queried(&self) -> Vec<String> {
        self.queried.lock().clone()
    }
}

impl PermissionSource for ChannelPermissionSource {
    fn query(&self, name: &str) -> Option<BoxFuture<'static, PermissionConnection>> {
        self.queried.lock().push(name.to_string());
        if !self.supported {
            return None;
        }
        let (initial, changes) = self.connection.lock().take()?;
        let connection = PermissionConnection {
            initial,
            changes: changes.boxed(),
        };
        Some(futures::future::ready(connection).boxed())
    }
}

impl fmt::Debug for ChannelPermissionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelPermissionSource")
            .field("supported", &self.supported)
            .field("queried", &self.queried.lock().len())
            .finish()
    }
}
