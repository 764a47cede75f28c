use crate::cancelable::{CancelTarget, CancelablePromise, Canceler, Settle};
use crate::host::{Handle, Host};
use crate::strategy::{DelayStrategy, DelayedCallbackOptions};
use crate::{CallbackError, CallbackResult};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, trace};

type SyncInvoke<A, T> = Arc<dyn Fn(A) -> Result<T, CallbackError> + Send + Sync>;
type AsyncInvoke<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<T, CallbackError>> + Send + Sync>;

enum Invoke<A, T> {
    Sync(SyncInvoke<A, T>),
    Async(AsyncInvoke<A, T>),
}

impl<A, T> Clone for Invoke<A, T> {
    fn clone(&self) -> Self {
        match self {
            Invoke::Sync(f) => Invoke::Sync(f.clone()),
            Invoke::Async(f) => Invoke::Async(f.clone()),
        }
    }
}

impl<A: Send + 'static, T: Send + 'static> Invoke<A, T> {
    fn run(self, args: A, settle: Settle<T, CallbackError>) {
        match self {
            Invoke::Sync(f) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| f(args)))
                    .unwrap_or_else(|panic| Err(CallbackError::from_panic(panic)));
                settle.settle(outcome);
            }
            Invoke::Async(f) => match catch_unwind(AssertUnwindSafe(|| f(args))) {
                Ok(future) => {
                    tokio::spawn(async move {
                        let outcome = AssertUnwindSafe(future)
                            .catch_unwind()
                            .await
                            .unwrap_or_else(|panic| Err(CallbackError::from_panic(panic)));
                        settle.settle(outcome);
                    });
                }
                Err(panic) => {
                    settle.settle(Err(CallbackError::from_panic(panic)));
                }
            },
        }
    }
}

/// The invocations of one wrapper that still hold a host handle.
#[derive(Default)]
struct HandleRegistry {
    scheduled: Mutex<HashMap<Handle, Arc<Scheduled>>>,
}

impl HandleRegistry {
    fn insert(&self, handle: Handle, scheduled: Arc<Scheduled>) {
        self.scheduled.lock().insert(handle, scheduled);
    }

    fn remove(&self, handle: Handle) {
        self.scheduled.lock().remove(&handle);
    }

    fn len(&self) -> usize {
        self.scheduled.lock().len()
    }

    fn drain(&self) -> Vec<Arc<Scheduled>> {
        self.scheduled.lock().drain().map(|(_, scheduled)| scheduled).collect()
    }
}

struct Slot {
    handle: Option<Handle>,
    fired: bool,
}

/// Scheduling bookkeeping for a single invocation, tied to its promise.
struct Scheduled {
    slot: Mutex<Slot>,
    strategy: DelayStrategy,
    host: Arc<dyn Host>,
    registry: Arc<HandleRegistry>,
    promise: Arc<dyn CancelTarget>,
}

impl Scheduled {
    /// Records the handle the host returned, unless the callback already ran.
    fn attach(self: &Arc<Self>, handle: Option<Handle>) {
        let Some(handle) = handle else {
            return;
        };
        let mut slot = self.slot.lock();
        if slot.fired {
            return;
        }
        slot.handle = Some(handle);
        self.registry.insert(handle, self.clone());
    }

    fn fire(&self) {
        let handle = {
            let mut slot = self.slot.lock();
            slot.fired = true;
            slot.handle.take()
        };
        if let Some(handle) = handle {
            self.registry.remove(handle);
        }
    }

    fn handle(&self) -> Option<Handle> {
        self.slot.lock().handle
    }
}

impl CancelTarget for Scheduled {
    /// Withdraws the invocation from the host when the strategy allows it,
    /// then suppresses the promise's settlement.
    fn cancel(&self) {
        let handle = self.slot.lock().handle.take();
        if let Some(handle) = handle {
            trace!(%handle, strategy = ?self.strategy.kind(), "canceling scheduled invocation");
            self.strategy.cancel(self.host.as_ref(), handle);
            self.registry.remove(handle);
        }
        self.promise.cancel();
    }
}

/// The promise returned by each call of a [`DelayedCallback`].
///
/// Canceling it first withdraws the scheduled invocation from the host (when
/// the strategy allows it) and then suppresses settlement.
#[must_use = "Futures do nothing unless polled"]
pub struct DelayedPromise<T> {
    promise: CancelablePromise<T, CallbackError>,
    scheduled: Arc<Scheduled>,
}

impl<T: Send + 'static> DelayedPromise<T> {
    pub fn cancel(&self) {
        self.scheduled.cancel();
    }

    pub fn canceler(&self) -> Canceler {
        let scheduled: Arc<dyn CancelTarget> = self.scheduled.clone();
        Canceler::new(vec![scheduled])
    }

    pub fn is_canceled(&self) -> bool {
        self.promise.is_canceled()
    }

    pub fn is_settled(&self) -> bool {
        self.promise.is_settled()
    }

    /// The host handle while the invocation is still waiting to run.
    pub fn handle(&self) -> Option<Handle> {
        self.scheduled.handle()
    }
}

impl<T> Future for DelayedPromise<T> {
    type Output = Result<T, CallbackError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.promise).poll(cx)
    }
}

impl<T> fmt::Debug for DelayedPromise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedPromise")
            .field("strategy", &self.scheduled.strategy)
            .field("promise", &self.promise)
            .finish()
    }
}

/// Wraps a callback so every call is deferred through a [`DelayStrategy`].
///
/// Each [`call`](DelayedCallback::call) returns a [`DelayedPromise`] right
/// away. The promise resolves with the callback's value, or rejects when the
/// callback returns an error, `None`, or panics. Handles of invocations that
/// have not run yet are tracked, and all of them are canceled when the
/// wrapper is dropped.
///
/// ```no_run
/// use easehooks::{DelayedCallback, DelayedCallbackOptions, TokioHost};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn run() {
/// let delayed: DelayedCallback<(), &str> = DelayedCallback::new(
///     Arc::new(TokioHost::new()),
///     DelayedCallbackOptions::timeout(Duration::from_millis(10)),
///     |_| "foo",
/// );
/// assert_eq!(delayed.call(()).await, Ok("foo"));
/// # }
/// ```
pub struct DelayedCallback<A, T> {
    name: String,
    invoke: Invoke<A, T>,
    strategy: DelayStrategy,
    host: Arc<dyn Host>,
    registry: Arc<HandleRegistry>,
}

impl<A, T> DelayedCallback<A, T>
where
    A: Send + 'static,
    T: Send + 'static,
{
    /// Wraps a synchronous callback.
    pub fn new<F, R>(host: Arc<dyn Host>, options: DelayedCallbackOptions, callback: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
        R: CallbackResult<T>,
    {
        let invoke = Invoke::Sync(Arc::new(move |args| {
            <R as CallbackResult<T>>::into_result(callback(args))
        }));
        Self::from_invoke(host, options, invoke)
    }

    /// Wraps a callback returning a future; the promise settles with the
    /// future's output.
    pub fn new_async<F, Fut, R>(
        host: Arc<dyn Host>,
        options: DelayedCallbackOptions,
        callback: F,
    ) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: CallbackResult<T> + 'static,
    {
        let invoke = Invoke::Async(Arc::new(move |args| {
            callback(args)
                .map(<R as CallbackResult<T>>::into_result)
                .boxed()
        }));
        Self::from_invoke(host, options, invoke)
    }

    fn from_invoke(host: Arc<dyn Host>, options: DelayedCallbackOptions, invoke: Invoke<A, T>) -> Self {
        DelayedCallback {
            name: "delayed(anonymous)".to_string(),
            invoke,
            strategy: DelayStrategy::from_options(&options),
            host,
            registry: Arc::new(HandleRegistry::default()),
        }
    }

    /// Names the wrapper after the callback it wraps.
    pub fn named(mut self, callback_name: &str) -> Self {
        self.name = format!("delayed({callback_name})");
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategy(&self) -> DelayStrategy {
        self.strategy
    }

    /// Switches the strategy used by later calls. Invocations already
    /// scheduled keep the strategy they were scheduled with.
    pub fn set_options(&mut self, options: DelayedCallbackOptions) {
        self.strategy = DelayStrategy::from_options(&options);
    }

    /// Number of invocations still waiting on a cancelable host handle.
    pub fn active_handles(&self) -> usize {
        self.registry.len()
    }

    pub fn call(&self, args: A) -> DelayedPromise<T> {
        let (promise, settle) = CancelablePromise::with_settle();
        let scheduled = Arc::new(Scheduled {
            slot: Mutex::new(Slot {
                handle: None,
                fired: false,
            }),
            strategy: self.strategy,
            host: self.host.clone(),
            registry: self.registry.clone(),
            promise: promise.cancel_target(),
        });

        let job = {
            let scheduled = scheduled.clone();
            let invoke = self.invoke.clone();
            Box::new(move || {
                scheduled.fire();
                invoke.run(args, settle);
            })
        };

        let handle = self.strategy.request(self.host.as_ref(), job);
        trace!(name = %self.name, ?handle, strategy = ?self.strategy.kind(), "callback scheduled");
        scheduled.attach(handle);

        DelayedPromise { promise, scheduled }
    }

    /// Cancels every invocation that is still waiting to run, along with
    /// its promise.
    pub fn cancel_all(&self) {
        let outstanding = self.registry.drain();
        if outstanding.is_empty() {
            return;
        }
        debug!(name = %self.name, count = outstanding.len(), "canceling outstanding callbacks");
        for scheduled in outstanding {
            scheduled.cancel();
        }
    }
}

impl<A, T> Drop for DelayedCallback<A, T> {
    fn drop(&mut self) {
        for scheduled in self.registry.drain() {
            scheduled.cancel();
        }
    }
}

impl<A, T> fmt::Debug for DelayedCallback<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedCallback")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("active_handles", &self.registry.len())
            .finish()
    }
}
