use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use tracing::trace;

/// Something that can be told to stop producing an observable result.
pub(crate) trait CancelTarget: Send + Sync {
    fn cancel(&self);
}

enum Outcome<T, E> {
    Pending,
    Settled(Result<T, E>),
    Taken,
}

struct PromiseState<T, E> {
    canceled: bool,
    outcome: Outcome<T, E>,
    waker: Option<Waker>,
}

struct Shared<T, E> {
    state: Mutex<PromiseState<T, E>>,
}

impl<T, E> Shared<T, E> {
    fn settle(&self, result: Result<T, E>) -> bool {
        let mut state = self.state.lock();
        if state.canceled {
            trace!("settlement dropped, promise was canceled");
            return false;
        }
        if !matches!(state.outcome, Outcome::Pending) {
            return false;
        }
        state.outcome = Outcome::Settled(result);
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
        true
    }
}

impl<T: Send, E: Send> CancelTarget for Shared<T, E> {
    fn cancel(&self) {
        let mut state = self.state.lock();
        state.canceled = true;
        if matches!(state.outcome, Outcome::Pending) {
            // Nothing will ever wake this promise again.
            state.waker = None;
        }
    }
}

/// A future whose settlement can be suppressed.
///
/// The promise is driven by a [`Settle`] handle given to its executor. Once
/// [`cancel`](CancelablePromise::cancel) is called, any later resolve or reject
/// is dropped silently and the promise stays pending forever, so code awaiting
/// it never observes a value or an error. A value accepted before cancellation
/// stays observable.
///
/// ```
/// use easehooks::CancelablePromise;
/// use futures::FutureExt;
///
/// let promise = CancelablePromise::<i32, String>::new(|settle| {
///     settle.resolve(1);
/// });
/// assert_eq!(promise.now_or_never(), Some(Ok(1)));
/// ```
#[must_use = "Futures do nothing unless polled"]
pub struct CancelablePromise<T, E> {
    shared: Arc<Shared<T, E>>,
}

/// The guarded resolve/reject pair handed to a promise's executor.
///
/// Only the first accepted settlement counts; every call after cancellation
/// or after a prior settlement returns `false` and changes nothing.
pub struct Settle<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Settle<T, E> {
    fn clone(&self) -> Self {
        Settle {
            shared: self.shared.clone(),
        }
    }
}

impl<T, E> Settle<T, E> {
    pub fn resolve(&self, value: T) -> bool {
        self.shared.settle(Ok(value))
    }

    pub fn reject(&self, reason: E) -> bool {
        self.shared.settle(Err(reason))
    }

    pub fn settle(&self, result: Result<T, E>) -> bool {
        self.shared.settle(result)
    }
}

impl<T, E> CancelablePromise<T, E> {
    /// Builds a promise and runs `executor` right away with its [`Settle`] handle.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Settle<T, E>),
    {
        let (promise, settle) = Self::with_settle();
        executor(settle);
        promise
    }

    /// Builds a promise and returns its [`Settle`] handle alongside it.
    pub fn with_settle() -> (Self, Settle<T, E>) {
        let shared = Arc::new(Shared {
            state: Mutex::new(PromiseState {
                canceled: false,
                outcome: Outcome::Pending,
                waker: None,
            }),
        });
        (
            CancelablePromise {
                shared: shared.clone(),
            },
            Settle { shared },
        )
    }

    pub fn is_canceled(&self) -> bool {
        self.shared.state.lock().canceled
    }

    /// Returns true once a value or an error has been accepted.
    pub fn is_settled(&self) -> bool {
        !matches!(self.shared.state.lock().outcome, Outcome::Pending)
    }
}

impl<T: Send + 'static, E: Send + 'static> CancelablePromise<T, E> {
    /// Marks the promise canceled. Idempotent.
    pub fn cancel(&self) {
        CancelTarget::cancel(self.shared.as_ref());
    }

    /// Returns a handle that cancels this promise from elsewhere, for instance
    /// after the promise itself has been moved into an awaiting task.
    pub fn canceler(&self) -> Canceler {
        Canceler::new(vec![self.cancel_target()])
    }

    pub(crate) fn cancel_target(&self) -> Arc<dyn CancelTarget> {
        self.shared.clone()
    }
}

impl<T, E> Future for CancelablePromise<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.state.lock();
        match std::mem::replace(&mut state.outcome, Outcome::Taken) {
            Outcome::Settled(result) => Poll::Ready(result),
            Outcome::Pending => {
                state.outcome = Outcome::Pending;
                if !state.canceled {
                    state.waker = Some(cx.waker().clone());
                }
                Poll::Pending
            }
            Outcome::Taken => Poll::Pending,
        }
    }
}

impl<T, E> fmt::Debug for CancelablePromise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        let outcome = match state.outcome {
            Outcome::Pending => "pending",
            Outcome::Settled(Ok(_)) => "resolved",
            Outcome::Settled(Err(_)) => "rejected",
            Outcome::Taken => "taken",
        };
        f.debug_struct("CancelablePromise")
            .field("canceled", &state.canceled)
            .field("outcome", &outcome)
            .finish()
    }
}

/// A cloneable handle that cancels a promise.
#[derive(Clone)]
pub struct Canceler {
    targets: Vec<Arc<dyn CancelTarget>>,
}

impl Canceler {
    pub(crate) fn new(targets: Vec<Arc<dyn CancelTarget>>) -> Self {
        Canceler { targets }
    }

    pub fn cancel(&self) {
        for target in &self.targets {
            target.cancel();
        }
    }
}

impl fmt::Debug for Canceler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceler")
            .field("targets", &self.targets.len())
            .finish()
    }
}
