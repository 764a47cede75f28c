use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Opaque token identifying a pending deferred invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    pub fn new(id: u64) -> Self {
        Handle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A deferred unit of work handed to a [`Host`].
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// The scheduling primitives a host environment exposes.
///
/// Each primitive comes as a request/cancel pair. Canceling an unknown or
/// already-fired handle must be a no-op. Microtasks have no handle and
/// cannot be canceled.
pub trait Host: Send + Sync + 'static {
    /// Runs `callback` once the host is idle, or after `timeout` at the latest.
    fn request_idle_callback(&self, callback: Callback, timeout: Option<Duration>) -> Handle;

    fn cancel_idle_callback(&self, handle: Handle);

    /// Runs `callback` on the next animation frame.
    fn request_animation_frame(&self, callback: Callback) -> Handle;

    fn cancel_animation_frame(&self, handle: Handle);

    /// Runs `callback` after `delay`.
    fn set_timeout(&self, callback: Callback, delay: Duration) -> Handle;

    fn clear_timeout(&self, handle: Handle);

    /// Runs `callback` on the next scheduling turn.
    fn queue_microtask(&self, callback: Callback);
}

/// Timing knobs for [`TokioHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokioHostConfig {
    /// Spacing of animation frames, measured from the host's creation.
    pub frame_interval: Duration,
    /// How long the runtime must go without the callback being forced before
    /// an idle callback counts as idle.
    pub idle_delay: Duration,
}

impl Default for TokioHostConfig {
    fn default() -> Self {
        TokioHostConfig {
            frame_interval: Duration::from_millis(16),
            idle_delay: Duration::from_millis(1),
        }
    }
}

/// A [`Host`] built on tokio timers and tasks.
///
/// Every scheduled callback runs on its own spawned task, so all requests must
/// be made from within a tokio runtime.
pub struct TokioHost {
    config: TokioHostConfig,
    epoch: Instant,
    next_handle: AtomicU64,
    pending: Arc<Mutex<HashMap<Handle, CancellationToken>>>,
}

impl TokioHost {
    pub fn new() -> Self {
        Self::with_config(TokioHostConfig::default())
    }

    pub fn with_config(config: TokioHostConfig) -> Self {
        TokioHost {
            config,
            epoch: Instant::now(),
            next_handle: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> TokioHostConfig {
        self.config
    }

    /// Number of callbacks that have been requested but neither fired nor canceled.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn schedule<W>(&self, kind: &'static str, wait: W, callback: Callback) -> Handle
    where
        W: Future<Output = ()> + Send + 'static,
    {
        let handle = Handle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        self.pending.lock().insert(handle, token.clone());

        let pending = self.pending.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(%handle, kind, "scheduled callback canceled");
                }
                _ = wait => {
                    pending.lock().remove(&handle);
                    trace!(%handle, kind, "running scheduled callback");
                    callback();
                }
            }
        });
        handle
    }

    fn cancel(&self, handle: Handle) {
        if let Some(token) = self.pending.lock().remove(&handle) {
            token.cancel();
        }
    }

    fn next_frame(&self) -> Instant {
        let frame = self.config.frame_interval;
        if frame.is_zero() {
            return Instant::now();
        }
        let elapsed = self.epoch.elapsed().as_nanos();
        let frames = elapsed / frame.as_nanos() + 1;
        let offset = frame.as_nanos().saturating_mul(frames);
        self.epoch + Duration::from_nanos(u64::try_from(offset).unwrap_or(u64::MAX))
    }
}

impl Default for TokioHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokioHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioHost")
            .field("config", &self.config)
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Host for TokioHost {
    fn request_idle_callback(&self, callback: Callback, timeout: Option<Duration>) -> Handle {
        let delay = match timeout {
            Some(timeout) => timeout.min(self.config.idle_delay),
            None => self.config.idle_delay,
        };
        let wait = async move {
            // Let already-queued work run first.
            tokio::task::yield_now().await;
            tokio::time::sleep(delay).await;
        };
        self.schedule("idle", wait, callback)
    }

    fn cancel_idle_callback(&self, handle: Handle) {
        self.cancel(handle);
    }

    fn request_animation_frame(&self, callback: Callback) -> Handle {
        let at = self.next_frame();
        self.schedule("animation", tokio::time::sleep_until(at), callback)
    }

    fn cancel_animation_frame(&self, handle: Handle) {
        self.cancel(handle);
    }

    fn set_timeout(&self, callback: Callback, delay: Duration) -> Handle {
        self.schedule("timeout", tokio::time::sleep(delay), callback)
    }

    fn clear_timeout(&self, handle: Handle) {
        self.cancel(handle);
    }

    fn queue_microtask(&self, callback: Callback) {
        tokio::spawn(async move {
            callback();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Callback) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (
            count,
            Box::new(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_after_delay() {
        let host = TokioHost::new();
        let (count, callback) = counter();
        host.set_timeout(callback, Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(49)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(host.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_timeout_prevents_callback() {
        let host = TokioHost::new();
        let (count, callback) = counter();
        let handle = host.set_timeout(callback, Duration::from_millis(50));
        host.clear_timeout(handle);
        host.clear_timeout(handle);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(host.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_frame_aligns_to_frame_interval() {
        let host = TokioHost::new();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (count, callback) = counter();
        host.request_animation_frame(callback);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_callback_can_be_canceled() {
        let host = TokioHost::new();
        let (count, callback) = counter();
        let handle = host.request_idle_callback(callback, Some(Duration::from_millis(100)));
        host.cancel_idle_callback(handle);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handles_are_unique() {
        let host = TokioHost::new();
        let a = host.set_timeout(Box::new(|| {}), Duration::from_millis(1));
        let b = host.request_animation_frame(Box::new(|| {}));
        let c = host.request_idle_callback(Box::new(|| {}), None);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }
}
