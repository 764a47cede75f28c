use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// How long one invocation of a measured callback took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub name: String,
    pub start: Instant,
    pub duration: Duration,
}

type OnMeasure = Arc<dyn Fn(&Measure) + Send + Sync>;

/// Wraps a callback and times every invocation.
///
/// Each measurement is logged at debug level and handed to the optional
/// `on_measure` observer.
pub struct MeasuredCallback<F> {
    name: String,
    callback: F,
    on_measure: Option<OnMeasure>,
}

impl<F> MeasuredCallback<F> {
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        MeasuredCallback {
            name: name.into(),
            callback,
            on_measure: None,
        }
    }

    pub fn on_measure<M>(self, on_measure: M) -> Self
    where
        M: Fn(&Measure) + Send + Sync + 'static,
    {
        MeasuredCallback {
            on_measure: Some(Arc::new(on_measure)),
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
    {
        let start = Instant::now();
        let result = (self.callback)(args);
        self.record(start);
        result
    }

    /// Times a callback returning a future, up to the future's completion.
    pub async fn call_async<A, Fut>(&self, args: A) -> Fut::Output
    where
        F: Fn(A) -> Fut,
        Fut: Future,
    {
        let start = Instant::now();
        let result = (self.callback)(args).await;
        self.record(start);
        result
    }

    fn record(&self, start: Instant) {
        let measure = Measure {
            name: self.name.clone(),
            start,
            duration: start.elapsed(),
        };
        debug!(name = %measure.name, duration = ?measure.duration, "callback measured");
        if let Some(on_measure) = &self.on_measure {
            on_measure(&measure);
        }
    }
}

impl<F> fmt::Debug for MeasuredCallback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeasuredCallback")
            .field("name", &self.name)
            .field("on_measure", &self.on_measure.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[tokio::test(start_paused = true)]
    async fn test_sync_call_is_measured() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let double = MeasuredCallback::new("double", |n: i32| n * 2)
            .on_measure(move |m| sink.lock().push(m.clone()));

        assert_eq!(double.call(21), 42);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].name, "double");
        assert_eq!(seen[0].duration, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_call_measures_until_completion() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let slow = MeasuredCallback::new("slow", |delay: Duration| async move {
            tokio::time::sleep(delay).await;
            "done"
        })
        .on_measure(move |m| sink.lock().push(m.duration));

        assert_eq!(slow.call_async(Duration::from_millis(40)).await, "done");
        assert_eq!(*seen.lock(), vec![Duration::from_millis(40)]);
    }
}
