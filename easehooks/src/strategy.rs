use crate::host::{Callback, Handle, Host};
use std::time::Duration;
use tracing::trace;

/// Names of the available delay strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StrategyKind {
    /// Run when the host is idle.
    #[default]
    Idle,
    /// Run on the next animation frame.
    Animation,
    /// Run after a fixed delay.
    Timeout,
    /// Run on the next scheduling turn. Cannot be canceled once requested.
    Resolve,
}

/// Options chosen when wrapping a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DelayedCallbackOptions {
    pub strategy: StrategyKind,
    /// Deadline for `Idle`, delay for `Timeout`; ignored by the others.
    pub timeout: Option<Duration>,
}

impl DelayedCallbackOptions {
    pub fn idle() -> Self {
        DelayedCallbackOptions {
            strategy: StrategyKind::Idle,
            timeout: None,
        }
    }

    pub fn animation() -> Self {
        DelayedCallbackOptions {
            strategy: StrategyKind::Animation,
            timeout: None,
        }
    }

    pub fn timeout(delay: Duration) -> Self {
        DelayedCallbackOptions {
            strategy: StrategyKind::Timeout,
            timeout: Some(delay),
        }
    }

    pub fn resolve() -> Self {
        DelayedCallbackOptions {
            strategy: StrategyKind::Resolve,
            timeout: None,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        DelayedCallbackOptions {
            timeout: Some(timeout),
            ..self
        }
    }
}

/// A resolved delay strategy: which host primitive to use and with what options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayStrategy {
    Idle { timeout: Option<Duration> },
    Animation,
    Timeout { delay: Duration },
    Resolve,
}

impl DelayStrategy {
    pub fn from_options(options: &DelayedCallbackOptions) -> Self {
        match options.strategy {
            StrategyKind::Idle => DelayStrategy::Idle {
                timeout: options.timeout,
            },
            StrategyKind::Animation => DelayStrategy::Animation,
            StrategyKind::Timeout => DelayStrategy::Timeout {
                delay: options.timeout.unwrap_or(Duration::ZERO),
            },
            StrategyKind::Resolve => DelayStrategy::Resolve,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            DelayStrategy::Idle { .. } => StrategyKind::Idle,
            DelayStrategy::Animation => StrategyKind::Animation,
            DelayStrategy::Timeout { .. } => StrategyKind::Timeout,
            DelayStrategy::Resolve => StrategyKind::Resolve,
        }
    }

    /// Whether a requested callback can still be stopped through its handle.
    pub fn supports_cancel(&self) -> bool {
        !matches!(self, DelayStrategy::Resolve)
    }

    /// Schedules `callback` on `host`. Returns `None` when the strategy hands
    /// out no handle.
    pub fn request(&self, host: &dyn Host, callback: Callback) -> Option<Handle> {
        match *self {
            DelayStrategy::Idle { timeout } => Some(host.request_idle_callback(callback, timeout)),
            DelayStrategy::Animation => Some(host.request_animation_frame(callback)),
            DelayStrategy::Timeout { delay } => Some(host.set_timeout(callback, delay)),
            DelayStrategy::Resolve => {
                host.queue_microtask(callback);
                None
            }
        }
    }

    pub fn cancel(&self, host: &dyn Host, handle: Handle) {
        match self {
            DelayStrategy::Idle { .. } => host.cancel_idle_callback(handle),
            DelayStrategy::Animation => host.cancel_animation_frame(handle),
            DelayStrategy::Timeout { .. } => host.clear_timeout(handle),
            DelayStrategy::Resolve => {
                trace!(%handle, "resolve strategy cannot cancel a requested callback");
            }
        }
    }
}

impl From<DelayedCallbackOptions> for DelayStrategy {
    fn from(options: DelayedCallbackOptions) -> Self {
        DelayStrategy::from_options(&options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{HostCall, ManualHost};

    #[test]
    fn test_default_options_use_idle() {
        let strategy = DelayStrategy::from_options(&DelayedCallbackOptions::default());
        assert_eq!(strategy, DelayStrategy::Idle { timeout: None });
    }

    #[test]
    fn test_timeout_defaults_to_zero_delay() {
        let options = DelayedCallbackOptions {
            strategy: StrategyKind::Timeout,
            timeout: None,
        };
        assert_eq!(
            DelayStrategy::from(options),
            DelayStrategy::Timeout {
                delay: Duration::ZERO
            }
        );
    }

    #[test]
    fn test_animation_ignores_timeout() {
        let options = DelayedCallbackOptions::animation().with_timeout(Duration::from_secs(1));
        assert_eq!(DelayStrategy::from(options), DelayStrategy::Animation);
    }

    #[test]
    fn test_each_strategy_uses_its_own_primitives() {
        let host = ManualHost::new();
        let idle = DelayStrategy::Idle {
            timeout: Some(Duration::from_millis(30)),
        };
        let animation = DelayStrategy::Animation;
        let timeout = DelayStrategy::Timeout {
            delay: Duration::from_millis(5),
        };

        let h1 = idle.request(&host, Box::new(|| {})).unwrap();
        let h2 = animation.request(&host, Box::new(|| {})).unwrap();
        let h3 = timeout.request(&host, Box::new(|| {})).unwrap();
        assert!(DelayStrategy::Resolve.request(&host, Box::new(|| {})).is_none());

        idle.cancel(&host, h1);
        animation.cancel(&host, h2);
        timeout.cancel(&host, h3);
        DelayStrategy::Resolve.cancel(&host, h3);

        assert_eq!(
            host.calls(),
            vec![
                HostCall::RequestIdle {
                    timeout: Some(Duration::from_millis(30))
                },
                HostCall::RequestAnimationFrame,
                HostCall::SetTimeout {
                    delay: Duration::from_millis(5)
                },
                HostCall::QueueMicrotask,
                HostCall::CancelIdle(h1),
                HostCall::CancelAnimationFrame(h2),
                HostCall::ClearTimeout(h3),
            ]
        );
    }

    #[test]
    fn test_only_resolve_lacks_cancellation() {
        assert!(DelayStrategy::Animation.supports_cancel());
        assert!(DelayStrategy::Idle { timeout: None }.supports_cancel());
        assert!(!DelayStrategy::Resolve.supports_cancel());
    }
}
