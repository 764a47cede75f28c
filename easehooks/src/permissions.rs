use crate::state_store::StateStore;
use crate::stream_ext::StateStreamExt;
use crate::{State, StoreError};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use futures_signals::signal::{MutableSignalCloned, SignalStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// What the platform reports for one permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionStatus {
    /// The query has not answered yet.
    #[default]
    Unknown,
    /// The platform cannot be asked about this permission.
    Unsupported,
    Known(PermissionState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionAction {
    Unsupported,
    Changed(PermissionState),
}

impl PermissionStatus {
    pub fn reduce(self, action: PermissionAction) -> Self {
        match action {
            PermissionAction::Unsupported => PermissionStatus::Unsupported,
            PermissionAction::Changed(state) => PermissionStatus::Known(state),
        }
    }

    /// Only an explicit grant counts; a pending prompt does not.
    pub fn has_permission(&self) -> bool {
        matches!(self, PermissionStatus::Known(PermissionState::Granted))
    }

    pub fn state(&self) -> Option<PermissionState> {
        match self {
            PermissionStatus::Known(state) => Some(*state),
            _ => None,
        }
    }
}

impl State for PermissionStatus {}

/// An answered permission query: the state at query time plus later changes.
pub struct PermissionConnection {
    pub initial: PermissionState,
    pub changes: BoxStream<'static, PermissionState>,
}

/// The platform's permissions API.
pub trait PermissionSource: Send + Sync + 'static {
    /// Returns `None` when the platform cannot be queried for `name`.
    fn query(&self, name: &str) -> Option<BoxFuture<'static, PermissionConnection>>;
}

/// Tracks one named permission through a [`PermissionSource`] until dropped.
pub struct PermissionMonitor {
    name: String,
    store: StateStore<PermissionStatus>,
    token: CancellationToken,
}

impl PermissionMonitor {
    /// Queries `name` and follows its changes. Must run inside a tokio runtime.
    pub fn start(source: &dyn PermissionSource, name: impl Into<String>) -> Self {
        let name = name.into();
        let store = StateStore::new(PermissionStatus::Unknown);
        let token = CancellationToken::new();

        match source.query(&name) {
            None => {
                debug!(permission = %name, "permission cannot be queried");
                let _ = store.set_state(|state| state.reduce(PermissionAction::Unsupported));
            }
            Some(querying) => {
                let setter = store.setter();
                let token = token.clone();
                let permission = name.clone();
                tokio::spawn(async move {
                    let connection = tokio::select! {
                        biased;
                        _ = token.cancelled() => return,
                        connection = querying => connection,
                    };
                    let mut next = Some(connection.initial);
                    let mut changes = connection.changes;
                    while let Some(current) = next {
                        trace!(%permission, ?current, "permission state");
                        if setter
                            .set_state(move |state| state.reduce(PermissionAction::Changed(current)))
                            .is_err()
                        {
                            break;
                        }
                        next = tokio::select! {
                            biased;
                            _ = token.cancelled() => None,
                            change = changes.next() => change,
                        };
                    }
                    trace!(%permission, "permission monitor stopped");
                });
            }
        }

        PermissionMonitor { name, store, token }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> PermissionStatus {
        self.store.get_state()
    }

    pub fn has_permission(&self) -> bool {
        self.state().has_permission()
    }

    pub async fn await_state(&self) -> Result<PermissionStatus, StoreError> {
        self.store.await_state().await
    }

    /// Waits until the query has answered or turned out to be unsupported.
    pub async fn ready(&self) -> Result<PermissionStatus, StoreError> {
        self.store.await_state().await?;
        let mut states = self.store.to_stream();
        states.next_settled().await.ok_or(StoreError::Closed)
    }

    pub fn to_signal(&self) -> MutableSignalCloned<PermissionStatus> {
        self.store.to_signal()
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<PermissionStatus>> {
        self.store.to_stream()
    }
}

impl Drop for PermissionMonitor {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_granted_counts() {
        let granted = PermissionStatus::default().reduce(PermissionAction::Changed(PermissionState::Granted));
        assert!(granted.has_permission());
        assert_eq!(granted.state(), Some(PermissionState::Granted));

        let prompt = granted.reduce(PermissionAction::Changed(PermissionState::Prompt));
        assert!(!prompt.has_permission());

        assert!(!PermissionStatus::Unknown.has_permission());
        assert!(!PermissionStatus::Unsupported.has_permission());
        assert!(!PermissionStatus::Known(PermissionState::Denied).has_permission());
    }

    #[test]
    fn test_unsupported_has_no_state() {
        let status = PermissionStatus::Unknown.reduce(PermissionAction::Unsupported);
        assert_eq!(status, PermissionStatus::Unsupported);
        assert_eq!(status.state(), None);
    }
}
