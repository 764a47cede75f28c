use crate::state_store::StateStore;
use crate::stream_ext::StateStreamExt;
use crate::{State, StoreError};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::StreamExt;
use futures_signals::signal::{MutableSignalCloned, SignalStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatteryAvailability {
    Unknown,
    Unavailable,
    Loading,
    Available,
}

/// A reading of the battery manager's fields.
///
/// Times are in seconds and may be infinite, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryData {
    pub charging: bool,
    pub charging_time: f64,
    pub discharging_time: f64,
    pub level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatteryState {
    Unknown,
    Unavailable,
    Loading,
    Available(BatteryData),
}

/// A change to one battery field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatteryUpdate {
    Level(f64),
    Charging(bool),
    ChargingTime(f64),
    DischargingTime(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatteryAction {
    Unavailable,
    Loading,
    ManagerLoaded(BatteryData),
    Update(BatteryUpdate),
}

impl BatteryState {
    pub fn reduce(self, action: BatteryAction) -> Self {
        match action {
            BatteryAction::Unavailable => BatteryState::Unavailable,
            BatteryAction::Loading => BatteryState::Loading,
            BatteryAction::ManagerLoaded(data) => BatteryState::Available(data),
            BatteryAction::Update(update) => match self {
                BatteryState::Available(data) => BatteryState::Available(data.apply(update)),
                other => {
                    trace!(?update, "battery update before the manager loaded");
                    other
                }
            },
        }
    }

    pub fn availability(&self) -> BatteryAvailability {
        match self {
            BatteryState::Unknown => BatteryAvailability::Unknown,
            BatteryState::Unavailable => BatteryAvailability::Unavailable,
            BatteryState::Loading => BatteryAvailability::Loading,
            BatteryState::Available(_) => BatteryAvailability::Available,
        }
    }

    pub fn data(&self) -> Option<&BatteryData> {
        match self {
            BatteryState::Available(data) => Some(data),
            _ => None,
        }
    }
}

impl Default for BatteryState {
    fn default() -> Self {
        BatteryState::Unknown
    }
}

impl State for BatteryState {}

impl BatteryData {
    fn apply(self, update: BatteryUpdate) -> Self {
        match update {
            BatteryUpdate::Level(level) => BatteryData { level, ..self },
            BatteryUpdate::Charging(charging) => BatteryData { charging, ..self },
            BatteryUpdate::ChargingTime(charging_time) => BatteryData {
                charging_time,
                ..self
            },
            BatteryUpdate::DischargingTime(discharging_time) => BatteryData {
                discharging_time,
                ..self
            },
        }
    }
}

/// A live battery manager: its first reading plus a stream of field changes.
pub struct BatteryConnection {
    pub initial: BatteryData,
    pub updates: BoxStream<'static, BatteryUpdate>,
}

/// The platform's battery status API.
pub trait BatterySource: Send + Sync + 'static {
    /// Returns `None` when the platform has no battery API at all.
    fn connect(&self) -> Option<BoxFuture<'static, BatteryConnection>>;
}

/// Tracks the battery through a [`BatterySource`] until dropped.
pub struct BatteryMonitor {
    store: StateStore<BatteryState>,
    token: CancellationToken,
}

impl BatteryMonitor {
    /// Starts monitoring. Must run inside a tokio runtime.
    pub fn start(source: &dyn BatterySource) -> Self {
        let store = StateStore::new(BatteryState::Unknown);
        let token = CancellationToken::new();

        match source.connect() {
            None => {
                debug!("battery status API unavailable");
                let _ = store.set_state(|state| state.reduce(BatteryAction::Unavailable));
            }
            Some(connecting) => {
                let _ = store.set_state(|state| state.reduce(BatteryAction::Loading));
                let setter = store.setter();
                let token = token.clone();
                tokio::spawn(async move {
                    let connection = tokio::select! {
                        biased;
                        _ = token.cancelled() => return,
                        connection = connecting => connection,
                    };
                    let initial = connection.initial;
                    if setter
                        .set_state(move |state| state.reduce(BatteryAction::ManagerLoaded(initial)))
                        .is_err()
                    {
                        return;
                    }

                    let mut updates = connection.updates;
                    loop {
                        let update = tokio::select! {
                            biased;
                            _ = token.cancelled() => break,
                            update = updates.next() => update,
                        };
                        let Some(update) = update else {
                            break;
                        };
                        if setter
                            .set_state(move |state| state.reduce(BatteryAction::Update(update)))
                            .is_err()
                        {
                            break;
                        }
                    }
                    trace!("battery monitor stopped");
                });
            }
        }

        BatteryMonitor { store, token }
    }

    pub fn state(&self) -> BatteryState {
        self.store.get_state()
    }

    pub async fn await_state(&self) -> Result<BatteryState, StoreError> {
        self.store.await_state().await
    }

    /// Waits until the battery is known to be available or unavailable.
    pub async fn ready(&self) -> Result<BatteryState, StoreError> {
        self.store.await_state().await?;
        let mut states = self.store.to_stream();
        states.next_settled().await.ok_or(StoreError::Closed)
    }

    pub fn to_signal(&self) -> MutableSignalCloned<BatteryState> {
        self.store.to_signal()
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<BatteryState>> {
        self.store.to_stream()
    }
}

impl Drop for BatteryMonitor {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> BatteryData {
        BatteryData {
            charging: false,
            charging_time: f64::INFINITY,
            discharging_time: 3600.0,
            level: 0.5,
        }
    }

    #[test]
    fn test_manager_loaded_makes_data_available() {
        let state = BatteryState::default()
            .reduce(BatteryAction::Loading)
            .reduce(BatteryAction::ManagerLoaded(reading()));
        assert_eq!(state.availability(), BatteryAvailability::Available);
        assert_eq!(state.data(), Some(&reading()));
    }

    #[test]
    fn test_updates_change_one_field() {
        let state = BatteryState::Available(reading())
            .reduce(BatteryAction::Update(BatteryUpdate::Level(0.4)))
            .reduce(BatteryAction::Update(BatteryUpdate::Charging(true)));
        let data = state.data().copied().unwrap();
        assert_eq!(data.level, 0.4);
        assert!(data.charging);
        assert_eq!(data.discharging_time, 3600.0);
    }

    #[test]
    fn test_updates_without_data_are_ignored() {
        let state = BatteryState::Loading.reduce(BatteryAction::Update(BatteryUpdate::Level(0.1)));
        assert_eq!(state, BatteryState::Loading);
    }

    #[test]
    fn test_unavailable() {
        let state = BatteryState::default().reduce(BatteryAction::Unavailable);
        assert_eq!(state.availability(), BatteryAvailability::Unavailable);
        assert!(state.data().is_none());
    }
}
