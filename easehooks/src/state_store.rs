use crate::{State, StoreError};
use futures_signals::signal::{Mutable, MutableSignalCloned, SignalExt, SignalStream};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::trace;

type Reducer<S> = Box<dyn FnOnce(S) -> S + Send>;
type Reader<S> = Box<dyn FnOnce(S) + Send>;

/// One queued operation on a store.
enum Command<S> {
    Reduce(Reducer<S>),
    Read(Reader<S>),
}

/// Owns a piece of state and serialises every change to it.
///
/// Reducers and reads share one FIFO queue drained by a background task, so
/// the store is the only writer of its state and a read observes exactly the
/// reducers queued before it. Observers subscribe through
/// [`to_signal`](StateStore::to_signal), which is how they get told to
/// re-render.
pub struct StateStore<S: State> {
    state: Mutable<S>,
    commands: UnboundedSender<Command<S>>,
}

impl<S: State> StateStore<S> {
    /// Creates the store and spawns its queue. Must run inside a tokio runtime.
    pub fn new(initial_state: S) -> Self {
        let state = Mutable::new(initial_state);
        let (commands, queue) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(drain(state.clone(), queue));
        StateStore { state, commands }
    }

    /// Queues a reducer.
    pub fn set_state<F>(&self, reducer: F) -> Result<(), StoreError>
    where
        F: FnOnce(S) -> S + Send + 'static,
    {
        send(&self.commands, Command::Reduce(Box::new(reducer)))
    }

    /// Queues a read that runs after every reducer queued before it.
    pub fn with_state<F>(&self, reader: F) -> Result<(), StoreError>
    where
        F: FnOnce(S) + Send + 'static,
    {
        send(&self.commands, Command::Read(Box::new(reader)))
    }

    /// Snapshot of the state as of now, ignoring reducers still queued.
    pub fn get_state(&self) -> S {
        self.state.get_cloned()
    }

    /// Resolves with the state once every reducer queued so far has run.
    pub async fn await_state(&self) -> Result<S, StoreError> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.with_state(|state| {
            let _ = tx.send(state);
        })?;
        rx.await.map_err(|_| StoreError::Closed)
    }

    /// Current state followed by every later change.
    pub fn to_signal(&self) -> MutableSignalCloned<S> {
        self.state.signal_cloned()
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<S>> {
        self.to_signal().to_stream()
    }

    pub(crate) fn setter(&self) -> StateSetter<S> {
        StateSetter {
            commands: self.commands.clone(),
        }
    }
}

async fn drain<S: State>(state: Mutable<S>, mut queue: UnboundedReceiver<Command<S>>) {
    while let Some(command) = queue.recv().await {
        match command {
            Command::Reduce(reducer) => {
                let next = reducer(state.get_cloned());
                *state.lock_mut() = next;
            }
            Command::Read(reader) => reader(state.get_cloned()),
        }
    }
    trace!("state store queue closed");
}

fn send<S>(commands: &UnboundedSender<Command<S>>, command: Command<S>) -> Result<(), StoreError> {
    commands.send(command).map_err(|_| StoreError::Closed)
}

/// A cloneable write-only view of a [`StateStore`], handed to spawned tasks.
pub(crate) struct StateSetter<S> {
    commands: UnboundedSender<Command<S>>,
}

impl<S> Clone for StateSetter<S> {
    fn clone(&self) -> Self {
        StateSetter {
            commands: self.commands.clone(),
        }
    }
}

impl<S: State> StateSetter<S> {
    pub(crate) fn set_state<F>(&self, reducer: F) -> Result<(), StoreError>
    where
        F: FnOnce(S) -> S + Send + 'static,
    {
        send(&self.commands, Command::Reduce(Box::new(reducer)))
    }
}
