mod battery;
mod callback_result;
mod cancelable;
mod compare;
mod delayed;
mod error;
mod fetch;
mod host;
mod interval;
mod local_storage;
mod measured;
mod memo;
mod paginated;
mod permissions;
mod request;
mod state_store;
mod stream_ext;
mod strategy;
pub mod mock;

pub use battery::*;
pub use callback_result::*;
pub use cancelable::*;
pub use compare::*;
pub use delayed::*;
pub use error::*;
pub use fetch::*;
pub use host::*;
pub use interval::*;
pub use local_storage::*;
pub use measured::*;
pub use memo::*;
pub use paginated::*;
pub use permissions::*;
pub use request::*;
pub use state_store::*;
pub use stream_ext::*;
pub use strategy::*;

#[cfg(test)]
mod unit_tests;

/// Marker for values a [`StateStore`] can own.
pub trait State: Clone + Send + Sync + 'static {}
