use crate::mock::{ManualHost, MockTransport};
use crate::Host;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

mod state_store_test;

/// Counts how often a callback ran.
#[derive(Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn manual_host() -> (Arc<ManualHost>, Arc<dyn Host>) {
    let host = Arc::new(ManualHost::new());
    let dyn_host: Arc<dyn Host> = host.clone();
    (host, dyn_host)
}

pub fn mock_transport() -> Arc<MockTransport> {
    Arc::new(MockTransport::new())
}
