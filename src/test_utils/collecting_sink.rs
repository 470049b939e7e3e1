//! An error sink that accumulates failure reports for test assertions.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::forwarder::ErrorSink;

/// Sink that stores every message it receives for later inspection.
#[derive(Clone, Debug, Default)]
pub struct CollectingSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a snapshot of all messages received so far.
    pub fn collected(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, message: &str) {
        self.messages.lock().push(message.to_owned());
    }
}
