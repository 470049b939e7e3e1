//! Helpers shared by unit and integration tests.
//!
//! Compiled for unit tests and behind the `test-util` feature so the
//! integration suite under `tests/` can drive the forwarder without real
//! network peers.

mod collecting_sink;
mod fake_network;

pub use collecting_sink::CollectingSink;
pub use fake_network::{FakeResolver, FakeSocketFactory, Outcome};
