//! Shared setup for the service integration tests
//!
//! Every test gets its own SQLite store inside a `TempDir` and its own
//! in-process cache; the `TempDir` must be held until the end of the test.

#![allow(dead_code)]

pub mod adapters;
pub mod fixtures;

pub use adapters::*;
pub use fixtures::*;

/// Route service logs to the test output
pub fn setup_test_logging() {
	let _ = tracing_subscriber::fmt()
		.with_test_writer()
		.with_max_level(tracing::Level::DEBUG)
		.try_init();
}

// vim: ts=4
