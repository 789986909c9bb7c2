//! Cache backend adapter. Stores opaque byte payloads under string keys.
//!
//! Implementations must store a value and its expiry in one operation so a
//! value never exists in the cache without a TTL.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use crate::prelude::*;

#[async_trait]
pub trait CacheAdapter: Debug + Send + Sync {
	/// Read a live entry. Expired entries are reported as a miss.
	async fn get(&self, key: &str) -> ClResult<Option<Vec<u8>>>;

	/// Store `value` with the given time-to-live, atomically
	async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> ClResult<()>;

	/// Delete one entry. Deleting a missing key is not an error.
	async fn delete(&self, key: &str) -> ClResult<()>;

	/// Delete every entry whose key starts with `prefix`, returns the number removed
	async fn delete_prefix(&self, prefix: &str) -> ClResult<u64>;
}

// vim: ts=4
