//! Cache-aside access to the cache backend
//!
//! Every backend error is logged and absorbed here: a failed read is a miss,
//! a failed write or delete leaves the entry to expire through its TTL.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use super::keys::{CacheKeys, Target};
use crate::config::SettleConfig;
use crate::prelude::*;
use settle_types::cache_adapter::CacheAdapter;

#[derive(Debug)]
pub struct CacheLayer {
	adapter: Arc<dyn CacheAdapter>,
	keys: CacheKeys,
	pub catalog_ttl: Duration,
	pub overrides_ttl: Duration,
	pub effective_ttl: Duration,
	pub response_ttl: Duration,
}

impl CacheLayer {
	pub fn new(adapter: Arc<dyn CacheAdapter>, config: &SettleConfig) -> Self {
		Self {
			adapter,
			keys: CacheKeys::new(config.cache_prefix.clone()),
			catalog_ttl: config.catalog_ttl,
			overrides_ttl: config.overrides_ttl,
			effective_ttl: config.effective_ttl,
			response_ttl: config.response_ttl,
		}
	}

	pub fn keys(&self) -> &CacheKeys {
		&self.keys
	}

	/// Read and decode a cached payload. Errors and undecodable entries are misses.
	pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
		match self.adapter.get(key).await {
			Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
				Ok(value) => {
					debug!(key, "cache hit");
					Some(value)
				}
				Err(err) => {
					warn!(key, "Undecodable cache entry, treating as miss: {}", err);
					None
				}
			},
			Ok(None) => {
				debug!(key, "cache miss");
				None
			}
			Err(err) => {
				warn!(key, "Cache read failed, falling back to store: {}", err);
				None
			}
		}
	}

	/// Encode and store a payload with its TTL
	pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
		let bytes = match serde_json::to_vec(value) {
			Ok(bytes) => bytes,
			Err(err) => {
				warn!(key, "Cache payload could not be encoded: {}", err);
				return;
			}
		};
		if let Err(err) = self.adapter.set(key, bytes, ttl).await {
			warn!(key, "Cache write failed: {}", err);
		}
	}

	/// Delete every target, continuing past failures.
	///
	/// Returns the first backend error so that background jobs can count it.
	pub async fn try_invalidate(&self, targets: &[Target]) -> ClResult<()> {
		let mut first_err = None;
		for target in targets {
			let res = match target {
				Target::Key(key) => self.adapter.delete(key).await.map(|()| 1),
				Target::Prefix(prefix) => self.adapter.delete_prefix(prefix).await,
			};
			match res {
				Ok(removed) => debug!(?target, removed, "cache invalidated"),
				Err(err) => {
					warn!(?target, "Cache invalidation failed: {}", err);
					first_err.get_or_insert(err);
				}
			}
		}
		first_err.map_or(Ok(()), Err)
	}

	/// Delete every target; failures are logged only
	pub async fn invalidate(&self, targets: &[Target]) {
		let _ignore = self.try_invalidate(targets).await;
	}
}

// vim: ts=4
