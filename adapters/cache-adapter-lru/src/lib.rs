//! In-process cache backend
//!
//! A bounded LRU map of byte payloads. Each entry carries its own expiry, set
//! in the same write as the payload. Expired entries are dropped lazily when
//! read, or pushed out by the LRU bound.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use settle_types::cache_adapter::CacheAdapter;
use settle_types::prelude::*;

/// Default number of entries kept
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
struct Entry {
	value: Vec<u8>,
	expires_at: Instant,
}

impl Entry {
	fn is_expired(&self, now: Instant) -> bool {
		now >= self.expires_at
	}
}

#[derive(Debug)]
pub struct CacheAdapterLru {
	entries: RwLock<LruCache<String, Entry>>,
}

impl CacheAdapterLru {
	pub fn new(max_entries: usize) -> Self {
		let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
		Self { entries: RwLock::new(LruCache::new(capacity)) }
	}

	/// Number of stored entries, expired ones included
	pub fn len(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	/// Drop every expired entry, returns the number removed
	pub fn purge_expired(&self) -> usize {
		let now = Instant::now();
		let mut entries = self.entries.write();
		let expired: Vec<String> =
			entries.iter().filter(|(_, e)| e.is_expired(now)).map(|(k, _)| k.clone()).collect();
		for key in &expired {
			entries.pop(key);
		}
		expired.len()
	}
}

impl Default for CacheAdapterLru {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}

#[async_trait]
impl CacheAdapter for CacheAdapterLru {
	async fn get(&self, key: &str) -> ClResult<Option<Vec<u8>>> {
		let now = Instant::now();
		// `get` promotes the entry, so a write lock is needed either way
		let mut entries = self.entries.write();
		let expired = match entries.get(key) {
			Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
			Some(_) => true,
			None => false,
		};
		if expired {
			entries.pop(key);
		}
		Ok(None)
	}

	async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> ClResult<()> {
		let expires_at = Instant::now()
			.checked_add(ttl)
			.ok_or_else(|| Error::CacheBackend(format!("ttl out of range: {:?}", ttl)))?;
		self.entries.write().put(key.to_owned(), Entry { value, expires_at });
		Ok(())
	}

	async fn delete(&self, key: &str) -> ClResult<()> {
		self.entries.write().pop(key);
		Ok(())
	}

	async fn delete_prefix(&self, prefix: &str) -> ClResult<u64> {
		let mut entries = self.entries.write();
		let keys: Vec<String> =
			entries.iter().filter(|(k, _)| k.starts_with(prefix)).map(|(k, _)| k.clone()).collect();
		for key in &keys {
			entries.pop(key);
		}
		Ok(u64::try_from(keys.len()).unwrap_or(u64::MAX))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const TTL: Duration = Duration::from_secs(60);

	#[tokio::test]
	async fn test_set_get_delete() {
		let cache = CacheAdapterLru::default();
		cache.set("a", b"1".to_vec(), TTL).await.expect("set");
		assert_eq!(cache.get("a").await.expect("get"), Some(b"1".to_vec()));

		cache.delete("a").await.expect("delete");
		cache.delete("a").await.expect("deleting a missing key");
		assert_eq!(cache.get("a").await.expect("get"), None);
	}

	#[tokio::test]
	async fn test_expired_entry_is_a_miss() {
		let cache = CacheAdapterLru::default();
		cache.set("a", b"1".to_vec(), Duration::from_millis(20)).await.expect("set");
		cache.set("b", b"2".to_vec(), TTL).await.expect("set");
		tokio::time::sleep(Duration::from_millis(40)).await;

		assert_eq!(cache.get("a").await.expect("get"), None);
		assert_eq!(cache.len(), 1, "expired entry is dropped on read");
		assert_eq!(cache.get("b").await.expect("get"), Some(b"2".to_vec()));
	}

	#[tokio::test]
	async fn test_purge_expired() {
		let cache = CacheAdapterLru::default();
		cache.set("a", b"1".to_vec(), Duration::ZERO).await.expect("set");
		cache.set("b", b"2".to_vec(), TTL).await.expect("set");
		assert_eq!(cache.purge_expired(), 1);
		assert_eq!(cache.len(), 1);
	}

	#[tokio::test]
	async fn test_delete_prefix() {
		let cache = CacheAdapterLru::default();
		for key in ["s:response:org:1", "s:response:org:1:all", "s:response:org:12", "s:effective:org:1"] {
			cache.set(key, Vec::new(), TTL).await.expect("set");
		}

		let removed = cache.delete_prefix("s:response:org:1:").await.expect("delete prefix");
		assert_eq!(removed, 1);
		let removed = cache.delete_prefix("s:response:").await.expect("delete prefix");
		assert_eq!(removed, 2);
		assert_eq!(cache.len(), 1);
	}

	#[tokio::test]
	async fn test_capacity_evicts_least_recently_used() {
		let cache = CacheAdapterLru::new(2);
		cache.set("a", b"1".to_vec(), TTL).await.expect("set");
		cache.set("b", b"2".to_vec(), TTL).await.expect("set");
		cache.get("a").await.expect("get");
		cache.set("c", b"3".to_vec(), TTL).await.expect("set");

		assert!(cache.get("a").await.expect("get").is_some());
		assert!(cache.get("b").await.expect("get").is_none());
		assert!(cache.get("c").await.expect("get").is_some());
	}
}

// vim: ts=4
