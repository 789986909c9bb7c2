//! Test adapters and service builders

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use settle_cache_adapter_lru::CacheAdapterLru;
use settle_core::service::Adapters;
use settle_core::{SettingsService, SettleConfig};
use settle_store_adapter_sqlite::StoreAdapterSqlite;
use settle_types::cache_adapter::CacheAdapter;
use settle_types::directory_adapter::ScopeDirectory;
use settle_types::prelude::*;

use super::fixtures::test_registry;

/// Service wired to real adapters, plus handles the tests poke at directly
pub struct TestEnv {
	pub service: SettingsService,
	pub store: Arc<StoreAdapterSqlite>,
	pub cache: Arc<dyn CacheAdapter>,
	pub dir: TempDir,
}

pub fn test_config() -> SettleConfig {
	SettleConfig::default().with_cache_prefix("test:").with_invalidation_timeout(Duration::from_secs(2))
}

/// Open a store in a fresh temp dir and seed it with the test catalog
pub async fn create_test_store() -> (Arc<StoreAdapterSqlite>, TempDir) {
	let dir = TempDir::new().expect("Failed to create temp directory");
	let store = Arc::new(StoreAdapterSqlite::new(dir.path()).await.expect("Failed to open store"));
	(store, dir)
}

pub fn build_service(
	store: &Arc<StoreAdapterSqlite>,
	cache: Arc<dyn CacheAdapter>,
	directory: Option<Arc<dyn ScopeDirectory>>,
	config: &SettleConfig,
) -> SettingsService {
	let adapters = Adapters {
		catalog: Arc::clone(store) as _,
		overrides: Arc::clone(store) as _,
		cache,
		directory,
	};
	SettingsService::new(adapters, config).expect("Failed to create service")
}

/// Full environment: seeded store, LRU cache, no directory
pub async fn create_test_env() -> TestEnv {
	create_test_env_with(test_config(), None).await
}

pub async fn create_test_env_with(
	config: SettleConfig,
	directory: Option<Arc<dyn ScopeDirectory>>,
) -> TestEnv {
	let cache: Arc<dyn CacheAdapter> = Arc::new(CacheAdapterLru::default());
	create_test_env_with_cache(config, directory, cache).await
}

pub async fn create_test_env_with_cache(
	config: SettleConfig,
	directory: Option<Arc<dyn ScopeDirectory>>,
	cache: Arc<dyn CacheAdapter>,
) -> TestEnv {
	let (store, dir) = create_test_store().await;
	let service = build_service(&store, Arc::clone(&cache), directory, &config);
	service.catalog().import(&test_registry()).await.expect("Failed to import catalog");
	TestEnv { service, store, cache, dir }
}

// Directory
//***********

/// Fixed org -> teams mapping, counts lookups
#[derive(Debug, Default)]
pub struct StaticDirectory {
	teams: HashMap<ScopeId, Vec<ScopeId>>,
	pub lookups: AtomicU64,
}

impl StaticDirectory {
	pub fn new(entries: &[(&str, &[&str])]) -> Self {
		let teams = entries
			.iter()
			.map(|(org, teams)| ((*org).into(), teams.iter().map(|t| (*t).into()).collect()))
			.collect();
		Self { teams, lookups: AtomicU64::new(0) }
	}
}

#[async_trait]
impl ScopeDirectory for StaticDirectory {
	async fn teams_in_org(&self, org_id: &ScopeId) -> ClResult<Vec<ScopeId>> {
		self.lookups.fetch_add(1, Ordering::Relaxed);
		Ok(self.teams.get(org_id).cloned().unwrap_or_default())
	}
}

// Failing cache
//***************

/// Cache backend whose every call fails
#[derive(Debug, Default)]
pub struct FailingCache {
	pub calls: AtomicU64,
}

impl FailingCache {
	fn fail(&self) -> Error {
		self.calls.fetch_add(1, Ordering::Relaxed);
		Error::CacheBackend("connection refused".into())
	}
}

#[async_trait]
impl CacheAdapter for FailingCache {
	async fn get(&self, _key: &str) -> ClResult<Option<Vec<u8>>> {
		Err(self.fail())
	}

	async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> ClResult<()> {
		Err(self.fail())
	}

	async fn delete(&self, _key: &str) -> ClResult<()> {
		Err(self.fail())
	}

	async fn delete_prefix(&self, _prefix: &str) -> ClResult<u64> {
		Err(self.fail())
	}
}

// Reviving cache
//****************

/// LRU cache that, once armed, puts one entry back right after the first
/// delete covering it. Stands in for a reader that loaded the entry before a
/// write and stored it after the write's synchronous invalidation.
#[derive(Debug)]
pub struct RevivingCache {
	inner: CacheAdapterLru,
	key: String,
	armed: AtomicBool,
}

impl RevivingCache {
	pub fn new(key: impl Into<String>) -> Self {
		Self { inner: CacheAdapterLru::default(), key: key.into(), armed: AtomicBool::new(false) }
	}

	pub fn arm(&self) {
		self.armed.store(true, Ordering::Release);
	}

	pub fn is_armed(&self) -> bool {
		self.armed.load(Ordering::Acquire)
	}

	async fn take_stale(&self, covered: bool) -> ClResult<Option<Vec<u8>>> {
		if covered && self.armed.swap(false, Ordering::AcqRel) {
			self.inner.get(&self.key).await
		} else {
			Ok(None)
		}
	}

	async fn restore(&self, stale: Option<Vec<u8>>) -> ClResult<()> {
		if let Some(value) = stale {
			self.inner.set(&self.key, value, Duration::from_secs(60)).await?;
		}
		Ok(())
	}
}

#[async_trait]
impl CacheAdapter for RevivingCache {
	async fn get(&self, key: &str) -> ClResult<Option<Vec<u8>>> {
		self.inner.get(key).await
	}

	async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> ClResult<()> {
		self.inner.set(key, value, ttl).await
	}

	async fn delete(&self, key: &str) -> ClResult<()> {
		let stale = self.take_stale(key == self.key).await?;
		self.inner.delete(key).await?;
		self.restore(stale).await
	}

	async fn delete_prefix(&self, prefix: &str) -> ClResult<u64> {
		let stale = self.take_stale(self.key.starts_with(prefix)).await?;
		let removed = self.inner.delete_prefix(prefix).await?;
		self.restore(stale).await?;
		Ok(removed)
	}
}

// vim: ts=4
