//! Override repositories, one per override scope
//!
//! Reads go through tier A: the whole override set of a scope entity is
//! fetched and cached in one piece, never key by key. Every write deletes the
//! entity's tier A entry after the store mutation has completed.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::cache::CacheLayer;
use crate::prelude::*;
use settle_types::override_adapter::{OverrideAdapter, OverrideItem, OverrideRow};

/// Raw overrides of one scope entity, `setting_key -> value`
pub type OverrideMap = BTreeMap<Box<str>, Value>;

#[derive(Debug, Clone)]
pub struct OverrideRepository {
	scope: OverrideScope,
	adapter: Arc<dyn OverrideAdapter>,
	cache: Arc<CacheLayer>,
}

impl OverrideRepository {
	pub fn new(scope: OverrideScope, adapter: Arc<dyn OverrideAdapter>, cache: Arc<CacheLayer>) -> Self {
		Self { scope, adapter, cache }
	}

	pub fn scope(&self) -> OverrideScope {
		self.scope
	}

	// Commands
	//**********

	/// Create or replace the override of `(scope_id, key)`
	pub async fn upsert(&self, scope_id: &ScopeId, key: &str, value: &Value) -> ClResult<OverrideRow> {
		let row = self.adapter.upsert_override(self.scope, scope_id, key, value).await?;
		self.evict(scope_id).await;
		Ok(row)
	}

	/// Remove an override. Removing a missing override succeeds with `false`.
	pub async fn delete(&self, scope_id: &ScopeId, key: &str) -> ClResult<bool> {
		let removed = self.adapter.delete_override(self.scope, scope_id, key).await?;
		self.evict(scope_id).await;
		Ok(removed)
	}

	pub async fn delete_all(&self, scope_id: &ScopeId) -> ClResult<u64> {
		let removed = self.adapter.delete_all_overrides(self.scope, scope_id).await?;
		self.evict(scope_id).await;
		Ok(removed)
	}

	/// Upsert every item atomically
	pub async fn batch_upsert(&self, items: &[OverrideItem]) -> ClResult<()> {
		if items.is_empty() {
			return Ok(());
		}
		self.adapter.batch_upsert_overrides(self.scope, items).await?;
		let scope_ids: BTreeSet<&ScopeId> = items.iter().map(|item| &item.scope_id).collect();
		for scope_id in scope_ids {
			self.evict(scope_id).await;
		}
		Ok(())
	}

	async fn evict(&self, scope_id: &ScopeId) {
		let key = self.cache.keys().overrides(self.scope, scope_id);
		self.cache.invalidate(&[crate::cache::Target::Key(key)]).await;
	}

	// Queries
	//*********

	/// Every non-null override of `scope_id`
	pub async fn find_all_for_scope(&self, scope_id: &ScopeId) -> ClResult<OverrideMap> {
		let cache_key = self.cache.keys().overrides(self.scope, scope_id);
		if let Some(map) = self.cache.get_json::<OverrideMap>(&cache_key).await {
			return Ok(map);
		}

		let rows = self.adapter.list_overrides(self.scope, scope_id).await?;
		let map: OverrideMap = rows
			.into_iter()
			.filter(|row| row.scope_id == *scope_id && !row.value.is_null())
			.map(|row| (row.setting_key, row.value))
			.collect();

		self.cache.set_json(&cache_key, &map, self.cache.overrides_ttl).await;
		Ok(map)
	}

	pub async fn find_one(&self, scope_id: &ScopeId, key: &str) -> ClResult<Option<Value>> {
		let mut map = self.find_all_for_scope(scope_id).await?;
		Ok(map.remove(key))
	}

	/// Overrides of the given keys; keys without an override are omitted
	pub async fn find_many(&self, scope_id: &ScopeId, keys: &[&str]) -> ClResult<OverrideMap> {
		let map = self.find_all_for_scope(scope_id).await?;
		Ok(map.into_iter().filter(|(key, _)| keys.contains(&&**key)).collect())
	}

	/// Persisted rows of `scope_id`, read directly from the store
	pub async fn find_rows(&self, scope_id: &ScopeId) -> ClResult<Vec<OverrideRow>> {
		self.adapter.list_overrides(self.scope, scope_id).await
	}
}

/// The three override repositories
#[derive(Debug, Clone)]
pub struct OverrideStores {
	pub user: OverrideRepository,
	pub org: OverrideRepository,
	pub team: OverrideRepository,
}

impl OverrideStores {
	/// All three repositories over one adapter
	pub fn new(adapter: &Arc<dyn OverrideAdapter>, cache: &Arc<CacheLayer>) -> Self {
		Self {
			user: OverrideRepository::new(OverrideScope::User, Arc::clone(adapter), Arc::clone(cache)),
			org: OverrideRepository::new(OverrideScope::Org, Arc::clone(adapter), Arc::clone(cache)),
			team: OverrideRepository::new(OverrideScope::Team, Arc::clone(adapter), Arc::clone(cache)),
		}
	}

	pub fn get(&self, scope: OverrideScope) -> &OverrideRepository {
		match scope {
			OverrideScope::User => &self.user,
			OverrideScope::Org => &self.org,
			OverrideScope::Team => &self.team,
		}
	}
}

// vim: ts=4
