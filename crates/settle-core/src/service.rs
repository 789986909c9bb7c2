//! Settings service - main interface for reading and writing settings
//!
//! Reads are cache-aside over tiers B (effective values) and C (listings).
//! Writes check configurability, validate, then run the store mutation and
//! its cache invalidation in a spawned task: a caller that goes away mid-write
//! (dropped future, cancelled token) never leaves the caches half-cleaned.

use serde_json::Value;
use std::sync::Arc;

use crate::cache::{CacheLayer, InvalidationStats, Invalidator};
use crate::catalog::{CatalogService, FrozenCatalog};
use crate::config::SettleConfig;
use crate::listing::{SettingsListing, assemble};
use crate::prelude::*;
use crate::repository::OverrideStores;
use crate::resolver::{EffectiveSetting, ScopeContext, ScopeResolver};
use crate::validation::{SettingsSnapshot, ValidationPipeline};
use settle_types::cache_adapter::CacheAdapter;
use settle_types::catalog_adapter::{CatalogAdapter, SettingDefinition};
use settle_types::directory_adapter::ScopeDirectory;
use settle_types::override_adapter::{OverrideAdapter, OverrideItem};

/// Backends the service runs on
#[derive(Debug, Clone)]
pub struct Adapters {
	pub catalog: Arc<dyn CatalogAdapter>,
	pub overrides: Arc<dyn OverrideAdapter>,
	pub cache: Arc<dyn CacheAdapter>,
	/// Narrows org-level invalidation to the org's teams when present
	pub directory: Option<Arc<dyn ScopeDirectory>>,
}

#[derive(Debug, Clone)]
pub struct SettingsService {
	catalog: Arc<CatalogService>,
	stores: OverrideStores,
	invalidator: Arc<Invalidator>,
}

impl SettingsService {
	/// Must be called within a tokio runtime when the detached invalidation mode is used
	pub fn new(adapters: Adapters, config: &SettleConfig) -> ClResult<Self> {
		config.validate()?;
		let cache = Arc::new(CacheLayer::new(adapters.cache, config));
		let invalidator = Arc::new(Invalidator::new(Arc::clone(&cache), adapters.directory, config));
		let catalog = Arc::new(CatalogService::new(adapters.catalog, Arc::clone(&invalidator)));
		let stores = OverrideStores::new(&adapters.overrides, &cache);
		info!(mode = ?config.invalidation_mode, prefix = %config.cache_prefix, "Settings service ready");
		Ok(Self { catalog, stores, invalidator })
	}

	pub fn catalog(&self) -> &Arc<CatalogService> {
		&self.catalog
	}

	pub fn stores(&self) -> &OverrideStores {
		&self.stores
	}

	fn cache(&self) -> &CacheLayer {
		self.invalidator.cache()
	}

	// Queries
	//*********

	/// Effective value of one setting.
	///
	/// Fails with `InvalidSettingKey` for keys not in the catalog and with
	/// `NotFound` for keys the context may not see.
	pub async fn get_setting(&self, ctx: &ScopeContext, key: &str) -> ClResult<EffectiveSetting> {
		let catalog = self.catalog.snapshot().await?;
		let def = lookup(&catalog, key)?;
		if !def.is_visible_at(ctx.level()) {
			return Err(Error::NotFound);
		}

		let cache_key = self.cache().keys().effective(ctx.level(), &ctx.cache_id(), key);
		if let Some(setting) = self.cache().get_json::<EffectiveSetting>(&cache_key).await {
			return Ok(setting);
		}

		let setting = ScopeResolver::new(&catalog, &self.stores).resolve(ctx, key).await?;
		self.cache().set_json(&cache_key, &setting, self.cache().effective_ttl).await;
		Ok(setting)
	}

	/// Grouped listing of every setting visible to the context, optionally
	/// restricted to one category
	pub async fn list_settings(
		&self,
		ctx: &ScopeContext,
		category: Option<&str>,
	) -> ClResult<SettingsListing> {
		let cache_key = self.cache().keys().response(ctx.level(), &ctx.cache_id(), category);
		if let Some(listing) = self.cache().get_json::<SettingsListing>(&cache_key).await {
			return Ok(listing);
		}

		let catalog = self.catalog.snapshot().await?;
		let level = ctx.level();
		let visible: Vec<EffectiveSetting> = self
			.effective_settings(ctx, &catalog)
			.await?
			.into_iter()
			.filter(|s| {
				catalog.find_by_key(&s.key).is_some_and(|def| def.is_visible_at(level))
					&& category.is_none_or(|c| &*s.metadata.category_id == c)
			})
			.collect();
		let listing = assemble(&catalog, level, visible);

		self.cache().set_json(&cache_key, &listing, self.cache().response_ttl).await;
		Ok(listing)
	}

	/// `key -> value` of every setting resolved at the context
	pub async fn effective_values(&self, ctx: &ScopeContext) -> ClResult<SettingsSnapshot> {
		let catalog = self.catalog.snapshot().await?;
		self.snapshot_for(ctx, &catalog).await
	}

	async fn snapshot_for(
		&self,
		ctx: &ScopeContext,
		catalog: &FrozenCatalog,
	) -> ClResult<SettingsSnapshot> {
		let settings = self.effective_settings(ctx, catalog).await?;
		Ok(settings.into_iter().map(|s| (s.key, s.value.into_json())).collect())
	}

	/// Every definition resolved at the context (tier B, whole scope)
	async fn effective_settings(
		&self,
		ctx: &ScopeContext,
		catalog: &FrozenCatalog,
	) -> ClResult<Vec<EffectiveSetting>> {
		let cache_key = self.cache().keys().effective_all(ctx.level(), &ctx.cache_id());
		if let Some(settings) = self.cache().get_json::<Vec<EffectiveSetting>>(&cache_key).await {
			return Ok(settings);
		}

		let settings = ScopeResolver::new(catalog, &self.stores).resolve_all(ctx).await?;
		self.cache().set_json(&cache_key, &settings, self.cache().effective_ttl).await;
		Ok(settings)
	}

	// Typed getters
	//***************

	pub async fn get_string(&self, ctx: &ScopeContext, key: &str) -> ClResult<String> {
		match self.get_setting(ctx, key).await?.value {
			SettingValue::String(s) => Ok(s),
			v => Err(type_mismatch(key, "string", &v)),
		}
	}

	pub async fn get_number(&self, ctx: &ScopeContext, key: &str) -> ClResult<f64> {
		let value = self.get_setting(ctx, key).await?.value;
		value.as_f64().ok_or_else(|| type_mismatch(key, "number", &value))
	}

	pub async fn get_bool(&self, ctx: &ScopeContext, key: &str) -> ClResult<bool> {
		match self.get_setting(ctx, key).await?.value {
			SettingValue::Bool(b) => Ok(b),
			v => Err(type_mismatch(key, "boolean", &v)),
		}
	}

	pub async fn get_json(&self, ctx: &ScopeContext, key: &str) -> ClResult<Value> {
		match self.get_setting(ctx, key).await?.value {
			SettingValue::Json(j) => Ok(j),
			v => Err(type_mismatch(key, "json", &v)),
		}
	}

	// Commands
	//**********

	/// Validate and store an override at the context's own scope
	pub async fn set_setting(
		&self,
		ctx: &ScopeContext,
		key: &str,
		value: Value,
	) -> ClResult<EffectiveSetting> {
		let catalog = self.catalog.snapshot().await?;
		let def = lookup(&catalog, key)?;
		let (scope, scope_id) = writable_target(ctx, def)?;

		let settings = self.snapshot_for(ctx, &catalog).await?;
		let value = ValidationPipeline::new(&catalog).validate(key, value, &settings)?;

		let stores = self.stores.clone();
		let invalidator = Arc::clone(&self.invalidator);
		let (owned_id, owned_key, json) = (scope_id.clone(), def.key.clone(), value.to_json());
		spawn_write(async move {
			stores.get(scope).upsert(&owned_id, &owned_key, &json).await?;
			invalidator.override_written(scope, &owned_id).await;
			Ok(())
		})
		.await?;

		info!(key, scope = %scope, scope_id = %scope_id, "Setting updated");
		Ok(EffectiveSetting::customized(def, value, scope.level()))
	}

	/// Validate and store several overrides at once. A failure on any item
	/// leaves every override untouched.
	pub async fn set_many(
		&self,
		ctx: &ScopeContext,
		items: Vec<(Box<str>, Value)>,
	) -> ClResult<Vec<EffectiveSetting>> {
		let catalog = self.catalog.snapshot().await?;
		let mut target = None;
		for (key, _) in &items {
			let def = lookup(&catalog, key)?;
			target = Some(writable_target(ctx, def)?);
		}
		let Some((scope, scope_id)) = target else {
			return Ok(Vec::new());
		};

		let settings = self.snapshot_for(ctx, &catalog).await?;
		let values = ValidationPipeline::new(&catalog).validate_batch(items, &settings)?;

		let batch: Vec<OverrideItem> = values
			.iter()
			.map(|(key, value)| OverrideItem {
				scope_id: scope_id.clone(),
				setting_key: key.clone(),
				value: value.to_json(),
			})
			.collect();
		let stores = self.stores.clone();
		let invalidator = Arc::clone(&self.invalidator);
		let owned_id = scope_id.clone();
		spawn_write(async move {
			stores.get(scope).batch_upsert(&batch).await?;
			invalidator.override_written(scope, &owned_id).await;
			Ok(())
		})
		.await?;

		info!(count = values.len(), scope = %scope, scope_id = %scope_id, "Settings updated");
		values
			.into_iter()
			.map(|(key, value)| {
				let def = lookup(&catalog, &key)?;
				Ok(EffectiveSetting::customized(def, value, scope.level()))
			})
			.collect()
	}

	/// Remove the context's override of `key` and return the value that now applies.
	/// Resetting a key without an override succeeds.
	pub async fn reset_setting(&self, ctx: &ScopeContext, key: &str) -> ClResult<EffectiveSetting> {
		let catalog = self.catalog.snapshot().await?;
		let def = lookup(&catalog, key)?;
		let (scope, scope_id) = writable_target(ctx, def)?;

		let stores = self.stores.clone();
		let invalidator = Arc::clone(&self.invalidator);
		let (owned_id, owned_key) = (scope_id.clone(), def.key.clone());
		let removed = spawn_write(async move {
			let removed = stores.get(scope).delete(&owned_id, &owned_key).await?;
			if removed {
				invalidator.override_written(scope, &owned_id).await;
			}
			Ok(removed)
		})
		.await?;

		if removed {
			info!(key, scope = %scope, scope_id = %scope_id, "Setting reset");
		} else {
			debug!(key, scope = %scope, scope_id = %scope_id, "Setting reset without override");
		}
		ScopeResolver::new(&catalog, &self.stores).resolve(ctx, key).await
	}

	/// Remove every override of the context's own scope entity
	pub async fn reset_all(&self, ctx: &ScopeContext) -> ClResult<u64> {
		let Some((scope, scope_id)) = ctx.target() else {
			return Ok(0);
		};

		let stores = self.stores.clone();
		let invalidator = Arc::clone(&self.invalidator);
		let owned_id = scope_id.clone();
		let removed = spawn_write(async move {
			let removed = stores.get(scope).delete_all(&owned_id).await?;
			invalidator.override_written(scope, &owned_id).await;
			Ok(removed)
		})
		.await?;

		info!(removed, scope = %scope, scope_id = %scope_id, "All settings reset");
		Ok(removed)
	}

	// Invalidation
	//**************

	/// Wait for queued background invalidations
	pub async fn flush_invalidations(&self) {
		self.invalidator.flush().await;
	}

	pub fn invalidation_stats(&self) -> InvalidationStats {
		self.invalidator.stats()
	}
}

fn lookup<'a>(catalog: &'a FrozenCatalog, key: &str) -> ClResult<&'a SettingDefinition> {
	catalog.find_by_key(key).ok_or_else(|| Error::InvalidSettingKey(key.into()))
}

/// The override store a write from `ctx` goes to, if `def` may be written there
fn writable_target<'c>(
	ctx: &'c ScopeContext,
	def: &SettingDefinition,
) -> ClResult<(OverrideScope, &'c ScopeId)> {
	match ctx.target() {
		Some((scope, scope_id)) if def.is_configurable_at(scope.level()) => Ok((scope, scope_id)),
		_ => Err(Error::NotConfigurableAtScope { key: def.key.clone(), scope: ctx.level() }),
	}
}

fn type_mismatch(key: &str, expected: &str, value: &SettingValue) -> Error {
	Error::InvalidSettingValue {
		key: key.into(),
		reason: format!("expected {}, got {}", expected, value.type_name()),
	}
}

/// Run a store mutation and its invalidation to completion, even if the
/// caller stops waiting
async fn spawn_write<T, F>(fut: F) -> ClResult<T>
where
	F: std::future::Future<Output = ClResult<T>> + Send + 'static,
	T: Send + 'static,
{
	tokio::spawn(fut).await.map_err(|err| {
		error!("Write task failed: {}", err);
		Error::Internal("write task failed".into())
	})?
}

// vim: ts=4
