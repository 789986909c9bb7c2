//! Catalog access and admin write hooks
//!
//! Reads return a [`FrozenCatalog`] built from the catalog store, cached as a
//! serialized snapshot. Every write through this service is followed by a
//! synchronous invalidation of every cache tier.

use std::sync::Arc;

use super::registry::{CatalogSnapshot, FrozenCatalog, SettingsRegistry, check_definition};
use crate::cache::Invalidator;
use crate::prelude::*;
use settle_types::catalog_adapter::{CatalogAdapter, SettingCategory, SettingDefinition};

#[derive(Debug)]
pub struct CatalogService {
	adapter: Arc<dyn CatalogAdapter>,
	invalidator: Arc<Invalidator>,
}

/// Counts of an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
	pub categories: usize,
	pub definitions: usize,
}

impl CatalogService {
	pub fn new(adapter: Arc<dyn CatalogAdapter>, invalidator: Arc<Invalidator>) -> Self {
		Self { adapter, invalidator }
	}

	/// Current catalog, from the cache when possible
	pub async fn snapshot(&self) -> ClResult<Arc<FrozenCatalog>> {
		let cache = self.invalidator.cache();
		let cache_key = cache.keys().catalog();
		if let Some(snapshot) = cache.get_json::<CatalogSnapshot>(&cache_key).await {
			return Ok(Arc::new(FrozenCatalog::from_snapshot(snapshot)));
		}

		let (definitions, categories) =
			tokio::try_join!(self.adapter.list_definitions(), self.adapter.list_categories())?;
		let catalog = FrozenCatalog::from_parts(definitions, categories);
		debug!(definitions = catalog.len(), "Catalog loaded from store");

		cache.set_json(&cache_key, &catalog.to_snapshot(), cache.catalog_ttl).await;
		Ok(Arc::new(catalog))
	}

	// Definitions
	//*************

	pub async fn create_definition(&self, def: &SettingDefinition) -> ClResult<()> {
		check_definition(def)?;
		self.adapter.create_definition(def).await?;
		info!(key = %def.key, "Setting definition created");
		self.invalidator.catalog_written().await;
		Ok(())
	}

	pub async fn update_definition(&self, def: &SettingDefinition) -> ClResult<()> {
		check_definition(def)?;
		self.adapter.update_definition(def).await?;
		info!(key = %def.key, "Setting definition updated");
		self.invalidator.catalog_written().await;
		Ok(())
	}

	/// Returns `true` if the definition existed
	pub async fn delete_definition(&self, key: &str) -> ClResult<bool> {
		let removed = self.adapter.delete_definition(key).await?;
		if removed {
			info!(key, "Setting definition deleted");
			self.invalidator.catalog_written().await;
		}
		Ok(removed)
	}

	// Categories
	//************

	pub async fn create_category(&self, category: &SettingCategory) -> ClResult<()> {
		self.adapter.create_category(category).await?;
		info!(category = %category.key, "Setting category created");
		self.invalidator.catalog_written().await;
		Ok(())
	}

	pub async fn update_category(&self, category: &SettingCategory) -> ClResult<()> {
		self.adapter.update_category(category).await?;
		info!(category = %category.key, "Setting category updated");
		self.invalidator.catalog_written().await;
		Ok(())
	}

	pub async fn delete_category(&self, key: &str) -> ClResult<bool> {
		let removed = self.adapter.delete_category(key).await?;
		if removed {
			info!(category = key, "Setting category deleted");
			self.invalidator.catalog_written().await;
		}
		Ok(removed)
	}

	/// Upsert every category and definition of `registry`, then invalidate once
	pub async fn import(&self, registry: &SettingsRegistry) -> ClResult<ImportSummary> {
		let mut summary = ImportSummary::default();
		for category in registry.categories() {
			self.adapter.upsert_category(category).await?;
			summary.categories += 1;
		}
		for def in registry.definitions() {
			self.adapter.upsert_definition(def).await?;
			summary.definitions += 1;
		}
		info!(
			categories = summary.categories,
			definitions = summary.definitions,
			"Catalog imported"
		);
		self.invalidator.catalog_written().await;
		Ok(summary)
	}
}

// vim: ts=4
