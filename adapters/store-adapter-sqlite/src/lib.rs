//! SQLite storage adapter for the Settle settings service.
//!
//! Implements both the catalog store (definitions and categories) and the
//! three override stores (user, org, team) over one database file.

#![forbid(unsafe_code)]

use async_trait::async_trait;
use sqlx::sqlite::{self, SqlitePool};
use std::path::Path;

use settle_types::catalog_adapter::{CatalogAdapter, SettingCategory, SettingDefinition};
use settle_types::override_adapter::{OverrideAdapter, OverrideItem, OverrideRow};
use settle_types::prelude::*;

mod catalog;
mod overrides;
mod schema;
mod utils;

/// File name of the database inside the data directory
pub const DB_FILE: &str = "settings.db";

#[derive(Debug, Clone)]
pub struct StoreAdapterSqlite {
	db: SqlitePool,
}

impl StoreAdapterSqlite {
	/// Open (or create) the database in `dir`
	pub async fn new(dir: impl AsRef<Path>) -> ClResult<Self> {
		let dir = dir.as_ref();
		tokio::fs::create_dir_all(dir).await.map_err(|err| {
			warn!("Cannot create data directory {}: {}", dir.display(), err);
			Error::DbError(err.to_string())
		})?;

		let opts = sqlite::SqliteConnectOptions::new()
			.filename(dir.join(DB_FILE))
			.create_if_missing(true)
			.journal_mode(sqlite::SqliteJournalMode::Wal);
		let db = sqlite::SqlitePoolOptions::new()
			.max_connections(5)
			.connect_with(opts)
			.await
			.inspect_err(utils::inspect)
			.map_err(utils::db_error)?;

		schema::init_db(&db).await.inspect_err(utils::inspect).map_err(utils::db_error)?;
		debug!(path = %dir.display(), "Settings store opened");

		Ok(Self { db })
	}
}

#[async_trait]
impl CatalogAdapter for StoreAdapterSqlite {
	// Definitions
	//*************
	async fn list_definitions(&self) -> ClResult<Vec<SettingDefinition>> {
		catalog::list_definitions(&self.db).await
	}

	async fn read_definition(&self, key: &str) -> ClResult<Option<SettingDefinition>> {
		catalog::read_definition(&self.db, key).await
	}

	async fn create_definition(&self, def: &SettingDefinition) -> ClResult<()> {
		catalog::create_definition(&self.db, def).await
	}

	async fn update_definition(&self, def: &SettingDefinition) -> ClResult<()> {
		catalog::update_definition(&self.db, def).await
	}

	async fn upsert_definition(&self, def: &SettingDefinition) -> ClResult<()> {
		catalog::upsert_definition(&self.db, def).await
	}

	async fn delete_definition(&self, key: &str) -> ClResult<bool> {
		catalog::delete_definition(&self.db, key).await
	}

	// Categories
	//************
	async fn list_categories(&self) -> ClResult<Vec<SettingCategory>> {
		catalog::list_categories(&self.db).await
	}

	async fn create_category(&self, category: &SettingCategory) -> ClResult<()> {
		catalog::create_category(&self.db, category).await
	}

	async fn update_category(&self, category: &SettingCategory) -> ClResult<()> {
		catalog::update_category(&self.db, category).await
	}

	async fn upsert_category(&self, category: &SettingCategory) -> ClResult<()> {
		catalog::upsert_category(&self.db, category).await
	}

	async fn delete_category(&self, key: &str) -> ClResult<bool> {
		catalog::delete_category(&self.db, key).await
	}
}

#[async_trait]
impl OverrideAdapter for StoreAdapterSqlite {
	async fn upsert_override(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
		key: &str,
		value: &serde_json::Value,
	) -> ClResult<OverrideRow> {
		overrides::upsert(&self.db, scope, scope_id, key, value).await
	}

	async fn batch_upsert_overrides(
		&self,
		scope: OverrideScope,
		items: &[OverrideItem],
	) -> ClResult<()> {
		overrides::batch_upsert(&self.db, scope, items).await
	}

	async fn delete_override(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
		key: &str,
	) -> ClResult<bool> {
		overrides::delete(&self.db, scope, scope_id, key).await
	}

	async fn delete_all_overrides(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
	) -> ClResult<u64> {
		overrides::delete_all(&self.db, scope, scope_id).await
	}

	async fn read_override(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
		key: &str,
	) -> ClResult<Option<OverrideRow>> {
		overrides::read(&self.db, scope, scope_id, key).await
	}

	async fn list_overrides(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
	) -> ClResult<Vec<OverrideRow>> {
		overrides::list(&self.db, scope, scope_id).await
	}

	async fn list_overrides_by_keys(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
		keys: &[&str],
	) -> ClResult<Vec<OverrideRow>> {
		overrides::list_by_keys(&self.db, scope, scope_id, keys).await
	}
}

// vim: ts=4
