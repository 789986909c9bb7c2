//! Database schema initialization and migrations

use sqlx::{Sqlite, SqlitePool, Transaction};

use settle_types::prelude::*;
use settle_types::types::OverrideScope;

/// Get the current database version from vars table
async fn get_db_version(tx: &mut Transaction<'_, Sqlite>) -> i64 {
	sqlx::query_scalar::<_, String>("SELECT value FROM vars WHERE key = 'db_version'")
		.fetch_optional(&mut **tx)
		.await
		.ok()
		.flatten()
		.and_then(|v| v.parse().ok())
		.unwrap_or(0)
}

/// Set the database version in vars table
async fn set_db_version(tx: &mut Transaction<'_, Sqlite>, version: i64) -> Result<(), sqlx::Error> {
	sqlx::query("INSERT OR REPLACE INTO vars (key, value) VALUES ('db_version', ?)")
		.bind(version.to_string())
		.execute(&mut **tx)
		.await?;
	Ok(())
}

// Current schema version - update this when adding new migrations
const CURRENT_DB_VERSION: i64 = 1;

/// Override table of a scope
pub(crate) fn override_table(scope: OverrideScope) -> &'static str {
	match scope {
		OverrideScope::User => "user_setting_overrides",
		OverrideScope::Org => "org_setting_overrides",
		OverrideScope::Team => "team_setting_overrides",
	}
}

/// Initialize the database schema and run migrations
pub(crate) async fn init_db(db: &SqlitePool) -> Result<(), sqlx::Error> {
	let mut tx = db.begin().await?;

	// Create vars table first (needed for version tracking)
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS vars (
		key text NOT NULL,
		value text NOT NULL,
		created_at INTEGER DEFAULT (unixepoch()),
		updated_at INTEGER DEFAULT (unixepoch()),
		PRIMARY KEY(key)
	)",
	)
	.execute(&mut *tx)
	.await?;

	let version = get_db_version(&mut tx).await;

	// Catalog
	//*********
	sqlx::query(
		"CREATE TABLE IF NOT EXISTS setting_categories (
		key text NOT NULL,
		label text NOT NULL,
		icon text,
		ord integer NOT NULL DEFAULT 0,
		created_at INTEGER DEFAULT (unixepoch()),
		updated_at INTEGER DEFAULT (unixepoch()),
		PRIMARY KEY(key)
	)",
	)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		"CREATE TABLE IF NOT EXISTS setting_definitions (
		key text NOT NULL,
		label text NOT NULL,
		description text,
		default_value text NOT NULL,
		value_type text NOT NULL,
		input_type text NOT NULL,
		visible_at text NOT NULL,
		configurable_at text NOT NULL,
		validation_rule text,
		options text,
		category_id text NOT NULL,
		grp text,
		ord integer NOT NULL DEFAULT 0,
		created_at INTEGER DEFAULT (unixepoch()),
		updated_at INTEGER DEFAULT (unixepoch()),
		PRIMARY KEY(key)
	)",
	)
	.execute(&mut *tx)
	.await?;
	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_setting_definitions_category ON setting_definitions(category_id)",
	)
	.execute(&mut *tx)
	.await?;

	// Overrides
	//***********
	for scope in OverrideScope::ALL {
		let table = override_table(scope);
		sqlx::query(&format!(
			"CREATE TABLE IF NOT EXISTS {table} (
			id integer PRIMARY KEY AUTOINCREMENT,
			scope_id text NOT NULL,
			setting_key text NOT NULL,
			value text NOT NULL,
			created_at INTEGER NOT NULL DEFAULT (unixepoch()),
			updated_at INTEGER NOT NULL DEFAULT (unixepoch()),
			UNIQUE(scope_id, setting_key)
		)"
		))
		.execute(&mut *tx)
		.await?;
	}

	if version == 0 {
		set_db_version(&mut tx, CURRENT_DB_VERSION).await?;
	} else if version > CURRENT_DB_VERSION {
		warn!(version, "Database schema is newer than this build ({})", CURRENT_DB_VERSION);
	}

	tx.commit().await?;
	Ok(())
}

// vim: ts=4
