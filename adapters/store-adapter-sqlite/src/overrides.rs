//! Per-scope setting overrides
//!
//! Every statement is confined to one `scope_id` of one override table.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::schema::override_table;
use crate::utils::*;
use settle_types::override_adapter::{OverrideItem, OverrideRow};
use settle_types::prelude::*;

const COLUMNS: &str = "id, scope_id, setting_key, value, created_at, updated_at";

fn row_to_override(row: &SqliteRow) -> Result<OverrideRow, sqlx::Error> {
	let value: String = row.try_get("value")?;
	Ok(OverrideRow {
		id: row.try_get("id")?,
		scope_id: ScopeId::from(row.try_get::<String, _>("scope_id")?),
		setting_key: row.try_get::<String, _>("setting_key")?.into(),
		value: json_from_text(&value)?,
		created_at: Timestamp(row.try_get("created_at")?),
		updated_at: Timestamp(row.try_get("updated_at")?),
	})
}

/// Decode listed rows. A row that fails to decode is logged and left out, so
/// one corrupt value never hides the rest of the scope.
fn decode_rows(scope: OverrideScope, rows: &[SqliteRow]) -> Vec<OverrideRow> {
	rows.iter()
		.filter_map(|row| match row_to_override(row) {
			Ok(item) => Some(item),
			Err(err) => {
				let scope_id = row.try_get::<String, _>("scope_id").unwrap_or_default();
				let key = row.try_get::<String, _>("setting_key").unwrap_or_default();
				warn!(scope = %scope, scope_id = %scope_id, key = %key, "Skipping malformed override row: {}", err);
				None
			}
		})
		.collect()
}

fn upsert_sql(scope: OverrideScope) -> String {
	format!(
		"INSERT INTO {} (scope_id, setting_key, value) VALUES (?, ?, ?)
		ON CONFLICT(scope_id, setting_key) DO UPDATE SET
			value = excluded.value, updated_at = unixepoch()
		RETURNING {COLUMNS}",
		override_table(scope)
	)
}

// Commands
//**********

pub(crate) async fn upsert(
	db: &SqlitePool,
	scope: OverrideScope,
	scope_id: &ScopeId,
	key: &str,
	value: &serde_json::Value,
) -> ClResult<OverrideRow> {
	let res = sqlx::query(&upsert_sql(scope))
		.bind(scope_id.as_str())
		.bind(key)
		.bind(value.to_string())
		.fetch_one(db)
		.await;

	map_res(res, row_to_override)
}

/// All items in one transaction
pub(crate) async fn batch_upsert(
	db: &SqlitePool,
	scope: OverrideScope,
	items: &[OverrideItem],
) -> ClResult<()> {
	let sql = upsert_sql(scope);
	let mut tx = db.begin().await.inspect_err(inspect).map_err(db_error)?;
	for item in items {
		sqlx::query(&sql)
			.bind(item.scope_id.as_str())
			.bind(&*item.setting_key)
			.bind(item.value.to_string())
			.execute(&mut *tx)
			.await
			.inspect_err(inspect)
			.map_err(db_error)?;
	}
	tx.commit().await.inspect_err(inspect).map_err(db_error)?;
	Ok(())
}

pub(crate) async fn delete(
	db: &SqlitePool,
	scope: OverrideScope,
	scope_id: &ScopeId,
	key: &str,
) -> ClResult<bool> {
	let res = sqlx::query(&format!(
		"DELETE FROM {} WHERE scope_id = ? AND setting_key = ?",
		override_table(scope)
	))
	.bind(scope_id.as_str())
	.bind(key)
	.execute(db)
	.await
	.inspect_err(inspect)
	.map_err(db_error)?;

	Ok(res.rows_affected() > 0)
}

pub(crate) async fn delete_all(
	db: &SqlitePool,
	scope: OverrideScope,
	scope_id: &ScopeId,
) -> ClResult<u64> {
	let res = sqlx::query(&format!("DELETE FROM {} WHERE scope_id = ?", override_table(scope)))
		.bind(scope_id.as_str())
		.execute(db)
		.await
		.inspect_err(inspect)
		.map_err(db_error)?;

	Ok(res.rows_affected())
}

// Queries
//*********

pub(crate) async fn read(
	db: &SqlitePool,
	scope: OverrideScope,
	scope_id: &ScopeId,
	key: &str,
) -> ClResult<Option<OverrideRow>> {
	let row = sqlx::query(&format!(
		"SELECT {COLUMNS} FROM {} WHERE scope_id = ? AND setting_key = ?",
		override_table(scope)
	))
	.bind(scope_id.as_str())
	.bind(key)
	.fetch_optional(db)
	.await
	.inspect_err(inspect)
	.map_err(db_error)?;

	row.as_ref().map(row_to_override).transpose().inspect_err(inspect).map_err(db_error)
}

pub(crate) async fn list(
	db: &SqlitePool,
	scope: OverrideScope,
	scope_id: &ScopeId,
) -> ClResult<Vec<OverrideRow>> {
	let rows = sqlx::query(&format!(
		"SELECT {COLUMNS} FROM {} WHERE scope_id = ? ORDER BY setting_key",
		override_table(scope)
	))
	.bind(scope_id.as_str())
	.fetch_all(db)
	.await
	.inspect_err(inspect)
	.map_err(db_error)?;

	Ok(decode_rows(scope, &rows))
}

pub(crate) async fn list_by_keys(
	db: &SqlitePool,
	scope: OverrideScope,
	scope_id: &ScopeId,
	keys: &[&str],
) -> ClResult<Vec<OverrideRow>> {
	if keys.is_empty() {
		return Ok(Vec::new());
	}

	let mut query = sqlx::QueryBuilder::new(format!(
		"SELECT {COLUMNS} FROM {} WHERE scope_id = ",
		override_table(scope)
	));
	query.push_bind(scope_id.as_str()).push(" AND setting_key IN (");
	let mut separated = query.separated(", ");
	for key in keys {
		separated.push_bind(*key);
	}
	separated.push_unseparated(") ORDER BY setting_key");

	let rows = query.build().fetch_all(db).await.inspect_err(inspect).map_err(db_error)?;
	Ok(decode_rows(scope, &rows))
}

// vim: ts=4
