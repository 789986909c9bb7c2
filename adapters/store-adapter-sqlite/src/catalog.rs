//! Setting definitions and categories

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::utils::*;
use settle_types::catalog_adapter::{SettingCategory, SettingDefinition};
use settle_types::prelude::*;

const DEFINITION_COLUMNS: &str = "key, label, description, default_value, value_type, input_type, \
	visible_at, configurable_at, validation_rule, options, category_id, grp, ord";

fn definition_from_row(row: &SqliteRow) -> Result<SettingDefinition, sqlx::Error> {
	let default_value: String = row.try_get("default_value")?;
	let value_type: String = row.try_get("value_type")?;
	let input_type: String = row.try_get("input_type")?;
	let visible_at: String = row.try_get("visible_at")?;
	let configurable_at: String = row.try_get("configurable_at")?;

	Ok(SettingDefinition {
		key: row.try_get::<String, _>("key")?.into(),
		label: row.try_get::<String, _>("label")?.into(),
		description: row.try_get::<Option<String>, _>("description")?.map(Into::into),
		default_value: json_from_text(&default_value)?,
		value_type: enum_from_text(&value_type)?,
		input_type: enum_from_text(&input_type)?,
		visible_at: enum_from_text(&visible_at)?,
		configurable_at: enum_from_text(&configurable_at)?,
		validation_rule: opt_json_from_text(row.try_get("validation_rule")?)?,
		options: opt_json_from_text(row.try_get("options")?)?,
		category_id: row.try_get::<String, _>("category_id")?.into(),
		group: row.try_get::<Option<String>, _>("grp")?.map(Into::into),
		order: row.try_get("ord")?,
	})
}

fn category_from_row(row: &SqliteRow) -> Result<SettingCategory, sqlx::Error> {
	Ok(SettingCategory {
		key: row.try_get::<String, _>("key")?.into(),
		label: row.try_get::<String, _>("label")?.into(),
		icon: row.try_get::<Option<String>, _>("icon")?.map(Into::into),
		order: row.try_get("ord")?,
	})
}

/// Column values of a definition in `DEFINITION_COLUMNS` order, minus the key
struct DefinitionColumns {
	default_value: String,
	value_type: String,
	input_type: String,
	visible_at: String,
	configurable_at: String,
	validation_rule: Option<String>,
	options: Option<String>,
}

impl DefinitionColumns {
	fn encode(def: &SettingDefinition) -> ClResult<Self> {
		Ok(Self {
			default_value: serde_json::to_string(&def.default_value)?,
			value_type: def.value_type.as_str().to_owned(),
			input_type: enum_to_text(&def.input_type)?,
			visible_at: def.visible_at.as_str().to_owned(),
			configurable_at: def.configurable_at.as_str().to_owned(),
			validation_rule: opt_json_to_text(def.validation_rule.as_ref()),
			options: opt_json_to_text(def.options.as_ref()),
		})
	}
}

// Definitions
//*************

pub(crate) async fn list_definitions(db: &SqlitePool) -> ClResult<Vec<SettingDefinition>> {
	let rows = sqlx::query(&format!(
		"SELECT {DEFINITION_COLUMNS} FROM setting_definitions ORDER BY category_id, ord, key"
	))
	.fetch_all(db)
	.await
	.inspect_err(inspect)
	.map_err(db_error)?;

	collect_res(rows.iter().map(definition_from_row))
}

pub(crate) async fn read_definition(
	db: &SqlitePool,
	key: &str,
) -> ClResult<Option<SettingDefinition>> {
	let res = sqlx::query(&format!("SELECT {DEFINITION_COLUMNS} FROM setting_definitions WHERE key = ?"))
		.bind(key)
		.fetch_one(db)
		.await;

	match map_res(res, definition_from_row) {
		Ok(def) => Ok(Some(def)),
		Err(Error::NotFound) => Ok(None),
		Err(err) => Err(err),
	}
}

pub(crate) async fn create_definition(db: &SqlitePool, def: &SettingDefinition) -> ClResult<()> {
	let cols = DefinitionColumns::encode(def)?;
	sqlx::query(&format!(
		"INSERT INTO setting_definitions ({DEFINITION_COLUMNS})
		VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
	))
	.bind(&*def.key)
	.bind(&*def.label)
	.bind(def.description.as_deref())
	.bind(cols.default_value)
	.bind(cols.value_type)
	.bind(cols.input_type)
	.bind(cols.visible_at)
	.bind(cols.configurable_at)
	.bind(cols.validation_rule)
	.bind(cols.options)
	.bind(&*def.category_id)
	.bind(def.group.as_deref())
	.bind(def.order)
	.execute(db)
	.await
	.map_err(|err| conflict_or_db_error(err, &format!("setting definition '{}'", def.key)))?;
	Ok(())
}

pub(crate) async fn update_definition(db: &SqlitePool, def: &SettingDefinition) -> ClResult<()> {
	let cols = DefinitionColumns::encode(def)?;
	let res = sqlx::query(
		"UPDATE setting_definitions SET label = ?, description = ?, default_value = ?,
		value_type = ?, input_type = ?, visible_at = ?, configurable_at = ?,
		validation_rule = ?, options = ?, category_id = ?, grp = ?, ord = ?,
		updated_at = unixepoch()
		WHERE key = ?",
	)
	.bind(&*def.label)
	.bind(def.description.as_deref())
	.bind(cols.default_value)
	.bind(cols.value_type)
	.bind(cols.input_type)
	.bind(cols.visible_at)
	.bind(cols.configurable_at)
	.bind(cols.validation_rule)
	.bind(cols.options)
	.bind(&*def.category_id)
	.bind(def.group.as_deref())
	.bind(def.order)
	.bind(&*def.key)
	.execute(db)
	.await
	.inspect_err(inspect)
	.map_err(db_error)?;

	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

pub(crate) async fn upsert_definition(db: &SqlitePool, def: &SettingDefinition) -> ClResult<()> {
	let cols = DefinitionColumns::encode(def)?;
	sqlx::query(&format!(
		"INSERT INTO setting_definitions ({DEFINITION_COLUMNS})
		VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
		ON CONFLICT(key) DO UPDATE SET
			label = excluded.label, description = excluded.description,
			default_value = excluded.default_value, value_type = excluded.value_type,
			input_type = excluded.input_type, visible_at = excluded.visible_at,
			configurable_at = excluded.configurable_at, validation_rule = excluded.validation_rule,
			options = excluded.options, category_id = excluded.category_id,
			grp = excluded.grp, ord = excluded.ord, updated_at = unixepoch()"
	))
	.bind(&*def.key)
	.bind(&*def.label)
	.bind(def.description.as_deref())
	.bind(cols.default_value)
	.bind(cols.value_type)
	.bind(cols.input_type)
	.bind(cols.visible_at)
	.bind(cols.configurable_at)
	.bind(cols.validation_rule)
	.bind(cols.options)
	.bind(&*def.category_id)
	.bind(def.group.as_deref())
	.bind(def.order)
	.execute(db)
	.await
	.inspect_err(inspect)
	.map_err(db_error)?;
	Ok(())
}

pub(crate) async fn delete_definition(db: &SqlitePool, key: &str) -> ClResult<bool> {
	let res = sqlx::query("DELETE FROM setting_definitions WHERE key = ?")
		.bind(key)
		.execute(db)
		.await
		.inspect_err(inspect)
		.map_err(db_error)?;
	Ok(res.rows_affected() > 0)
}

// Categories
//************

pub(crate) async fn list_categories(db: &SqlitePool) -> ClResult<Vec<SettingCategory>> {
	let rows = sqlx::query("SELECT key, label, icon, ord FROM setting_categories ORDER BY ord, key")
		.fetch_all(db)
		.await
		.inspect_err(inspect)
		.map_err(db_error)?;

	collect_res(rows.iter().map(category_from_row))
}

pub(crate) async fn create_category(db: &SqlitePool, category: &SettingCategory) -> ClResult<()> {
	sqlx::query("INSERT INTO setting_categories (key, label, icon, ord) VALUES (?, ?, ?, ?)")
		.bind(&*category.key)
		.bind(&*category.label)
		.bind(category.icon.as_deref())
		.bind(category.order)
		.execute(db)
		.await
		.map_err(|err| conflict_or_db_error(err, &format!("setting category '{}'", category.key)))?;
	Ok(())
}

pub(crate) async fn update_category(db: &SqlitePool, category: &SettingCategory) -> ClResult<()> {
	let res = sqlx::query(
		"UPDATE setting_categories SET label = ?, icon = ?, ord = ?, updated_at = unixepoch()
		WHERE key = ?",
	)
	.bind(&*category.label)
	.bind(category.icon.as_deref())
	.bind(category.order)
	.bind(&*category.key)
	.execute(db)
	.await
	.inspect_err(inspect)
	.map_err(db_error)?;

	if res.rows_affected() == 0 {
		return Err(Error::NotFound);
	}
	Ok(())
}

pub(crate) async fn upsert_category(db: &SqlitePool, category: &SettingCategory) -> ClResult<()> {
	sqlx::query(
		"INSERT INTO setting_categories (key, label, icon, ord) VALUES (?, ?, ?, ?)
		ON CONFLICT(key) DO UPDATE SET
			label = excluded.label, icon = excluded.icon, ord = excluded.ord,
			updated_at = unixepoch()",
	)
	.bind(&*category.key)
	.bind(&*category.label)
	.bind(category.icon.as_deref())
	.bind(category.order)
	.execute(db)
	.await
	.inspect_err(inspect)
	.map_err(db_error)?;
	Ok(())
}

pub(crate) async fn delete_category(db: &SqlitePool, key: &str) -> ClResult<bool> {
	let res = sqlx::query("DELETE FROM setting_categories WHERE key = ?")
		.bind(key)
		.execute(db)
		.await
		.inspect_err(inspect)
		.map_err(db_error)?;
	Ok(res.rows_affected() > 0)
}

// vim: ts=4
