//! Utility functions for database operations

use serde::{Serialize, de::DeserializeOwned};
use sqlx::sqlite::SqliteRow;

use settle_types::prelude::*;

/// Log database errors
pub(crate) fn inspect(err: &sqlx::Error) {
	warn!("DB: {:#?}", err);
}

pub(crate) fn db_error(err: sqlx::Error) -> Error {
	Error::DbError(err.to_string())
}

/// Map a query result to a value using a closure
pub(crate) fn map_res<T, F>(row: Result<SqliteRow, sqlx::Error>, f: F) -> ClResult<T>
where
	F: FnOnce(&SqliteRow) -> Result<T, sqlx::Error>,
{
	match row {
		Ok(ref row) => f(row).inspect_err(inspect).map_err(db_error),
		Err(sqlx::Error::RowNotFound) => Err(Error::NotFound),
		Err(err) => {
			inspect(&err);
			Err(db_error(err))
		}
	}
}

/// Collect result iterator into a vector
pub(crate) fn collect_res<T>(
	iter: impl Iterator<Item = Result<T, sqlx::Error>> + Unpin,
) -> ClResult<Vec<T>> {
	let mut items = Vec::new();
	for item in iter {
		items.push(item.inspect_err(inspect).map_err(db_error)?);
	}
	Ok(items)
}

/// `Conflict` for unique-key violations, `DbError` for anything else
pub(crate) fn conflict_or_db_error(err: sqlx::Error, what: &str) -> Error {
	match &err {
		sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
			Error::Conflict(format!("{} already exists", what))
		}
		_ => {
			inspect(&err);
			db_error(err)
		}
	}
}

// Column codecs
//***************

/// Text form of a unit enum (`"team"`, `"email"`, ...)
pub(crate) fn enum_to_text<T: Serialize>(value: &T) -> ClResult<String> {
	match serde_json::to_value(value)? {
		serde_json::Value::String(s) => Ok(s),
		other => Err(Error::Internal(format!("not a unit enum: {}", other))),
	}
}

pub(crate) fn enum_from_text<T: DeserializeOwned>(text: &str) -> Result<T, sqlx::Error> {
	serde_json::from_value(serde_json::Value::String(text.to_owned()))
		.map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

pub(crate) fn json_from_text<T: DeserializeOwned>(text: &str) -> Result<T, sqlx::Error> {
	serde_json::from_str(text).map_err(|err| sqlx::Error::Decode(Box::new(err)))
}

pub(crate) fn opt_json_to_text(value: Option<&serde_json::Value>) -> Option<String> {
	value.map(serde_json::Value::to_string)
}

pub(crate) fn opt_json_from_text(
	text: Option<String>,
) -> Result<Option<serde_json::Value>, sqlx::Error> {
	text.as_deref().map(json_from_text).transpose()
}

// vim: ts=4
