//! Error type shared by every settings crate

use crate::types::ScopeLevel;

pub type ClResult<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Key is not in the catalog (or not visible at the caller's scope)
	#[error("invalid setting key: {0}")]
	InvalidSettingKey(Box<str>),

	/// Candidate value failed the value-type check
	#[error("invalid value for setting '{key}': {reason}")]
	InvalidSettingValue { key: Box<str>, reason: String },

	/// Candidate value failed the format or rule check
	#[error("validation failed for setting '{key}': {message}")]
	ValidationFailed { key: Box<str>, message: String },

	#[error("setting '{key}' is not configurable at {scope} scope")]
	NotConfigurableAtScope { key: Box<str>, scope: ScopeLevel },

	#[error("not found")]
	NotFound,

	/// Catalog entry already exists
	#[error("conflict: {0}")]
	Conflict(String),

	/// Cache backend failure. Absorbed by the cache layer, never returned by the service.
	#[error("cache backend error: {0}")]
	CacheBackend(String),

	#[error("database error: {0}")]
	DbError(String),

	#[error("parse error: {0}")]
	Parse(String),

	#[error("configuration error: {0}")]
	ConfigError(String),

	#[error("operation cancelled")]
	Cancelled,

	#[error("operation timed out")]
	Timeout,

	#[error("internal error: {0}")]
	Internal(String),
}

impl Error {
	/// Business errors are returned to the caller with key and reason,
	/// everything else is an infrastructure failure.
	pub fn is_business(&self) -> bool {
		matches!(
			self,
			Error::InvalidSettingKey(_)
				| Error::InvalidSettingValue { .. }
				| Error::ValidationFailed { .. }
				| Error::NotConfigurableAtScope { .. }
				| Error::NotFound
		)
	}

	/// Setting key the error refers to, if any
	pub fn key(&self) -> Option<&str> {
		match self {
			Error::InvalidSettingKey(key)
			| Error::InvalidSettingValue { key, .. }
			| Error::ValidationFailed { key, .. }
			| Error::NotConfigurableAtScope { key, .. } => Some(key),
			_ => None,
		}
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Parse(err.to_string())
	}
}

impl From<tokio::time::error::Elapsed> for Error {
	fn from(_: tokio::time::error::Elapsed) -> Self {
		Error::Timeout
	}
}


// vim: ts=4
