//! Engine configuration
//!
//! | Env Var                           | Default    |
//! |-----------------------------------|------------|
//! | `SETTLE_CACHE_PREFIX`             | `settle:`  |
//! | `SETTLE_TTL_CATALOG_SECS`         | `300`      |
//! | `SETTLE_TTL_OVERRIDES_SECS`       | `300`      |
//! | `SETTLE_TTL_EFFECTIVE_SECS`       | `300`      |
//! | `SETTLE_TTL_RESPONSE_SECS`        | `120`      |
//! | `SETTLE_INVALIDATION_MODE`        | `detached` |
//! | `SETTLE_INVALIDATION_WORKERS`     | `2`        |
//! | `SETTLE_INVALIDATION_QUEUE`       | `1024`     |
//! | `SETTLE_INVALIDATION_TIMEOUT_MS`  | `3000`     |

use std::str::FromStr;
use std::time::Duration;

use crate::prelude::*;

/// How the deferred part of a cache invalidation is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationMode {
	/// Run every invalidation before the write returns
	Inline,
	/// Hand descendant and listing invalidations to the background dispatcher.
	/// Those entries may stay stale for up to the task timeout.
	Detached,
}

impl FromStr for InvalidationMode {
	type Err = Error;

	fn from_str(s: &str) -> ClResult<Self> {
		match s {
			"inline" => Ok(InvalidationMode::Inline),
			"detached" => Ok(InvalidationMode::Detached),
			_ => Err(Error::ConfigError(format!("invalid invalidation mode: {}", s))),
		}
	}
}

#[derive(Debug, Clone)]
pub struct SettleConfig {
	/// Prepended to every cache key
	pub cache_prefix: Box<str>,
	pub catalog_ttl: Duration,
	/// Tier A: raw overrides per scope entity
	pub overrides_ttl: Duration,
	/// Tier B: effective values
	pub effective_ttl: Duration,
	/// Tier C: assembled listings
	pub response_ttl: Duration,
	pub invalidation_mode: InvalidationMode,
	pub invalidation_workers: usize,
	pub invalidation_queue: usize,
	/// Deadline of one detached invalidation task
	pub invalidation_timeout: Duration,
}

impl Default for SettleConfig {
	fn default() -> Self {
		Self {
			cache_prefix: "settle:".into(),
			catalog_ttl: Duration::from_secs(300),
			overrides_ttl: Duration::from_secs(300),
			effective_ttl: Duration::from_secs(300),
			response_ttl: Duration::from_secs(120),
			invalidation_mode: InvalidationMode::Detached,
			invalidation_workers: 2,
			invalidation_queue: 1024,
			invalidation_timeout: Duration::from_millis(3000),
		}
	}
}

impl SettleConfig {
	/// Load configuration from environment variables with defaults
	pub fn from_env() -> ClResult<Self> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Load configuration through an arbitrary variable lookup
	pub fn from_lookup<F>(lookup: F) -> ClResult<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();

		if let Some(prefix) = lookup("SETTLE_CACHE_PREFIX") {
			config.cache_prefix = prefix.into_boxed_str();
		}
		if let Some(secs) = parse_var::<u64>(&lookup, "SETTLE_TTL_CATALOG_SECS")? {
			config.catalog_ttl = Duration::from_secs(secs);
		}
		if let Some(secs) = parse_var::<u64>(&lookup, "SETTLE_TTL_OVERRIDES_SECS")? {
			config.overrides_ttl = Duration::from_secs(secs);
		}
		if let Some(secs) = parse_var::<u64>(&lookup, "SETTLE_TTL_EFFECTIVE_SECS")? {
			config.effective_ttl = Duration::from_secs(secs);
		}
		if let Some(secs) = parse_var::<u64>(&lookup, "SETTLE_TTL_RESPONSE_SECS")? {
			config.response_ttl = Duration::from_secs(secs);
		}
		if let Some(mode) = parse_var::<InvalidationMode>(&lookup, "SETTLE_INVALIDATION_MODE")? {
			config.invalidation_mode = mode;
		}
		if let Some(workers) = parse_var::<usize>(&lookup, "SETTLE_INVALIDATION_WORKERS")? {
			config.invalidation_workers = workers;
		}
		if let Some(queue) = parse_var::<usize>(&lookup, "SETTLE_INVALIDATION_QUEUE")? {
			config.invalidation_queue = queue;
		}
		if let Some(ms) = parse_var::<u64>(&lookup, "SETTLE_INVALIDATION_TIMEOUT_MS")? {
			config.invalidation_timeout = Duration::from_millis(ms);
		}

		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> ClResult<()> {
		if self.invalidation_workers == 0 {
			return Err(Error::ConfigError("SETTLE_INVALIDATION_WORKERS must be at least 1".into()));
		}
		if self.invalidation_queue == 0 {
			return Err(Error::ConfigError("SETTLE_INVALIDATION_QUEUE must be at least 1".into()));
		}
		if self.invalidation_timeout.is_zero() {
			return Err(Error::ConfigError("SETTLE_INVALIDATION_TIMEOUT_MS must be positive".into()));
		}
		Ok(())
	}

	pub fn with_cache_prefix(mut self, prefix: impl Into<Box<str>>) -> Self {
		self.cache_prefix = prefix.into();
		self
	}

	/// Set the TTL of every cache tier at once
	pub fn with_ttl(mut self, ttl: Duration) -> Self {
		self.catalog_ttl = ttl;
		self.overrides_ttl = ttl;
		self.effective_ttl = ttl;
		self.response_ttl = ttl;
		self
	}

	pub fn with_invalidation_mode(mut self, mode: InvalidationMode) -> Self {
		self.invalidation_mode = mode;
		self
	}

	pub fn with_invalidation_workers(mut self, workers: usize) -> Self {
		self.invalidation_workers = workers;
		self
	}

	pub fn with_invalidation_queue(mut self, capacity: usize) -> Self {
		self.invalidation_queue = capacity;
		self
	}

	pub fn with_invalidation_timeout(mut self, timeout: Duration) -> Self {
		self.invalidation_timeout = timeout;
		self
	}
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> ClResult<Option<T>>
where
	T: FromStr,
{
	match lookup(name) {
		None => Ok(None),
		Some(raw) => raw
			.trim()
			.parse::<T>()
			.map(Some)
			.map_err(|_| Error::ConfigError(format!("{} has an invalid value: {}", name, raw))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> =
			vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
		move |name| vars.get(name).cloned()
	}

	#[test]
	fn test_defaults() {
		let config = SettleConfig::from_lookup(lookup(&[])).expect("defaults are valid");
		assert_eq!(&*config.cache_prefix, "settle:");
		assert_eq!(config.invalidation_mode, InvalidationMode::Detached);
		assert_eq!(config.invalidation_timeout, Duration::from_secs(3));
	}

	#[test]
	fn test_overrides_from_env() {
		let config = SettleConfig::from_lookup(lookup(&[
			("SETTLE_CACHE_PREFIX", "test:"),
			("SETTLE_TTL_RESPONSE_SECS", "5"),
			("SETTLE_INVALIDATION_MODE", "inline"),
			("SETTLE_INVALIDATION_WORKERS", "4"),
		]))
		.expect("valid config");
		assert_eq!(&*config.cache_prefix, "test:");
		assert_eq!(config.response_ttl, Duration::from_secs(5));
		assert_eq!(config.invalidation_mode, InvalidationMode::Inline);
		assert_eq!(config.invalidation_workers, 4);
	}

	#[test]
	fn test_invalid_values_are_config_errors() {
		let res = SettleConfig::from_lookup(lookup(&[("SETTLE_TTL_CATALOG_SECS", "soon")]));
		assert!(matches!(res, Err(Error::ConfigError(_))));

		let res = SettleConfig::from_lookup(lookup(&[("SETTLE_INVALIDATION_MODE", "sync")]));
		assert!(matches!(res, Err(Error::ConfigError(_))));

		let res = SettleConfig::from_lookup(lookup(&[("SETTLE_INVALIDATION_WORKERS", "0")]));
		assert!(matches!(res, Err(Error::ConfigError(_))));
	}
}

// vim: ts=4
