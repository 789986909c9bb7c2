//! Cache key layout
//!
//! `{prefix}{tier}:{scope}:{scope_id}[:{suffix}]`
//!
//! Tier B and C entries of a team context use `{team_id}@{org_id}` as their
//! scope id (`{team_id}@-` without an org), since the org fallback changes
//! what the context resolves to.
//!
//! | Tier        | Suffix                  | Payload                         |
//! |-------------|-------------------------|---------------------------------|
//! | `overrides` | -                       | raw overrides of one entity (A) |
//! | `effective` | - or setting key        | effective values (B)            |
//! | `response`  | category filter / `all` | assembled listing (C)           |
//! | `catalog`   | -                       | catalog snapshot                |

use std::fmt;

use crate::prelude::*;

/// Scope id used for the system scope, which has no entity
pub const SYSTEM_SCOPE_ID: &str = "0";

/// Org part of a team cache id when the team context has no org
pub const NO_ORG: &str = "-";

/// Cache id of a team context
pub fn team_cache_id(team_id: &str, org_id: &str) -> String {
	format!("{}@{}", team_id, org_id)
}

/// Listing variant without a category filter
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
	Overrides,
	Effective,
	Response,
	Catalog,
}

impl Tier {
	pub fn as_str(self) -> &'static str {
		match self {
			Tier::Overrides => "overrides",
			Tier::Effective => "effective",
			Tier::Response => "response",
			Tier::Catalog => "catalog",
		}
	}
}

impl fmt::Display for Tier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Something to delete from the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
	Key(String),
	Prefix(String),
}

#[derive(Debug, Clone)]
pub struct CacheKeys {
	prefix: Box<str>,
}

impl CacheKeys {
	pub fn new(prefix: impl Into<Box<str>>) -> Self {
		Self { prefix: prefix.into() }
	}

	pub fn prefix(&self) -> &str {
		&self.prefix
	}

	fn entity(&self, tier: Tier, scope: ScopeLevel, scope_id: &str) -> String {
		format!("{}{}:{}:{}", self.prefix, tier, scope, scope_id)
	}

	pub fn catalog(&self) -> String {
		self.entity(Tier::Catalog, ScopeLevel::System, SYSTEM_SCOPE_ID)
	}

	/// Tier A: whole override set of one entity
	pub fn overrides(&self, scope: OverrideScope, scope_id: &ScopeId) -> String {
		self.entity(Tier::Overrides, scope.level(), scope_id.as_str())
	}

	/// Tier B: every effective value at one scope context
	pub fn effective_all(&self, scope: ScopeLevel, scope_id: &str) -> String {
		self.entity(Tier::Effective, scope, scope_id)
	}

	/// Tier B: one effective setting at one scope context
	pub fn effective(&self, scope: ScopeLevel, scope_id: &str, key: &str) -> String {
		format!("{}:{}", self.entity(Tier::Effective, scope, scope_id), key)
	}

	/// Tier C: assembled listing, optionally filtered to one category
	pub fn response(&self, scope: ScopeLevel, scope_id: &str, category: Option<&str>) -> String {
		format!(
			"{}:{}",
			self.entity(Tier::Response, scope, scope_id),
			category.unwrap_or(ALL_CATEGORIES)
		)
	}

	/// Every entry of one entity in one tier.
	///
	/// The entity key itself plus everything below `{key}:`, so that entity
	/// `1` never matches entity `10`. For teams every org variant of the team
	/// is covered through the `{team_id}@` prefix.
	pub fn entity_targets(&self, tier: Tier, scope: ScopeLevel, scope_id: &str) -> Vec<Target> {
		if scope == ScopeLevel::Team && matches!(tier, Tier::Effective | Tier::Response) {
			return vec![Target::Prefix(self.entity(tier, scope, &format!("{}@", scope_id)))];
		}
		let exact = self.entity(tier, scope, scope_id);
		let below = format!("{}:", exact);
		vec![Target::Key(exact), Target::Prefix(below)]
	}

	/// Every entry of every entity of one scope level in one tier
	pub fn level_target(&self, tier: Tier, scope: ScopeLevel) -> Target {
		Target::Prefix(format!("{}{}:{}:", self.prefix, tier, scope))
	}

	/// Every entry of one tier
	pub fn tier_target(&self, tier: Tier) -> Target {
		Target::Prefix(format!("{}{}:", self.prefix, tier))
	}
}


// vim: ts=4
