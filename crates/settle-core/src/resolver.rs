//! Scope resolution
//!
//! A scope context selects a chain of override stores, most specific first:
//!
//! | Context | Chain                     |
//! |---------|---------------------------|
//! | team    | team → org (if known) → system |
//! | org     | org → system              |
//! | user    | user → system             |
//! | system  | system                    |
//!
//! The first store in the chain holding a usable value for a key supplies the
//! effective value; otherwise the definition's default applies.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::borrow::Cow;
use std::fmt;

use crate::cache::keys::{NO_ORG, SYSTEM_SCOPE_ID, team_cache_id};
use crate::catalog::FrozenCatalog;
use crate::prelude::*;
use crate::repository::{OverrideMap, OverrideStores};
use settle_types::catalog_adapter::SettingDefinition;
use settle_types::types::{InputType, ValueType};

// ScopeContext
//**************

/// Scope entities that apply to one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "lowercase")]
pub enum ScopeContext {
	System,
	User {
		#[serde(rename = "userId")]
		user_id: ScopeId,
	},
	Org {
		#[serde(rename = "orgId")]
		org_id: ScopeId,
	},
	Team {
		#[serde(rename = "teamId")]
		team_id: ScopeId,
		/// Organization the team belongs to, consulted after the team
		#[serde(rename = "orgId")]
		org_id: Option<ScopeId>,
	},
}

impl ScopeContext {
	pub fn user(user_id: impl Into<ScopeId>) -> Self {
		ScopeContext::User { user_id: user_id.into() }
	}

	pub fn org(org_id: impl Into<ScopeId>) -> Self {
		ScopeContext::Org { org_id: org_id.into() }
	}

	pub fn team(team_id: impl Into<ScopeId>, org_id: Option<ScopeId>) -> Self {
		ScopeContext::Team { team_id: team_id.into(), org_id }
	}

	/// Build a context from the ids a request carries.
	///
	/// A team id selects a team context (with the org id as its fallback),
	/// an org id alone an org context, a user id alone a user context.
	/// A user id combined with an org or team id is ambiguous.
	pub fn from_ids(
		user_id: Option<ScopeId>,
		org_id: Option<ScopeId>,
		team_id: Option<ScopeId>,
	) -> ClResult<Self> {
		match (user_id, org_id, team_id) {
			(Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(Error::Parse(
				"a user scope cannot be combined with an org or team scope".into(),
			)),
			(None, org_id, Some(team_id)) => Ok(ScopeContext::Team { team_id, org_id }),
			(None, Some(org_id), None) => Ok(ScopeContext::Org { org_id }),
			(Some(user_id), None, None) => Ok(ScopeContext::User { user_id }),
			(None, None, None) => Ok(ScopeContext::System),
		}
	}

	pub fn level(&self) -> ScopeLevel {
		match self {
			ScopeContext::System => ScopeLevel::System,
			ScopeContext::User { .. } => ScopeLevel::User,
			ScopeContext::Org { .. } => ScopeLevel::Org,
			ScopeContext::Team { .. } => ScopeLevel::Team,
		}
	}

	/// Id of the most specific entity (`0` for system)
	pub fn scope_id(&self) -> &str {
		match self.target() {
			Some((_, id)) => id.as_str(),
			None => SYSTEM_SCOPE_ID,
		}
	}

	/// Identity of the context in cache keys.
	///
	/// Team contexts with and without an org resolve along different chains,
	/// so the org fallback is part of a team's identity: `{team_id}@{org_id}`,
	/// or `{team_id}@-` without one.
	pub fn cache_id(&self) -> Cow<'_, str> {
		match self {
			ScopeContext::Team { team_id, org_id } => Cow::Owned(team_cache_id(
				team_id.as_str(),
				org_id.as_ref().map_or(NO_ORG, ScopeId::as_str),
			)),
			_ => Cow::Borrowed(self.scope_id()),
		}
	}

	/// The store a write from this context goes to
	pub fn target(&self) -> Option<(OverrideScope, &ScopeId)> {
		match self {
			ScopeContext::System => None,
			ScopeContext::User { user_id } => Some((OverrideScope::User, user_id)),
			ScopeContext::Org { org_id } => Some((OverrideScope::Org, org_id)),
			ScopeContext::Team { team_id, .. } => Some((OverrideScope::Team, team_id)),
		}
	}

	/// Override stores to consult, most specific first
	pub fn chain(&self) -> Vec<(OverrideScope, &ScopeId)> {
		match self {
			ScopeContext::System => Vec::new(),
			ScopeContext::User { user_id } => vec![(OverrideScope::User, user_id)],
			ScopeContext::Org { org_id } => vec![(OverrideScope::Org, org_id)],
			ScopeContext::Team { team_id, org_id } => {
				let mut chain = vec![(OverrideScope::Team, team_id)];
				if let Some(org_id) = org_id {
					chain.push((OverrideScope::Org, org_id));
				}
				chain
			}
		}
	}
}

impl fmt::Display for ScopeContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.level(), self.scope_id())
	}
}

// EffectiveSetting
//******************

/// Display metadata copied from the definition
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingMetadata {
	pub label: Box<str>,
	pub description: Option<Box<str>>,
	pub value_type: ValueType,
	pub input_type: InputType,
	pub visible_at: ScopeLevel,
	pub configurable_at: ScopeLevel,
	pub category_id: Box<str>,
	pub group: Option<Box<str>>,
	pub order: i32,
	pub options: Option<serde_json::Value>,
}

impl From<&SettingDefinition> for SettingMetadata {
	fn from(def: &SettingDefinition) -> Self {
		Self {
			label: def.label.clone(),
			description: def.description.clone(),
			value_type: def.value_type,
			input_type: def.input_type,
			visible_at: def.visible_at,
			configurable_at: def.configurable_at,
			category_id: def.category_id.clone(),
			group: def.group.clone(),
			order: def.order,
			options: def.options.clone(),
		}
	}
}

/// Resolved value of one setting at one scope context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSetting {
	pub key: Box<str>,
	pub value: SettingValue,
	pub is_customized: bool,
	/// Scope level that supplied `value`
	pub provenance: ScopeLevel,
	#[serde(flatten)]
	pub metadata: SettingMetadata,
}

impl EffectiveSetting {
	pub fn default_of(def: &SettingDefinition) -> Self {
		Self {
			key: def.key.clone(),
			value: def.default_value.clone(),
			is_customized: false,
			provenance: ScopeLevel::System,
			metadata: def.into(),
		}
	}

	pub fn customized(def: &SettingDefinition, value: SettingValue, provenance: ScopeLevel) -> Self {
		Self {
			key: def.key.clone(),
			value,
			is_customized: true,
			provenance,
			metadata: def.into(),
		}
	}
}

// Resolver
//**********

#[derive(Debug, Clone, Copy)]
pub struct ScopeResolver<'a> {
	catalog: &'a FrozenCatalog,
	stores: &'a OverrideStores,
}

impl<'a> ScopeResolver<'a> {
	pub fn new(catalog: &'a FrozenCatalog, stores: &'a OverrideStores) -> Self {
		Self { catalog, stores }
	}

	/// Resolve one key. Visibility is not checked here.
	pub async fn resolve(&self, ctx: &ScopeContext, key: &str) -> ClResult<EffectiveSetting> {
		let def = self.catalog.find_by_key(key).ok_or_else(|| Error::InvalidSettingKey(key.into()))?;
		let layers = self.load_layers(ctx).await?;
		Ok(resolve_with(def, &layers))
	}

	/// Resolve many definitions with one override fetch per scope in the chain
	pub async fn resolve_many(
		&self,
		ctx: &ScopeContext,
		defs: &[&SettingDefinition],
	) -> ClResult<Vec<EffectiveSetting>> {
		let layers = self.load_layers(ctx).await?;
		Ok(defs.iter().map(|def| resolve_with(def, &layers)).collect())
	}

	/// Resolve every definition of the catalog
	pub async fn resolve_all(&self, ctx: &ScopeContext) -> ClResult<Vec<EffectiveSetting>> {
		let defs: Vec<&SettingDefinition> = self.catalog.find_all().collect();
		self.resolve_many(ctx, &defs).await
	}

	async fn load_layers(&self, ctx: &ScopeContext) -> ClResult<Vec<Layer>> {
		let chain = ctx.chain();
		let maps = try_join_all(
			chain.iter().map(|(scope, id)| self.stores.get(*scope).find_all_for_scope(id)),
		)
		.await?;
		Ok(chain
			.into_iter()
			.zip(maps)
			.map(|((scope, id), overrides)| Layer { scope, scope_id: id.clone(), overrides })
			.collect())
	}
}

/// Overrides of one scope entity in the chain
#[derive(Debug)]
struct Layer {
	scope: OverrideScope,
	scope_id: ScopeId,
	overrides: OverrideMap,
}

fn resolve_with(def: &SettingDefinition, layers: &[Layer]) -> EffectiveSetting {
	for layer in layers {
		let Some(raw) = layer.overrides.get(&def.key) else {
			continue;
		};
		match SettingValue::typed(def.value_type, raw.clone()) {
			Ok(value) => return EffectiveSetting::customized(def, value, layer.scope.level()),
			Err(reason) => {
				warn!(
					key = %def.key,
					scope = %layer.scope,
					scope_id = %layer.scope_id,
					"Skipping malformed override: {}",
					reason
				);
			}
		}
	}
	EffectiveSetting::default_of(def)
}


// vim: ts=4
