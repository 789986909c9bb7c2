//! Adapter that stores the setting catalog: definitions and categories.
//!
//! The catalog is read on every request but written only by administrators.
//! Every write through this adapter must be followed by a full cache
//! invalidation, which the core `CatalogService` takes care of.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt::Debug;

use crate::prelude::*;
use crate::types::{InputType, ScopeLevel, ValueType};
use crate::value::SettingValue;

/// Setting definition - the ground truth for key existence, type, scope rules and validation
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingDefinition {
	/// Dotted `category.name` key, globally unique
	pub key: Box<str>,
	pub label: Box<str>,
	pub description: Option<Box<str>>,
	pub default_value: SettingValue,
	pub value_type: ValueType,
	#[serde(default)]
	pub input_type: InputType,
	/// Minimum scope level at which the setting may be seen
	pub visible_at: ScopeLevel,
	/// Minimum scope level at which the setting may be written (`system` = never overridable)
	pub configurable_at: ScopeLevel,
	/// Declarative validation rule, shorthand or tree form (raw JSON)
	pub validation_rule: Option<serde_json::Value>,
	/// UI option list for select/radio inputs (validated by the caller)
	pub options: Option<serde_json::Value>,
	pub category_id: Box<str>,
	pub group: Option<Box<str>>,
	#[serde(default)]
	pub order: i32,
}

impl SettingDefinition {
	/// A scope may write the setting if it is configurable at all (not system-only)
	/// and the configurable level is at or below the scope.
	pub fn is_configurable_at(&self, scope: ScopeLevel) -> bool {
		self.configurable_at != ScopeLevel::System && self.configurable_at <= scope
	}

	/// Visible by nominal visibility, or because the scope may configure it
	pub fn is_visible_at(&self, scope: ScopeLevel) -> bool {
		self.visible_at <= scope || self.is_configurable_at(scope)
	}
}

/// Setting category - grouping and UI metadata only
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingCategory {
	pub key: Box<str>,
	pub label: Box<str>,
	pub icon: Option<Box<str>>,
	#[serde(default)]
	pub order: i32,
}

#[async_trait]
pub trait CatalogAdapter: Debug + Send + Sync {
	// Definitions
	//*************
	async fn list_definitions(&self) -> ClResult<Vec<SettingDefinition>>;
	async fn read_definition(&self, key: &str) -> ClResult<Option<SettingDefinition>>;

	/// Fails with `Error::Conflict` if the key already exists
	async fn create_definition(&self, def: &SettingDefinition) -> ClResult<()>;

	/// Fails with `Error::NotFound` if the key does not exist
	async fn update_definition(&self, def: &SettingDefinition) -> ClResult<()>;
	async fn upsert_definition(&self, def: &SettingDefinition) -> ClResult<()>;

	/// Returns `true` if a definition was removed
	async fn delete_definition(&self, key: &str) -> ClResult<bool>;

	// Categories
	//************
	async fn list_categories(&self) -> ClResult<Vec<SettingCategory>>;
	async fn create_category(&self, category: &SettingCategory) -> ClResult<()>;
	async fn update_category(&self, category: &SettingCategory) -> ClResult<()>;
	async fn upsert_category(&self, category: &SettingCategory) -> ClResult<()>;
	async fn delete_category(&self, key: &str) -> ClResult<bool>;
}


// vim: ts=4
