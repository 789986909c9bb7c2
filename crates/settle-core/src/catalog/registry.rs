//! Setting catalog: definition builder, mutable registry and frozen snapshot

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::prelude::*;
use crate::validation::{SettingsSnapshot, ValidationRule};
use settle_types::catalog_adapter::{SettingCategory, SettingDefinition};
use settle_types::types::{InputType, ValueType};

/// Check the structural rules every stored definition must satisfy
pub fn check_definition(def: &SettingDefinition) -> ClResult<()> {
	let well_formed = def
		.key
		.split_once('.')
		.is_some_and(|(category, name)| !category.is_empty() && !name.is_empty());
	if !well_formed {
		return Err(Error::ConfigError(format!(
			"setting key '{}' must have the form 'category.name'",
			def.key
		)));
	}

	SettingValue::typed(def.value_type, def.default_value.to_json()).map_err(|reason| {
		Error::ConfigError(format!("default value of '{}' is invalid: {}", def.key, reason))
	})?;

	if let Some(rule) = &def.validation_rule {
		ValidationRule::parse(rule).map_err(|err| {
			Error::ConfigError(format!("validation rule of '{}' is invalid: {}", def.key, err))
		})?;
	}

	if def.configurable_at != ScopeLevel::System && def.configurable_at < def.visible_at {
		warn!(
			key = %def.key,
			visible_at = %def.visible_at,
			configurable_at = %def.configurable_at,
			"Setting is configurable below its visibility level"
		);
	}
	Ok(())
}

// Builder
//*********

/// Adds `SettingDefinition::builder(key)`
pub trait DefinitionExt {
	fn builder(key: impl Into<Box<str>>) -> SettingDefinitionBuilder;
}

impl DefinitionExt for SettingDefinition {
	fn builder(key: impl Into<Box<str>>) -> SettingDefinitionBuilder {
		SettingDefinitionBuilder::new(key)
	}
}

/// Builder for SettingDefinition with fluent API
#[derive(Debug, Clone)]
pub struct SettingDefinitionBuilder {
	key: Box<str>,
	label: Option<Box<str>>,
	description: Option<Box<str>>,
	default: Option<SettingValue>,
	value_type: Option<ValueType>,
	input_type: InputType,
	visible_at: ScopeLevel,
	configurable_at: ScopeLevel,
	rule: Option<Value>,
	options: Option<Value>,
	category_id: Option<Box<str>>,
	group: Option<Box<str>>,
	order: i32,
}

impl SettingDefinitionBuilder {
	pub fn new(key: impl Into<Box<str>>) -> Self {
		Self {
			key: key.into(),
			label: None,
			description: None,
			default: None,
			value_type: None,
			input_type: InputType::default(),
			visible_at: ScopeLevel::User,
			configurable_at: ScopeLevel::User,
			rule: None,
			options: None,
			category_id: None,
			group: None,
			order: 0,
		}
	}

	/// Display label (defaults to the key)
	pub fn label(mut self, label: impl Into<Box<str>>) -> Self {
		self.label = Some(label.into());
		self
	}

	pub fn description(mut self, description: impl Into<Box<str>>) -> Self {
		self.description = Some(description.into());
		self
	}

	/// Default value (required)
	pub fn default(mut self, value: SettingValue) -> Self {
		self.default = Some(value);
		self
	}

	/// Value type (defaults to the type of the default value)
	pub fn value_type(mut self, value_type: ValueType) -> Self {
		self.value_type = Some(value_type);
		self
	}

	pub fn input_type(mut self, input_type: InputType) -> Self {
		self.input_type = input_type;
		self
	}

	pub fn visible_at(mut self, level: ScopeLevel) -> Self {
		self.visible_at = level;
		self
	}

	pub fn configurable_at(mut self, level: ScopeLevel) -> Self {
		self.configurable_at = level;
		self
	}

	pub fn rule(mut self, rule: Value) -> Self {
		self.rule = Some(rule);
		self
	}

	pub fn options(mut self, options: Value) -> Self {
		self.options = Some(options);
		self
	}

	/// Category (defaults to the first segment of the key)
	pub fn category(mut self, category_id: impl Into<Box<str>>) -> Self {
		self.category_id = Some(category_id.into());
		self
	}

	pub fn group(mut self, group: impl Into<Box<str>>) -> Self {
		self.group = Some(group.into());
		self
	}

	pub fn order(mut self, order: i32) -> Self {
		self.order = order;
		self
	}

	pub fn build(self) -> ClResult<SettingDefinition> {
		let default_value = self.default.ok_or_else(|| {
			Error::ConfigError(format!("setting '{}' needs a default value", self.key))
		})?;
		let value_type = self.value_type.unwrap_or_else(|| default_value.value_type());
		let category_id = match self.category_id {
			Some(category_id) => category_id,
			None => self.key.split_once('.').map(|(c, _)| c).unwrap_or_default().into(),
		};

		let def = SettingDefinition {
			label: self.label.unwrap_or_else(|| self.key.clone()),
			key: self.key,
			description: self.description,
			default_value,
			value_type,
			input_type: self.input_type,
			visible_at: self.visible_at,
			configurable_at: self.configurable_at,
			validation_rule: self.rule,
			options: self.options,
			category_id,
			group: self.group,
			order: self.order,
		};
		check_definition(&def)?;
		Ok(def)
	}
}

// Registry
//**********

/// Mutable registry used while the catalog is assembled
#[derive(Debug, Default)]
pub struct SettingsRegistry {
	definitions: HashMap<Box<str>, SettingDefinition>,
	categories: HashMap<Box<str>, SettingCategory>,
}

impl SettingsRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a new setting definition
	pub fn register(&mut self, def: SettingDefinition) -> ClResult<()> {
		if self.definitions.contains_key(&def.key) {
			return Err(Error::ConfigError(format!("Setting '{}' is already registered", def.key)));
		}
		check_definition(&def)?;

		debug!("Registering setting: {}", def.key);
		self.definitions.insert(def.key.clone(), def);
		Ok(())
	}

	pub fn register_category(&mut self, category: SettingCategory) -> ClResult<()> {
		if self.categories.contains_key(&category.key) {
			return Err(Error::ConfigError(format!(
				"Category '{}' is already registered",
				category.key
			)));
		}
		self.categories.insert(category.key.clone(), category);
		Ok(())
	}

	pub fn definitions(&self) -> impl Iterator<Item = &SettingDefinition> {
		self.definitions.values()
	}

	pub fn categories(&self) -> impl Iterator<Item = &SettingCategory> {
		self.categories.values()
	}

	/// Freeze the registry (make it immutable)
	pub fn freeze(self) -> FrozenCatalog {
		info!("Freezing settings registry with {} definitions", self.definitions.len());
		FrozenCatalog::from_parts(
			self.definitions.into_values().collect(),
			self.categories.into_values().collect(),
		)
	}

	pub fn len(&self) -> usize {
		self.definitions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.definitions.is_empty()
	}
}

// Frozen catalog
//****************

/// Serializable form of a catalog snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
	pub definitions: Vec<SettingDefinition>,
	pub categories: Vec<SettingCategory>,
}

/// Immutable catalog snapshot a request resolves against
///
/// Rules are parsed once when the snapshot is built. A stored rule that does
/// not parse is kept as its error, so writes to that key fail validation
/// while reads keep working.
#[derive(Debug, Clone, Default)]
pub struct FrozenCatalog {
	definitions: BTreeMap<Box<str>, SettingDefinition>,
	categories: BTreeMap<Box<str>, SettingCategory>,
	rules: HashMap<Box<str>, Result<ValidationRule, String>>,
}

impl FrozenCatalog {
	pub fn from_parts(definitions: Vec<SettingDefinition>, categories: Vec<SettingCategory>) -> Self {
		let mut rules = HashMap::new();
		for def in &definitions {
			if let Some(rule) = &def.validation_rule {
				let parsed = ValidationRule::parse(rule).map_err(|err| err.to_string());
				if let Err(err) = &parsed {
					warn!(key = %def.key, "Stored validation rule does not parse: {}", err);
				}
				rules.insert(def.key.clone(), parsed);
			}
		}

		Self {
			definitions: definitions.into_iter().map(|d| (d.key.clone(), d)).collect(),
			categories: categories.into_iter().map(|c| (c.key.clone(), c)).collect(),
			rules,
		}
	}

	pub fn to_snapshot(&self) -> CatalogSnapshot {
		CatalogSnapshot {
			definitions: self.definitions.values().cloned().collect(),
			categories: self.categories.values().cloned().collect(),
		}
	}

	pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
		Self::from_parts(snapshot.definitions, snapshot.categories)
	}

	// Queries
	//*********

	pub fn find_by_key(&self, key: &str) -> Option<&SettingDefinition> {
		self.definitions.get(key)
	}

	/// Missing keys are silently omitted
	pub fn find_by_keys(&self, keys: &[&str]) -> Vec<&SettingDefinition> {
		keys.iter().filter_map(|key| self.definitions.get(*key)).collect()
	}

	/// All definitions, ordered by key
	pub fn find_all(&self) -> impl Iterator<Item = &SettingDefinition> {
		self.definitions.values()
	}

	pub fn find_by_category(&self, category_id: &str) -> Vec<&SettingDefinition> {
		self.definitions.values().filter(|def| &*def.category_id == category_id).collect()
	}

	/// Definitions a requester at `level` may see by nominal visibility
	pub fn find_by_visible_at_or_above(&self, level: ScopeLevel) -> Vec<&SettingDefinition> {
		self.definitions.values().filter(|def| def.visible_at <= level).collect()
	}

	/// Definitions a requester at `level` may write
	pub fn find_by_configurable_at_or_above(&self, level: ScopeLevel) -> Vec<&SettingDefinition> {
		self.definitions.values().filter(|def| def.is_configurable_at(level)).collect()
	}

	/// Definitions visible at `level`, including those only configurable there
	pub fn find_visible_to(&self, level: ScopeLevel) -> Vec<&SettingDefinition> {
		self.definitions.values().filter(|def| def.is_visible_at(level)).collect()
	}

	pub fn category(&self, key: &str) -> Option<&SettingCategory> {
		self.categories.get(key)
	}

	pub fn categories(&self) -> impl Iterator<Item = &SettingCategory> {
		self.categories.values()
	}

	pub fn rule(&self, key: &str) -> Option<&Result<ValidationRule, String>> {
		self.rules.get(key)
	}

	/// Default value of every definition
	pub fn defaults(&self) -> SettingsSnapshot {
		self.definitions
			.values()
			.map(|def| (def.key.clone(), def.default_value.to_json()))
			.collect()
	}

	pub fn len(&self) -> usize {
		self.definitions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.definitions.is_empty()
	}
}


// vim: ts=4
