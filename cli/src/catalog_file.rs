//! YAML catalog files
//!
//! ```yaml
//! categories:
//!   - key: general
//!     label: General
//!     order: 1
//! settings:
//!   - key: general.theme
//!     label: Theme
//!     default: system
//!     inputType: select
//!     options: [system, light, dark]
//!     visibleAt: user
//!     configurableAt: team
//! ```

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use settle_core::catalog::{DefinitionExt, SettingsRegistry};
use settle_types::catalog_adapter::{SettingCategory, SettingDefinition};
use settle_types::prelude::*;
use settle_types::types::{InputType, ValueType};
use settle_types::value::SettingValue;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
	#[serde(default)]
	pub categories: Vec<SettingCategory>,
	#[serde(default)]
	pub settings: Vec<SettingEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingEntry {
	pub key: Box<str>,
	pub label: Option<Box<str>>,
	pub description: Option<Box<str>>,
	pub default: Value,
	/// Inferred from `default` when missing
	pub value_type: Option<ValueType>,
	#[serde(default)]
	pub input_type: InputType,
	pub visible_at: Option<ScopeLevel>,
	pub configurable_at: Option<ScopeLevel>,
	pub rule: Option<Value>,
	pub options: Option<Value>,
	pub category: Option<Box<str>>,
	pub group: Option<Box<str>>,
	#[serde(default)]
	pub order: i32,
}

impl SettingEntry {
	fn into_definition(self) -> ClResult<SettingDefinition> {
		let default = match self.value_type {
			Some(value_type) => SettingValue::typed(value_type, self.default),
			None => infer_value(self.default),
		}
		.map_err(|reason| {
			Error::ConfigError(format!("default value of '{}' is invalid: {}", self.key, reason))
		})?;

		let mut builder = SettingDefinition::builder(self.key).default(default).input_type(self.input_type);
		if let Some(label) = self.label {
			builder = builder.label(label);
		}
		if let Some(description) = self.description {
			builder = builder.description(description);
		}
		if let Some(value_type) = self.value_type {
			builder = builder.value_type(value_type);
		}
		if let Some(level) = self.visible_at {
			builder = builder.visible_at(level);
		}
		if let Some(level) = self.configurable_at {
			builder = builder.configurable_at(level);
		}
		if let Some(rule) = self.rule {
			builder = builder.rule(rule);
		}
		if let Some(options) = self.options {
			builder = builder.options(options);
		}
		if let Some(category) = self.category {
			builder = builder.category(category);
		}
		if let Some(group) = self.group {
			builder = builder.group(group);
		}
		builder.order(self.order).build()
	}
}

fn infer_value(json: Value) -> Result<SettingValue, String> {
	match json {
		Value::Bool(b) => Ok(SettingValue::Bool(b)),
		Value::Number(n) => Ok(SettingValue::Number(n)),
		Value::String(s) => Ok(SettingValue::String(s)),
		v @ (Value::Object(_) | Value::Array(_)) => Ok(SettingValue::Json(v)),
		Value::Null => Err("a default value is required".into()),
	}
}

impl CatalogFile {
	pub fn parse(yaml: &str) -> ClResult<Self> {
		serde_yaml::from_str(yaml).map_err(|err| Error::Parse(format!("catalog file: {}", err)))
	}

	pub async fn load(path: &Path) -> ClResult<Self> {
		let yaml = tokio::fs::read_to_string(path).await.map_err(|err| {
			Error::ConfigError(format!("cannot read {}: {}", path.display(), err))
		})?;
		Self::parse(&yaml)
	}

	pub fn into_registry(self) -> ClResult<SettingsRegistry> {
		let mut registry = SettingsRegistry::new();
		for category in self.categories {
			registry.register_category(category)?;
		}
		for entry in self.settings {
			registry.register(entry.into_definition()?)?;
		}
		Ok(registry)
	}
}


// vim: ts=4
