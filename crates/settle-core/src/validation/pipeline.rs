//! Three-stage validation of candidate values
//!
//! Stages run in order and short-circuit:
//! 1. value-type check (`InvalidSettingValue`)
//! 2. input-format check for string values (`ValidationFailed`)
//! 3. validation rule, with access to the other settings (`ValidationFailed`)

use serde_json::Value;
use std::collections::HashSet;

use super::evaluator::{RuleContext, RuleEvaluator, SettingsSnapshot};
use super::format::check_format;
use super::rule::ValidationRule;
use crate::catalog::FrozenCatalog;
use crate::prelude::*;
use settle_types::catalog_adapter::SettingDefinition;

const DEFAULT_RULE_MESSAGE: &str = "value does not satisfy the validation rule";

#[derive(Debug, Clone, Copy)]
pub struct ValidationPipeline<'a> {
	catalog: &'a FrozenCatalog,
}

impl<'a> ValidationPipeline<'a> {
	pub fn new(catalog: &'a FrozenCatalog) -> Self {
		Self { catalog }
	}

	/// Validate one candidate value against the current settings snapshot
	pub fn validate(
		&self,
		key: &str,
		value: Value,
		settings: &SettingsSnapshot,
	) -> ClResult<SettingValue> {
		let def = self.definition(key)?;
		let typed = type_check(def, value)?;
		self.check_value(def, &typed, settings)?;
		Ok(typed)
	}

	/// Validate a batch. All items are type-checked first, then each item's
	/// format and rule stages run against a snapshot that already holds the
	/// pending values of the whole batch. The first failure aborts the batch.
	pub fn validate_batch(
		&self,
		items: Vec<(Box<str>, Value)>,
		settings: &SettingsSnapshot,
	) -> ClResult<Vec<(Box<str>, SettingValue)>> {
		let mut seen = HashSet::new();
		let mut typed = Vec::with_capacity(items.len());
		for (key, value) in items {
			let def = self.definition(&key)?;
			if !seen.insert(key.clone()) {
				return Err(Error::InvalidSettingValue {
					key,
					reason: "key appears more than once in the batch".into(),
				});
			}
			typed.push((key, type_check(def, value)?));
		}

		let mut pending = settings.clone();
		for (key, value) in &typed {
			pending.insert(key.clone(), value.to_json());
		}

		for (key, value) in &typed {
			let def = self.definition(key)?;
			self.check_value(def, value, &pending)?;
		}
		Ok(typed)
	}

	fn definition(&self, key: &str) -> ClResult<&'a SettingDefinition> {
		self.catalog.find_by_key(key).ok_or_else(|| Error::InvalidSettingKey(key.into()))
	}

	fn check_value(
		&self,
		def: &SettingDefinition,
		value: &SettingValue,
		settings: &SettingsSnapshot,
	) -> ClResult<()> {
		if let Some(s) = value.as_str()
			&& let Err(message) = check_format(def.input_type, s)?
		{
			return Err(Error::ValidationFailed { key: def.key.clone(), message });
		}

		let Some(rule) = self.catalog.rule(&def.key) else {
			return Ok(());
		};
		let rule = rule.as_ref().map_err(|err| Error::ValidationFailed {
			key: def.key.clone(),
			message: format!("validation rule is invalid: {}", err),
		})?;

		let json = value.to_json();
		let ctx = RuleContext { key: &def.key, value: &json, settings };
		match rule {
			ValidationRule::Shorthand { checks } => {
				let mut failed = Vec::new();
				for check in checks {
					if !RuleEvaluator::check(&check.expr, &ctx)? {
						failed.push(check.message.as_str());
					}
				}
				if !failed.is_empty() {
					return Err(Error::ValidationFailed {
						key: def.key.clone(),
						message: failed.join("; "),
					});
				}
			}
			ValidationRule::Logic { expr, message } => {
				if !RuleEvaluator::check(expr, &ctx)? {
					return Err(Error::ValidationFailed {
						key: def.key.clone(),
						message: message.clone().unwrap_or_else(|| DEFAULT_RULE_MESSAGE.into()),
					});
				}
			}
		}
		Ok(())
	}
}

fn type_check(def: &SettingDefinition, value: Value) -> ClResult<SettingValue> {
	SettingValue::typed(def.value_type, value)
		.map_err(|reason| Error::InvalidSettingValue { key: def.key.clone(), reason })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{DefinitionExt, SettingsRegistry};
	use serde_json::json;
	use settle_types::catalog_adapter::SettingCategory;
	use settle_types::types::{InputType, ValueType};

	fn catalog() -> FrozenCatalog {
		let mut registry = SettingsRegistry::new();
		registry
			.register_category(SettingCategory {
				key: "security".into(),
				label: "Security".into(),
				icon: None,
				order: 0,
			})
			.expect("category");
		registry
			.register(
				SettingDefinition::builder("security.password_min")
					.default(SettingValue::from(8_i64))
					.rule(json!({"min": 6, "max": 32}))
					.build()
					.expect("definition"),
			)
			.expect("register");
		registry
			.register(
				SettingDefinition::builder("security.contact")
					.default(SettingValue::from("admin@example.com"))
					.input_type(InputType::Email)
					.rule(json!({"max_length": 5}))
					.build()
					.expect("definition"),
			)
			.expect("register");
		registry
			.register(
				SettingDefinition::builder("security.backup_hours")
					.default(SettingValue::from(12_i64))
					.rule(json!({
						"rule": {"<": [{"var": "value"}, {"*": [{"var": "security.retention_days"}, 24]}]},
						"message": "backup interval must be shorter than the retention period"
					}))
					.build()
					.expect("definition"),
			)
			.expect("register");
		registry
			.register(
				SettingDefinition::builder("security.retention_days")
					.default(SettingValue::from(7_i64))
					.value_type(ValueType::Number)
					.build()
					.expect("definition"),
			)
			.expect("register");
		registry.freeze()
	}

	#[test]
	fn test_type_check_comes_first() {
		let catalog = catalog();
		let pipeline = ValidationPipeline::new(&catalog);
		let res = pipeline.validate("security.password_min", json!("8"), &SettingsSnapshot::new());
		assert!(matches!(res, Err(Error::InvalidSettingValue { .. })));
	}

	#[test]
	fn test_format_check_short_circuits_rule() {
		let catalog = catalog();
		let pipeline = ValidationPipeline::new(&catalog);
		let res = pipeline.validate("security.contact", json!("not-an-email"), &SettingsSnapshot::new());
		assert!(
			matches!(res, Err(Error::ValidationFailed { ref message, .. }) if message == "must be a valid email address"),
			"unexpected result: {:?}",
			res
		);
	}

	#[test]
	fn test_unknown_key() {
		let catalog = catalog();
		let pipeline = ValidationPipeline::new(&catalog);
		let res = pipeline.validate("security.nope", json!(1), &SettingsSnapshot::new());
		assert!(matches!(res, Err(Error::InvalidSettingKey(_))));
	}

	#[test]
	fn test_custom_rule_message() {
		let catalog = catalog();
		let pipeline = ValidationPipeline::new(&catalog);
		let mut settings = SettingsSnapshot::new();
		settings.insert("security.retention_days".into(), json!(1));
		let res = pipeline.validate("security.backup_hours", json!(30), &settings);
		assert!(
			matches!(res, Err(Error::ValidationFailed { ref message, .. })
				if message == "backup interval must be shorter than the retention period"),
			"unexpected result: {:?}",
			res
		);
		assert!(pipeline.validate("security.backup_hours", json!(20), &settings).is_ok());
	}

	#[test]
	fn test_batch_sees_pending_values() {
		let catalog = catalog();
		let pipeline = ValidationPipeline::new(&catalog);
		let mut settings = SettingsSnapshot::new();
		settings.insert("security.retention_days".into(), json!(1));

		// 30h is too long for 1 day of retention, but fine for the pending 2 days
		let res = pipeline.validate_batch(
			vec![
				("security.backup_hours".into(), json!(30)),
				("security.retention_days".into(), json!(2)),
			],
			&settings,
		);
		assert_eq!(res.expect("batch should validate").len(), 2);
	}

	#[test]
	fn test_batch_is_all_or_nothing() {
		let catalog = catalog();
		let pipeline = ValidationPipeline::new(&catalog);
		let res = pipeline.validate_batch(
			vec![
				("security.retention_days".into(), json!(3)),
				("security.password_min".into(), json!(40)),
			],
			&SettingsSnapshot::new(),
		);
		assert!(matches!(res, Err(Error::ValidationFailed { ref key, .. }) if &**key == "security.password_min"));
	}

	#[test]
	fn test_batch_rejects_duplicates() {
		let catalog = catalog();
		let pipeline = ValidationPipeline::new(&catalog);
		let res = pipeline.validate_batch(
			vec![
				("security.retention_days".into(), json!(3)),
				("security.retention_days".into(), json!(4)),
			],
			&SettingsSnapshot::new(),
		);
		assert!(matches!(res, Err(Error::InvalidSettingValue { .. })));
	}

	#[test]
	fn test_shorthand_failures_combine() {
		let mut registry = SettingsRegistry::new();
		registry
			.register(
				SettingDefinition::builder("profile.nickname")
					.default(SettingValue::from("bob"))
					.rule(json!({"min_length": 5, "enum": ["alice", "carol"]}))
					.build()
					.expect("definition"),
			)
			.expect("register");
		let catalog = registry.freeze();
		let pipeline = ValidationPipeline::new(&catalog);
		let res = pipeline.validate("profile.nickname", json!("bob"), &SettingsSnapshot::new());
		assert!(
			matches!(res, Err(Error::ValidationFailed { ref message, .. })
				if message == "must be at least 5 characters; must be one of: alice, carol"),
			"unexpected result: {:?}",
			res
		);
	}
}

// vim: ts=4
