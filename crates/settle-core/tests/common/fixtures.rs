//! Test catalog

use serde_json::json;

use settle_core::catalog::{DefinitionExt, SettingsRegistry};
use settle_types::catalog_adapter::{SettingCategory, SettingDefinition};
use settle_types::prelude::*;
use settle_types::types::{InputType, ValueType};
use settle_types::value::SettingValue;

fn category(key: &str, label: &str, order: i32) -> SettingCategory {
	SettingCategory { key: key.into(), label: label.into(), icon: None, order }
}

/// Catalog shared by the service tests
///
/// | key                       | visible | configurable |
/// |---------------------------|---------|--------------|
/// | general.theme             | user    | team         |
/// | general.language          | org     | org          |
/// | security.password_length  | org     | org          |
/// | security.audit_retention  | system  | system       |
/// | backup.frequency_hours    | org     | org          |
/// | backup.retention_days     | org     | org          |
/// | notify.email              | user    | user         |
/// | notify.webhook            | team    | team         |
pub fn test_registry() -> SettingsRegistry {
	let mut registry = SettingsRegistry::new();
	for c in [
		category("general", "General", 1),
		category("security", "Security", 2),
		category("backup", "Backup", 3),
		category("notify", "Notifications", 4),
	] {
		registry.register_category(c).expect("category");
	}

	let definitions = [
		SettingDefinition::builder("general.theme")
			.label("Theme")
			.default(SettingValue::from("system"))
			.input_type(InputType::Select)
			.options(json!(["system", "light", "dark"]))
			.visible_at(ScopeLevel::User)
			.configurable_at(ScopeLevel::Team)
			.group("appearance")
			.order(1),
		SettingDefinition::builder("general.language")
			.label("Language")
			.default(SettingValue::from("en"))
			.visible_at(ScopeLevel::Org)
			.configurable_at(ScopeLevel::Org)
			.order(2),
		SettingDefinition::builder("security.password_length")
			.label("Minimum password length")
			.default(SettingValue::from(8_i64))
			.input_type(InputType::Number)
			.rule(json!({ "min": 6, "max": 32 }))
			.visible_at(ScopeLevel::Org)
			.configurable_at(ScopeLevel::Org),
		SettingDefinition::builder("security.audit_retention")
			.label("Audit log retention (days)")
			.default(SettingValue::from(365_i64))
			.visible_at(ScopeLevel::System)
			.configurable_at(ScopeLevel::System),
		SettingDefinition::builder("backup.frequency_hours")
			.label("Backup frequency (hours)")
			.default(SettingValue::from(24_i64))
			.rule(json!({
				"rule": { "<": [{ "var": "value" }, { "*": [{ "var": "settings.backup.retention_days" }, 24] }] },
				"message": "backups must run more often than the retention period",
			}))
			.visible_at(ScopeLevel::Org)
			.configurable_at(ScopeLevel::Org),
		SettingDefinition::builder("backup.retention_days")
			.label("Backup retention (days)")
			.default(SettingValue::from(7_i64))
			.rule(json!({ "min": 1 }))
			.visible_at(ScopeLevel::Org)
			.configurable_at(ScopeLevel::Org),
		SettingDefinition::builder("notify.email")
			.label("Notification address")
			.default(SettingValue::from("admin@example.com"))
			.input_type(InputType::Email)
			.visible_at(ScopeLevel::User)
			.configurable_at(ScopeLevel::User),
		SettingDefinition::builder("notify.webhook")
			.label("Webhook")
			.default(SettingValue::from("https://hooks.example.com/settle"))
			.value_type(ValueType::String)
			.input_type(InputType::Url)
			.visible_at(ScopeLevel::Team)
			.configurable_at(ScopeLevel::Team),
	];
	for def in definitions {
		registry.register(def.build().expect("valid definition")).expect("register");
	}
	registry
}

// vim: ts=4
