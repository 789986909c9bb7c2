//! Setting values
//!
//! Defaults, overrides and rule contexts all carry a `SettingValue`. Values
//! arriving from the outside (API payloads, store rows) are raw JSON and are
//! converted with [`SettingValue::typed`], which is the value-type check of
//! the validation pipeline.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ValueType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)] // No type tag - type comes from the SettingDefinition
pub enum SettingValue {
	Bool(bool), // Must be before Number to avoid bool -> number coercion
	Number(serde_json::Number),
	String(String),
	Json(Value),
}

impl SettingValue {
	/// Convert raw JSON into a value of the given type
	///
	/// `json` settings only accept objects and arrays. The error is a short
	/// human-readable reason ("expected number, got string").
	pub fn typed(value_type: ValueType, json: Value) -> Result<SettingValue, String> {
		match (value_type, json) {
			(ValueType::String, Value::String(s)) => Ok(SettingValue::String(s)),
			(ValueType::Number, Value::Number(n)) => Ok(SettingValue::Number(n)),
			(ValueType::Boolean, Value::Bool(b)) => Ok(SettingValue::Bool(b)),
			(ValueType::Json, v @ (Value::Object(_) | Value::Array(_))) => Ok(SettingValue::Json(v)),
			(value_type, v) => {
				Err(format!("expected {}, got {}", value_type, json_type_name(&v)))
			}
		}
	}

	pub fn value_type(&self) -> ValueType {
		match self {
			SettingValue::Bool(_) => ValueType::Boolean,
			SettingValue::Number(_) => ValueType::Number,
			SettingValue::String(_) => ValueType::String,
			SettingValue::Json(_) => ValueType::Json,
		}
	}

	pub fn matches_type(&self, value_type: ValueType) -> bool {
		self.value_type() == value_type
	}

	/// Get the type name for error messages
	pub fn type_name(&self) -> &'static str {
		self.value_type().as_str()
	}

	pub fn to_json(&self) -> Value {
		match self {
			SettingValue::Bool(b) => Value::Bool(*b),
			SettingValue::Number(n) => Value::Number(n.clone()),
			SettingValue::String(s) => Value::String(s.clone()),
			SettingValue::Json(v) => v.clone(),
		}
	}

	pub fn into_json(self) -> Value {
		match self {
			SettingValue::Bool(b) => Value::Bool(b),
			SettingValue::Number(n) => Value::Number(n),
			SettingValue::String(s) => Value::String(s),
			SettingValue::Json(v) => v,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			SettingValue::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			SettingValue::Number(n) => n.as_f64(),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			SettingValue::Bool(b) => Some(*b),
			_ => None,
		}
	}
}

impl From<bool> for SettingValue {
	fn from(b: bool) -> Self {
		SettingValue::Bool(b)
	}
}

impl From<i64> for SettingValue {
	fn from(n: i64) -> Self {
		SettingValue::Number(n.into())
	}
}

impl From<&str> for SettingValue {
	fn from(s: &str) -> Self {
		SettingValue::String(s.to_string())
	}
}

impl From<String> for SettingValue {
	fn from(s: String) -> Self {
		SettingValue::String(s)
	}
}

/// JSON type name for error messages
pub fn json_type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_typed_accepts_matching_json() {
		assert_eq!(
			SettingValue::typed(ValueType::String, json!("dark")),
			Ok(SettingValue::String("dark".into()))
		);
		assert_eq!(SettingValue::typed(ValueType::Number, json!(6)), Ok(SettingValue::from(6_i64)));
		assert_eq!(SettingValue::typed(ValueType::Boolean, json!(true)), Ok(SettingValue::Bool(true)));
		assert!(SettingValue::typed(ValueType::Json, json!({"a": 1})).is_ok());
		assert!(SettingValue::typed(ValueType::Json, json!([1, 2])).is_ok());
	}

	#[test]
	fn test_typed_rejects_mismatch() {
		assert_eq!(
			SettingValue::typed(ValueType::Number, json!("6")),
			Err("expected number, got string".to_string())
		);
		assert!(SettingValue::typed(ValueType::Boolean, json!(1)).is_err());
		assert!(SettingValue::typed(ValueType::Json, json!("x")).is_err());
		assert!(SettingValue::typed(ValueType::String, Value::Null).is_err());
	}

	#[test]
	fn test_number_representation_is_preserved() {
		let v = SettingValue::typed(ValueType::Number, json!(30)).expect("number");
		assert_eq!(v.to_json(), json!(30));
		let v = SettingValue::typed(ValueType::Number, json!(2.5)).expect("number");
		assert_eq!(v.to_json(), json!(2.5));
	}

	#[test]
	fn test_untagged_serialization() {
		let v = SettingValue::String("system".into());
		assert_eq!(serde_json::to_string(&v).expect("serialize"), "\"system\"");
		let v: SettingValue = serde_json::from_str("true").expect("deserialize");
		assert_eq!(v, SettingValue::Bool(true));
	}
}

// vim: ts=4
