//! Rule evaluator
//!
//! Evaluates an [`Expr`] tree against a [`RuleContext`]. Evaluation is pure:
//! it reads the candidate value and the settings snapshot and never touches
//! a store or cache.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::rule::{ArithmeticExpr, ComparisonExpr, Expr, LogicalExpr};
use crate::prelude::*;

/// Maximum expression nesting depth to prevent stack overflow
const MAX_DEPTH: usize = 50;
/// Maximum expression node count to prevent resource exhaustion
const MAX_NODES: usize = 256;

/// Current values of settings, keyed by setting key
pub type SettingsSnapshot = HashMap<Box<str>, Value>;

/// Variables visible to a rule
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
	pub key: &'a str,
	pub value: &'a Value,
	pub settings: &'a SettingsSnapshot,
}

impl RuleContext<'_> {
	/// Resolve a variable path
	///
	/// - `value` / `value.<path>`: the candidate value
	/// - `key`: the key being validated
	/// - `settings.<key>`: another setting's current value
	/// - any other path: a setting key, looked up directly
	fn lookup(&self, path: &str) -> Value {
		match path {
			"" | "value" => return self.value.clone(),
			"key" => return Value::String(self.key.to_string()),
			_ => {}
		}
		if let Some(rest) = path.strip_prefix("value.") {
			return traverse(self.value, rest);
		}
		let setting = path.strip_prefix("settings.").unwrap_or(path);
		self.settings.get(setting).cloned().unwrap_or(Value::Null)
	}
}

fn traverse(root: &Value, path: &str) -> Value {
	let mut current = root;
	for part in path.split('.') {
		current = match current {
			Value::Object(map) => match map.get(part) {
				Some(v) => v,
				None => return Value::Null,
			},
			Value::Array(items) => match part.parse::<usize>().ok().and_then(|i| items.get(i)) {
				Some(v) => v,
				None => return Value::Null,
			},
			_ => return Value::Null,
		};
	}
	current.clone()
}

/// Expression evaluator with depth and node count tracking
#[derive(Debug, Default)]
pub struct RuleEvaluator {
	depth: usize,
	node_count: usize,
}

impl RuleEvaluator {
	pub fn new() -> Self {
		Self { depth: 0, node_count: 0 }
	}

	/// Evaluate `expr` and reduce the result to pass/fail
	pub fn check(expr: &Expr, ctx: &RuleContext<'_>) -> ClResult<bool> {
		let mut eval = Self::new();
		let value = eval.evaluate(expr, ctx)?;
		Ok(to_bool(&value))
	}

	pub fn evaluate(&mut self, expr: &Expr, ctx: &RuleContext<'_>) -> ClResult<Value> {
		self.depth += 1;
		self.node_count += 1;

		if self.depth > MAX_DEPTH {
			return Err(fail(ctx, format!("maximum rule depth exceeded ({})", MAX_DEPTH)));
		}
		if self.node_count > MAX_NODES {
			return Err(fail(ctx, format!("maximum rule size exceeded ({})", MAX_NODES)));
		}

		let result = self.evaluate_inner(expr, ctx)?;

		self.depth -= 1;
		Ok(result)
	}

	fn evaluate_inner(&mut self, expr: &Expr, ctx: &RuleContext<'_>) -> ClResult<Value> {
		match expr {
			Expr::Literal(v) => Ok(v.clone()),
			Expr::List(items) => {
				let mut values = Vec::with_capacity(items.len());
				for item in items {
					values.push(self.evaluate(item, ctx)?);
				}
				Ok(Value::Array(values))
			}
			Expr::Var { path, default } => {
				let value = ctx.lookup(path);
				match (value, default) {
					(Value::Null, Some(default)) => Ok(default.clone()),
					(value, _) => Ok(value),
				}
			}
			Expr::Comparison(c) => self.evaluate_comparison(c, ctx),
			Expr::Logical(l) => self.evaluate_logical(l, ctx),
			Expr::Arithmetic(a) => self.evaluate_arithmetic(a, ctx),
			Expr::In(ops) => {
				let [needle, haystack] = ops.as_ref();
				let needle = self.evaluate(needle, ctx)?;
				let haystack = self.evaluate(haystack, ctx)?;
				let found = match &haystack {
					Value::Array(items) => items.iter().any(|item| loose_eq(item, &needle)),
					Value::String(s) => s.contains(&to_string(&needle)),
					_ => false,
				};
				Ok(Value::Bool(found))
			}
			Expr::Length(op) => {
				let value = self.evaluate(op, ctx)?;
				let len = match &value {
					Value::String(s) => s.chars().count(),
					Value::Array(items) => items.len(),
					Value::Null => 0,
					other => {
						return Err(fail(
							ctx,
							format!("length expects a string or array, got {}", other),
						));
					}
				};
				Ok(Value::from(len))
			}
		}
	}

	fn evaluate_comparison(
		&mut self,
		comp: &ComparisonExpr,
		ctx: &RuleContext<'_>,
	) -> ClResult<Value> {
		match comp {
			ComparisonExpr::Eq([left, right]) => {
				let l = self.evaluate(left, ctx)?;
				let r = self.evaluate(right, ctx)?;
				Ok(Value::Bool(loose_eq(&l, &r)))
			}
			ComparisonExpr::Ne([left, right]) => {
				let l = self.evaluate(left, ctx)?;
				let r = self.evaluate(right, ctx)?;
				Ok(Value::Bool(!loose_eq(&l, &r)))
			}
			ComparisonExpr::Gt([left, right]) => {
				self.compare_chain(&[left, right], ctx, |ord| ord == Ordering::Greater)
			}
			ComparisonExpr::Gte([left, right]) => {
				self.compare_chain(&[left, right], ctx, |ord| ord != Ordering::Less)
			}
			ComparisonExpr::Lt(ops) => {
				let ops: Vec<&Expr> = ops.iter().collect();
				self.compare_chain(&ops, ctx, |ord| ord == Ordering::Less)
			}
			ComparisonExpr::Lte(ops) => {
				let ops: Vec<&Expr> = ops.iter().collect();
				self.compare_chain(&ops, ctx, |ord| ord != Ordering::Greater)
			}
		}
	}

	/// Every adjacent pair must satisfy `accept`; incomparable operands fail
	fn compare_chain(
		&mut self,
		ops: &[&Expr],
		ctx: &RuleContext<'_>,
		accept: impl Fn(Ordering) -> bool,
	) -> ClResult<Value> {
		let mut values = Vec::with_capacity(ops.len());
		for op in ops {
			values.push(self.evaluate(op, ctx)?);
		}
		let ok = values.windows(2).all(|pair| compare(&pair[0], &pair[1]).is_some_and(&accept));
		Ok(Value::Bool(ok))
	}

	fn evaluate_logical(&mut self, logical: &LogicalExpr, ctx: &RuleContext<'_>) -> ClResult<Value> {
		match logical {
			LogicalExpr::And(exprs) => {
				for expr in exprs {
					let value = self.evaluate(expr, ctx)?;
					if !to_bool(&value) {
						return Ok(Value::Bool(false));
					}
				}
				Ok(Value::Bool(true))
			}
			LogicalExpr::Or(exprs) => {
				for expr in exprs {
					let value = self.evaluate(expr, ctx)?;
					if to_bool(&value) {
						return Ok(Value::Bool(true));
					}
				}
				Ok(Value::Bool(false))
			}
			LogicalExpr::Not(expr) => {
				let value = self.evaluate(expr, ctx)?;
				Ok(Value::Bool(!to_bool(&value)))
			}
			LogicalExpr::Truthy(expr) => {
				let value = self.evaluate(expr, ctx)?;
				Ok(Value::Bool(to_bool(&value)))
			}
		}
	}

	fn evaluate_arithmetic(
		&mut self,
		arith: &ArithmeticExpr,
		ctx: &RuleContext<'_>,
	) -> ClResult<Value> {
		let result = match arith {
			ArithmeticExpr::Add(exprs) => {
				let mut sum = 0.0;
				for expr in exprs {
					let val = self.evaluate(expr, ctx)?;
					sum += to_number(&val, ctx)?;
				}
				sum
			}
			ArithmeticExpr::Subtract(exprs) => {
				let mut nums = Vec::with_capacity(exprs.len());
				for expr in exprs {
					let val = self.evaluate(expr, ctx)?;
					nums.push(to_number(&val, ctx)?);
				}
				match nums.as_slice() {
					[n] => -n,
					[l, r] => l - r,
					_ => return Err(fail(ctx, "'-' takes one or two operands".into())),
				}
			}
			ArithmeticExpr::Multiply(exprs) => {
				let mut product = 1.0;
				for expr in exprs {
					let val = self.evaluate(expr, ctx)?;
					product *= to_number(&val, ctx)?;
				}
				product
			}
			ArithmeticExpr::Divide([left, right]) => {
				let l_val = self.evaluate(left, ctx)?;
				let r_val = self.evaluate(right, ctx)?;
				to_number(&l_val, ctx)? / to_number(&r_val, ctx)?
			}
		};
		serde_json::Number::from_f64(result)
			.map(Value::Number)
			.ok_or_else(|| fail(ctx, "invalid number result (NaN or infinity)".into()))
	}
}

fn fail(ctx: &RuleContext<'_>, message: String) -> Error {
	Error::ValidationFailed { key: ctx.key.into(), message }
}

/// Convert value to boolean (truthy/falsy)
pub fn to_bool(value: &Value) -> bool {
	match value {
		Value::Null => false,
		Value::Bool(b) => *b,
		Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
		Value::String(s) => !s.is_empty(),
		Value::Array(a) => !a.is_empty(),
		Value::Object(o) => !o.is_empty(),
	}
}

fn to_string(value: &Value) -> String {
	match value {
		Value::Null => String::new(),
		Value::String(s) => s.clone(),
		v => v.to_string(),
	}
}

fn to_number(value: &Value, ctx: &RuleContext<'_>) -> ClResult<f64> {
	as_number(value)
		.ok_or_else(|| fail(ctx, format!("type mismatch: expected number, got {}", value)))
}

/// Numeric view of a value: numbers, and strings that parse as numbers
fn as_number(value: &Value) -> Option<f64> {
	match value {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim().parse::<f64>().ok(),
		_ => None,
	}
}

/// Equality with numeric normalization (`6 == 6.0`)
fn loose_eq(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
		_ => a == b,
	}
}

/// Order two values. Strings compare lexically with each other, everything
/// else numerically. Null and non-numeric operands are incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
	match (a, b) {
		(Value::String(x), Value::String(y)) => Some(x.cmp(y)),
		_ => as_number(a)?.partial_cmp(&as_number(b)?),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn run(rule: &Value, value: &Value, settings: &SettingsSnapshot) -> ClResult<bool> {
		let expr = Expr::parse(rule).expect("rule should parse");
		let ctx = RuleContext { key: "test.key", value, settings };
		RuleEvaluator::check(&expr, &ctx)
	}

	#[test]
	fn test_between() {
		let rule = json!({"<=": [6, {"var": "value"}, 32]});
		let settings = SettingsSnapshot::new();
		assert!(!run(&rule, &json!(5), &settings).expect("eval"));
		assert!(run(&rule, &json!(6), &settings).expect("eval"));
		assert!(run(&rule, &json!(32), &settings).expect("eval"));
		assert!(!run(&rule, &json!(33), &settings).expect("eval"));
	}

	#[test]
	fn test_cross_field_reference() {
		// backup frequency (hours) must stay below retention days * 24
		let rule = json!({"<": [{"var": "value"}, {"*": [{"var": "settings.backup.retention_days"}, 24]}]});
		let mut settings = SettingsSnapshot::new();
		settings.insert("backup.retention_days".into(), json!(2));
		assert!(run(&rule, &json!(47), &settings).expect("eval"));
		assert!(!run(&rule, &json!(48), &settings).expect("eval"));

		let bare = json!({"<": [{"var": "value"}, {"*": [{"var": "backup.retention_days"}, 24]}]});
		assert!(run(&bare, &json!(47), &settings).expect("eval"));
	}

	#[test]
	fn test_missing_reference_is_null() {
		let rule = json!({"<": [{"var": "value"}, {"var": "settings.absent"}]});
		assert!(!run(&rule, &json!(1), &SettingsSnapshot::new()).expect("eval"));

		let rule = json!({"<": [{"var": "value"}, {"var": ["settings.absent", 10]}]});
		assert!(run(&rule, &json!(1), &SettingsSnapshot::new()).expect("eval"));
	}

	#[test]
	fn test_value_path_and_key() {
		let rule = json!({"and": [
			{"==": [{"var": "value.mode"}, "strict"]},
			{"==": [{"var": "key"}, "test.key"]}
		]});
		let settings = SettingsSnapshot::new();
		assert!(run(&rule, &json!({"mode": "strict"}), &settings).expect("eval"));
		assert!(!run(&rule, &json!({"mode": "loose"}), &settings).expect("eval"));
	}

	#[test]
	fn test_membership_and_length() {
		let settings = SettingsSnapshot::new();
		let rule = json!({"in": [{"var": "value"}, ["light", "dark"]]});
		assert!(run(&rule, &json!("dark"), &settings).expect("eval"));
		assert!(!run(&rule, &json!("blue"), &settings).expect("eval"));

		let rule = json!({">=": [{"length": {"var": "value"}}, 3]});
		assert!(run(&rule, &json!("héé"), &settings).expect("eval"));
		assert!(!run(&rule, &json!("ab"), &settings).expect("eval"));
	}

	#[test]
	fn test_numeric_equality_normalizes() {
		let rule = json!({"==": [{"var": "value"}, 6]});
		assert!(run(&rule, &json!(6.0), &SettingsSnapshot::new()).expect("eval"));
	}

	#[test]
	fn test_division_by_zero_is_an_error() {
		let rule = json!({"<": [{"/": [{"var": "value"}, 0]}, 1]});
		let res = run(&rule, &json!(1), &SettingsSnapshot::new());
		assert!(matches!(res, Err(Error::ValidationFailed { .. })));
	}

	#[test]
	fn test_depth_limit() {
		let mut rule = json!({"var": "value"});
		for _ in 0..60 {
			rule = json!({"!": [rule]});
		}
		let res = run(&rule, &json!(true), &SettingsSnapshot::new());
		assert!(matches!(res, Err(Error::ValidationFailed { .. })));
	}
}

// vim: ts=4
