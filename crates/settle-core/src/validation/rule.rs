//! Declarative validation rules
//!
//! Rules come in two forms:
//! - tree form: JSON-Logic style single-key objects, e.g.
//!   `{"<=": [6, {"var": "value"}, 32]}`, optionally wrapped as
//!   `{"rule": <tree>, "message": "..."}` to customize the failure message
//! - shorthand form: `{min, max, min_length, max_length, required, enum}`
//!
//! Both are parsed into the same [`Expr`] tree; the shorthand is compiled
//! constraint by constraint so that failing constraints can report their own
//! message.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::prelude::*;

/// Rule expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	/// Literal scalar, or an array made only of literals
	Literal(Value),
	/// Array with at least one non-literal element
	List(Vec<Expr>),
	/// Variable reference with optional fallback
	Var { path: Box<str>, default: Option<Value> },
	Comparison(Box<ComparisonExpr>),
	Logical(Box<LogicalExpr>),
	Arithmetic(Box<ArithmeticExpr>),
	/// Set membership, or substring test when the haystack is a string
	In(Box<[Expr; 2]>),
	/// Character count of a string or item count of an array
	Length(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonExpr {
	Eq([Expr; 2]),
	Ne([Expr; 2]),
	/// Two operands, or three for the `a < b < c` between form
	Lt(Vec<Expr>),
	/// Two operands, or three for the `a <= b <= c` between form
	Lte(Vec<Expr>),
	Gt([Expr; 2]),
	Gte([Expr; 2]),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogicalExpr {
	And(Vec<Expr>),
	Or(Vec<Expr>),
	Not(Expr),
	/// Double negation: truthiness of the operand
	Truthy(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArithmeticExpr {
	Add(Vec<Expr>),
	/// One operand negates, two subtract
	Subtract(Vec<Expr>),
	Multiply(Vec<Expr>),
	Divide([Expr; 2]),
}

impl Expr {
	pub fn var(path: &str) -> Self {
		Expr::Var { path: path.into(), default: None }
	}

	pub fn literal(value: impl Into<Value>) -> Self {
		Expr::Literal(value.into())
	}

	/// Parse the JSON tree form
	pub fn parse(json: &Value) -> ClResult<Self> {
		match json {
			Value::Object(map) => {
				if map.len() != 1 {
					return Err(Error::Parse(format!(
						"rule node must have exactly one operator, got {}",
						map.len()
					)));
				}
				let Some((op, args)) = map.iter().next() else {
					return Err(Error::Parse("empty rule node".into()));
				};
				Self::parse_operator(op, args)
			}
			Value::Array(items) => {
				let items = items.iter().map(Self::parse).collect::<ClResult<Vec<_>>>()?;
				if items.iter().all(|item| matches!(item, Expr::Literal(_))) {
					let values = items
						.into_iter()
						.filter_map(|item| match item {
							Expr::Literal(v) => Some(v),
							_ => None,
						})
						.collect();
					Ok(Expr::Literal(Value::Array(values)))
				} else {
					Ok(Expr::List(items))
				}
			}
			scalar => Ok(Expr::Literal(scalar.clone())),
		}
	}

	fn parse_operator(op: &str, args: &Value) -> ClResult<Self> {
		let expr = match op {
			"var" => return Self::parse_var(args),
			"==" => Expr::Comparison(Box::new(ComparisonExpr::Eq(Self::pair(op, args)?))),
			"!=" => Expr::Comparison(Box::new(ComparisonExpr::Ne(Self::pair(op, args)?))),
			">" => Expr::Comparison(Box::new(ComparisonExpr::Gt(Self::pair(op, args)?))),
			">=" => Expr::Comparison(Box::new(ComparisonExpr::Gte(Self::pair(op, args)?))),
			"<" => Expr::Comparison(Box::new(ComparisonExpr::Lt(Self::chain(op, args)?))),
			"<=" => Expr::Comparison(Box::new(ComparisonExpr::Lte(Self::chain(op, args)?))),
			"and" => Expr::Logical(Box::new(LogicalExpr::And(Self::many(op, args)?))),
			"or" => Expr::Logical(Box::new(LogicalExpr::Or(Self::many(op, args)?))),
			"!" => Expr::Logical(Box::new(LogicalExpr::Not(Self::single(args)?))),
			"!!" => Expr::Logical(Box::new(LogicalExpr::Truthy(Self::single(args)?))),
			"+" => Expr::Arithmetic(Box::new(ArithmeticExpr::Add(Self::many(op, args)?))),
			"*" => Expr::Arithmetic(Box::new(ArithmeticExpr::Multiply(Self::many(op, args)?))),
			"/" => Expr::Arithmetic(Box::new(ArithmeticExpr::Divide(Self::pair(op, args)?))),
			"-" => {
				let operands = Self::operands(args)?;
				if !(1..=2).contains(&operands.len()) {
					return Err(Error::Parse("'-' takes one or two operands".into()));
				}
				Expr::Arithmetic(Box::new(ArithmeticExpr::Subtract(operands)))
			}
			"in" => Expr::In(Box::new(Self::pair(op, args)?)),
			"length" => Expr::Length(Box::new(Self::single(args)?)),
			_ => return Err(Error::Parse(format!("unknown rule operator: {}", op))),
		};
		Ok(expr)
	}

	fn parse_var(args: &Value) -> ClResult<Self> {
		let (path, default) = match args {
			Value::String(path) => (path.as_str(), None),
			Value::Array(items) => match items.as_slice() {
				[Value::String(path)] => (path.as_str(), None),
				[Value::String(path), default] => (path.as_str(), Some(default.clone())),
				_ => return Err(Error::Parse("'var' takes a path and an optional default".into())),
			},
			_ => return Err(Error::Parse("'var' path must be a string".into())),
		};
		Ok(Expr::Var { path: path.into(), default })
	}

	/// Operand list. A non-array argument is a single operand.
	fn operands(args: &Value) -> ClResult<Vec<Expr>> {
		match args {
			Value::Array(items) => items.iter().map(Self::parse).collect(),
			other => Ok(vec![Self::parse(other)?]),
		}
	}

	fn single(args: &Value) -> ClResult<Expr> {
		match args {
			Value::Array(items) if items.len() == 1 => Self::parse(&items[0]),
			Value::Array(_) => Err(Error::Parse("unary operator takes one operand".into())),
			other => Self::parse(other),
		}
	}

	fn pair(op: &str, args: &Value) -> ClResult<[Expr; 2]> {
		let operands: [Expr; 2] = Self::operands(args)?
			.try_into()
			.map_err(|_| Error::Parse(format!("'{}' takes exactly two operands", op)))?;
		Ok(operands)
	}

	fn chain(op: &str, args: &Value) -> ClResult<Vec<Expr>> {
		let operands = Self::operands(args)?;
		if !(2..=3).contains(&operands.len()) {
			return Err(Error::Parse(format!("'{}' takes two or three operands", op)));
		}
		Ok(operands)
	}

	fn many(op: &str, args: &Value) -> ClResult<Vec<Expr>> {
		let operands = Self::operands(args)?;
		if operands.is_empty() {
			return Err(Error::Parse(format!("'{}' needs at least one operand", op)));
		}
		Ok(operands)
	}

	/// Serialize back into the JSON tree form
	pub fn to_json(&self) -> Value {
		fn list(items: &[Expr]) -> Value {
			Value::Array(items.iter().map(Expr::to_json).collect())
		}

		match self {
			Expr::Literal(v) => v.clone(),
			Expr::List(items) => list(items),
			Expr::Var { path, default: None } => json!({ "var": path.as_ref() }),
			Expr::Var { path, default: Some(default) } => {
				json!({ "var": [path.as_ref(), default] })
			}
			Expr::Comparison(c) => match c.as_ref() {
				ComparisonExpr::Eq(ops) => json!({ "==": list(ops) }),
				ComparisonExpr::Ne(ops) => json!({ "!=": list(ops) }),
				ComparisonExpr::Lt(ops) => json!({ "<": list(ops) }),
				ComparisonExpr::Lte(ops) => json!({ "<=": list(ops) }),
				ComparisonExpr::Gt(ops) => json!({ ">": list(ops) }),
				ComparisonExpr::Gte(ops) => json!({ ">=": list(ops) }),
			},
			Expr::Logical(l) => match l.as_ref() {
				LogicalExpr::And(ops) => json!({ "and": list(ops) }),
				LogicalExpr::Or(ops) => json!({ "or": list(ops) }),
				LogicalExpr::Not(op) => json!({ "!": [op.to_json()] }),
				LogicalExpr::Truthy(op) => json!({ "!!": [op.to_json()] }),
			},
			Expr::Arithmetic(a) => match a.as_ref() {
				ArithmeticExpr::Add(ops) => json!({ "+": list(ops) }),
				ArithmeticExpr::Subtract(ops) => json!({ "-": list(ops) }),
				ArithmeticExpr::Multiply(ops) => json!({ "*": list(ops) }),
				ArithmeticExpr::Divide(ops) => json!({ "/": list(ops) }),
			},
			Expr::In(ops) => json!({ "in": list(ops.as_ref()) }),
			Expr::Length(op) => json!({ "length": op.to_json() }),
		}
	}
}

// Shorthand form
//****************

const SHORTHAND_KEYS: [&str; 8] =
	["min", "max", "min_length", "max_length", "minLength", "maxLength", "required", "enum"];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShorthandRule {
	pub min: Option<f64>,
	pub max: Option<f64>,
	#[serde(alias = "minLength")]
	pub min_length: Option<u64>,
	#[serde(alias = "maxLength")]
	pub max_length: Option<u64>,
	#[serde(default)]
	pub required: bool,
	pub r#enum: Option<Vec<Value>>,
}

/// One compiled shorthand constraint with its failure message
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
	pub expr: Expr,
	pub message: String,
}

impl ShorthandRule {
	fn is_shorthand(json: &Value) -> bool {
		match json {
			Value::Object(map) => {
				!map.is_empty() && map.keys().all(|k| SHORTHAND_KEYS.contains(&k.as_str()))
			}
			_ => false,
		}
	}

	/// Compile into one check per constraint, in a fixed order
	pub fn compile(&self) -> Vec<Check> {
		let value = || Expr::var("value");
		let mut checks = Vec::new();

		if self.required {
			checks.push(Check {
				expr: Expr::Logical(Box::new(LogicalExpr::Truthy(value()))),
				message: "value is required".into(),
			});
		}
		match (self.min, self.max) {
			(Some(min), Some(max)) => checks.push(Check {
				expr: Expr::Comparison(Box::new(ComparisonExpr::Lte(vec![
					Expr::literal(min),
					value(),
					Expr::literal(max),
				]))),
				message: format!("must be between {} and {}", fmt_number(min), fmt_number(max)),
			}),
			(Some(min), None) => checks.push(Check {
				expr: Expr::Comparison(Box::new(ComparisonExpr::Gte([value(), Expr::literal(min)]))),
				message: format!("must be at least {}", fmt_number(min)),
			}),
			(None, Some(max)) => checks.push(Check {
				expr: Expr::Comparison(Box::new(ComparisonExpr::Lte(vec![
					value(),
					Expr::literal(max),
				]))),
				message: format!("must be at most {}", fmt_number(max)),
			}),
			(None, None) => {}
		}
		if let Some(min_length) = self.min_length {
			checks.push(Check {
				expr: Expr::Comparison(Box::new(ComparisonExpr::Gte([
					Expr::Length(Box::new(value())),
					Expr::literal(min_length),
				]))),
				message: format!("must be at least {} characters", min_length),
			});
		}
		if let Some(max_length) = self.max_length {
			checks.push(Check {
				expr: Expr::Comparison(Box::new(ComparisonExpr::Lte(vec![
					Expr::Length(Box::new(value())),
					Expr::literal(max_length),
				]))),
				message: format!("must be at most {} characters", max_length),
			});
		}
		if let Some(allowed) = &self.r#enum {
			let listed = allowed
				.iter()
				.map(|v| match v {
					Value::String(s) => s.clone(),
					other => other.to_string(),
				})
				.collect::<Vec<_>>()
				.join(", ");
			checks.push(Check {
				expr: Expr::In(Box::new([value(), Expr::Literal(Value::Array(allowed.clone()))])),
				message: format!("must be one of: {}", listed),
			});
		}
		checks
	}

	/// The equivalent single tree: every constraint joined with `and`
	pub fn to_expr(&self) -> Expr {
		let mut exprs: Vec<Expr> = self.compile().into_iter().map(|c| c.expr).collect();
		match exprs.len() {
			0 => Expr::Literal(Value::Bool(true)),
			1 => exprs.remove(0),
			_ => Expr::Logical(Box::new(LogicalExpr::And(exprs))),
		}
	}
}

/// Integral bounds print without a fraction ("6", not "6.0")
#[allow(clippy::cast_possible_truncation)]
fn fmt_number(n: f64) -> String {
	if n.fract() == 0.0 && n.abs() < 1e15 { format!("{}", n as i64) } else { n.to_string() }
}

// ValidationRule
//****************

/// A parsed validation rule as attached to a setting definition
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationRule {
	Shorthand { checks: Vec<Check> },
	Logic { expr: Expr, message: Option<String> },
}

impl ValidationRule {
	pub fn parse(json: &Value) -> ClResult<Self> {
		if ShorthandRule::is_shorthand(json) {
			let shorthand: ShorthandRule = serde_json::from_value(json.clone())
				.map_err(|err| Error::Parse(format!("invalid shorthand rule: {}", err)))?;
			return Ok(ValidationRule::Shorthand { checks: shorthand.compile() });
		}

		if let Value::Object(map) = json
			&& let Some(rule) = map.get("rule")
			&& map.keys().all(|k| k == "rule" || k == "message")
		{
			let message = match map.get("message") {
				None | Some(Value::Null) => None,
				Some(Value::String(s)) => Some(s.clone()),
				Some(_) => return Err(Error::Parse("rule message must be a string".into())),
			};
			return Ok(ValidationRule::Logic { expr: Expr::parse(rule)?, message });
		}

		Ok(ValidationRule::Logic { expr: Expr::parse(json)?, message: None })
	}
}


// vim: ts=4
