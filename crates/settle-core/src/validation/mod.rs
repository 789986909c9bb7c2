//! Validation pipeline: value-type check, input-format check, rule evaluation

pub mod evaluator;
pub mod format;
pub mod pipeline;
pub mod rule;

pub use evaluator::{RuleContext, RuleEvaluator, SettingsSnapshot};
pub use pipeline::ValidationPipeline;
pub use rule::{Expr, ShorthandRule, ValidationRule};

// vim: ts=4
