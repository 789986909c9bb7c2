//! Common types used throughout the settings service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ClResult, Error};

// Timestamp
//***********

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
	pub fn now() -> Timestamp {
		Timestamp(chrono::Utc::now().timestamp())
	}

	pub fn from_now(delta_secs: i64) -> Timestamp {
		Timestamp(Self::now().0 + delta_secs)
	}
}

impl fmt::Display for Timestamp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

// ScopeLevel
//************

/// Scope level in increasing order of specificity: `system < org < team < user`
///
/// The derived `Ord` follows declaration order, so comparisons between levels
/// implement the total order used by visibility and configurability gating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeLevel {
	System,
	Org,
	Team,
	User,
}

impl ScopeLevel {
	pub const ALL: [ScopeLevel; 4] =
		[ScopeLevel::System, ScopeLevel::Org, ScopeLevel::Team, ScopeLevel::User];

	pub fn as_str(self) -> &'static str {
		match self {
			ScopeLevel::System => "system",
			ScopeLevel::Org => "org",
			ScopeLevel::Team => "team",
			ScopeLevel::User => "user",
		}
	}

	/// The override store backing this level (`None` for system, which only has defaults)
	pub fn override_scope(self) -> Option<OverrideScope> {
		match self {
			ScopeLevel::System => None,
			ScopeLevel::Org => Some(OverrideScope::Org),
			ScopeLevel::Team => Some(OverrideScope::Team),
			ScopeLevel::User => Some(OverrideScope::User),
		}
	}
}

impl fmt::Display for ScopeLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ScopeLevel {
	type Err = Error;

	fn from_str(s: &str) -> ClResult<Self> {
		match s {
			"system" => Ok(ScopeLevel::System),
			"org" => Ok(ScopeLevel::Org),
			"team" => Ok(ScopeLevel::Team),
			"user" => Ok(ScopeLevel::User),
			_ => Err(Error::Parse(format!("invalid scope level: {}", s))),
		}
	}
}

// OverrideScope
//***************

/// The three scopes that own an override store
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideScope {
	User,
	Org,
	Team,
}

impl OverrideScope {
	pub const ALL: [OverrideScope; 3] = [OverrideScope::User, OverrideScope::Org, OverrideScope::Team];

	pub fn level(self) -> ScopeLevel {
		match self {
			OverrideScope::User => ScopeLevel::User,
			OverrideScope::Org => ScopeLevel::Org,
			OverrideScope::Team => ScopeLevel::Team,
		}
	}

	pub fn as_str(self) -> &'static str {
		self.level().as_str()
	}
}

impl fmt::Display for OverrideScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

// ScopeId
//*********

/// Identifier of a user, organization or team entity
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(pub Box<str>);

impl ScopeId {
	pub fn new(id: impl Into<Box<str>>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ScopeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for ScopeId {
	fn from(s: &str) -> Self {
		Self(s.into())
	}
}

impl From<String> for ScopeId {
	fn from(s: String) -> Self {
		Self(s.into_boxed_str())
	}
}

// ValueType / InputType
//***********************

/// Storage type of a setting value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
	String,
	Number,
	Boolean,
	Json,
}

impl ValueType {
	pub fn as_str(self) -> &'static str {
		match self {
			ValueType::String => "string",
			ValueType::Number => "number",
			ValueType::Boolean => "boolean",
			ValueType::Json => "json",
		}
	}
}

impl fmt::Display for ValueType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// UI input type, drives the format check stage of validation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
	#[default]
	Text,
	Textarea,
	Email,
	Url,
	Password,
	Number,
	Select,
	Radio,
	Switch,
	Checkbox,
	Color,
	Json,
	#[serde(other)]
	Other,
}


// vim: ts=4
