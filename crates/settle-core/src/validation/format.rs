//! Input-format checks driven by a definition's input type
//!
//! Only string candidates are checked. Select and radio option membership is
//! left to the caller, which owns the option list.

use regex::Regex;
use std::sync::LazyLock;

use crate::prelude::*;
use settle_types::types::InputType;

pub const PASSWORD_MIN_LENGTH: usize = 6;

// Dot-atom local part, at least one dot in the domain, labels without leading/trailing hyphens
static EMAIL_REGEX: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
	Regex::new(
		r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$",
	)
});

/// Check `value` against the format implied by `input_type`.
///
/// Returns a human-readable reason on failure.
pub fn check_format(input_type: InputType, value: &str) -> ClResult<Result<(), String>> {
	let res = match input_type {
		InputType::Email => check_email(value)?,
		InputType::Url => check_url(value),
		InputType::Password => check_password(value),
		_ => Ok(()),
	};
	Ok(res)
}

fn check_email(value: &str) -> ClResult<Result<(), String>> {
	let re = EMAIL_REGEX
		.as_ref()
		.map_err(|e| Error::Internal(format!("email regex compilation failed: {}", e)))?;
	if value.len() <= 254 && re.is_match(value) {
		Ok(Ok(()))
	} else {
		Ok(Err("must be a valid email address".into()))
	}
}

fn check_url(value: &str) -> Result<(), String> {
	let url = url::Url::parse(value).map_err(|_| "must be a valid URL".to_string())?;
	if !matches!(url.scheme(), "http" | "https") {
		return Err("URL scheme must be http or https".into());
	}
	if url.host_str().is_none_or(str::is_empty) {
		return Err("URL must have a host".into());
	}
	Ok(())
}

fn check_password(value: &str) -> Result<(), String> {
	if value.chars().count() < PASSWORD_MIN_LENGTH {
		return Err(format!("must be at least {} characters", PASSWORD_MIN_LENGTH));
	}
	Ok(())
}


// vim: ts=4
