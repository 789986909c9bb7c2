//! Adapter that stores per-scope setting overrides.
//!
//! One adapter backs all three override stores (user, organization, team);
//! every call names the store through its `OverrideScope` argument and is
//! confined to a single `scope_id` within that store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::prelude::*;
use crate::types::{OverrideScope, ScopeId};

/// Persisted override row, unique on `(scope_id, setting_key)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRow {
	pub id: i64,
	pub scope_id: ScopeId,
	pub setting_key: Box<str>,
	pub value: serde_json::Value,
	pub created_at: Timestamp,
	pub updated_at: Timestamp,
}

/// Item of a batch upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideItem {
	pub scope_id: ScopeId,
	pub setting_key: Box<str>,
	pub value: serde_json::Value,
}

#[async_trait]
pub trait OverrideAdapter: Debug + Send + Sync {
	// Commands
	//**********

	/// Create or replace the override for `(scope_id, key)`
	async fn upsert_override(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
		key: &str,
		value: &serde_json::Value,
	) -> ClResult<OverrideRow>;

	/// Upsert all items atomically (all or nothing)
	async fn batch_upsert_overrides(
		&self,
		scope: OverrideScope,
		items: &[OverrideItem],
	) -> ClResult<()>;

	/// Returns `true` if a row was removed. Deleting a missing override is not an error.
	async fn delete_override(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
		key: &str,
	) -> ClResult<bool>;

	/// Returns the number of rows removed
	async fn delete_all_overrides(&self, scope: OverrideScope, scope_id: &ScopeId)
	-> ClResult<u64>;

	// Queries
	//*********
	async fn read_override(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
		key: &str,
	) -> ClResult<Option<OverrideRow>>;

	async fn list_overrides(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
	) -> ClResult<Vec<OverrideRow>>;

	async fn list_overrides_by_keys(
		&self,
		scope: OverrideScope,
		scope_id: &ScopeId,
		keys: &[&str],
	) -> ClResult<Vec<OverrideRow>>;
}

// vim: ts=4
