//! Organization hierarchy lookups used to narrow cache invalidation fan-out.
//!
//! Identity management lives outside this service; the directory only answers
//! which teams inherit from an organization.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::prelude::*;

#[async_trait]
pub trait ScopeDirectory: Debug + Send + Sync {
	/// Teams whose resolution chain falls back to `org_id`
	async fn teams_in_org(&self, org_id: &ScopeId) -> ClResult<Vec<ScopeId>>;
}

// vim: ts=4
