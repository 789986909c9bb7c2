//! Three-tier cache in front of the override stores and the resolver
//!
//! - tier A (`overrides`): whole override set of one scope entity
//! - tier B (`effective`): resolved values of one scope context
//! - tier C (`response`): assembled, grouped listings

pub mod invalidation;
pub mod keys;
pub mod layer;

pub use invalidation::{InvalidationDispatcher, InvalidationStats, Invalidator};
pub use keys::{CacheKeys, Target, Tier};
pub use layer::CacheLayer;

// vim: ts=4
