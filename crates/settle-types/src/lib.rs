//! Shared types, adapter traits, and core utilities for the Settle settings service.
//!
//! This crate contains the foundational types that are shared between the
//! core engine and all adapter implementations. Keeping them in a separate
//! crate lets the adapter crates compile without pulling in the engine.

#![forbid(unsafe_code)]

pub mod cache_adapter;
pub mod catalog_adapter;
pub mod directory_adapter;
pub mod error;
pub mod override_adapter;
pub mod prelude;
pub mod types;
pub mod utils;
pub mod value;

// vim: ts=4
