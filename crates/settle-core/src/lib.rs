//! Core engine of the Settle settings service.
//!
//! Resolves effective setting values across the `system < org < team < user`
//! scope chain, validates candidate values before they reach an override
//! store, and keeps a three-tier cache coherent with the stores.
//!
//! Storage and cache backends are injected as adapter trait objects from
//! `settle-types`; this crate holds no long-lived mutable state of its own.

#![forbid(unsafe_code)]

pub mod cache;
pub mod catalog;
pub mod config;
pub mod listing;
pub mod prelude;
pub mod repository;
pub mod resolver;
pub mod service;
pub mod validation;

pub use catalog::{CatalogService, FrozenCatalog, SettingsRegistry};
pub use config::{InvalidationMode, SettleConfig};
pub use resolver::{EffectiveSetting, ScopeContext};
pub use service::{Adapters, SettingsService};

// vim: ts=4
