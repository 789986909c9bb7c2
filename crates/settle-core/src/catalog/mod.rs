//! Setting catalog: definitions, categories and their validation rules

pub mod registry;
pub mod service;

pub use registry::{
	CatalogSnapshot, DefinitionExt, FrozenCatalog, SettingDefinitionBuilder, SettingsRegistry,
	check_definition,
};
pub use service::{CatalogService, ImportSummary};

// vim: ts=4
