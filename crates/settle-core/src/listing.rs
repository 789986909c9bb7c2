//! Listing assembly: group resolved settings by category and group
//!
//! - categories by their own `order`, then key
//! - groups by the smallest `order` of their members, the ungrouped bucket last
//! - settings by `order`, then key

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;

use crate::catalog::FrozenCatalog;
use crate::prelude::*;
use crate::resolver::EffectiveSetting;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsListing {
	pub scope: ScopeLevel,
	pub categories: Vec<CategoryGroup>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGroup {
	pub key: Box<str>,
	pub label: Box<str>,
	pub icon: Option<Box<str>>,
	pub order: i32,
	pub groups: Vec<SettingGroup>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingGroup {
	/// `None` for the ungrouped bucket
	pub name: Option<Box<str>>,
	pub settings: Vec<EffectiveSetting>,
}

impl SettingsListing {
	/// Every setting in listing order
	pub fn settings(&self) -> impl Iterator<Item = &EffectiveSetting> {
		self.categories.iter().flat_map(|c| c.groups.iter().flat_map(|g| g.settings.iter()))
	}

	pub fn find(&self, key: &str) -> Option<&EffectiveSetting> {
		self.settings().find(|s| &*s.key == key)
	}
}

/// Group resolved settings into a listing.
///
/// A category id with no catalog entry gets a synthesized category that
/// sorts after all known ones.
pub fn assemble(
	catalog: &FrozenCatalog,
	scope: ScopeLevel,
	settings: Vec<EffectiveSetting>,
) -> SettingsListing {
	let by_category: BTreeMap<Box<str>, Vec<EffectiveSetting>> = settings
		.into_iter()
		.into_group_map_by(|s| s.metadata.category_id.clone())
		.into_iter()
		.collect();

	let categories = by_category
		.into_iter()
		.map(|(category_id, members)| {
			let (label, icon, order) = match catalog.category(&category_id) {
				Some(category) => (category.label.clone(), category.icon.clone(), category.order),
				None => {
					debug!(category = %category_id, "Setting refers to an unknown category");
					(category_id.clone(), None, i32::MAX)
				}
			};
			CategoryGroup { key: category_id, label, icon, order, groups: group(members) }
		})
		.sorted_by(|a, b| a.order.cmp(&b.order).then_with(|| a.key.cmp(&b.key)))
		.collect();

	SettingsListing { scope, categories }
}

fn group(members: Vec<EffectiveSetting>) -> Vec<SettingGroup> {
	let by_group = members.into_iter().into_group_map_by(|s| {
		s.metadata.group.as_ref().filter(|g| !g.is_empty()).cloned()
	});

	by_group
		.into_iter()
		.map(|(name, mut settings)| {
			settings.sort_by(|a, b| {
				a.metadata.order.cmp(&b.metadata.order).then_with(|| a.key.cmp(&b.key))
			});
			let min_order = settings.first().map_or(i32::MAX, |s| s.metadata.order);
			(min_order, SettingGroup { name, settings })
		})
		.sorted_by(|(a_order, a), (b_order, b)| {
			// ungrouped bucket last, then by min member order, then by name
			a.name
				.is_none()
				.cmp(&b.name.is_none())
				.then_with(|| a_order.cmp(b_order))
				.then_with(|| a.name.cmp(&b.name))
		})
		.map(|(_, group)| group)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::catalog::{DefinitionExt, SettingsRegistry};
	use settle_types::catalog_adapter::{SettingCategory, SettingDefinition};

	fn category(key: &str, order: i32) -> SettingCategory {
		SettingCategory { key: key.into(), label: key.to_uppercase().into(), icon: None, order }
	}

	fn setting(key: &str, group: Option<&str>, order: i32) -> SettingDefinition {
		let mut builder = SettingDefinition::builder(key).default(SettingValue::from(true)).order(order);
		if let Some(group) = group {
			builder = builder.group(group);
		}
		builder.build().expect("valid definition")
	}

	fn listing() -> SettingsListing {
		let mut registry = SettingsRegistry::new();
		registry.register_category(category("general", 2)).expect("category");
		registry.register_category(category("privacy", 1)).expect("category");
		for def in [
			setting("general.b", None, 0),
			setting("general.a", None, 0),
			setting("general.late", Some("advanced"), 5),
			setting("general.early", Some("display"), 1),
			setting("general.later", Some("display"), 9),
			setting("privacy.x", None, 0),
			setting("orphan.z", None, 0),
		] {
			registry.register(def).expect("register");
		}
		let catalog = registry.freeze();
		let settings = catalog.find_all().map(EffectiveSetting::default_of).collect();
		assemble(&catalog, ScopeLevel::User, settings)
	}

	#[test]
	fn test_categories_sorted_by_order() {
		let listing = listing();
		let keys: Vec<&str> = listing.categories.iter().map(|c| &*c.key).collect();
		assert_eq!(keys, vec!["privacy", "general", "orphan"]);
		assert_eq!(&*listing.categories[0].label, "PRIVACY");
		assert_eq!(&*listing.categories[2].label, "orphan");
	}

	#[test]
	fn test_groups_sorted_by_min_order_with_default_last() {
		let listing = listing();
		let general = &listing.categories[1];
		let names: Vec<Option<&str>> = general.groups.iter().map(|g| g.name.as_deref()).collect();
		assert_eq!(names, vec![Some("display"), Some("advanced"), None]);

		let display: Vec<&str> = general.groups[0].settings.iter().map(|s| &*s.key).collect();
		assert_eq!(display, vec!["general.early", "general.later"]);
		let ungrouped: Vec<&str> = general.groups[2].settings.iter().map(|s| &*s.key).collect();
		assert_eq!(ungrouped, vec!["general.a", "general.b"]);
	}

	#[test]
	fn test_find() {
		let listing = listing();
		assert!(listing.find("privacy.x").is_some());
		assert!(listing.find("privacy.y").is_none());
		assert_eq!(listing.settings().count(), 7);
	}
}

// vim: ts=4
