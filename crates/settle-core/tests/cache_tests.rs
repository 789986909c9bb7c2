//! Cache coherence, invalidation fan-out and degradation

mod common;

use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use common::*;
use settle_core::{InvalidationMode, ScopeContext};
use settle_types::directory_adapter::ScopeDirectory;
use settle_types::prelude::*;
use settle_types::utils::{cancellable, with_deadline};
use settle_types::value::SettingValue;

#[tokio::test]
async fn test_read_after_write_on_warm_cache() {
	let env = create_test_env().await;
	let svc = &env.service;
	let org = ScopeContext::org("o1");

	for length in [10, 12, 16, 20] {
		svc.get_setting(&org, "security.password_length").await.expect("warm the cache");
		svc.set_setting(&org, "security.password_length", json!(length)).await.expect("set");
		let eff = svc.get_setting(&org, "security.password_length").await.expect("get");
		assert_eq!(eff.value, SettingValue::from(i64::from(length)));
		assert!(eff.is_customized);
	}

	svc.reset_setting(&org, "security.password_length").await.expect("reset");
	let eff = svc.get_setting(&org, "security.password_length").await.expect("get");
	assert_eq!(eff.value, SettingValue::from(8_i64));
}

#[tokio::test]
async fn test_listing_refreshed_after_flush() {
	let env = create_test_env().await;
	let svc = &env.service;
	let org = ScopeContext::org("o1");

	let before = svc.list_settings(&org, None).await.expect("listing");
	assert!(!before.find("general.language").expect("listed").is_customized);

	svc.set_setting(&org, "general.language", json!("de")).await.expect("set");
	svc.flush_invalidations().await;

	let after = svc.list_settings(&org, None).await.expect("listing");
	let language = after.find("general.language").expect("listed");
	assert_eq!(language.value, SettingValue::from("de"));
	assert!(language.is_customized);

	let stats = svc.invalidation_stats();
	assert!(stats.dispatched >= 1);
	assert_eq!(stats.dispatched, stats.completed);
	assert_eq!(stats.failed, 0);
}

async fn assert_org_write_reaches_team(env: &TestEnv, org_id: &str, team_id: &str) {
	let svc = &env.service;
	let team = ScopeContext::team(team_id, Some(org_id.into()));
	let org = ScopeContext::org(org_id);

	// populate tiers B and C of the team
	let eff = svc.get_setting(&team, "general.language").await.expect("get");
	assert_eq!(eff.value, SettingValue::from("en"));
	svc.list_settings(&team, None).await.expect("listing");
	svc.list_settings(&team, Some("general")).await.expect("filtered listing");

	svc.set_setting(&org, "general.language", json!("de")).await.expect("org set");
	svc.flush_invalidations().await;

	let eff = svc.get_setting(&team, "general.language").await.expect("get");
	assert_eq!(eff.value, SettingValue::from("de"));
	assert_eq!(eff.provenance, ScopeLevel::Org);

	for category in [None, Some("general")] {
		let listing = svc.list_settings(&team, category).await.expect("listing");
		let language = listing.find("general.language").expect("listed");
		assert_eq!(language.value, SettingValue::from("de"));
		assert_eq!(language.provenance, ScopeLevel::Org);
	}
}

#[tokio::test]
async fn test_org_write_invalidates_directory_teams() {
	let directory = Arc::new(StaticDirectory::new(&[("o1", &["t1", "t2"])]));
	let env = create_test_env_with(test_config(), Some(Arc::clone(&directory) as Arc<dyn ScopeDirectory>)).await;

	assert_org_write_reaches_team(&env, "o1", "t1").await;
	assert!(directory.lookups.load(Ordering::Relaxed) >= 1);
}

#[tokio::test]
async fn test_org_write_invalidates_all_teams_without_directory() {
	let env = create_test_env().await;
	assert_org_write_reaches_team(&env, "o1", "t1").await;
}

#[tokio::test]
async fn test_team_contexts_with_and_without_org_are_cached_apart() {
	let env = create_test_env().await;
	let svc = &env.service;
	let with_org = ScopeContext::team("t1", Some("o1".into()));
	let without_org = ScopeContext::team("t1", None);

	svc.set_setting(&ScopeContext::org("o1"), "general.language", json!("de")).await.expect("org set");
	svc.flush_invalidations().await;

	// cold, then warm
	for _ in 0..2 {
		let eff = svc.get_setting(&with_org, "general.language").await.expect("get");
		assert_eq!((eff.value, eff.provenance), (SettingValue::from("de"), ScopeLevel::Org));
		let eff = svc.get_setting(&without_org, "general.language").await.expect("get");
		assert_eq!((eff.value, eff.provenance), (SettingValue::from("en"), ScopeLevel::System));

		let listing = svc.list_settings(&with_org, None).await.expect("listing");
		assert_eq!(listing.find("general.language").expect("listed").value, SettingValue::from("de"));
		let listing = svc.list_settings(&without_org, None).await.expect("listing");
		assert_eq!(listing.find("general.language").expect("listed").value, SettingValue::from("en"));
	}

	// a team write reaches both variants of the team
	svc.set_setting(&without_org, "general.language", json!("fr")).await.expect("team set");
	svc.flush_invalidations().await;
	for ctx in [&with_org, &without_org] {
		let eff = svc.get_setting(ctx, "general.language").await.expect("get");
		assert_eq!((eff.value, eff.provenance), (SettingValue::from("fr"), ScopeLevel::Team));
		let listing = svc.list_settings(ctx, None).await.expect("listing");
		assert_eq!(listing.find("general.language").expect("listed").value, SettingValue::from("fr"));
	}
}

#[tokio::test]
async fn test_entry_repopulated_during_write_is_cleared() {
	let cache = Arc::new(RevivingCache::new("test:effective:org:o1:general.language"));
	let env = create_test_env_with_cache(test_config(), None, Arc::clone(&cache) as _).await;
	let svc = &env.service;
	let org = ScopeContext::org("o1");

	assert_eq!(svc.get_string(&org, "general.language").await.expect("get"), "en");
	cache.arm();
	svc.set_setting(&org, "general.language", json!("de")).await.expect("set");
	svc.flush_invalidations().await;

	assert!(!cache.is_armed(), "stale entry was never put back");
	assert_eq!(svc.get_string(&org, "general.language").await.expect("get"), "de");
}

#[tokio::test]
async fn test_inline_invalidation_needs_no_flush() {
	let config = test_config().with_invalidation_mode(InvalidationMode::Inline);
	let env = create_test_env_with(config, None).await;
	let svc = &env.service;
	let team = ScopeContext::team("t1", Some("o1".into()));

	svc.list_settings(&team, None).await.expect("listing");
	svc.set_setting(&ScopeContext::org("o1"), "general.language", json!("de")).await.expect("set");

	let listing = svc.list_settings(&team, None).await.expect("listing");
	assert_eq!(listing.find("general.language").expect("listed").value, SettingValue::from("de"));
	assert_eq!(svc.invalidation_stats().dispatched, 0);
}

#[tokio::test]
async fn test_definition_change_invalidates_every_tier() {
	let env = create_test_env().await;
	let svc = &env.service;
	let team = ScopeContext::team("t1", None);

	assert_eq!(svc.get_string(&team, "general.theme").await.expect("get"), "system");
	svc.list_settings(&team, None).await.expect("listing");

	let mut def = svc
		.catalog()
		.snapshot()
		.await
		.expect("catalog")
		.find_by_key("general.theme")
		.cloned()
		.expect("theme defined");
	def.default_value = SettingValue::from("light");
	svc.catalog().update_definition(&def).await.expect("update definition");

	assert_eq!(svc.get_string(&team, "general.theme").await.expect("get"), "light");
	let listing = svc.list_settings(&team, None).await.expect("listing");
	assert_eq!(listing.find("general.theme").expect("listed").value, SettingValue::from("light"));

	assert!(svc.catalog().delete_definition("general.theme").await.expect("delete"));
	let res = svc.get_setting(&team, "general.theme").await;
	assert!(matches!(res, Err(Error::InvalidSettingKey(_))), "unexpected result: {:?}", res);
	let listing = svc.list_settings(&team, None).await.expect("listing");
	assert!(listing.find("general.theme").is_none());
}

#[tokio::test]
async fn test_category_change_invalidates_listing() {
	use settle_types::catalog_adapter::SettingCategory;

	let env = create_test_env().await;
	let svc = &env.service;
	let user = ScopeContext::user("u1");

	let listing = svc.list_settings(&user, None).await.expect("listing");
	assert_eq!(&*listing.categories[0].key, "general");

	let category = SettingCategory { key: "notify".into(), label: "Alerts".into(), icon: None, order: 0 };
	svc.catalog().update_category(&category).await.expect("update category");

	let listing = svc.list_settings(&user, None).await.expect("listing");
	assert_eq!(&*listing.categories[0].key, "notify");
	assert_eq!(&*listing.categories[0].label, "Alerts");
}

#[tokio::test]
async fn test_failing_cache_degrades_to_store() {
	let cache = Arc::new(FailingCache::default());
	let env = create_test_env_with_cache(test_config(), None, Arc::clone(&cache) as _).await;
	let svc = &env.service;
	let org = ScopeContext::org("o1");
	let team = ScopeContext::team("t1", Some("o1".into()));

	svc.set_setting(&org, "general.language", json!("de")).await.expect("write despite cache failure");
	assert_eq!(svc.get_string(&org, "general.language").await.expect("get"), "de");
	assert_eq!(svc.get_string(&team, "general.language").await.expect("get"), "de");

	let listing = svc.list_settings(&team, None).await.expect("listing");
	assert_eq!(listing.find("general.language").expect("listed").value, SettingValue::from("de"));

	svc.reset_setting(&org, "general.language").await.expect("reset despite cache failure");
	assert_eq!(svc.get_string(&team, "general.language").await.expect("get"), "en");

	svc.flush_invalidations().await;
	assert!(cache.calls.load(Ordering::Relaxed) > 0);
	assert!(svc.invalidation_stats().failed >= 1);
}

#[tokio::test]
async fn test_cancelled_read() {
	let env = create_test_env().await;
	let token = CancellationToken::new();
	token.cancel();

	let res = cancellable(&token, env.service.get_setting(&ScopeContext::user("u1"), "general.theme")).await;
	assert!(matches!(res, Err(Error::Cancelled)), "unexpected result: {:?}", res);

	let live = CancellationToken::new();
	let eff = cancellable(&live, env.service.get_setting(&ScopeContext::user("u1"), "general.theme"))
		.await
		.expect("get with live token");
	assert_eq!(eff.value, SettingValue::from("system"));
}

#[tokio::test]
async fn test_cancelled_write_is_not_applied() {
	let env = create_test_env().await;
	let user = ScopeContext::user("u1");
	let token = CancellationToken::new();
	token.cancel();

	let res = cancellable(&token, env.service.set_setting(&user, "general.theme", json!("dark"))).await;
	assert!(matches!(res, Err(Error::Cancelled)), "unexpected result: {:?}", res);
	assert_eq!(env.service.get_string(&user, "general.theme").await.expect("get"), "system");
}

#[tokio::test]
async fn test_deadline() {
	let env = create_test_env().await;
	let user = ScopeContext::user("u1");

	let eff = with_deadline(Duration::from_secs(5), env.service.get_setting(&user, "general.theme"))
		.await
		.expect("get within deadline");
	assert_eq!(eff.value, SettingValue::from("system"));
}

// vim: ts=4
