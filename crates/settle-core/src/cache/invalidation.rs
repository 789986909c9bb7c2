//! Write-triggered cache invalidation
//!
//! A write first mutates its store, then invalidates in two parts:
//! - synchronous: the writing scope's effective values, so the caller's next
//!   read of the key it just wrote is fresh
//! - deferred: listings of the writing scope and every descendant scope entry,
//!   plus a second pass over the writing scope's tiers A and B
//!
//! In detached mode the deferred part is queued on the [`InvalidationDispatcher`],
//! a bounded queue drained by worker tasks that run each job under its own
//! timeout. The triggering request's cancellation never reaches these jobs.

use futures::future::BoxFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use super::keys::{Target, Tier};
use super::layer::CacheLayer;
use crate::config::{InvalidationMode, SettleConfig};
use crate::prelude::*;
use settle_types::directory_adapter::ScopeDirectory;

/// Counters of the background dispatcher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationStats {
	pub dispatched: u64,
	pub completed: u64,
	pub failed: u64,
	pub timed_out: u64,
	/// Rejected because the queue was full or closed
	pub dropped: u64,
}

struct Job {
	label: String,
	fut: BoxFuture<'static, ClResult<()>>,
}

#[derive(Debug, Default)]
struct Shared {
	dispatched: AtomicU64,
	completed: AtomicU64,
	failed: AtomicU64,
	timed_out: AtomicU64,
	dropped: AtomicU64,
	pending: AtomicUsize,
	idle: Notify,
}

impl Shared {
	fn finish_one(&self) {
		if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
			self.idle.notify_waiters();
		}
	}
}

/// Bounded queue of detached invalidation jobs
#[derive(Debug)]
pub struct InvalidationDispatcher {
	tx: flume::Sender<Job>,
	shared: Arc<Shared>,
}

impl std::fmt::Debug for Job {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Job").field("label", &self.label).finish_non_exhaustive()
	}
}

impl InvalidationDispatcher {
	/// Start `workers` tasks on the current tokio runtime
	pub fn new(workers: usize, capacity: usize, timeout: Duration) -> Self {
		let (tx, rx) = flume::bounded::<Job>(capacity.max(1));
		let shared = Arc::new(Shared::default());

		for worker_id in 0..workers.max(1) {
			let rx = rx.clone();
			let shared = Arc::clone(&shared);
			tokio::spawn(async move {
				while let Ok(job) = rx.recv_async().await {
					match tokio::time::timeout(timeout, job.fut).await {
						Ok(Ok(())) => {
							shared.completed.fetch_add(1, Ordering::Relaxed);
						}
						Ok(Err(err)) => {
							warn!(worker_id, job = %job.label, "Invalidation job failed: {}", err);
							shared.failed.fetch_add(1, Ordering::Relaxed);
						}
						Err(_) => {
							warn!(worker_id, job = %job.label, "Invalidation job timed out after {:?}", timeout);
							shared.timed_out.fetch_add(1, Ordering::Relaxed);
						}
					}
					shared.finish_one();
				}
				debug!(worker_id, "Invalidation worker stopped");
			});
		}

		Self { tx, shared }
	}

	pub fn from_config(config: &SettleConfig) -> Self {
		Self::new(
			config.invalidation_workers,
			config.invalidation_queue,
			config.invalidation_timeout,
		)
	}

	/// Queue a job without waiting. A full queue drops the job with a warning;
	/// the affected entries then expire through their TTL.
	pub fn dispatch(&self, label: impl Into<String>, fut: BoxFuture<'static, ClResult<()>>) {
		let job = Job { label: label.into(), fut };
		self.shared.pending.fetch_add(1, Ordering::AcqRel);
		match self.tx.try_send(job) {
			Ok(()) => {
				self.shared.dispatched.fetch_add(1, Ordering::Relaxed);
			}
			Err(err) => {
				let reason = match &err {
					flume::TrySendError::Full(_) => "queue full",
					flume::TrySendError::Disconnected(_) => "queue closed",
				};
				warn!(job = %err.into_inner().label, "Invalidation job dropped: {}", reason);
				self.shared.dropped.fetch_add(1, Ordering::Relaxed);
				self.shared.finish_one();
			}
		}
	}

	/// Wait until every queued job has finished
	pub async fn flush(&self) {
		loop {
			let notified = self.shared.idle.notified();
			tokio::pin!(notified);
			notified.as_mut().enable();
			if self.shared.pending.load(Ordering::Acquire) == 0 {
				return;
			}
			notified.await;
		}
	}

	pub fn stats(&self) -> InvalidationStats {
		InvalidationStats {
			dispatched: self.shared.dispatched.load(Ordering::Relaxed),
			completed: self.shared.completed.load(Ordering::Relaxed),
			failed: self.shared.failed.load(Ordering::Relaxed),
			timed_out: self.shared.timed_out.load(Ordering::Relaxed),
			dropped: self.shared.dropped.load(Ordering::Relaxed),
		}
	}
}

// Invalidator
//*************

/// Decides what a write invalidates and when
#[derive(Debug)]
pub struct Invalidator {
	cache: Arc<CacheLayer>,
	directory: Option<Arc<dyn ScopeDirectory>>,
	dispatcher: Option<InvalidationDispatcher>,
	timeout: Duration,
}

impl Invalidator {
	/// The dispatcher is only started in detached mode
	pub fn new(
		cache: Arc<CacheLayer>,
		directory: Option<Arc<dyn ScopeDirectory>>,
		config: &SettleConfig,
	) -> Self {
		let dispatcher = match config.invalidation_mode {
			InvalidationMode::Detached => Some(InvalidationDispatcher::from_config(config)),
			InvalidationMode::Inline => None,
		};
		Self { cache, directory, dispatcher, timeout: config.invalidation_timeout }
	}

	pub fn cache(&self) -> &Arc<CacheLayer> {
		&self.cache
	}

	/// After an override of `scope_id` changed
	pub async fn override_written(&self, scope: OverrideScope, scope_id: &ScopeId) {
		let keys = self.cache.keys();
		let level = scope.level();

		let sync = keys.entity_targets(Tier::Effective, level, scope_id.as_str());
		self.cache.invalidate(&sync).await;

		// Tiers A and B again: a read that loaded the old overrides may have
		// repopulated them after the synchronous delete
		let mut deferred = keys.entity_targets(Tier::Response, level, scope_id.as_str());
		deferred.push(Target::Key(keys.overrides(scope, scope_id)));
		deferred.extend(sync);
		let org_id = match scope {
			OverrideScope::Org => Some(scope_id.clone()),
			// team and user contexts have no descendants
			OverrideScope::Team | OverrideScope::User => None,
		};

		let cache = Arc::clone(&self.cache);
		let directory = self.directory.clone();
		let label = format!("override {}:{}", scope, scope_id);
		let fut: BoxFuture<'static, ClResult<()>> = Box::pin(async move {
			if let Some(org_id) = org_id {
				deferred.extend(team_targets(&cache, directory.as_deref(), &org_id).await);
			}
			cache.try_invalidate(&deferred).await
		});
		self.run_deferred(label, fut).await;
	}

	/// After a definition or category changed: every tier, synchronously
	pub async fn catalog_written(&self) {
		let keys = self.cache.keys();
		let targets = [
			Target::Key(keys.catalog()),
			keys.tier_target(Tier::Overrides),
			keys.tier_target(Tier::Effective),
			keys.tier_target(Tier::Response),
		];
		self.cache.invalidate(&targets).await;
	}

	async fn run_deferred(&self, label: String, fut: BoxFuture<'static, ClResult<()>>) {
		match &self.dispatcher {
			Some(dispatcher) => dispatcher.dispatch(label, fut),
			None => match tokio::time::timeout(self.timeout, fut).await {
				Ok(Ok(())) => {}
				Ok(Err(err)) => warn!(job = %label, "Invalidation failed: {}", err),
				Err(_) => warn!(job = %label, "Invalidation timed out after {:?}", self.timeout),
			},
		}
	}

	/// Wait for detached invalidations (no-op in inline mode)
	pub async fn flush(&self) {
		if let Some(dispatcher) = &self.dispatcher {
			dispatcher.flush().await;
		}
	}

	pub fn stats(&self) -> InvalidationStats {
		self.dispatcher.as_ref().map(InvalidationDispatcher::stats).unwrap_or_default()
	}
}

/// Tier B and C entries of every team that inherits from `org_id`.
///
/// Without a directory, or if the lookup fails, all team entries are targeted.
async fn team_targets(
	cache: &CacheLayer,
	directory: Option<&dyn ScopeDirectory>,
	org_id: &ScopeId,
) -> Vec<Target> {
	let keys = cache.keys();
	let teams = match directory {
		Some(directory) => match directory.teams_in_org(org_id).await {
			Ok(teams) => Some(teams),
			Err(err) => {
				warn!(org_id = %org_id, "Team lookup failed, invalidating all teams: {}", err);
				None
			}
		},
		None => None,
	};

	match teams {
		Some(teams) => teams
			.iter()
			.flat_map(|team_id| {
				[Tier::Effective, Tier::Response]
					.into_iter()
					.flat_map(move |tier| keys.entity_targets(tier, ScopeLevel::Team, team_id.as_str()))
			})
			.collect(),
		None => vec![
			keys.level_target(Tier::Effective, ScopeLevel::Team),
			keys.level_target(Tier::Response, ScopeLevel::Team),
		],
	}
}


// vim: ts=4
