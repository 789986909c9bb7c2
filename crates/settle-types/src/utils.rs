//! Cancellation and deadline helpers

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::prelude::*;

/// Run `fut` until it completes or `token` is cancelled.
///
/// On cancellation the future is dropped at its current await point and
/// `Error::Cancelled` is returned.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> ClResult<T>
where
	F: Future<Output = ClResult<T>>,
{
	tokio::select! {
		biased;
		() = token.cancelled() => Err(Error::Cancelled),
		res = fut => res,
	}
}

/// Run `fut` with a deadline, returning `Error::Timeout` when it elapses
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> ClResult<T>
where
	F: Future<Output = ClResult<T>>,
{
	tokio::time::timeout(deadline, fut).await?
}


// vim: ts=4
