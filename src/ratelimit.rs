//! Client-side rate limiting.
//!
//! Two algorithms are provided behind the [`RateLimiter`] contract:
//!
//! - [`TokenBucketLimiter`] allows bursts up to a capacity while bounding the sustained rate.
//! - [`SlidingWindowLimiter`] counts issued requests inside a moving window, exact but
//!   memory-proportional to the request budget.
//!
//! Each limiter owns a concurrent map of per-key state; every key has its own lock, so
//! throttling one host never blocks callers targeting another. [`RateLimiter::acquire`]
//! is a cooperative sleep loop on the Tokio timer that re-checks periodically until a slot
//! frees up or the caller's timeout budget is exhausted.

mod keyed;
mod sliding_window;
mod token_bucket;

pub use keyed::*;
pub use sliding_window::*;
pub use token_bucket::*;

// crates.io
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	config::{RateLimitConfig, RateLimiterKind},
	error::{ConfigError, TransportError},
	obs::{OpTimer, Operation},
};

/// Boxed future returned by [`RateLimiter::acquire`].
pub type RateLimitFuture<'a> =
	Pin<Box<dyn Future<Output = Result<(), RateLimitTimeout>> + 'a + Send>>;

/// Throttling contract shared by every limiter algorithm.
///
/// `target` is the request URL (or any string); the limiter maps it to a state key via its
/// [`KeyPolicy`].
pub trait RateLimiter
where
	Self: Send + Sync,
{
	/// Algorithm backing this limiter.
	fn kind(&self) -> RateLimiterKind;

	/// Keying policy used to map targets to state.
	fn key_policy(&self) -> KeyPolicy;

	/// Returns `true` when a request to `target` could proceed right now.
	///
	/// The check never consumes capacity.
	fn can_proceed(&self, target: &str) -> bool;

	/// Consumes one slot for `target` if available, otherwise reports how long to wait.
	fn try_acquire(&self, target: &str) -> RateLimitDecision;

	/// Forgets keys whose state has returned to its initial value, returning how many went.
	///
	/// Pruning never changes a later decision. Per-host limiters keep one entry per host seen
	/// until this runs, so long-lived hosts should call it on a timer.
	fn prune_idle(&self) -> usize;

	/// Upper bound on a single sleep inside [`RateLimiter::acquire`].
	fn poll_interval(&self) -> StdDuration;

	/// Waits until a slot for `target` is available.
	///
	/// With `timeout = None` the call waits indefinitely. Otherwise it fails as soon as the
	/// elapsed time plus the estimated wait would exceed the budget, returning the estimate
	/// as [`RateLimitTimeout::retry_after`].
	fn acquire<'a>(&'a self, target: &'a str, timeout: Option<StdDuration>) -> RateLimitFuture<'a> {
		Box::pin(async move {
			let mut timer = OpTimer::start(Operation::Acquire, self.kind().as_str());
			let started = Instant::now();

			loop {
				let wait = match self.try_acquire(target) {
					RateLimitDecision::Allow => {
						timer.succeed();

						return Ok(());
					},
					RateLimitDecision::Delay(wait) => wait,
				};

				if timeout.is_some_and(|budget| started.elapsed().saturating_add(wait) > budget) {
					let key = self.key_policy().key_for(target);

					#[cfg(feature = "tracing")]
					tracing::warn!(
						key = %key,
						retry_after_ms = wait.as_millis() as u64,
						"Rate limit wait exceeded its timeout."
					);

					return Err(RateLimitTimeout { key, retry_after: wait });
				}

				tokio::time::sleep(wait.min(self.poll_interval())).await;
			}
		})
	}
}

/// Result emitted by [`RateLimiter::try_acquire`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately; a slot was consumed.
	Allow,
	/// No slot is free; the estimated wait until one is.
	Delay(StdDuration),
}
impl RateLimitDecision {
	/// Returns `true` for [`RateLimitDecision::Allow`].
	pub fn is_allow(&self) -> bool {
		matches!(self, Self::Allow)
	}
}

/// A slot could not be obtained within the caller's timeout.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Rate limit timeout exceeded for `{key}`; retry after {retry_after:?}.")]
pub struct RateLimitTimeout {
	/// State key that was saturated.
	pub key: String,
	/// Estimated wait before a slot frees up.
	pub retry_after: StdDuration,
}
impl From<RateLimitTimeout> for TransportError {
	fn from(e: RateLimitTimeout) -> Self {
		Self::Timeout { reason: e.to_string(), retry_after: Some(e.retry_after) }
	}
}
impl From<RateLimitTimeout> for Error {
	fn from(e: RateLimitTimeout) -> Self {
		Self::Transport(e.into())
	}
}

/// Builds the limiter selected by `config.kind`.
///
/// The `enabled` flag is not consulted here; see [`crate::transport::build_stack`].
pub fn build_limiter(config: &RateLimitConfig) -> Result<Arc<dyn RateLimiter>, ConfigError> {
	config.validate()?;

	Ok(match config.kind {
		RateLimiterKind::TokenBucket => Arc::new(TokenBucketLimiter::from_config(config)?),
		RateLimiterKind::SlidingWindow => Arc::new(SlidingWindowLimiter::from_config(config)?),
	})
}

pub(crate) fn duration_from_secs(secs: f64) -> StdDuration {
	StdDuration::try_from_secs_f64(secs).unwrap_or(StdDuration::MAX)
}
