//! Sliding window limiter.

// crates.io
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	config::{RateLimitConfig, RateLimiterKind},
	error::ConfigError,
	ratelimit::{KeyPolicy, KeyedState, RateLimitDecision, RateLimiter},
};

const POLL_INTERVAL: StdDuration = StdDuration::from_secs(1);

#[derive(Debug, Default)]
struct Window {
	issued: VecDeque<Instant>,
}
impl Window {
	// An entry issued at `t` counts against the window `(t, t + size]`.
	fn evict(&mut self, now: Instant, size: StdDuration) {
		while let Some(&oldest) = self.issued.front() {
			match oldest.checked_add(size) {
				Some(expires) if expires <= now => {
					self.issued.pop_front();
				},
				_ => break,
			}
		}
	}

	fn wait(&self, now: Instant, size: StdDuration) -> StdDuration {
		self.issued
			.front()
			.map(|oldest| match oldest.checked_add(size) {
				Some(expires) => expires.saturating_duration_since(now),
				None => StdDuration::MAX,
			})
			.unwrap_or_default()
	}
}

/// Sliding window limiter admitting at most `limit` requests in any `window`.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
	limit: usize,
	window: StdDuration,
	policy: KeyPolicy,
	windows: KeyedState<Window>,
}
impl SlidingWindowLimiter {
	/// Creates a limiter admitting `limit` requests per `window`.
	pub fn new(limit: u32, window: StdDuration, policy: KeyPolicy) -> Result<Self, ConfigError> {
		if limit == 0 {
			return Err(ConfigError::InvalidRateLimit {
				field: "requests_per_window",
				reason: "must allow at least one request",
			});
		}
		if window.is_zero() {
			return Err(ConfigError::InvalidRateLimit {
				field: "window_size_seconds",
				reason: "must be at least one second",
			});
		}

		Ok(Self { limit: limit as usize, window, policy, windows: KeyedState::default() })
	}

	/// Creates a limiter from the sliding-window fields of `config`.
	pub fn from_config(config: &RateLimitConfig) -> Result<Self, ConfigError> {
		Self::new(
			config.requests_per_window,
			StdDuration::from_secs(config.window_size_seconds),
			KeyPolicy::from_per_host(config.per_host),
		)
	}

	/// Request budget per window.
	pub fn limit(&self) -> usize {
		self.limit
	}

	/// Window length.
	pub fn window(&self) -> StdDuration {
		self.window
	}

	/// Returns how many requests to `target` currently count against the window.
	pub fn in_flight(&self, target: &str) -> usize {
		let window = self.window_for(target);
		let mut window = window.lock();

		window.evict(Instant::now(), self.window);

		window.issued.len()
	}

	fn window_for(&self, target: &str) -> Arc<Mutex<Window>> {
		let key = self.policy.key_for(target);

		self.windows.entry(&key, Window::default)
	}
}
impl RateLimiter for SlidingWindowLimiter {
	fn kind(&self) -> RateLimiterKind {
		RateLimiterKind::SlidingWindow
	}

	fn key_policy(&self) -> KeyPolicy {
		self.policy
	}

	fn can_proceed(&self, target: &str) -> bool {
		self.in_flight(target) < self.limit
	}

	fn prune_idle(&self) -> usize {
		let now = Instant::now();

		self.windows.prune(|window| {
			window.evict(now, self.window);

			window.issued.is_empty()
		})
	}

	fn try_acquire(&self, target: &str) -> RateLimitDecision {
		let window = self.window_for(target);
		let mut window = window.lock();
		let now = Instant::now();

		window.evict(now, self.window);

		if window.issued.len() < self.limit {
			window.issued.push_back(now);

			RateLimitDecision::Allow
		} else {
			RateLimitDecision::Delay(window.wait(now, self.window))
		}
	}

	fn poll_interval(&self) -> StdDuration {
		POLL_INTERVAL
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn rejects_invalid_parameters() {
		assert!(SlidingWindowLimiter::new(0, StdDuration::from_secs(1), KeyPolicy::Global).is_err());
		assert!(matches!(
			SlidingWindowLimiter::new(1, StdDuration::ZERO, KeyPolicy::Global),
			Err(ConfigError::InvalidRateLimit { field: "window_size_seconds", .. })
		));
	}

	#[tokio::test(start_paused = true)]
	async fn full_window_reports_time_until_oldest_expires() {
		let limiter = SlidingWindowLimiter::new(2, StdDuration::from_secs(10), KeyPolicy::Global)
			.expect("Sliding window parameters should be valid.");

		assert!(limiter.try_acquire("x").is_allow());

		tokio::time::advance(StdDuration::from_secs(4)).await;

		assert!(limiter.try_acquire("x").is_allow());
		assert_eq!(limiter.try_acquire("x"), RateLimitDecision::Delay(StdDuration::from_secs(6)));
		assert!(!limiter.can_proceed("x"));

		tokio::time::advance(StdDuration::from_secs(6)).await;

		assert_eq!(limiter.in_flight("x"), 1);
		assert!(limiter.try_acquire("x").is_allow());
	}

	#[tokio::test(start_paused = true)]
	async fn pruning_forgets_only_empty_windows() {
		let limiter = SlidingWindowLimiter::new(1, StdDuration::from_secs(10), KeyPolicy::PerHost)
			.expect("Sliding window parameters should be valid.");

		assert!(limiter.try_acquire("https://a.example.com/x").is_allow());
		assert_eq!(limiter.in_flight("https://b.example.com/x"), 0);
		assert_eq!(limiter.prune_idle(), 1);
		assert!(!limiter.can_proceed("https://a.example.com/x"));

		tokio::time::advance(StdDuration::from_secs(10)).await;

		assert_eq!(limiter.prune_idle(), 1);
		assert!(limiter.can_proceed("https://a.example.com/x"));
	}

	#[tokio::test(start_paused = true)]
	async fn no_interval_ever_holds_more_than_the_limit() {
		let limit = 3;
		let size = StdDuration::from_secs(1);
		let limiter = SlidingWindowLimiter::new(limit, size, KeyPolicy::PerHost)
			.expect("Sliding window parameters should be valid.");
		let mut granted = Vec::new();

		for i in 0..12_u64 {
			limiter
				.acquire("https://clob.example.com/book", None)
				.await
				.expect("Unbounded waits never time out.");
			granted.push(Instant::now());

			tokio::time::advance(StdDuration::from_millis(i * 37 % 250)).await;
		}

		for &end in &granted {
			let start = end.checked_sub(size).expect("Paused clock starts well after zero.");
			let inside = granted.iter().filter(|&&t| t > start && t <= end).count();

			assert!(inside <= limit as usize, "{inside} grants fell inside one window.");
		}
	}
}
