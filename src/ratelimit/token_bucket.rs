//! Token bucket limiter.

// crates.io
use tokio::time::Instant;
// self
use crate::{
	_prelude::*,
	config::{RateLimitConfig, RateLimiterKind},
	error::ConfigError,
	ratelimit::{self, KeyPolicy, KeyedState, RateLimitDecision, RateLimiter},
};

const POLL_INTERVAL: StdDuration = StdDuration::from_millis(100);
// Float refill can leave a deficit too small to express as a sleep.
const MIN_WAIT: StdDuration = StdDuration::from_millis(1);

#[derive(Debug)]
struct Bucket {
	tokens: f64,
	last_update: Instant,
}
impl Bucket {
	fn full(capacity: f64) -> Self {
		Self { tokens: capacity, last_update: Instant::now() }
	}

	// Saturating refill keeps `0 <= tokens <= capacity`.
	fn refill(&mut self, rate: f64, capacity: f64) {
		let now = Instant::now();
		let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

		self.tokens = (self.tokens + elapsed * rate).min(capacity);
		self.last_update = now;
	}
}

/// Token bucket limiter allowing bursts up to `capacity` at a sustained `rate`.
#[derive(Debug)]
pub struct TokenBucketLimiter {
	rate: f64,
	capacity: f64,
	policy: KeyPolicy,
	buckets: KeyedState<Bucket>,
}
impl TokenBucketLimiter {
	/// Creates a limiter refilling `rate` tokens per second.
	///
	/// `burst_capacity` defaults to twice the rate (at least one token).
	pub fn new(
		rate: f64,
		burst_capacity: Option<u32>,
		policy: KeyPolicy,
	) -> Result<Self, ConfigError> {
		if !(rate.is_finite() && rate > 0.) {
			return Err(ConfigError::InvalidRateLimit {
				field: "requests_per_second",
				reason: "must be a finite, positive number",
			});
		}

		let capacity = match burst_capacity {
			Some(0) =>
				return Err(ConfigError::InvalidRateLimit {
					field: "burst_capacity",
					reason: "must allow at least one request",
				}),
			Some(capacity) => capacity as f64,
			None => (rate * 2.).floor().max(1.),
		};

		Ok(Self { rate, capacity, policy, buckets: KeyedState::default() })
	}

	/// Creates a limiter from the token-bucket fields of `config`.
	pub fn from_config(config: &RateLimitConfig) -> Result<Self, ConfigError> {
		Self::new(
			config.requests_per_second,
			config.burst_capacity,
			KeyPolicy::from_per_host(config.per_host),
		)
	}

	/// Sustained refill rate in tokens per second.
	pub fn rate(&self) -> f64 {
		self.rate
	}

	/// Maximum number of tokens a bucket holds.
	pub fn capacity(&self) -> f64 {
		self.capacity
	}

	/// Returns the refilled token count for `target` without consuming any.
	pub fn available(&self, target: &str) -> f64 {
		let bucket = self.bucket(target);
		let mut bucket = bucket.lock();

		bucket.refill(self.rate, self.capacity);

		bucket.tokens
	}

	/// Number of distinct keys seen so far.
	pub fn tracked_keys(&self) -> usize {
		self.buckets.len()
	}

	fn bucket(&self, target: &str) -> Arc<Mutex<Bucket>> {
		let key = self.policy.key_for(target);

		self.buckets.entry(&key, || Bucket::full(self.capacity))
	}
}
impl RateLimiter for TokenBucketLimiter {
	fn kind(&self) -> RateLimiterKind {
		RateLimiterKind::TokenBucket
	}

	fn key_policy(&self) -> KeyPolicy {
		self.policy
	}

	fn can_proceed(&self, target: &str) -> bool {
		self.available(target) >= 1.
	}

	fn prune_idle(&self) -> usize {
		self.buckets.prune(|bucket| {
			bucket.refill(self.rate, self.capacity);

			bucket.tokens >= self.capacity
		})
	}

	fn try_acquire(&self, target: &str) -> RateLimitDecision {
		let bucket = self.bucket(target);
		let mut bucket = bucket.lock();

		bucket.refill(self.rate, self.capacity);

		if bucket.tokens >= 1. {
			bucket.tokens -= 1.;

			RateLimitDecision::Allow
		} else {
			let wait = ratelimit::duration_from_secs((1. - bucket.tokens) / self.rate);

			RateLimitDecision::Delay(wait.max(MIN_WAIT))
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
	fn default_capacity_is_twice_the_rate() {
		let limiter = TokenBucketLimiter::new(5., None, KeyPolicy::PerHost)
			.expect("Token bucket parameters should be valid.");

		assert_eq!(limiter.capacity(), 10.);

		let slow = TokenBucketLimiter::new(0.2, None, KeyPolicy::PerHost)
			.expect("Token bucket parameters should be valid.");

		assert_eq!(slow.capacity(), 1.);
	}

	#[test]
	fn rejects_invalid_parameters() {
		assert!(TokenBucketLimiter::new(0., None, KeyPolicy::Global).is_err());
		assert!(TokenBucketLimiter::new(-1., None, KeyPolicy::Global).is_err());
		assert!(TokenBucketLimiter::new(f64::INFINITY, None, KeyPolicy::Global).is_err());
		assert!(matches!(
			TokenBucketLimiter::new(1., Some(0), KeyPolicy::Global),
			Err(ConfigError::InvalidRateLimit { field: "burst_capacity", .. })
		));
	}

	#[tokio::test(start_paused = true)]
	async fn burst_admits_capacity_then_delays() {
		let limiter = TokenBucketLimiter::new(2., Some(3), KeyPolicy::PerHost)
			.expect("Token bucket parameters should be valid.");
		let target = "https://clob.example.com/orders";

		for _ in 0..3 {
			assert_eq!(limiter.try_acquire(target), RateLimitDecision::Allow);
		}

		assert_eq!(
			limiter.try_acquire(target),
			RateLimitDecision::Delay(StdDuration::from_millis(500))
		);
	}

	#[tokio::test(start_paused = true)]
	async fn can_proceed_does_not_consume() {
		let limiter = TokenBucketLimiter::new(1., Some(1), KeyPolicy::Global)
			.expect("Token bucket parameters should be valid.");

		for _ in 0..10 {
			assert!(limiter.can_proceed("any"));
		}

		assert!(limiter.try_acquire("any").is_allow());
		assert!(!limiter.can_proceed("any"));
	}

	#[tokio::test(start_paused = true)]
	async fn refill_is_saturating() {
		let limiter = TokenBucketLimiter::new(4., Some(2), KeyPolicy::Global)
			.expect("Token bucket parameters should be valid.");

		assert!(limiter.try_acquire("x").is_allow());

		tokio::time::advance(StdDuration::from_secs(60)).await;

		assert_eq!(limiter.available("x"), 2.);
	}

	#[tokio::test(start_paused = true)]
	async fn hosts_do_not_share_buckets() {
		let limiter = TokenBucketLimiter::new(1., Some(1), KeyPolicy::PerHost)
			.expect("Token bucket parameters should be valid.");

		assert!(limiter.try_acquire("https://a.example.com/x").is_allow());
		assert!(!limiter.can_proceed("https://a.example.com/y"));
		assert!(limiter.can_proceed("https://b.example.com/x"));
		assert_eq!(limiter.tracked_keys(), 2);
	}

	#[tokio::test(start_paused = true)]
	async fn pruning_forgets_only_refilled_buckets() {
		let limiter = TokenBucketLimiter::new(1., Some(1), KeyPolicy::PerHost)
			.expect("Token bucket parameters should be valid.");

		assert!(limiter.try_acquire("https://a.example.com/x").is_allow());
		assert!(limiter.can_proceed("https://b.example.com/x"));
		assert_eq!(limiter.prune_idle(), 1);
		assert_eq!(limiter.tracked_keys(), 1);
		assert!(!limiter.can_proceed("https://a.example.com/x"));

		tokio::time::advance(StdDuration::from_secs(1)).await;

		assert_eq!(limiter.prune_idle(), 1);
		assert_eq!(limiter.tracked_keys(), 0);
	}

	#[tokio::test(start_paused = true)]
	async fn global_policy_shares_one_bucket() {
		let limiter = TokenBucketLimiter::new(1., Some(1), KeyPolicy::Global)
			.expect("Token bucket parameters should be valid.");

		assert!(limiter.try_acquire("https://a.example.com/x").is_allow());
		assert!(!limiter.can_proceed("https://b.example.com/x"));
		assert_eq!(limiter.tracked_keys(), 1);
	}
}
