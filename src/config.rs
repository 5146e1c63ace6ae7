//! Read-only configuration surface consumed by the transport core.
//!
//! Every section is `serde`-friendly and fully defaulted so hosts can deserialize a
//! partial document from whatever source they own. Call [`TransportConfig::validate`]
//! before wiring the stack; constructors re-check the parameters they rely on.

// self
use crate::{_prelude::*, error::ConfigError, transport::RetryPolicy};

/// Top-level configuration for the transport stack.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
	/// Client-side rate limiting.
	pub rate_limit: RateLimitConfig,
	/// Retry policy applied beneath the rate limiter.
	pub retry: RetryPolicy,
	/// Request authentication and replay protection.
	pub auth: AuthConfig,
	/// Offset pagination defaults.
	pub pagination: PaginationConfig,
}
impl TransportConfig {
	/// Validates every section.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.rate_limit.validate()?;
		self.retry.validate()?;
		self.pagination.validate()?;

		Ok(())
	}
}

/// Rate limiting algorithm selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimiterKind {
	/// Token bucket with burst capacity.
	#[default]
	TokenBucket,
	/// Exact sliding window over issue timestamps.
	SlidingWindow,
}
impl RateLimiterKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::TokenBucket => "token_bucket",
			Self::SlidingWindow => "sliding_window",
		}
	}
}
impl Display for RateLimiterKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Client-side rate limiting parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
	/// Whether outbound calls are throttled at all.
	pub enabled: bool,
	/// Algorithm used when enabled.
	pub kind: RateLimiterKind,
	/// Sustained token-bucket rate.
	pub requests_per_second: f64,
	/// Token-bucket burst capacity; defaults to twice the rate.
	pub burst_capacity: Option<u32>,
	/// Sliding-window request budget.
	pub requests_per_window: u32,
	/// Sliding-window length in seconds.
	pub window_size_seconds: u64,
	/// Throttle each target host independently instead of globally.
	pub per_host: bool,
	/// Maximum wait for a slot in seconds; `None` waits indefinitely.
	pub timeout_seconds: Option<f64>,
}
impl RateLimitConfig {
	/// Returns the configured wait budget as a [`StdDuration`].
	pub fn timeout(&self) -> Option<StdDuration> {
		self.timeout_seconds.and_then(|secs| StdDuration::try_from_secs_f64(secs).ok())
	}

	/// Validates the parameters relevant to the selected algorithm.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.timeout_seconds.is_some_and(|secs| !(secs.is_finite() && secs >= 0.)) {
			return Err(ConfigError::InvalidRateLimit {
				field: "timeout_seconds",
				reason: "must be a finite, non-negative number",
			});
		}

		match self.kind {
			RateLimiterKind::TokenBucket => {
				if !(self.requests_per_second.is_finite() && self.requests_per_second > 0.) {
					return Err(ConfigError::InvalidRateLimit {
						field: "requests_per_second",
						reason: "must be a finite, positive number",
					});
				}
				if self.burst_capacity == Some(0) {
					return Err(ConfigError::InvalidRateLimit {
						field: "burst_capacity",
						reason: "must allow at least one request",
					});
				}
			},
			RateLimiterKind::SlidingWindow => {
				if self.requests_per_window == 0 {
					return Err(ConfigError::InvalidRateLimit {
						field: "requests_per_window",
						reason: "must allow at least one request",
					});
				}
				if self.window_size_seconds == 0 {
					return Err(ConfigError::InvalidRateLimit {
						field: "window_size_seconds",
						reason: "must be at least one second",
					});
				}
			},
		}

		Ok(())
	}
}
impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			kind: RateLimiterKind::default(),
			requests_per_second: 5.,
			burst_capacity: None,
			requests_per_window: 100,
			window_size_seconds: 60,
			per_host: true,
			timeout_seconds: Some(30.),
		}
	}
}

/// Authentication and replay-protection parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
	/// Maximum accepted age of a signed timestamp, in seconds.
	pub max_timestamp_age: i64,
	/// Track consumed wallet nonces to reject replays.
	pub enable_nonce_tracking: bool,
	/// Horizon beyond which nonces are considered stale, in seconds.
	pub max_nonce_age: i64,
	/// Chain identifier bound into wallet signatures.
	pub chain_id: u64,
}
impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			max_timestamp_age: 300,
			enable_nonce_tracking: true,
			max_nonce_age: 3_600,
			chain_id: 137,
		}
	}
}

/// Offset pagination parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
	/// Page size used when callers do not pick one.
	pub default_page_size: usize,
	/// Largest page size ever requested from the remote service.
	pub max_page_size: usize,
	/// Safety cap on accumulated results; `None` disables the cap.
	pub max_total_results: Option<usize>,
	/// Follow pages automatically instead of returning only the first one.
	pub enable_auto_pagination: bool,
}
impl PaginationConfig {
	/// Validates page sizing.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.default_page_size == 0 {
			return Err(ConfigError::InvalidPagination {
				field: "default_page_size",
				reason: "must be at least one",
			});
		}
		if self.max_page_size == 0 {
			return Err(ConfigError::InvalidPagination {
				field: "max_page_size",
				reason: "must be at least one",
			});
		}

		Ok(())
	}
}
impl Default for PaginationConfig {
	fn default() -> Self {
		Self {
			default_page_size: 100,
			max_page_size: 1_000,
			max_total_results: Some(10_000),
			enable_auto_pagination: false,
		}
	}
}
