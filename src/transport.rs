//! Transport decorators and stack assembly.
//!
//! [`build_stack`] wires the layers in the order every outbound call must traverse:
//!
//! ```text
//! RateLimitedTransport -> RetryTransport -> inner HttpTransport
//! ```
//!
//! The limiter is consulted once per logical send; retries happen beneath it and therefore
//! never consume additional rate-limit slots.

mod rate_limited;
mod retry;

pub use rate_limited::*;
pub use retry::*;

// self
use crate::{config::TransportConfig, error::ConfigError, http::HttpTransport};

/// Fully assembled stack returned by [`build_stack`].
pub type TransportStack<T> = RateLimitedTransport<RetryTransport<T>>;

/// Wraps `inner` with retries and (when enabled) client-side rate limiting.
pub fn build_stack<T>(inner: T, config: &TransportConfig) -> Result<TransportStack<T>, ConfigError>
where
	T: HttpTransport,
{
	config.validate()?;

	let retrying = RetryTransport::new(inner, config.retry.clone());

	RateLimitedTransport::from_config(retrying, &config.rate_limit)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_prelude::*,
		config::{RateLimitConfig, RateLimiterKind},
		http::{HttpRequest, HttpResponse, TransportFuture},
	};

	struct Ok200;
	impl HttpTransport for Ok200 {
		fn send(&self, _request: HttpRequest) -> TransportFuture<'_> {
			Box::pin(async { Ok(HttpResponse::new(Vec::new())) })
		}
	}

	#[test]
	fn disabled_rate_limit_builds_passthrough() {
		let config = TransportConfig {
			rate_limit: RateLimitConfig { enabled: false, ..Default::default() },
			..Default::default()
		};
		let stack = build_stack(Ok200, &config).expect("Stack should build.");

		assert!(stack.limiter().is_none());
		assert_eq!(stack.inner().policy().max_retries, 3);
	}

	#[test]
	fn enabled_rate_limit_selects_kind() {
		let config = TransportConfig {
			rate_limit: RateLimitConfig { kind: RateLimiterKind::SlidingWindow, ..Default::default() },
			..Default::default()
		};
		let stack = build_stack(Ok200, &config).expect("Stack should build.");
		let limiter = stack.limiter().expect("Limiter should be installed.");

		assert_eq!(limiter.kind(), RateLimiterKind::SlidingWindow);
		assert_eq!(stack.timeout(), Some(StdDuration::from_secs(30)));
	}

	#[test]
	fn invalid_config_is_rejected_before_wiring() {
		let mut config = TransportConfig::default();

		config.retry.backoff_factor = -1.;

		assert!(matches!(
			build_stack(Ok200, &config),
			Err(ConfigError::InvalidRetryPolicy { field: "backoff_factor", .. })
		));
	}
}
