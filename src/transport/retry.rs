//! Retry-with-backoff beneath the rate limiter.

// crates.io
use ::http::{Method, StatusCode};
use rand::Rng;
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{self, HttpRequest, HttpResponse, HttpTransport, TransportFuture},
	obs::{self, Operation, Outcome},
};

/// Retry policy applied to idempotent-enough methods on transient failures.
///
/// Delays follow `backoff_factor * 2^(n - 1)` seconds for the `n`-th retry, capped at
/// `backoff_max`, plus uniform jitter of up to `jitter_ms` milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Retries after the first attempt; `0` disables retrying.
	pub max_retries: u32,
	/// Base of the exponential backoff, in seconds.
	pub backoff_factor: f64,
	/// Upper bound on a single backoff, in seconds.
	pub backoff_max: f64,
	/// Response statuses that trigger a retry.
	pub status_forcelist: Vec<u16>,
	/// Methods eligible for retrying (compared case-insensitively).
	pub allowed_methods: Vec<String>,
	/// Honor `Retry-After` on 429/503 responses when it asks for a longer wait.
	pub respect_retry_after: bool,
	/// Maximum random jitter added to each delay, in milliseconds.
	pub jitter_ms: u64,
}
impl RetryPolicy {
	/// Validates numeric ranges.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !(self.backoff_factor.is_finite() && self.backoff_factor >= 0.) {
			return Err(ConfigError::InvalidRetryPolicy {
				field: "backoff_factor",
				reason: "must be a finite, non-negative number",
			});
		}
		if !(self.backoff_max.is_finite() && self.backoff_max >= 0.) {
			return Err(ConfigError::InvalidRetryPolicy {
				field: "backoff_max",
				reason: "must be a finite, non-negative number",
			});
		}

		Ok(())
	}

	/// Returns `true` when `method` may be replayed.
	pub fn allows_method(&self, method: &Method) -> bool {
		self.allowed_methods.iter().any(|m| m.eq_ignore_ascii_case(method.as_str()))
	}

	/// Returns `true` when `status` should trigger a retry.
	pub fn retries_status(&self, status: StatusCode) -> bool {
		self.status_forcelist.contains(&status.as_u16())
	}

	/// Exponential backoff before the `retry`-th replay (1-based), jitter included.
	pub fn backoff(&self, retry: u32) -> StdDuration {
		let exponent = retry.saturating_sub(1).min(63) as i32;
		let secs = (self.backoff_factor * 2_f64.powi(exponent)).min(self.backoff_max);
		let base = StdDuration::try_from_secs_f64(secs).unwrap_or_default();

		if self.jitter_ms == 0 {
			base
		} else {
			base + StdDuration::from_millis(rand::rng().random_range(0..=self.jitter_ms))
		}
	}

	/// Delay before the `retry`-th replay given the response that triggered it, if any.
	pub fn retry_delay(&self, retry: u32, response: Option<&HttpResponse>) -> StdDuration {
		let backoff = self.backoff(retry);

		match response {
			Some(response)
				if self.respect_retry_after
					&& matches!(
						response.status(),
						StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
					) =>
				http::parse_retry_after(response.headers()).map_or(backoff, |hint| hint.max(backoff)),
			_ => backoff,
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			backoff_factor: 0.3,
			backoff_max: 120.,
			status_forcelist: vec![429, 500, 502, 503, 504],
			allowed_methods: ["GET", "POST", "PUT", "DELETE"].map(String::from).to_vec(),
			respect_retry_after: true,
			jitter_ms: 0,
		}
	}
}

/// Decorator replaying requests that hit transient failures.
///
/// After `max_retries` replays the last response or error is returned unchanged.
#[derive(Clone, Debug)]
pub struct RetryTransport<T> {
	inner: T,
	policy: RetryPolicy,
}
impl<T> RetryTransport<T> {
	/// Wraps `inner` with `policy`.
	pub fn new(inner: T, policy: RetryPolicy) -> Self {
		Self { inner, policy }
	}

	/// Active policy.
	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	/// Wrapped transport.
	pub fn inner(&self) -> &T {
		&self.inner
	}
}
impl<T> HttpTransport for RetryTransport<T>
where
	T: HttpTransport,
{
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let replayable = self.policy.allows_method(request.method());
			let mut retries = 0;

			loop {
				if !replayable || retries >= self.policy.max_retries {
					return self.inner.send(request).await;
				}

				let result = self.inner.send(http::clone_request(&request)).await;
				let delay = match &result {
					Ok(response) if self.policy.retries_status(response.status()) =>
						self.policy.retry_delay(retries + 1, Some(response)),
					Err(Error::Transport(e)) if e.is_retryable() =>
						self.policy.retry_delay(retries + 1, None),
					_ => return result,
				};

				retries += 1;

				obs::record_outcome(Operation::Retry, Outcome::Attempt);

				#[cfg(feature = "tracing")]
				{
					match &result {
						Ok(response) => tracing::debug!(
							uri = %request.uri(),
							status = response.status().as_u16(),
							retry = retries,
							delay_ms = delay.as_millis() as u64,
							"Retrying request after a retryable status."
						),
						Err(e) => tracing::warn!(
							uri = %request.uri(),
							error = %e,
							retry = retries,
							delay_ms = delay.as_millis() as u64,
							"Retrying request after a transport failure."
						),
					}
				}

				tokio::time::sleep(delay).await;
			}
		})
	}
}
