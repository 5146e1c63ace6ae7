//! Rate-limited transport decorator.

// self
use crate::{
	_prelude::*,
	config::RateLimitConfig,
	error::{ConfigError, TransportError},
	http::{HttpRequest, HttpTransport, TransportFuture},
	obs::{OpSpan, Operation},
	ratelimit::{self, RateLimiter},
};

/// Decorator that waits for a rate-limit slot before delegating to the inner transport.
///
/// A wait that cannot finish inside the configured timeout surfaces as
/// [`TransportError::Timeout`], so upstream retry logic treats throttling exactly like a
/// network timeout. Responses and errors from the inner transport pass through verbatim.
#[derive(Clone)]
pub struct RateLimitedTransport<T> {
	inner: T,
	limiter: Option<Arc<dyn RateLimiter>>,
	timeout: Option<StdDuration>,
}
impl<T> RateLimitedTransport<T> {
	/// Throttles `inner` through `limiter`, waiting at most `timeout` per request.
	pub fn new(inner: T, limiter: Arc<dyn RateLimiter>, timeout: Option<StdDuration>) -> Self {
		Self { inner, limiter: Some(limiter), timeout }
	}

	/// Forwards every request without throttling.
	pub fn passthrough(inner: T) -> Self {
		Self { inner, limiter: None, timeout: None }
	}

	/// Builds the limiter described by `config`, or a passthrough when it is disabled.
	pub fn from_config(inner: T, config: &RateLimitConfig) -> Result<Self, ConfigError> {
		if !config.enabled {
			return Ok(Self::passthrough(inner));
		}

		Ok(Self::new(inner, ratelimit::build_limiter(config)?, config.timeout()))
	}

	/// Installed limiter, if any.
	pub fn limiter(&self) -> Option<&Arc<dyn RateLimiter>> {
		self.limiter.as_ref()
	}

	/// Wait budget applied to each acquisition.
	pub fn timeout(&self) -> Option<StdDuration> {
		self.timeout
	}

	/// Wrapped transport.
	pub fn inner(&self) -> &T {
		&self.inner
	}
}
impl<T> Debug for RateLimitedTransport<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimitedTransport")
			.field("inner", &self.inner)
			.field("limiter", &self.limiter.as_ref().map(|l| l.kind()))
			.field("timeout", &self.timeout)
			.finish()
	}
}
impl<T> HttpTransport for RateLimitedTransport<T>
where
	T: HttpTransport,
{
	fn send(&self, request: HttpRequest) -> TransportFuture<'_> {
		let span = OpSpan::new(Operation::Send, "rate_limited");

		Box::pin(span.instrument(async move {
			if let Some(limiter) = &self.limiter {
				let target = request.uri().to_string();

				limiter.acquire(&target, self.timeout).await.map_err(TransportError::from)?;
			}

			self.inner.send(request).await
		}))
	}
}
