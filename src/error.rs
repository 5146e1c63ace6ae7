//! Transport-level error types shared across rate limiting, signing, and pagination.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeouts, rate-limit waits).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response did not follow the wire contract.
	#[error(transparent)]
	Protocol(#[from] ProtocolError),

	/// Remote service answered with a non-success status.
	#[error("Remote service responded with status {status}.")]
	Api {
		/// HTTP status code.
		status: u16,
		/// Response body decoded as UTF-8 (lossy).
		body: String,
	},
	/// A page item failed model validation.
	#[error("Page item at index {index} failed validation.")]
	InvalidItem {
		/// Absolute position of the item in the remote collection.
		index: usize,
		/// Structured deserialization failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Returns `true` when the error is a transport-class timeout.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Transport(TransportError::Timeout { .. }))
	}

	/// Returns the retry hint carried by timeout-class errors.
	pub fn retry_after(&self) -> Option<StdDuration> {
		match self {
			Self::Transport(TransportError::Timeout { retry_after, .. }) => *retry_after,
			_ => None,
		}
	}
}

/// Configuration and validation failures raised before any request leaves the process.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// A header value contains characters HTTP does not allow.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeaderValue {
		/// Header name.
		name: &'static str,
		/// Underlying header failure.
		#[source]
		source: ::http::header::InvalidHeaderValue,
	},
	/// Endpoint URL could not be parsed.
	#[error("Endpoint URL is invalid.")]
	InvalidEndpoint(#[from] url::ParseError),

	/// Credentials required by the requested signing scheme are absent or empty.
	#[error("{scheme} signing requires {missing}.")]
	MissingCredentials {
		/// Signing scheme label.
		scheme: &'static str,
		/// Human-readable description of the missing material.
		missing: &'static str,
	},
	/// Authentication scheme label is not recognized.
	#[error("Authentication scheme `{scheme}` is not supported.")]
	UnknownScheme {
		/// Label that failed to parse.
		scheme: String,
	},
	/// Private key could not be parsed.
	#[error("Private key is invalid.")]
	InvalidPrivateKey {
		/// Underlying key parsing failure.
		#[source]
		source: BoxError,
	},
	/// Signing backend rejected the payload.
	#[error("Signing failed.")]
	Signing {
		/// Underlying signer failure.
		#[source]
		source: BoxError,
	},
	/// Rate limiter parameters are out of range.
	#[error("Rate limiter parameter `{field}` is invalid: {reason}.")]
	InvalidRateLimit {
		/// Offending field.
		field: &'static str,
		/// Why the value was rejected.
		reason: &'static str,
	},
	/// Pagination parameters are out of range.
	#[error("Pagination parameter `{field}` is invalid: {reason}.")]
	InvalidPagination {
		/// Offending field.
		field: &'static str,
		/// Why the value was rejected.
		reason: &'static str,
	},
	/// Retry policy parameters are out of range.
	#[error("Retry parameter `{field}` is invalid: {reason}.")]
	InvalidRetryPolicy {
		/// Offending field.
		field: &'static str,
		/// Why the value was rejected.
		reason: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Wraps a private key parsing failure.
	pub fn invalid_private_key(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidPrivateKey { source: Box::new(src) }
	}

	/// Wraps a signer failure.
	pub fn signing(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Signing { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, timeouts).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request could not complete in time.
	///
	/// Rate-limit waits that exceed their budget are reported here as well, so retry
	/// machinery treats them exactly like network timeouts.
	#[error("Request timed out: {reason}.")]
	Timeout {
		/// Description of what timed out.
		reason: String,
		/// Estimated wait before a retry can succeed, when known.
		retry_after: Option<StdDuration>,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Returns `true` for failures that a retry may resolve.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Network { .. } | Self::Timeout { .. })
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout { reason: e.to_string(), retry_after: None }
		} else {
			Self::network(e)
		}
	}
}

/// Wire-contract violations in otherwise successful responses.
#[derive(Debug, ThisError)]
pub enum ProtocolError {
	/// Paginated endpoint returned something other than a JSON array.
	#[error("Expected a JSON array page but received {found}.")]
	NotAList {
		/// JSON kind that was received instead.
		found: &'static str,
	},
	/// Response body is not valid JSON.
	#[error("Response body is not valid JSON.")]
	Json {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
