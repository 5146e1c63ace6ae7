//! Authentication middleware: scheme detection, fail-closed validation, nonce ownership.

// crates.io
use ::http::header::HeaderMap;
// self
use crate::{
	_prelude::*,
	auth::{
		AuthScheme, AuthSession, L2_API_KEY, L2_API_SIGNATURE, L2_API_TIMESTAMP, NonceSet,
		POLY_ADDRESS, POLY_NONCE, POLY_SIGNATURE, POLY_TIMESTAMP, RequestSigner,
		SignatureValidator, SigningIdentity,
	},
	config::AuthConfig,
	error::ConfigError,
	http::{HttpRequest, HttpTransport},
	obs::{OpSpan, OpTimer, Operation},
};

/// Why a request failed validation.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Neither the HMAC nor the wallet header set is complete.
	#[error("Request carries no complete authentication header set.")]
	MissingHeaders,
	/// HMAC validation needs the shared secret.
	#[error("HMAC validation requires an API secret.")]
	MissingSecret,
	/// A header value is not visible ASCII.
	#[error("Header `{name}` is malformed.")]
	MalformedHeader {
		/// Offending header.
		name: &'static str,
	},
	/// `L2-API-KEY` is not at least 32 characters of `[A-Za-z0-9_-]`.
	#[error("API key is malformed.")]
	MalformedApiKey,
	/// Request body is not UTF-8 and cannot be part of the signed payload.
	#[error("Request body is not valid UTF-8.")]
	MalformedBody,
	/// Timestamp is unparsable, too old, or in the future.
	#[error("Timestamp is outside the accepted window.")]
	StaleTimestamp,
	/// Wallet address is not `0x` + 40 hex digits.
	#[error("Address is malformed.")]
	MalformedAddress,
	/// Nonce is not an unsigned integer.
	#[error("Nonce is malformed.")]
	MalformedNonce,
	/// Signature is not well-formed hex of an accepted length.
	#[error("Signature is malformed.")]
	MalformedSignature,
	/// Signature does not match the request.
	#[error("Signature does not match the request.")]
	BadSignature,
	/// Nonce was already consumed or lies outside the accepted horizon.
	#[error("Nonce was already used or is outside the accepted horizon.")]
	NonceRejected,
}

/// Orchestrates signing sessions and validation of signed requests.
///
/// The middleware owns the [`NonceSet`]; it is the single authority deciding whether a wallet
/// nonce has been consumed.
#[derive(Debug)]
pub struct AuthMiddleware {
	validator: SignatureValidator,
	max_timestamp_age: i64,
	enable_nonce_tracking: bool,
	max_nonce_age: i64,
	check_api_key_format: bool,
	nonces: NonceSet,
}
impl AuthMiddleware {
	/// Creates a middleware with default limits around `validator`.
	pub fn new(validator: SignatureValidator) -> Self {
		let defaults = AuthConfig::default();

		Self {
			validator,
			max_timestamp_age: defaults.max_timestamp_age,
			enable_nonce_tracking: defaults.enable_nonce_tracking,
			max_nonce_age: defaults.max_nonce_age,
			check_api_key_format: false,
			nonces: NonceSet::default(),
		}
	}

	/// Creates a middleware from the authentication section of the configuration.
	pub fn from_config(config: &AuthConfig) -> Self {
		Self::new(SignatureValidator::new(config.chain_id))
			.with_max_timestamp_age(config.max_timestamp_age)
			.with_nonce_tracking(config.enable_nonce_tracking)
			.with_max_nonce_age(config.max_nonce_age)
	}

	/// Overrides the accepted timestamp age in seconds.
	pub fn with_max_timestamp_age(mut self, seconds: i64) -> Self {
		self.max_timestamp_age = seconds;

		self
	}

	/// Enables or disables wallet nonce tracking.
	pub fn with_nonce_tracking(mut self, enabled: bool) -> Self {
		self.enable_nonce_tracking = enabled;

		self
	}

	/// Overrides the nonce horizon in seconds.
	pub fn with_max_nonce_age(mut self, seconds: i64) -> Self {
		self.max_nonce_age = seconds;

		self
	}

	/// Rejects HMAC requests whose API key fails
	/// [`SignatureValidator::validate_api_key_format`]. Off by default.
	pub fn with_api_key_format_check(mut self, enabled: bool) -> Self {
		self.check_api_key_format = enabled;

		self
	}

	/// Underlying validator.
	pub fn validator(&self) -> &SignatureValidator {
		&self.validator
	}

	/// Consumed nonces.
	pub fn nonces(&self) -> &NonceSet {
		&self.nonces
	}

	/// Builds a transport that signs every request with `scheme` on behalf of `identity`.
	///
	/// Fails immediately when `identity` lacks the material `scheme` needs.
	pub fn create_auth_session<T>(
		&self,
		identity: &SigningIdentity,
		scheme: AuthScheme,
		transport: T,
	) -> Result<AuthSession<T>, ConfigError>
	where
		T: HttpTransport,
	{
		AuthSession::new(transport, RequestSigner::new(identity)?, scheme)
	}

	/// Returns `true` when `request` carries a valid signature.
	pub fn validate_request(&self, request: &HttpRequest, api_secret: Option<&str>) -> bool {
		self.check_request(request, api_secret).is_ok()
	}

	/// Validates `request`, naming the exact reason on rejection.
	///
	/// HMAC is checked when its four headers are present, otherwise the wallet scheme; a
	/// request with neither complete set is rejected. A wallet nonce is consumed only after
	/// every other check, including the signature, has passed.
	pub fn check_request(
		&self,
		request: &HttpRequest,
		api_secret: Option<&str>,
	) -> Result<AuthScheme, ValidationError> {
		self.check_request_at(request, api_secret, OffsetDateTime::now_utc())
	}

	/// [`AuthMiddleware::check_request`] against an explicit clock reading.
	pub fn check_request_at(
		&self,
		request: &HttpRequest,
		api_secret: Option<&str>,
		now: OffsetDateTime,
	) -> Result<AuthScheme, ValidationError> {
		let scheme = AuthScheme::detect(request.headers());
		let _span =
			OpSpan::new(Operation::Validate, scheme.map_or("unsigned", AuthScheme::as_str)).entered();
		let mut timer = OpTimer::start(Operation::Validate, "check_request");
		let result = match scheme {
			Some(AuthScheme::Hmac) => self.check_hmac(request, api_secret, now),
			Some(AuthScheme::Wallet) => self.check_wallet(request.headers(), now),
			None => Err(ValidationError::MissingHeaders),
		};

		match &result {
			Ok(_) => timer.succeed(),
			#[cfg(feature = "tracing")]
			Err(e) => tracing::warn!(uri = %request.uri(), reason = %e, "Rejected signed request."),
			#[cfg(not(feature = "tracing"))]
			Err(_) => {},
		}

		result
	}

	/// Removes nonces older than `max_age_seconds`; a no-op when tracking is disabled.
	///
	/// Hosts are expected to call this on a timer.
	pub fn cleanup_nonces(&self, max_age_seconds: i64) -> usize {
		if !self.enable_nonce_tracking {
			return 0;
		}

		self.nonces.cleanup(max_age_seconds)
	}

	fn check_hmac(
		&self,
		request: &HttpRequest,
		api_secret: Option<&str>,
		now: OffsetDateTime,
	) -> Result<AuthScheme, ValidationError> {
		let secret = api_secret.filter(|s| !s.is_empty()).ok_or(ValidationError::MissingSecret)?;

		if self.check_api_key_format
			&& !self.validator.validate_api_key_format(header(request.headers(), L2_API_KEY)?)
		{
			return Err(ValidationError::MalformedApiKey);
		}

		let timestamp = header(request.headers(), L2_API_TIMESTAMP)?;

		if !self.validator.validate_timestamp_at(timestamp, self.max_timestamp_age, now) {
			return Err(ValidationError::StaleTimestamp);
		}

		let signature = header(request.headers(), L2_API_SIGNATURE)?;
		let path = request.uri().path_and_query().map_or("/", |pq| pq.as_str());
		let body =
			std::str::from_utf8(request.body()).map_err(|_| ValidationError::MalformedBody)?;

		if !self.validator.validate_hmac_signature(
			signature,
			secret,
			request.method().as_str(),
			path,
			body,
			timestamp,
		) {
			return Err(ValidationError::BadSignature);
		}

		Ok(AuthScheme::Hmac)
	}

	fn check_wallet(
		&self,
		headers: &HeaderMap,
		now: OffsetDateTime,
	) -> Result<AuthScheme, ValidationError> {
		let address = header(headers, POLY_ADDRESS)?;

		if !self.validator.validate_address_format(address) {
			return Err(ValidationError::MalformedAddress);
		}

		let timestamp = header(headers, POLY_TIMESTAMP)?;

		if !self.validator.validate_timestamp_at(timestamp, self.max_timestamp_age, now) {
			return Err(ValidationError::StaleTimestamp);
		}

		let nonce = header(headers, POLY_NONCE)?
			.trim()
			.parse::<u64>()
			.map_err(|_| ValidationError::MalformedNonce)?;
		let signature = header(headers, POLY_SIGNATURE)?;

		if !self.validator.validate_signature_format(signature) {
			return Err(ValidationError::MalformedSignature);
		}
		if !self.validator.validate_wallet_signature(signature, address, timestamp, nonce) {
			return Err(ValidationError::BadSignature);
		}
		if self.enable_nonce_tracking && !self.nonces.consume_at(nonce, self.max_nonce_age, now) {
			return Err(ValidationError::NonceRejected);
		}

		Ok(AuthScheme::Wallet)
	}
}
impl Default for AuthMiddleware {
	fn default() -> Self {
		Self::from_config(&AuthConfig::default())
	}
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, ValidationError> {
	headers
		.get(name)
		.ok_or(ValidationError::MissingHeaders)?
		.to_str()
		.map_err(|_| ValidationError::MalformedHeader { name })
}
