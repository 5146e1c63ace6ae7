//! Signature, timestamp, nonce, and format validation.

// crates.io
use ::http::header::HeaderMap;
// self
use crate::{
	_prelude::*,
	auth::{Address, DEFAULT_CHAIN_ID, eip712, nonce, signer},
};

/// Stateless validator for signed requests.
///
/// Every check fails closed: anything unparsable is rejected rather than skipped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignatureValidator {
	chain_id: u64,
}
impl SignatureValidator {
	/// Creates a validator bound to `chain_id` for wallet signatures.
	pub const fn new(chain_id: u64) -> Self {
		Self { chain_id }
	}

	/// Chain identifier wallet signatures must be bound to.
	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	/// Recomputes the HMAC over `(timestamp, method, path, body)` and compares it with
	/// `signature` in constant time.
	pub fn validate_hmac_signature(
		&self,
		signature: &str,
		api_secret: &str,
		method: &str,
		path: &str,
		body: &str,
		timestamp: &str,
	) -> bool {
		signer::verify_hmac(signature, api_secret, method, path, body, timestamp)
	}

	/// Returns `true` iff `0 <= now - timestamp <= max_age_seconds`.
	pub fn validate_timestamp(&self, timestamp: &str, max_age_seconds: i64) -> bool {
		self.validate_timestamp_at(timestamp, max_age_seconds, OffsetDateTime::now_utc())
	}

	/// [`SignatureValidator::validate_timestamp`] against an explicit clock reading.
	pub fn validate_timestamp_at(
		&self,
		timestamp: &str,
		max_age_seconds: i64,
		now: OffsetDateTime,
	) -> bool {
		let Ok(issued) = timestamp.trim().parse::<i64>() else {
			return false;
		};

		now.unix_timestamp()
			.checked_sub(issued)
			.is_some_and(|age| (0..=max_age_seconds).contains(&age))
	}

	/// Returns `true` when `nonce` is not in `used` and no older than `max_nonce_age_seconds`.
	///
	/// The check never inserts; see [`NonceSet::consume`](crate::auth::NonceSet::consume) for
	/// the atomic claim.
	pub fn validate_nonce(
		&self,
		nonce: u64,
		used: &HashSet<u64>,
		max_nonce_age_seconds: i64,
	) -> bool {
		self.validate_nonce_at(nonce, used, max_nonce_age_seconds, OffsetDateTime::now_utc())
	}

	/// [`SignatureValidator::validate_nonce`] against an explicit clock reading.
	pub fn validate_nonce_at(
		&self,
		nonce: u64,
		used: &HashSet<u64>,
		max_nonce_age_seconds: i64,
		now: OffsetDateTime,
	) -> bool {
		nonce::nonce_is_fresh(nonce, used, max_nonce_age_seconds, now)
	}

	/// Returns `true` when every header in `required` is present (case-insensitive).
	pub fn validate_request_headers(&self, headers: &HeaderMap, required: &[&str]) -> bool {
		required.iter().all(|name| headers.contains_key(*name))
	}

	/// At least 32 characters drawn from `[A-Za-z0-9_-]`.
	pub fn validate_api_key_format(&self, api_key: &str) -> bool {
		api_key.len() >= 32
			&& api_key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
	}

	/// Hex signature of 64, 128, or 130 digits, with an optional `0x` prefix.
	pub fn validate_signature_format(&self, signature: &str) -> bool {
		let digits = signature.strip_prefix("0x").unwrap_or(signature);

		matches!(digits.len(), 64 | 128 | 130) && digits.chars().all(|c| c.is_ascii_hexdigit())
	}

	/// `0x` followed by exactly 40 hex digits.
	pub fn validate_address_format(&self, address: &str) -> bool {
		address
			.strip_prefix("0x")
			.is_some_and(|digits| digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit()))
	}

	/// Recovers the signer of the wallet attestation and compares it with `address`.
	pub fn validate_wallet_signature(
		&self,
		signature: &str,
		address: &str,
		timestamp: &str,
		nonce: u64,
	) -> bool {
		let Ok(claimed) = Address::from_str(address) else {
			return false;
		};
		let hash = eip712::signing_hash(claimed, timestamp, nonce, self.chain_id);

		eip712::recover(signature, &hash).is_some_and(|recovered| recovered == claimed)
	}
}
impl Default for SignatureValidator {
	fn default() -> Self {
		Self::new(DEFAULT_CHAIN_ID)
	}
}
