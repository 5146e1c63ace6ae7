//! Authentication header sets and scheme detection.

// crates.io
use ::http::header::{HeaderMap, HeaderName, HeaderValue};
// self
use crate::{_prelude::*, auth::SignatureValidator, error::ConfigError};

/// HMAC scheme: API key header.
pub const L2_API_KEY: &str = "L2-API-KEY";
/// HMAC scheme: hex signature header.
pub const L2_API_SIGNATURE: &str = "L2-API-SIGNATURE";
/// HMAC scheme: unix timestamp header.
pub const L2_API_TIMESTAMP: &str = "L2-API-TIMESTAMP";
/// HMAC scheme: passphrase header.
pub const L2_API_PASSPHRASE: &str = "L2-API-PASSPHRASE";
/// Wallet scheme: signer address header.
pub const POLY_ADDRESS: &str = "POLY_ADDRESS";
/// Wallet scheme: EIP-712 signature header.
pub const POLY_SIGNATURE: &str = "POLY_SIGNATURE";
/// Wallet scheme: unix timestamp header.
pub const POLY_TIMESTAMP: &str = "POLY_TIMESTAMP";
/// Wallet scheme: microsecond nonce header.
pub const POLY_NONCE: &str = "POLY_NONCE";

/// Supported authentication schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthScheme {
	/// HMAC-SHA256 over the canonical request string.
	#[serde(rename = "hmac")]
	Hmac,
	/// EIP-712 wallet attestation.
	#[serde(rename = "eip712")]
	Wallet,
}
impl AuthScheme {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Hmac => "hmac",
			Self::Wallet => "eip712",
		}
	}

	/// Headers that must all be present for this scheme.
	pub const fn required_headers(self) -> &'static [&'static str; 4] {
		match self {
			Self::Hmac => &[L2_API_KEY, L2_API_SIGNATURE, L2_API_TIMESTAMP, L2_API_PASSPHRASE],
			Self::Wallet => &[POLY_ADDRESS, POLY_SIGNATURE, POLY_TIMESTAMP, POLY_NONCE],
		}
	}

	/// Returns `true` when every required header is present.
	pub fn is_present(self, headers: &HeaderMap) -> bool {
		SignatureValidator::default().validate_request_headers(headers, self.required_headers())
	}

	/// Detects the scheme from complete header sets; HMAC wins when both are complete.
	pub fn detect(headers: &HeaderMap) -> Option<Self> {
		[Self::Hmac, Self::Wallet].into_iter().find(|scheme| scheme.is_present(headers))
	}
}
impl Display for AuthScheme {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for AuthScheme {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"hmac" => Ok(Self::Hmac),
			"eip712" | "wallet" => Ok(Self::Wallet),
			_ => Err(ConfigError::UnknownScheme { scheme: s.to_owned() }),
		}
	}
}

/// Header set produced by one signing operation.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeaders {
	scheme: AuthScheme,
	entries: Vec<(&'static str, String)>,
}
impl AuthHeaders {
	pub(crate) fn new(scheme: AuthScheme, entries: Vec<(&'static str, String)>) -> Self {
		Self { scheme, entries }
	}

	/// Scheme these headers belong to.
	pub fn scheme(&self) -> AuthScheme {
		self.scheme
	}

	/// Looks up a header value by name (case-insensitive).
	pub fn get(&self, name: &str) -> Option<&str> {
		self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
	}

	/// Iterates over `(name, value)` pairs in wire order.
	pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
		self.entries.iter().map(|(n, v)| (*n, v.as_str()))
	}

	/// Number of headers in the set.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` for an empty set.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Inserts every header into `headers`, replacing existing values.
	pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), ConfigError> {
		for &(name, ref value) in &self.entries {
			let header = HeaderName::from_bytes(name.as_bytes()).map_err(::http::Error::from)?;
			let mut value = HeaderValue::from_str(value)
				.map_err(|source| ConfigError::InvalidHeaderValue { name, source })?;

			if matches!(name, L2_API_PASSPHRASE | L2_API_SIGNATURE | POLY_SIGNATURE) {
				value.set_sensitive(true);
			}

			headers.insert(header, value);
		}

		Ok(())
	}
}
impl Debug for AuthHeaders {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut map = f.debug_map();

		for (name, value) in &self.entries {
			if *name == L2_API_PASSPHRASE {
				map.entry(name, &"<redacted>");
			} else {
				map.entry(name, value);
			}
		}

		map.finish()
	}
}
