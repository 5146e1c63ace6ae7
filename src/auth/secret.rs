//! Credential material: API secrets, passphrases, and wallet private keys.

// self
use crate::_prelude::*;

/// API secret, passphrase, or private key that never shows up in `Debug` or `Display` output.
///
/// Surrounding whitespace is stripped on construction, so values read from env files or
/// terminals sign the same way as their trimmed form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub struct ApiSecret(String);
impl ApiSecret {
	/// Wraps credential material, trimming surrounding whitespace.
	pub fn new(value: impl Into<String>) -> Self {
		let mut value = value.into();
		let trimmed = value.trim();

		if trimmed.len() != value.len() {
			value = trimmed.to_owned();
		}

		Self(value)
	}

	/// Raw credential for HMAC keys and header values; never log it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when nothing but whitespace was supplied.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<&str> for ApiSecret {
	fn from(value: &str) -> Self {
		Self::new(value)
	}
}
impl From<String> for ApiSecret {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
impl Debug for ApiSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ApiSecret(<redacted>)")
	}
}
impl Display for ApiSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
