//! Signing identities.

// self
use crate::{_prelude::*, auth::ApiSecret, error::ConfigError};

/// Polygon mainnet.
pub const DEFAULT_CHAIN_ID: u64 = 137;

/// API key credentials used by the HMAC scheme.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCredentials {
	/// Public API key.
	pub api_key: String,
	/// Shared HMAC secret.
	pub api_secret: ApiSecret,
	/// Passphrase sent alongside every signed request.
	pub api_passphrase: ApiSecret,
}
impl ApiCredentials {
	/// Bundles the three HMAC credentials.
	pub fn new(
		api_key: impl Into<String>,
		api_secret: impl Into<ApiSecret>,
		api_passphrase: impl Into<ApiSecret>,
	) -> Self {
		Self {
			api_key: api_key.into(),
			api_secret: api_secret.into(),
			api_passphrase: api_passphrase.into(),
		}
	}

	/// Returns `true` when none of the credentials is empty.
	pub fn is_complete(&self) -> bool {
		!(self.api_key.is_empty() || self.api_secret.is_empty() || self.api_passphrase.is_empty())
	}
}

/// Credentials and/or a wallet key that requests can be signed with.
///
/// Immutable once handed to a [`RequestSigner`](crate::auth::RequestSigner).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningIdentity {
	credentials: Option<ApiCredentials>,
	private_key: Option<ApiSecret>,
	chain_id: u64,
}
impl SigningIdentity {
	/// Creates an identity with no credentials on [`DEFAULT_CHAIN_ID`].
	pub fn new() -> Self {
		Self { credentials: None, private_key: None, chain_id: DEFAULT_CHAIN_ID }
	}

	/// Attaches HMAC credentials.
	pub fn with_api_credentials(
		mut self,
		api_key: impl Into<String>,
		api_secret: impl Into<ApiSecret>,
		api_passphrase: impl Into<ApiSecret>,
	) -> Self {
		self.credentials = Some(ApiCredentials::new(api_key, api_secret, api_passphrase));

		self
	}

	/// Attaches a hex-encoded secp256k1 private key (with or without `0x`).
	pub fn with_private_key(mut self, private_key: impl Into<ApiSecret>) -> Self {
		self.private_key = Some(private_key.into());

		self
	}

	/// Overrides the chain bound into wallet signatures.
	pub fn with_chain_id(mut self, chain_id: u64) -> Self {
		self.chain_id = chain_id;

		self
	}

	/// HMAC credentials, if any.
	pub fn credentials(&self) -> Option<&ApiCredentials> {
		self.credentials.as_ref()
	}

	/// Wallet key, if any.
	pub fn private_key(&self) -> Option<&ApiSecret> {
		self.private_key.as_ref()
	}

	/// Chain identifier for wallet signatures.
	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	/// Returns the complete HMAC credentials or the configuration error naming what is missing.
	pub fn require_credentials(&self) -> Result<&ApiCredentials, ConfigError> {
		self.credentials.as_ref().filter(|c| c.is_complete()).ok_or(
			ConfigError::MissingCredentials {
				scheme: "HMAC",
				missing: "an API key, secret, and passphrase",
			},
		)
	}
}
impl Default for SigningIdentity {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builder_collects_material() {
		let identity = SigningIdentity::new()
			.with_api_credentials("key", "secret", "pass")
			.with_private_key("0x01")
			.with_chain_id(80_002);

		assert_eq!(identity.chain_id(), 80_002);
		assert!(identity.require_credentials().is_ok());
		assert_eq!(identity.private_key().map(ApiSecret::expose), Some("0x01"));
	}

	#[test]
	fn empty_credentials_are_incomplete() {
		let identity = SigningIdentity::default().with_api_credentials("key", "", "pass");

		assert!(matches!(
			identity.require_credentials(),
			Err(ConfigError::MissingCredentials { scheme: "HMAC", .. })
		));
		assert!(SigningIdentity::default().require_credentials().is_err());
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let identity = SigningIdentity::new().with_api_credentials("key", "hunter2", "open-sesame");
		let rendered = format!("{identity:?}");

		assert!(!rendered.contains("hunter2"));
		assert!(!rendered.contains("open-sesame"));
	}
}
