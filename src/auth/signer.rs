//! Outbound request signing.

// crates.io
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use hmac::{Hmac, Mac};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	auth::{
		Address, ApiCredentials, AuthHeaders, AuthScheme, L2_API_KEY, L2_API_PASSPHRASE,
		L2_API_SIGNATURE, L2_API_TIMESTAMP, POLY_ADDRESS, POLY_NONCE, POLY_SIGNATURE,
		POLY_TIMESTAMP, SigningIdentity, eip712, nonce,
	},
	error::ConfigError,
	obs::{OpTimer, Operation},
};

pub(crate) type HmacSha256 = Hmac<Sha256>;

const MISSING_HMAC: ConfigError = ConfigError::MissingCredentials {
	scheme: "HMAC",
	missing: "an API key, secret, and passphrase",
};
const MISSING_WALLET_KEY: ConfigError =
	ConfigError::MissingCredentials { scheme: "EIP-712", missing: "a private key" };

/// Canonical HMAC payload: `timestamp + METHOD + path + body`.
pub(crate) fn hmac_message(timestamp: &str, method: &str, path: &str, body: &str) -> String {
	format!("{timestamp}{}{path}{body}", method.to_ascii_uppercase())
}

pub(crate) fn hmac_for(secret: &str, message: &str) -> Option<HmacSha256> {
	let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;

	mac.update(message.as_bytes());

	Some(mac)
}

pub(crate) fn unix_seconds() -> String {
	OffsetDateTime::now_utc().unix_timestamp().to_string()
}

/// Computes authentication headers for outbound requests.
///
/// The wallet key is parsed once at construction; the derived address and all credentials
/// are immutable afterwards, so one signer can be shared across tasks without locking.
pub struct RequestSigner {
	credentials: Option<ApiCredentials>,
	wallet: Option<PrivateKeySigner>,
	chain_id: u64,
}
impl RequestSigner {
	/// Builds a signer from `identity`, parsing its private key if present.
	pub fn new(identity: &SigningIdentity) -> Result<Self, ConfigError> {
		let wallet = identity
			.private_key()
			.map(|key| {
				let hex = key.expose();

				PrivateKeySigner::from_str(hex.strip_prefix("0x").unwrap_or(hex))
					.map_err(ConfigError::invalid_private_key)
			})
			.transpose()?;

		Ok(Self { credentials: identity.credentials().cloned(), wallet, chain_id: identity.chain_id() })
	}

	/// Address derived from the private key, if one was supplied.
	pub fn signing_address(&self) -> Option<Address> {
		self.wallet.as_ref().map(|wallet| wallet.address())
	}

	/// Chain bound into wallet signatures.
	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	/// Returns `true` when the material required by `scheme` is available.
	pub fn supports(&self, scheme: AuthScheme) -> bool {
		match scheme {
			AuthScheme::Hmac => self.credentials.as_ref().is_some_and(ApiCredentials::is_complete),
			AuthScheme::Wallet => self.wallet.is_some(),
		}
	}

	/// Fails with [`ConfigError::MissingCredentials`] unless `scheme` is supported.
	pub fn require(&self, scheme: AuthScheme) -> Result<(), ConfigError> {
		if self.supports(scheme) {
			return Ok(());
		}

		Err(match scheme {
			AuthScheme::Hmac => MISSING_HMAC,
			AuthScheme::Wallet => MISSING_WALLET_KEY,
		})
	}

	/// Signs a request with HMAC-SHA256, returning the four `L2-API-*` headers.
	///
	/// `timestamp` defaults to the current unix time in seconds.
	pub fn sign_hmac(
		&self,
		method: &str,
		path: &str,
		body: &str,
		timestamp: Option<&str>,
	) -> Result<AuthHeaders, ConfigError> {
		let mut timer = OpTimer::start(Operation::Sign, AuthScheme::Hmac.as_str());

		let credentials =
			self.credentials.as_ref().filter(|c| c.is_complete()).ok_or(MISSING_HMAC)?;
		let timestamp = timestamp.map_or_else(unix_seconds, str::to_owned);
		let message = hmac_message(&timestamp, method, path, body);
		let mac = hmac_for(credentials.api_secret.expose(), &message)
			.ok_or_else(|| ConfigError::Signing { source: "HMAC key was rejected".into() })?;
		let signature = hex::encode(mac.finalize().into_bytes());

		timer.succeed();

		Ok(AuthHeaders::new(
			AuthScheme::Hmac,
			vec![
				(L2_API_KEY, credentials.api_key.clone()),
				(L2_API_SIGNATURE, signature),
				(L2_API_TIMESTAMP, timestamp),
				(L2_API_PASSPHRASE, credentials.api_passphrase.expose().to_owned()),
			],
		))
	}

	/// HMAC headers stamped with the current time.
	pub fn create_auth_headers(
		&self,
		method: &str,
		path: &str,
		body: &str,
	) -> Result<AuthHeaders, ConfigError> {
		self.sign_hmac(method, path, body, None)
	}

	/// Signs the wallet attestation for `(address, timestamp, nonce)`.
	///
	/// `timestamp` defaults to the current unix time in seconds and `nonce` to the current
	/// time in microseconds. The result is a `0x`-prefixed 65-byte signature.
	pub fn create_auth_signature(
		&self,
		address: Address,
		timestamp: Option<&str>,
		nonce: Option<u64>,
	) -> Result<String, ConfigError> {
		let mut timer = OpTimer::start(Operation::Sign, AuthScheme::Wallet.as_str());
		let wallet = self.wallet.as_ref().ok_or(MISSING_WALLET_KEY)?;
		let timestamp = timestamp.map_or_else(unix_seconds, str::to_owned);
		let nonce = nonce.unwrap_or_else(|| {
			u64::try_from(nonce::unix_micros(OffsetDateTime::now_utc())).unwrap_or_default()
		});
		let hash = eip712::signing_hash(address, &timestamp, nonce, self.chain_id);
		let signature = wallet.sign_hash_sync(&hash).map_err(ConfigError::signing)?;

		timer.succeed();

		Ok(eip712::encode_signature(&signature))
	}

	/// Builds the four `POLY_*` headers for the signing address.
	pub fn wallet_headers(
		&self,
		timestamp: Option<&str>,
		nonce: Option<u64>,
	) -> Result<AuthHeaders, ConfigError> {
		let address = self.signing_address().ok_or(MISSING_WALLET_KEY)?;
		let timestamp = timestamp.map_or_else(unix_seconds, str::to_owned);
		let nonce = nonce.unwrap_or_else(|| {
			u64::try_from(nonce::unix_micros(OffsetDateTime::now_utc())).unwrap_or_default()
		});
		let signature = self.create_auth_signature(address, Some(&timestamp), Some(nonce))?;

		Ok(AuthHeaders::new(
			AuthScheme::Wallet,
			vec![
				(POLY_ADDRESS, address.to_checksum(None)),
				(POLY_SIGNATURE, signature),
				(POLY_TIMESTAMP, timestamp),
				(POLY_NONCE, nonce.to_string()),
			],
		))
	}
}
impl Debug for RequestSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestSigner")
			.field("api_key", &self.credentials.as_ref().map(|c| c.api_key.as_str()))
			.field("signing_address", &self.signing_address())
			.field("chain_id", &self.chain_id)
			.finish()
	}
}

/// Constant-time HMAC check shared by the signer and the validator.
///
/// The presented signature is hex-decoded (case-insensitively) and compared with
/// [`Mac::verify_slice`]; malformed hex never matches.
pub(crate) fn verify_hmac(
	signature: &str,
	secret: &str,
	method: &str,
	path: &str,
	body: &str,
	timestamp: &str,
) -> bool {
	let Ok(presented) = hex::decode(signature) else {
		return false;
	};

	hmac_for(secret, &hmac_message(timestamp, method, path, body))
		.is_some_and(|mac| mac.verify_slice(&presented).is_ok())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	// Well-known development key (Hardhat account #0).
	const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn hmac_signer() -> RequestSigner {
		RequestSigner::new(&SigningIdentity::new().with_api_credentials("key", "secret", "pass"))
			.expect("HMAC identity should build.")
	}

	#[test]
	fn hmac_signature_is_deterministic_hex() {
		let signer = hmac_signer();
		let headers = signer
			.sign_hmac("get", "/orders?market=1", "", Some("1700000000"))
			.expect("Complete credentials should sign.");
		let signature = headers.get(L2_API_SIGNATURE).expect("Signature header should exist.");

		assert_eq!(headers.len(), 4);
		assert_eq!(headers.get(L2_API_KEY), Some("key"));
		assert_eq!(headers.get(L2_API_TIMESTAMP), Some("1700000000"));
		assert_eq!(headers.get(L2_API_PASSPHRASE), Some("pass"));
		assert_eq!(signature.len(), 64);
		assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
		assert_eq!(
			Some(signature),
			signer
				.sign_hmac("GET", "/orders?market=1", "", Some("1700000000"))
				.expect("Complete credentials should sign.")
				.get(L2_API_SIGNATURE)
		);
	}

	#[test]
	fn hmac_requires_every_credential() {
		let signer = RequestSigner::new(&SigningIdentity::new().with_api_credentials("key", "", "p"))
			.expect("Incomplete credentials still build a signer.");
		let err = signer.sign_hmac("GET", "/", "", None).expect_err("Empty secret must fail.");

		assert!(matches!(err, ConfigError::MissingCredentials { scheme: "HMAC", .. }));
	}

	#[test]
	fn verify_accepts_only_the_exact_request() {
		let signer = hmac_signer();
		let headers = signer
			.sign_hmac("POST", "/order", "{\"size\":1}", Some("1700000000"))
			.expect("Complete credentials should sign.");
		let signature = headers.get(L2_API_SIGNATURE).expect("Signature header should exist.");

		assert!(verify_hmac(signature, "secret", "post", "/order", "{\"size\":1}", "1700000000"));
		assert!(verify_hmac(
			&signature.to_ascii_uppercase(),
			"secret",
			"POST",
			"/order",
			"{\"size\":1}",
			"1700000000"
		));
		assert!(!verify_hmac(signature, "secret", "POST", "/order", "{\"size\":2}", "1700000000"));
		assert!(!verify_hmac(signature, "other", "POST", "/order", "{\"size\":1}", "1700000000"));
		assert!(!verify_hmac("not-hex", "secret", "POST", "/order", "{\"size\":1}", "1700000000"));
	}

	#[test]
	fn wallet_signature_has_canonical_shape() {
		let signer = RequestSigner::new(&SigningIdentity::new().with_private_key(DEV_KEY))
			.expect("Valid private key should build.");
		let address = signer.signing_address().expect("Private key should derive an address.");

		assert_eq!(
			address.to_checksum(None),
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
		);

		let signature = signer
			.create_auth_signature(address, Some("1700000000"), Some(42))
			.expect("Wallet signing should succeed.");

		assert_eq!(signature.len(), 132);
		assert!(signature.starts_with("0x"));

		let hash = eip712::signing_hash(address, "1700000000", 42, 137);

		assert_eq!(eip712::recover(&signature, &hash), Some(address));
	}

	#[test]
	fn wallet_requires_a_private_key() {
		let signer = hmac_signer();

		assert_eq!(signer.signing_address(), None);
		assert!(matches!(
			signer.create_auth_signature(Address::ZERO, None, None),
			Err(ConfigError::MissingCredentials { scheme: "EIP-712", .. })
		));
		assert!(signer.wallet_headers(None, None).is_err());
	}

	#[test]
	fn malformed_private_key_is_rejected() {
		assert!(matches!(
			RequestSigner::new(&SigningIdentity::new().with_private_key("0xnot-a-key")),
			Err(ConfigError::InvalidPrivateKey { .. })
		));
	}

	#[test]
	fn debug_output_hides_secrets() {
		let rendered = format!("{:?}", hmac_signer());

		assert!(rendered.contains("key"));
		assert!(!rendered.contains("secret"));
		assert!(!rendered.contains("pass"));
	}
}
