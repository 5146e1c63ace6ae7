//! EIP-712 typed data for wallet attestations.

// crates.io
use alloy_primitives::{Address, B256, Signature, U256};
use alloy_sol_types::{SolStruct, eip712_domain};

/// Statement every wallet signature attests to.
pub const ATTESTATION_MESSAGE: &str = "This message attests that I control the given wallet";

mod typed {
	alloy_sol_types::sol! {
		struct ClobAuth {
			address address;
			string timestamp;
			uint256 nonce;
			string message;
		}
	}
}

/// EIP-712 digest of the attestation for `(address, timestamp, nonce)` on `chain_id`.
pub(crate) fn signing_hash(address: Address, timestamp: &str, nonce: u64, chain_id: u64) -> B256 {
	let domain = eip712_domain! {
		name: "ClobAuthDomain",
		version: "1",
		chain_id: chain_id,
	};
	let attestation = typed::ClobAuth {
		address,
		timestamp: timestamp.to_owned(),
		nonce: U256::from(nonce),
		message: ATTESTATION_MESSAGE.to_owned(),
	};

	attestation.eip712_signing_hash(&domain)
}

/// Renders a signature as `0x` + `r` + `s` + `v` (27/28), 132 characters in total.
pub(crate) fn encode_signature(signature: &Signature) -> String {
	format!("0x{}", hex::encode(signature.as_bytes()))
}

/// Recovers the address that produced `signature` over `hash`.
pub(crate) fn recover(signature: &str, hash: &B256) -> Option<Address> {
	let raw = hex::decode(signature.strip_prefix("0x").unwrap_or(signature)).ok()?;
	let signature = Signature::from_raw(&raw).ok()?;

	signature.recover_address_from_prehash(hash).ok()
}
