//! Request authentication: HMAC and EIP-712 signing, validation, and replay protection.
//!
//! - [`RequestSigner`] produces the `L2-API-*` (HMAC) or `POLY_*` (wallet) header sets.
//! - [`SignatureValidator`] is its inverse plus cheap syntactic pre-filters.
//! - [`AuthMiddleware`] detects the scheme on a request, validates it fail-closed, and owns the
//!   [`NonceSet`] that makes wallet nonces single-use.
//! - [`AuthSession`] is an [`HttpTransport`](crate::http::HttpTransport) that signs every
//!   outbound request transparently.

mod eip712;
mod headers;
mod identity;
mod middleware;
mod nonce;
mod secret;
mod session;
mod signer;
mod validator;

pub use eip712::ATTESTATION_MESSAGE;
pub use headers::*;
pub use identity::*;
pub use middleware::*;
pub use nonce::*;
pub use secret::*;
pub use session::*;
pub use signer::*;
pub use validator::*;

pub use alloy_primitives::Address;
