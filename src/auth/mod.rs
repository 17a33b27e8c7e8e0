//! Handshake authentication
//!
//! Every connection presents an opaque bearer credential at upgrade time.
//! The verifier turns it into an [`Identity`] or refuses admission; no
//! partially-authenticated connection state ever exists.

pub mod identity;
pub mod verifier;

pub use identity::Identity;
pub use verifier::{extract_token, AuthError, Claims, JwtVerifier, TokenVerifier};
