//! Bearer token verification
//!
//! The token issuer is an external collaborator; this module only holds the
//! verification side of its contract: HS256-signed JWTs carrying subject id,
//! role, permission list and expiry.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::identity::Identity;

/// Authentication failure, refusing the handshake
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No credential was supplied with the handshake
    #[error("authentication token required")]
    MissingToken,
    /// Credential is not a well-formed token
    #[error("malformed authentication token")]
    Malformed,
    /// Credential expired
    #[error("authentication token expired")]
    Expired,
    /// Signature does not verify against the issuer's secret
    #[error("invalid authentication token")]
    InvalidSignature,
}

/// Claims carried by issuer tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id
    pub id: String,
    /// Role name
    pub role: String,
    /// Granted permissions
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Expiry (seconds since epoch)
    pub exp: u64,
}

/// Verifies an opaque bearer credential into an [`Identity`]
pub trait TokenVerifier: Send + Sync {
    /// Verify a credential; any failure refuses admission
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// HS256 shared-secret verifier matching the external issuer's contract
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Create a verifier for the given shared secret
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature
                | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
                _ => AuthError::Malformed,
            },
        )?;

        Ok(Identity {
            id: data.claims.id,
            role: data.claims.role,
            permissions: data.claims.permissions,
        })
    }
}

/// Pull the bearer credential out of handshake metadata
///
/// Checks the `Authorization` header first, then the `token` query parameter.
pub fn extract_token<'a>(
    authorization: Option<&'a str>,
    query_token: Option<&'a str>,
) -> Result<&'a str, AuthError> {
    if let Some(header) = authorization {
        return header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Malformed);
    }

    query_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}
