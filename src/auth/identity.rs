//! Authenticated identity
//!
//! Derived once per connection from a verified credential and immutable for
//! the connection's lifetime.

use serde::{Deserialize, Serialize};

/// The authenticated subject behind a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Subject id (user or device id)
    pub id: String,

    /// Role name (e.g. "admin", "operator", "device")
    pub role: String,

    /// Permission strings granted by the token issuer
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Identity {
    /// Create a new identity
    pub fn new(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: role.into(),
            permissions: Vec::new(),
        }
    }

    /// Check whether a permission was granted
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.id, self.role)
    }
}
