//! Bind credentials.
//!
//! The bind identity is the DN and password used for the simple bind that establishes who
//! subsequent operations run as.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// DN and password used for a simple bind.
pub struct BindCredentials {
    /// Bind distinguished name (empty for an anonymous bind)
    pub bind_dn: String,

    /// Bind password
    pub bind_password: SecretString,
}

impl BindCredentials {
    /// Create new bind credentials.
    ///
    /// # Arguments
    ///
    /// * `bind_dn` - The distinguished name to bind as
    /// * `bind_password` - The password for `bind_dn`
    #[must_use]
    pub fn new(bind_dn: impl Into<String>, bind_password: impl Into<String>) -> Self {
        Self {
            bind_dn: bind_dn.into(),
            bind_password: SecretString::from(bind_password.into()),
        }
    }

    /// Get the bind DN.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Get the bind password.
    #[must_use]
    pub fn bind_password(&self) -> &str {
        self.bind_password.expose_secret()
    }

    /// Returns true when the DN is empty, i.e. the bind is anonymous.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.bind_dn.is_empty()
    }
}

impl fmt::Debug for BindCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindCredentials")
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"[REDACTED]")
            .finish()
    }
}
