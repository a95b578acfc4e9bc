//! Configuration types for directory client usage.

use crate::Result;
use ldapclient_core::{BindCredentials, Error};
use native_tls::{Certificate, Identity};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;
use validator::Validate;

/// Standard LDAP port; selects StartTLS by default.
pub const LDAP_PORT: u16 = 389;
/// Standard LDAPS port.
pub const LDAPS_PORT: u16 = 636;

/// Configuration for one directory client.
///
/// Fields are public so callers can override the derived transport flags after construction.
/// The certificate fields only take effect for the TLS transport modes.
#[derive(Validate)]
pub struct ClientConfig {
    /// Directory server host name or address
    #[validate(length(min = 1))]
    pub host: String,

    /// Directory server port
    #[validate(range(min = 1))]
    pub port: u16,

    /// Identity used by [`crate::DirectoryClient::authenticate`]
    pub credentials: BindCredentials,

    /// Name presented for SNI and certificate verification (defaults to `host`)
    pub server_name: Option<String>,

    /// Encrypt from the first byte (LDAPS)
    pub use_tls: bool,

    /// Dial plaintext and upgrade with the StartTLS extended operation
    pub start_tls: bool,

    /// Skip peer certificate verification for implicit TLS
    pub insecure_skip_verify: bool,

    /// Verify the peer certificate during a StartTLS upgrade
    pub verify_starttls: bool,

    /// Client certificate and key presented during the handshake
    pub client_identity: Option<Identity>,

    /// Additional trusted root certificates
    pub root_certificates: Vec<Certificate>,
}

impl ClientConfig {
    /// Creates a configuration, deriving the transport flags from the port.
    ///
    /// Port 389 selects StartTLS; every other port selects implicit TLS.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
    ) -> Self {
        let start_tls = port == LDAP_PORT;
        Self {
            host: host.into(),
            port,
            credentials: BindCredentials::new(bind_dn, bind_password),
            server_name: None,
            use_tls: !start_tls,
            start_tls,
            insecure_skip_verify: false,
            verify_starttls: false,
            client_identity: None,
            root_certificates: Vec::new(),
        }
    }

    /// Returns the name used for SNI and certificate verification.
    #[must_use]
    pub fn tls_server_name(&self) -> &str {
        self.server_name.as_deref().unwrap_or(&self.host)
    }

    /// Returns the `host:port` address of the server.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Overrides the TLS server name.
    #[must_use]
    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    /// Enables or disables implicit TLS.
    #[must_use]
    pub const fn with_tls(mut self, enabled: bool) -> Self {
        self.use_tls = enabled;
        self
    }

    /// Enables or disables the StartTLS upgrade.
    #[must_use]
    pub const fn with_starttls(mut self, enabled: bool) -> Self {
        self.start_tls = enabled;
        self
    }

    /// Disables peer certificate verification for implicit TLS.
    #[must_use]
    pub const fn with_insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Enables peer certificate verification during StartTLS upgrades.
    ///
    /// Off by default, in which case the upgraded channel accepts any certificate.
    #[must_use]
    pub const fn with_starttls_verification(mut self, verify: bool) -> Self {
        self.verify_starttls = verify;
        self
    }

    /// Sets the client certificate presented during the handshake.
    #[must_use]
    pub fn with_client_identity(mut self, identity: Identity) -> Self {
        self.client_identity = Some(identity);
        self
    }

    /// Adds a trusted root certificate.
    #[must_use]
    pub fn with_root_certificate(mut self, certificate: Certificate) -> Self {
        self.root_certificates.push(certificate);
        self
    }

    /// Adds a trusted root certificate from PEM bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the PEM cannot be parsed.
    pub fn with_root_certificate_pem(self, pem: &[u8]) -> Result<Self> {
        let certificate = Certificate::from_pem(pem)
            .map_err(|err| Error::ConfigError(format!("invalid root certificate: {err}")))?;
        Ok(self.with_root_certificate(certificate))
    }

    /// Adds a trusted root certificate read from a PEM file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the file cannot be read or parsed.
    pub fn with_root_certificate_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading root certificate from {}", path.display());
        let pem = fs::read(path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read root certificate {}: {err}",
                path.display()
            ))
        })?;
        self.with_root_certificate_pem(&pem)
    }

    /// Sets the client identity from a PEM certificate chain and a PKCS#8 PEM key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the certificate or key is invalid.
    pub fn with_client_identity_pem(self, cert_pem: &[u8], key_pem: &[u8]) -> Result<Self> {
        let identity = Identity::from_pkcs8(cert_pem, key_pem)
            .map_err(|err| Error::ConfigError(format!("invalid client identity: {err}")))?;
        Ok(self.with_client_identity(identity))
    }

    /// Sets the client identity from a DER-encoded PKCS#12 archive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the archive cannot be decoded with `password`.
    pub fn with_client_identity_pkcs12(self, der: &[u8], password: &str) -> Result<Self> {
        let identity = Identity::from_pkcs12(der, password)
            .map_err(|err| Error::ConfigError(format!("invalid client identity: {err}")))?;
        Ok(self.with_client_identity(identity))
    }

    /// Validates the connection parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the host is empty or the port is zero.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(Error::from)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("credentials", &self.credentials)
            .field("server_name", &self.server_name)
            .field("use_tls", &self.use_tls)
            .field("start_tls", &self.start_tls)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("verify_starttls", &self.verify_starttls)
            .field("client_identity", &self.client_identity.is_some())
            .field("root_certificates", &self.root_certificates.len())
            .finish()
    }
}
