//! Transport seam between the client and the LDAP implementation.

use crate::{
    config::ClientConfig,
    entry::{DirectoryModification, SearchRequest, SearchResult},
    Result,
};
use async_trait::async_trait;
use native_tls::{Certificate, Identity};
use std::fmt;

/// TLS parameters for an encrypted transport.
#[derive(Clone)]
pub struct TlsParams {
    /// Name used for SNI and certificate verification.
    pub server_name: String,
    /// Accept any peer certificate and host name.
    pub skip_verify: bool,
    /// Client certificate presented during the handshake.
    pub client_identity: Option<Identity>,
    /// Trusted roots added on top of the system store.
    pub root_certificates: Vec<Certificate>,
}

impl TlsParams {
    fn from_config(config: &ClientConfig, skip_verify: bool) -> Self {
        Self {
            server_name: config.tls_server_name().to_string(),
            skip_verify,
            client_identity: config.client_identity.clone(),
            root_certificates: config.root_certificates.clone(),
        }
    }

    /// Parameters for an upgrade that accepts any peer and presents no client certificate.
    fn unverified(config: &ClientConfig) -> Self {
        Self {
            server_name: config.tls_server_name().to_string(),
            skip_verify: true,
            client_identity: None,
            root_certificates: Vec::new(),
        }
    }
}

impl fmt::Debug for TlsParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsParams")
            .field("server_name", &self.server_name)
            .field("skip_verify", &self.skip_verify)
            .field("client_identity", &self.client_identity.is_some())
            .field("root_certificates", &self.root_certificates.len())
            .finish()
    }
}

/// Wire mode used to reach the server.
#[derive(Debug, Clone)]
pub enum TransportMode {
    /// Plaintext for the whole session.
    Plain,
    /// Plaintext dial upgraded in place with StartTLS.
    StartTls(TlsParams),
    /// TLS from the first byte.
    Tls(TlsParams),
}

impl TransportMode {
    /// URL scheme for the mode.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Plain | Self::StartTls(_) => "ldap",
            Self::Tls(_) => "ldaps",
        }
    }

    /// TLS parameters, if the mode encrypts at any point.
    #[must_use]
    pub const fn tls(&self) -> Option<&TlsParams> {
        match self {
            Self::Plain => None,
            Self::StartTls(params) | Self::Tls(params) => Some(params),
        }
    }

    /// Short label used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::StartTls(_) => "starttls",
            Self::Tls(_) => "tls",
        }
    }
}

/// Everything a [`Connector`] needs to open one connection.
#[derive(Debug, Clone)]
pub struct DialPlan {
    /// Host to dial.
    pub host: String,
    /// Port to dial.
    pub port: u16,
    /// Wire mode.
    pub mode: TransportMode,
}

impl DialPlan {
    /// Selects the transport mode for `config`.
    ///
    /// A plaintext dial is used unless implicit TLS is requested without StartTLS. Unless
    /// [`ClientConfig::verify_starttls`] is set, the StartTLS upgrade skips certificate
    /// verification and ignores the configured client identity and root certificates.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        let mode = if !config.use_tls || config.start_tls {
            if config.start_tls {
                let params = if config.verify_starttls {
                    TlsParams::from_config(config, config.insecure_skip_verify)
                } else {
                    TlsParams::unverified(config)
                };
                TransportMode::StartTls(params)
            } else {
                TransportMode::Plain
            }
        } else {
            TransportMode::Tls(TlsParams::from_config(
                config,
                config.insecure_skip_verify,
            ))
        };

        Self {
            host: config.host.clone(),
            port: config.port,
            mode,
        }
    }
}

/// One live connection to a directory server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectorySession: Send {
    /// Performs a simple bind.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    /// Runs a search.
    async fn search(&mut self, request: &SearchRequest) -> Result<SearchResult>;
    /// Applies modifications to one entry.
    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()>;
    /// Ends the session.
    async fn unbind(&mut self) -> Result<()>;
}

/// Opens [`DirectorySession`]s.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    /// Dials the server described by `plan`.
    async fn connect(&self, plan: &DialPlan) -> Result<Box<dyn DirectorySession>>;
}
