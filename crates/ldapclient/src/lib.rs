//! Thin LDAP client wrapper.
//!
//! [`DirectoryClient`] picks a transport mode (plaintext, StartTLS or implicit TLS) from its
//! [`ClientConfig`], binds with the configured credentials and forwards search and modify
//! requests to the directory server. Protocol encoding is handled by `ldap3`.

#![deny(missing_docs)]

mod client;
mod config;
mod entry;
mod ldap;
mod transport;

pub use client::DirectoryClient;
pub use config::{ClientConfig, LDAP_PORT, LDAPS_PORT};
pub use entry::{
    escape_filter_value, DerefAliases, DirectoryModification, LdapEntry, SearchRequest,
    SearchResult, SearchScope,
};
pub use ldap::Ldap3Connector;
pub use transport::{Connector, DialPlan, DirectorySession, TlsParams, TransportMode};

pub use ldapclient_core::{BindCredentials, Error, ErrorCategory};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = ldapclient_core::Result<T>;
