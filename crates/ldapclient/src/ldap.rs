//! `ldap3`-backed transport.

use crate::{
    entry::{DirectoryModification, LdapEntry, SearchRequest, SearchResult},
    transport::{Connector, DialPlan, DirectorySession, TlsParams, TransportMode},
    Result,
};
use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, LdapError, Mod, SearchEntry, SearchOptions};
use ldapclient_core::Error;
use native_tls::TlsConnector;
use std::collections::HashSet;
use tokio::net::TcpStream;
use tracing::{debug, warn};
use url::Url;

/// Real connector backed by `ldap3`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ldap3Connector;

impl Ldap3Connector {
    /// Creates a new connector instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for Ldap3Connector {
    async fn connect(&self, plan: &DialPlan) -> Result<Box<dyn DirectorySession>> {
        let mut settings = LdapConnSettings::new();
        let mut url_host = plan.host.as_str();

        if let Some(tls) = plan.mode.tls() {
            if tls.skip_verify {
                warn!(
                    host = %plan.host,
                    mode = plan.mode.label(),
                    "TLS certificate verification disabled for directory connection"
                );
            }
            settings = settings
                .set_connector(build_tls_connector(tls)?)
                .set_no_tls_verify(tls.skip_verify);

            // ldap3 takes the TLS domain from the URL, so dial the host ourselves and let the
            // URL carry the override.
            if tls.server_name != plan.host {
                let stream = TcpStream::connect((plan.host.as_str(), plan.port))
                    .await
                    .and_then(TcpStream::into_std)
                    .map_err(|err| {
                        Error::Connection(format!(
                            "failed to dial {}:{}: {err}",
                            plan.host, plan.port
                        ))
                    })?;
                settings = settings.set_std_stream(stream);
                url_host = tls.server_name.as_str();
            }
        }

        if matches!(plan.mode, TransportMode::StartTls(_)) {
            settings = settings.set_starttls(true);
        }

        let url = ldap_url(plan.mode.scheme(), url_host, plan.port)?;
        debug!(url = %url, host = %plan.host, mode = plan.mode.label(), "dialing directory server");

        let (conn, ldap) = LdapConnAsync::with_settings(settings, url.as_str())
            .await
            .map_err(connection_error)?;
        ldap3::drive!(conn);

        Ok(Box::new(Ldap3Session { inner: ldap }))
    }
}

struct Ldap3Session {
    inner: ldap3::Ldap,
}

#[async_trait]
impl DirectorySession for Ldap3Session {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = self
            .inner
            .simple_bind(dn, password)
            .await
            .map_err(request_error)?;
        if result.rc != 0 {
            return Err(Error::Auth {
                rc: result.rc,
                message: result.text,
            });
        }
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<SearchResult> {
        let options = SearchOptions::new()
            .deref(request.deref_aliases.into())
            .sizelimit(request.size_limit)
            .timelimit(request.time_limit)
            .typesonly(request.types_only);

        let ldap3::SearchResult(entries, result) = self
            .inner
            .with_search_options(options)
            .search(
                &request.base,
                request.scope.into(),
                &request.filter,
                request.attributes.clone(),
            )
            .await
            .map_err(request_error)?;
        ensure_success("search", &result)?;

        let entries = entries
            .into_iter()
            .filter(|entry| !entry.is_ref() && !entry.is_intermediate())
            .map(SearchEntry::construct)
            .map(|entry| LdapEntry {
                dn: entry.dn,
                attributes: entry.attrs,
                binary_attributes: entry.bin_attrs,
            })
            .collect();

        Ok(SearchResult {
            entries,
            referrals: result.refs,
        })
    }

    async fn modify(&mut self, dn: &str, modifications: &[DirectoryModification]) -> Result<()> {
        let mods = modifications
            .iter()
            .map(|m| match m {
                DirectoryModification::Add { attribute, values } => {
                    Mod::Add(attribute.clone(), value_set(values))
                }
                DirectoryModification::Delete { attribute, values } => {
                    Mod::Delete(attribute.clone(), value_set(values))
                }
                DirectoryModification::Replace { attribute, values } => {
                    Mod::Replace(attribute.clone(), value_set(values))
                }
            })
            .collect::<Vec<_>>();

        let result = self
            .inner
            .modify(dn, mods)
            .await
            .map_err(request_error)?;
        ensure_success("modify", &result)
    }

    async fn unbind(&mut self) -> Result<()> {
        self.inner.unbind().await.map_err(request_error)
    }
}

fn build_tls_connector(params: &TlsParams) -> Result<TlsConnector> {
    let mut builder = TlsConnector::builder();
    if params.skip_verify {
        builder
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true);
    }
    for certificate in &params.root_certificates {
        builder.add_root_certificate(certificate.clone());
    }
    if let Some(identity) = &params.client_identity {
        builder.identity(identity.clone());
    }
    builder
        .build()
        .map_err(|err| Error::ConfigError(format!("failed to construct TLS connector: {err}")))
}

/// Builds the connection URL, bracketing IPv6 literals.
fn ldap_url(scheme: &str, host: &str, port: u16) -> Result<Url> {
    let url = if host.contains(':') && !host.starts_with('[') {
        format!("{scheme}://[{host}]:{port}")
    } else {
        format!("{scheme}://{host}:{port}")
    };
    Ok(Url::parse(&url)?)
}

fn value_set(values: &[String]) -> HashSet<String> {
    values.iter().cloned().collect()
}

fn ensure_success(operation: &str, result: &ldap3::LdapResult) -> Result<()> {
    if result.rc == 0 {
        return Ok(());
    }
    Err(Error::Rejected {
        operation: operation.to_string(),
        rc: result.rc,
        message: result.text.clone(),
    })
}

fn connection_error(err: LdapError) -> Error {
    Error::Connection(err.to_string())
}

fn request_error(err: LdapError) -> Error {
    Error::Request(err.to_string())
}
