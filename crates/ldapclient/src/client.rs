//! Directory client implementation.

use crate::{
    config::ClientConfig,
    entry::{DirectoryModification, SearchRequest, SearchResult, SearchScope},
    ldap::Ldap3Connector,
    transport::{Connector, DialPlan, DirectorySession},
    Result,
};
use ldapclient_core::Error;
use tracing::debug;

/// Connection state owned by the client.
enum ConnectionState {
    Disconnected,
    Connected(Box<dyn DirectorySession>),
}

/// LDAP client with a pluggable transport.
///
/// The client owns at most one live session. Operations that touch it take `&mut self`, so a
/// single instance cannot be driven from several tasks at once.
pub struct DirectoryClient {
    config: ClientConfig,
    connector: Box<dyn Connector>,
    state: ConnectionState,
}

impl DirectoryClient {
    /// Creates a client for `host:port` that binds as `bind_dn`.
    ///
    /// No I/O happens until [`connect`](Self::connect) or [`authenticate`](Self::authenticate).
    /// The transport mode is derived from the port, see [`ClientConfig::new`].
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
    ) -> Self {
        Self::from_config(ClientConfig::new(host, port, bind_dn, bind_password))
    }

    /// Creates a client that uses the `ldap3` transport.
    #[must_use]
    pub fn from_config(config: ClientConfig) -> Self {
        Self::with_connector(config, Box::new(Ldap3Connector::new()))
    }

    /// Creates a client over a custom transport.
    #[must_use]
    pub fn with_connector(config: ClientConfig, connector: Box<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            state: ConnectionState::Disconnected,
        }
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns true while a session is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    /// Opens the connection unless one is already open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] for an invalid host or port and [`Error::Connection`] when
    /// the dial or TLS negotiation fails. The client stays disconnected on error.
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        self.config.check()?;
        let plan = DialPlan::from_config(&self.config);
        debug!(
            host = %plan.host,
            port = plan.port,
            mode = plan.mode.label(),
            "connecting to directory"
        );

        let session = self.connector.connect(&plan).await?;
        self.state = ConnectionState::Connected(session);
        Ok(())
    }

    /// Closes the connection if one is open.
    ///
    /// Unbind failures are logged and otherwise ignored.
    pub async fn close(&mut self) {
        let state = std::mem::replace(&mut self.state, ConnectionState::Disconnected);
        if let ConnectionState::Connected(mut session) = state {
            if let Err(err) = session.unbind().await {
                debug!(host = %self.config.host, "unbind failed during close: {err}");
            }
        }
    }

    /// Connects if needed, then binds with the configured credentials.
    ///
    /// # Errors
    ///
    /// Propagates [`connect`](Self::connect) errors and returns [`Error::Auth`] when the server
    /// rejects the credentials.
    pub async fn authenticate(&mut self) -> Result<()> {
        self.connect().await?;

        let credentials = &self.config.credentials;
        let ConnectionState::Connected(session) = &mut self.state else {
            return Err(Error::NotConnected);
        };
        debug!(bind_dn = credentials.bind_dn(), "binding to directory");
        session
            .simple_bind(credentials.bind_dn(), credentials.bind_password())
            .await
    }

    /// Searches the whole subtree below `base`.
    ///
    /// An empty `attributes` slice requests every user attribute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a live connection, otherwise any request error.
    pub async fn search(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[&str],
    ) -> Result<SearchResult> {
        self.search_scoped(base, filter, attributes, SearchScope::Subtree)
            .await
    }

    /// Searches below `base` with the given scope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a live connection, otherwise any request error.
    pub async fn search_scoped(
        &mut self,
        base: &str,
        filter: &str,
        attributes: &[&str],
        scope: SearchScope,
    ) -> Result<SearchResult> {
        let request = SearchRequest::new(base, scope, filter, attributes);
        debug!(base, filter, ?scope, "searching directory");
        self.session()?.search(&request).await
    }

    /// Replaces every value of `attribute` on `dn`; empty `values` removes the attribute.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] without a live connection, otherwise any request error.
    pub async fn replace(&mut self, dn: &str, attribute: &str, values: &[&str]) -> Result<()> {
        self.modify(dn, &[DirectoryModification::replace(attribute, values)])
            .await
    }

    /// Applies `modifications` to `dn` in one modify request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an empty change list, [`Error::NotConnected`]
    /// without a live connection, otherwise any request error.
    pub async fn modify(
        &mut self,
        dn: &str,
        modifications: &[DirectoryModification],
    ) -> Result<()> {
        if modifications.is_empty() {
            return Err(Error::InvalidRequest(format!(
                "modify of `{dn}` carries no changes"
            )));
        }
        debug!(dn, changes = modifications.len(), "modifying directory entry");
        self.session()?.modify(dn, modifications).await
    }

    fn session(&mut self) -> Result<&mut Box<dyn DirectorySession>> {
        match &mut self.state {
            ConnectionState::Connected(session) => Ok(session),
            ConnectionState::Disconnected => Err(Error::NotConnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::LdapEntry;
    use crate::transport::{MockConnector, MockDirectorySession, TransportMode};
    use std::collections::HashMap;

    fn sample_config() -> ClientConfig {
        ClientConfig::new(
            "dir.example.com",
            636,
            "cn=admin,dc=example,dc=com",
            "secret",
        )
    }

    fn closable_session() -> MockDirectorySession {
        let mut session = MockDirectorySession::new();
        session.expect_unbind().returning(|| Ok(()));
        session
    }

    fn sample_entry() -> LdapEntry {
        let mut attributes = HashMap::new();
        attributes.insert("uid".to_string(), vec!["jdoe".to_string()]);
        attributes.insert("cn".to_string(), vec!["John Doe".to_string()]);
        LdapEntry {
            dn: "uid=jdoe,ou=People,dc=example,dc=com".to_string(),
            attributes,
            binary_attributes: HashMap::new(),
        }
    }

    /// Client whose single dial yields `session`.
    fn connected_client(session: MockDirectorySession) -> DirectoryClient {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .times(1)
            .return_once(move |_| Ok(Box::new(session)));
        DirectoryClient::with_connector(sample_config(), Box::new(connector))
    }

    #[tokio::test]
    async fn connect_twice_dials_once() {
        let mut client = connected_client(closable_session());

        client.connect().await.unwrap();
        client.connect().await.unwrap();
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn implicit_tls_dial_for_ldaps_port() {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .withf(|plan: &DialPlan| {
                plan.host == "dir.example.com"
                    && plan.port == 636
                    && matches!(&plan.mode, TransportMode::Tls(params) if params.server_name == "dir.example.com")
            })
            .times(1)
            .return_once(|_| Ok(Box::new(closable_session())));

        let mut client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        assert!(client.config().use_tls);
        assert!(!client.config().start_tls);
        client.connect().await.unwrap();
    }

    #[tokio::test]
    async fn close_then_connect_dials_again() {
        let mut connector = MockConnector::new();
        connector.expect_connect().times(2).returning(|_| {
            let mut session = MockDirectorySession::new();
            session.expect_unbind().times(1).returning(|| Ok(()));
            Ok(Box::new(session))
        });

        let mut client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        client.connect().await.unwrap();
        client.close().await;
        assert!(!client.is_connected());

        client.connect().await.unwrap();
        assert!(client.is_connected());
        client.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent_and_swallows_unbind_errors() {
        let mut session = MockDirectorySession::new();
        session
            .expect_unbind()
            .times(1)
            .returning(|| Err(Error::Request("broken pipe".to_string())));
        let mut client = connected_client(session);

        client.close().await;
        client.connect().await.unwrap();
        client.close().await;
        client.close().await;
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn failed_dial_leaves_client_disconnected() {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|_| Err(Error::Connection("connection refused".to_string())));

        let mut client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn invalid_config_never_dials() {
        let mut connector = MockConnector::new();
        connector.expect_connect().never();

        let config = ClientConfig::new("", 636, "cn=admin", "secret");
        let mut client = DirectoryClient::with_connector(config, Box::new(connector));
        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[tokio::test]
    async fn authenticate_dials_then_binds_once() {
        let mut session = MockDirectorySession::new();
        session
            .expect_simple_bind()
            .withf(|dn: &str, password: &str| {
                dn == "cn=admin,dc=example,dc=com" && password == "secret"
            })
            .times(1)
            .returning(|_, _| Ok(()));
        session.expect_unbind().returning(|| Ok(()));

        let mut client = connected_client(session);
        client.authenticate().await.unwrap();
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn authenticate_propagates_connection_error() {
        let mut connector = MockConnector::new();
        connector
            .expect_connect()
            .returning(|_| Err(Error::Connection("handshake failed".to_string())));

        let mut client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let err = client.authenticate().await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[tokio::test]
    async fn rejected_bind_is_auth_error() {
        let mut session = closable_session();
        session.expect_simple_bind().returning(|_, _| {
            Err(Error::Auth {
                rc: 49,
                message: "invalid credentials".to_string(),
            })
        });

        let mut client = connected_client(session);
        let err = client.authenticate().await.unwrap_err();
        assert_eq!(err.category(), ldapclient_core::ErrorCategory::Auth);
        assert_eq!(err.result_code(), Some(49));
    }

    #[tokio::test]
    async fn search_without_connection_fails() {
        let mut connector = MockConnector::new();
        connector.expect_connect().never();

        let mut client = DirectoryClient::with_connector(sample_config(), Box::new(connector));
        let err = client
            .search("dc=example,dc=com", "(objectClass=*)", &[])
            .await
            .unwrap_err();
        assert_eq!(err, Error::NotConnected);

        let err = client
            .replace("uid=jdoe,dc=example,dc=com", "mail", &[])
            .await
            .unwrap_err();
        assert_eq!(err, Error::NotConnected);
    }

    #[tokio::test]
    async fn search_with_no_attributes_requests_all() {
        let mut session = closable_session();
        session
            .expect_search()
            .withf(|request: &SearchRequest| {
                request.base == "dc=example,dc=com"
                    && request.filter == "(uid=jdoe)"
                    && request.scope == SearchScope::Subtree
                    && request.requests_all_attributes()
                    && request.deref_aliases == crate::entry::DerefAliases::Never
                    && request.size_limit == 0
                    && request.time_limit == 0
                    && !request.types_only
            })
            .times(1)
            .returning(|_| {
                Ok(SearchResult {
                    entries: vec![sample_entry()],
                    referrals: Vec::new(),
                })
            });

        let mut client = connected_client(session);
        client.connect().await.unwrap();
        let result = client
            .search("dc=example,dc=com", "(uid=jdoe)", &[])
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.entries[0].first("cn"), Some("John Doe"));
    }

    #[tokio::test]
    async fn search_with_attributes_requests_only_those() {
        let mut session = closable_session();
        session
            .expect_search()
            .withf(|request: &SearchRequest| request.attributes == ["cn", "mail"])
            .times(1)
            .returning(|_| Ok(SearchResult::default()));

        let mut client = connected_client(session);
        client.connect().await.unwrap();
        let result = client
            .search("dc=example,dc=com", "(uid=jdoe)", &["cn", "mail"])
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn search_scoped_passes_scope_through() {
        let mut sequence = mockall::Sequence::new();
        let mut session = closable_session();
        session
            .expect_search()
            .withf(|request: &SearchRequest| request.scope == SearchScope::Base)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(SearchResult::default()));
        session
            .expect_search()
            .withf(|request: &SearchRequest| request.scope == SearchScope::Subtree)
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Ok(SearchResult::default()));

        let mut client = connected_client(session);
        client.connect().await.unwrap();
        client
            .search_scoped("dc=example,dc=com", "(objectClass=*)", &[], SearchScope::Base)
            .await
            .unwrap();
        client
            .search_scoped(
                "dc=example,dc=com",
                "(objectClass=*)",
                &[],
                SearchScope::Subtree,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn search_rejection_is_request_error() {
        let mut session = closable_session();
        session.expect_search().returning(|_| {
            Err(Error::Rejected {
                operation: "search".to_string(),
                rc: 32,
                message: "no such object".to_string(),
            })
        });

        let mut client = connected_client(session);
        client.connect().await.unwrap();
        let err = client
            .search("ou=Missing,dc=example,dc=com", "(objectClass=*)", &[])
            .await
            .unwrap_err();
        assert_eq!(err.category(), ldapclient_core::ErrorCategory::Request);
    }

    #[tokio::test]
    async fn replace_with_empty_values_removes_attribute() {
        let mut session = closable_session();
        session
            .expect_modify()
            .withf(|dn: &str, modifications: &[DirectoryModification]| {
                dn == "uid=jdoe,ou=People,dc=example,dc=com"
                    && modifications
                        == [DirectoryModification::Replace {
                            attribute: "description".to_string(),
                            values: Vec::new(),
                        }]
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut client = connected_client(session);
        client.connect().await.unwrap();
        client
            .replace("uid=jdoe,ou=People,dc=example,dc=com", "description", &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn replace_sends_all_values() {
        let mut session = closable_session();
        session
            .expect_modify()
            .withf(|_: &str, modifications: &[DirectoryModification]| {
                matches!(
                    modifications,
                    [DirectoryModification::Replace { attribute, values }]
                        if attribute == "mail" && values == &["a@example.com", "b@example.com"]
                )
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut client = connected_client(session);
        client.connect().await.unwrap();
        client
            .replace(
                "uid=jdoe,ou=People,dc=example,dc=com",
                "mail",
                &["a@example.com", "b@example.com"],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn modify_rejects_empty_change_list() {
        let mut client = connected_client(closable_session());
        client.connect().await.unwrap();
        let err = client
            .modify("uid=jdoe,dc=example,dc=com", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
