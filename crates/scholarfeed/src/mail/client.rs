//! IMAP client: TLS connect, password login, read-only folder access.

use std::future::Future;
use std::time::Duration;

use async_imap::Session;
use async_native_tls::TlsConnector;
use futures_util::StreamExt;
use log::{debug, info, warn};
use secrecy::ExposeSecret;

use crate::config::MailConfig;

use super::error::{MailError, Result};

type AsyncTcpStream = async_io::Async<std::net::TcpStream>;
type TlsStream = async_native_tls::TlsStream<AsyncTcpStream>;

pub struct ImapClient {
    session: Option<Session<TlsStream>>,
    config: MailConfig,
    current_folder: Option<String>,
    current_uidvalidity: Option<u32>,
}

impl ImapClient {
    pub fn new(config: MailConfig) -> Self {
        Self {
            session: None,
            config,
            current_folder: None,
            current_uidvalidity: None,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs.max(1))
    }

    async fn with_timeout<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout(), fut)
            .await
            .map_err(|_| MailError::Timeout(what.to_string()))?
    }

    /// Connects to the server and logs in. A no-op when already connected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("Already connected to IMAP server");
            return Ok(());
        }

        if !self.config.use_tls {
            return Err(MailError::ConfigError(
                "TLS is required for IMAP connections".to_string(),
            ));
        }

        if self.config.username.trim().is_empty() {
            return Err(MailError::ConfigError(
                "mail.username is empty (set it or SCHOLARFEED_EMAIL_ADDRESS)".to_string(),
            ));
        }

        let password_source = self.config.password();
        if password_source.direct.is_some() {
            warn!(
                "Using an inline mailbox password (password_insecure) is not recommended. \
                 Consider password_env_var or password_file instead."
            );
        }
        let password = password_source
            .resolve()
            .map_err(|e| MailError::CredentialsNotFound(e.to_string()))?;

        let host = self.config.host.clone();
        let addr = format!("{}:{}", host, self.config.port);
        let username = self.config.username.clone();
        info!("Connecting to IMAP server at {}", addr);

        let session = self
            .with_timeout("IMAP connect", async move {
                let tcp_stream = connect_tcp(&addr).await?;

                let tls_stream = TlsConnector::new().connect(&host, tcp_stream).await?;
                let client = async_imap::Client::new(tls_stream);

                client
                    .login(&username, password.expose_secret())
                    .await
                    .map_err(|(e, _)| MailError::AuthenticationFailed(e.to_string()))
            })
            .await?;

        info!("Authenticated to IMAP server as {}", self.config.username);
        self.session = Some(session);
        Ok(())
    }

    /// Opens a folder read-only with EXAMINE and returns its UIDVALIDITY.
    pub async fn examine_folder(&mut self, folder: &str) -> Result<u32> {
        let timeout = self.timeout();
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| MailError::ConnectionFailed("Not connected".to_string()))?;

        info!("Examining folder: {}", folder);

        let mailbox = tokio::time::timeout(timeout, session.examine(folder))
            .await
            .map_err(|_| MailError::Timeout(format!("EXAMINE {}", folder)))?
            .map_err(|e| {
                let text = e.to_string();
                if text.contains("doesn't exist") || text.contains("NO") {
                    MailError::FolderNotFound(folder.to_string())
                } else {
                    MailError::ProtocolError(text)
                }
            })?;

        let uidvalidity = mailbox.uid_validity.ok_or_else(|| {
            MailError::ProtocolError("Server did not provide UIDVALIDITY".to_string())
        })?;

        self.current_folder = Some(folder.to_string());
        self.current_uidvalidity = Some(uidvalidity);

        debug!("Folder '{}' opened with UIDVALIDITY={}", folder, uidvalidity);
        Ok(uidvalidity)
    }

    pub fn current_folder(&self) -> Option<&str> {
        self.current_folder.as_deref()
    }

    pub fn uidvalidity(&self) -> Option<u32> {
        self.current_uidvalidity
    }

    /// UIDs in the examined folder, optionally restricted to one sender, ascending.
    pub async fn search_from(&mut self, sender: Option<&str>) -> Result<Vec<u32>> {
        let timeout = self.timeout();
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| MailError::ConnectionFailed("Not connected".to_string()))?;

        let query = search_query(sender);
        debug!("Searching with query: {}", query);

        let uids = tokio::time::timeout(timeout, session.uid_search(&query))
            .await
            .map_err(|_| MailError::Timeout("UID SEARCH".to_string()))?
            .map_err(|e| MailError::ProtocolError(e.to_string()))?;

        let mut uid_list: Vec<u32> = uids.into_iter().collect();
        uid_list.sort_unstable();
        debug!("Found {} messages matching search", uid_list.len());
        Ok(uid_list)
    }

    /// Fetches full bodies with `BODY.PEEK[]` so the server keeps them unread.
    pub async fn fetch_peek(&mut self, uids: &[u32]) -> Result<Vec<(u32, Vec<u8>)>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let timeout = self.timeout();
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| MailError::ConnectionFailed("Not connected".to_string()))?;

        let uid_set = uids
            .iter()
            .map(|u| u.to_string())
            .collect::<Vec<_>>()
            .join(",");

        debug!("Fetching {} messages with UIDs: {}", uids.len(), uid_set);

        let fetch = async {
            let mut messages = session
                .uid_fetch(&uid_set, "(UID BODY.PEEK[])")
                .await
                .map_err(|e| MailError::ProtocolError(e.to_string()))?;

            let mut results = Vec::with_capacity(uids.len());
            while let Some(message_result) = messages.next().await {
                let message = message_result.map_err(|e| MailError::ProtocolError(e.to_string()))?;
                match (message.uid, message.body()) {
                    (Some(uid), Some(body)) => results.push((uid, body.to_vec())),
                    _ => warn!("Fetched message is missing its UID or body"),
                }
            }
            Ok::<_, MailError>(results)
        };

        let results = tokio::time::timeout(timeout, fetch)
            .await
            .map_err(|_| MailError::Timeout("UID FETCH".to_string()))??;

        debug!("Fetched {} messages", results.len());
        Ok(results)
    }

    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut session) = self.session.take() {
            info!("Disconnecting from IMAP server");
            session
                .logout()
                .await
                .map_err(|e| MailError::ProtocolError(e.to_string()))?;
        }
        self.current_folder = None;
        self.current_uidvalidity = None;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }
}

impl Drop for ImapClient {
    fn drop(&mut self) {
        if self.session.is_some() {
            warn!("ImapClient dropped without explicit disconnect");
        }
    }
}

/// Resolves `addr` and connects to the first address that accepts.
async fn connect_tcp(addr: &str) -> Result<AsyncTcpStream> {
    let resolved = tokio::net::lookup_host(addr)
        .await
        .map_err(|e| MailError::ConnectionFailed(format!("{}: {}", addr, e)))?;

    let mut last_err = None;
    for socket_addr in resolved {
        match async_io::Async::<std::net::TcpStream>::connect(socket_addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Connecting to {} failed: {}", socket_addr, e);
                last_err = Some(e);
            }
        }
    }

    Err(MailError::ConnectionFailed(match last_err {
        Some(e) => format!("{}: {}", addr, e),
        None => format!("{}: no addresses resolved", addr),
    }))
}

fn search_query(sender: Option<&str>) -> String {
    match sender.map(str::trim).filter(|s| !s.is_empty()) {
        Some(sender) => format!("FROM \"{}\"", sender.replace('\\', "\\\\").replace('"', "\\\"")),
        None => "ALL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MailConfig {
        MailConfig {
            host: "imap.example.com".to_string(),
            username: "reader@example.com".to_string(),
            password_env_var: Some("SCHOLARFEED_TEST_IMAP_PASSWORD".to_string()),
            ..MailConfig::default()
        }
    }

    #[test]
    fn test_new_client_is_disconnected() {
        let client = ImapClient::new(test_config());
        assert!(!client.is_connected());
        assert_eq!(client.uidvalidity(), None);
        assert_eq!(client.current_folder(), None);
    }

    #[test]
    fn test_search_query() {
        assert_eq!(
            search_query(Some("scholaralerts-noreply@google.com")),
            "FROM \"scholaralerts-noreply@google.com\""
        );
        assert_eq!(search_query(Some("a\"b")), "FROM \"a\\\"b\"");
        assert_eq!(search_query(Some("  ")), "ALL");
        assert_eq!(search_query(None), "ALL");
    }

    #[tokio::test]
    async fn test_tls_required() {
        let mut config = test_config();
        config.use_tls = false;
        let mut client = ImapClient::new(config);
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, MailError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_missing_username() {
        let mut config = test_config();
        config.username = String::new();
        let mut client = ImapClient::new(config);
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, MailError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_reported() {
        let err = connect_tcp("127.0.0.1:1").await.unwrap_err();
        assert!(matches!(err, MailError::ConnectionFailed(_)));
    }

    #[tokio::test]
    async fn test_connect_gives_up_within_timeout() {
        let mut config = test_config();
        // Non-routable, so the SYN is never answered.
        config.host = "10.255.255.1".to_string();
        config.timeout_secs = 1;
        config.password_insecure = Some("secret".to_string());
        let mut client = ImapClient::new(config);

        let started = std::time::Instant::now();
        let err = client.connect().await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(matches!(
            err,
            MailError::Timeout(_) | MailError::ConnectionFailed(_)
        ));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let mut client = ImapClient::new(test_config());
        assert!(matches!(
            client.examine_folder("INBOX").await,
            Err(MailError::ConnectionFailed(_))
        ));
        assert!(matches!(
            client.search_from(None).await,
            Err(MailError::ConnectionFailed(_))
        ));
        assert!(client.fetch_peek(&[]).await.unwrap().is_empty());
        assert!(client.disconnect().await.is_ok());
    }
}
