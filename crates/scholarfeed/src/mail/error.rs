use thiserror::Error;

/// Errors from the mail source. All of them abort the current run.
#[derive(Error, Debug)]
pub enum MailError {
    #[error("IMAP connection failed: {0}")]
    ConnectionFailed(String),

    #[error("TLS error: {0}")]
    TlsError(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Mailbox credentials not available: {0}")]
    CredentialsNotFound(String),

    #[error("IMAP protocol error: {0}")]
    ProtocolError(String),

    #[error("IMAP folder '{0}' not found")]
    FolderNotFound(String),

    #[error("Invalid mail configuration: {0}")]
    ConfigError(String),

    /// The folder was recreated between listing and fetching.
    #[error("UIDVALIDITY changed for folder '{0}': was {1}, now {2}")]
    UidValidityChanged(String, u32, u32),

    #[error("Message id '{0}' does not belong to this source")]
    ForeignMessageId(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl From<async_native_tls::Error> for MailError {
    fn from(err: async_native_tls::Error) -> Self {
        MailError::TlsError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MailError>;
