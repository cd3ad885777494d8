//! Mail source seam and the IMAP implementation.
//!
//! The coordinator only sees [`MailSource`]: it lists message identifiers in
//! a folder and fetches raw RFC 822 bodies for a subset of them. Messages are
//! never marked read or modified.

pub mod client;
pub mod error;
pub mod imap_source;

use std::fmt;

use async_trait::async_trait;

pub use client::ImapClient;
pub use error::{MailError, Result};
pub use imap_source::ImapMailSource;

/// Provider-assigned message identifier, unique per mailbox and folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Builds the identifier of an IMAP message: `folder:uidvalidity:uid`.
    pub fn imap(folder: &str, uidvalidity: u32, uid: u32) -> Self {
        Self(format!("{}:{}:{}", folder, uidvalidity, uid))
    }

    /// Splits an IMAP identifier back into `(folder, uidvalidity, uid)`.
    ///
    /// The folder itself may contain `:`, so the numeric parts are taken from
    /// the right.
    pub fn parse_imap(&self) -> Option<(&str, u32, u32)> {
        let mut parts = self.0.rsplitn(3, ':');
        let uid = parts.next()?.parse().ok()?;
        let uidvalidity = parts.next()?.parse().ok()?;
        let folder = parts.next()?;
        Some((folder, uidvalidity, uid))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fetched message. Only `id` is ever persisted.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub raw: Vec<u8>,
}

impl Message {
    pub fn new(id: MessageId, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            raw: raw.into(),
        }
    }
}

#[async_trait]
pub trait MailSource: Send {
    /// Lists up to `max_count` of the newest message ids in `folder`, oldest first.
    async fn list_new(&mut self, folder: &str, max_count: usize) -> Result<Vec<MessageId>>;

    /// Fetches raw bodies for `ids`, preserving their order. Ids the server no
    /// longer knows are left out of the result.
    async fn fetch_batch(&mut self, ids: &[MessageId]) -> Result<Vec<Message>>;

    /// Releases the connection. Sources without one need not override this.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
