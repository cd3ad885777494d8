use async_trait::async_trait;
use log::{debug, info};

use crate::config::MailConfig;

use super::client::ImapClient;
use super::error::{MailError, Result};
use super::{MailSource, Message, MessageId};

/// [`MailSource`] backed by a live IMAP connection.
///
/// The connection is opened lazily by the first `list_new` call and reused
/// for the rest of the run.
pub struct ImapMailSource {
    client: ImapClient,
    sender: Option<String>,
}

impl ImapMailSource {
    pub fn new(config: MailConfig) -> Self {
        let sender = config.sender.clone();
        Self {
            client: ImapClient::new(config),
            sender,
        }
    }

    /// Resolves ids to UIDs of the examined folder, rejecting ids from another
    /// folder or a previous UIDVALIDITY.
    fn uids_for(&self, ids: &[MessageId]) -> Result<Vec<u32>> {
        let folder = self
            .client
            .current_folder()
            .ok_or_else(|| MailError::ProtocolError("No folder examined".to_string()))?;
        let current = self
            .client
            .uidvalidity()
            .ok_or_else(|| MailError::ProtocolError("No folder examined".to_string()))?;

        ids.iter()
            .map(|id| {
                let (id_folder, uidvalidity, uid) = id
                    .parse_imap()
                    .ok_or_else(|| MailError::ForeignMessageId(id.to_string()))?;
                if id_folder != folder {
                    return Err(MailError::ForeignMessageId(id.to_string()));
                }
                if uidvalidity != current {
                    return Err(MailError::UidValidityChanged(
                        folder.to_string(),
                        uidvalidity,
                        current,
                    ));
                }
                Ok(uid)
            })
            .collect()
    }
}

#[async_trait]
impl MailSource for ImapMailSource {
    async fn list_new(&mut self, folder: &str, max_count: usize) -> Result<Vec<MessageId>> {
        self.client.connect().await?;
        let uidvalidity = self.client.examine_folder(folder).await?;
        let uids = self.client.search_from(self.sender.as_deref()).await?;

        let newest = &uids[uids.len().saturating_sub(max_count)..];
        info!(
            "Listing {} of {} messages in '{}'",
            newest.len(),
            uids.len(),
            folder
        );

        Ok(newest
            .iter()
            .map(|&uid| MessageId::imap(folder, uidvalidity, uid))
            .collect())
    }

    async fn fetch_batch(&mut self, ids: &[MessageId]) -> Result<Vec<Message>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let uids = self.uids_for(ids)?;
        let mut fetched = self.client.fetch_peek(&uids).await?;

        let mut messages = Vec::with_capacity(ids.len());
        for (id, uid) in ids.iter().zip(&uids) {
            match fetched.iter().position(|(u, _)| u == uid) {
                Some(pos) => {
                    let (_, raw) = fetched.swap_remove(pos);
                    messages.push(Message::new(id.clone(), raw));
                }
                None => debug!("Message {} vanished before it could be fetched", id),
            }
        }
        Ok(messages)
    }

    async fn close(&mut self) -> Result<()> {
        self.client.disconnect().await
    }
}
