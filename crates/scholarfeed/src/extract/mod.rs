//! Citation extraction from raw alert messages.
//!
//! Extraction is pure: the same bytes always yield the same citations in the
//! same order. Two layouts are recognized, tried in order:
//!
//! 1. plain-text `Title: … Link: … Abstract: …` blocks
//! 2. Google Scholar alert HTML (`a.gse_alrt_title` + `div.gse_alrt_sni`)

mod html;
mod text;

use log::debug;
use mail_parser::MessageParser;
use thiserror::Error;

use crate::mail::Message;
use crate::paper::{PaperRecord, ReferenceLink};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("message is not a parseable RFC 822 document")]
    Unparseable,

    #[error("message has no text or HTML body")]
    EmptyBody,
}

/// A citation as it appeared in the message, before link validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawCitation {
    pub title: String,
    pub link: String,
    pub abstract_text: String,
}

/// Lazily validated citations of one message, in order of appearance.
///
/// Candidates whose link does not normalize are skipped. Cloning restarts the
/// sequence from the current position.
#[derive(Debug, Clone)]
pub struct Citations {
    raw: Vec<RawCitation>,
    next: usize,
}

impl Citations {
    pub(crate) fn new(raw: Vec<RawCitation>) -> Self {
        Self { raw, next: 0 }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of candidates found, including ones with unusable links.
    pub fn candidate_count(&self) -> usize {
        self.raw.len()
    }
}

impl Iterator for Citations {
    type Item = PaperRecord;

    fn next(&mut self) -> Option<PaperRecord> {
        while let Some(raw) = self.raw.get(self.next) {
            self.next += 1;
            match ReferenceLink::parse(&raw.link) {
                Some(link) => {
                    return Some(PaperRecord::new(
                        raw.title.clone(),
                        link,
                        raw.abstract_text.clone(),
                    ))
                }
                None => debug!("Skipping citation '{}' with unusable link '{}'", raw.title, raw.link),
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.raw.len() - self.next))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor;

impl Extractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, message: &Message) -> Result<Citations, ExtractionError> {
        self.extract_raw(&message.raw)
    }

    /// Extracts citations from an RFC 822 blob.
    ///
    /// The text body is searched for plain-text blocks first; the HTML body is
    /// used when that finds nothing. A message without citations yields an
    /// empty sequence, not an error.
    pub fn extract_raw(&self, raw: &[u8]) -> Result<Citations, ExtractionError> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(ExtractionError::Unparseable);
        }

        let parsed = MessageParser::default()
            .parse(raw)
            .ok_or(ExtractionError::Unparseable)?;

        let text_body = parsed.body_text(0);
        let html_body = parsed.body_html(0);

        let has_text = text_body.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_html = html_body.as_deref().is_some_and(|h| !h.trim().is_empty());
        if !has_text && !has_html {
            return Err(ExtractionError::EmptyBody);
        }

        if let Some(body) = text_body.as_deref() {
            let found = text::parse_blocks(body);
            if !found.is_empty() {
                debug!("Found {} plain-text citations", found.len());
                return Ok(Citations::new(found));
            }
        }

        if let Some(body) = html_body.as_deref() {
            let found = html::parse_alert(body);
            if !found.is_empty() {
                debug!("Found {} Scholar HTML citations", found.len());
                return Ok(Citations::new(found));
            }
        }

        Ok(Citations::empty())
    }
}

/// Collapses runs of whitespace (including newlines) into single spaces.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
