//! Paper records and the normalized reference link that identifies them.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Characters stripped from the end of a link before parsing.
///
/// Links in plain-text alerts are often followed by sentence punctuation or
/// wrapped in angle brackets.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', ')', ']', '>', '"', '\''];

/// A normalized `http`/`https` link. This is the deduplication key for papers:
/// two candidates whose links normalize to the same value are the same paper.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ReferenceLink(String);

impl ReferenceLink {
    /// Parses and normalizes a raw link. Returns `None` for anything that is
    /// not an absolute `http`/`https` URL with a host.
    ///
    /// Normalization:
    /// - surrounding whitespace, a leading `<` and trailing punctuation are removed
    /// - Google Scholar redirect links are unwrapped to their `url=` target
    /// - scheme and host are lowercased
    /// - the fragment is dropped
    /// - a trailing `/` is dropped from non-root paths
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw
            .trim()
            .trim_start_matches('<')
            .trim_end_matches(TRAILING_PUNCTUATION);

        let mut url = web_url(trimmed)?;
        if let Some(target) = scholar_redirect_target(&url) {
            url = target;
        }

        url.set_fragment(None);
        if url.path().len() > 1 && url.path().ends_with('/') {
            let path = url.path().trim_end_matches('/').to_string();
            url.set_path(&path);
        }

        Some(Self(url.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps a link that was normalized before it was persisted.
    pub(crate) fn from_stored(link: String) -> Self {
        Self(link)
    }
}

impl fmt::Display for ReferenceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn web_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    Some(url)
}

/// Scholar alert links point at `scholar.google.<tld>/scholar_url?url=<target>&...`.
fn scholar_redirect_target(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    if !host.starts_with("scholar.google.") || url.path() != "/scholar_url" {
        return None;
    }
    let (_, target) = url.query_pairs().find(|(key, _)| key == "url")?;
    web_url(&target)
}

/// Row identifier of a stored paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PaperId(pub i64);

impl fmt::Display for PaperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derived fields produced by the annotation capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    /// Summary of the abstract in the configured language.
    pub summary: String,
    pub highlights: Vec<String>,
    pub applications: Vec<String>,
}

impl Enrichment {
    /// True when no field carries any content.
    pub fn is_empty(&self) -> bool {
        self.summary.trim().is_empty()
            && self.highlights.iter().all(|h| h.trim().is_empty())
            && self.applications.iter().all(|a| a.trim().is_empty())
    }
}

/// A citation extracted from an alert, optionally enriched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperRecord {
    pub title: String,
    pub link: ReferenceLink,
    /// Abstract or snippet as it appeared in the alert; empty when absent.
    pub abstract_text: String,
    pub enrichment: Option<Enrichment>,
}

impl PaperRecord {
    pub fn new(title: impl Into<String>, link: ReferenceLink, abstract_text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link,
            abstract_text: abstract_text.into(),
            enrichment: None,
        }
    }

    pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    pub fn is_enriched(&self) -> bool {
        self.enrichment.is_some()
    }
}
