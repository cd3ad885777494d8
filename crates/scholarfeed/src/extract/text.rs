use std::sync::LazyLock;

use regex::Regex;

use super::{collapse_whitespace, RawCitation};

static BLOCK_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*Title:").unwrap());
static LINK_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bLink:").unwrap());
static ABSTRACT_LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bAbstract:").unwrap());

/// Parses `Title: … Link: … Abstract: …` blocks. Each block runs until the
/// next line starting with `Title:`.
pub(crate) fn parse_blocks(body: &str) -> Vec<RawCitation> {
    let starts: Vec<usize> = BLOCK_START.find_iter(body).map(|m| m.start()).collect();

    starts
        .iter()
        .enumerate()
        .filter_map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(body.len());
            parse_block(&body[start..end])
        })
        .collect()
}

fn parse_block(block: &str) -> Option<RawCitation> {
    let title_label = BLOCK_START.find(block)?;
    let fields = &block[title_label.end()..];

    let link_at = LINK_LABEL.find(fields);
    let abstract_at = ABSTRACT_LABEL.find(fields);

    let title_end = [link_at.map(|m| m.start()), abstract_at.map(|m| m.start())]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(fields.len());
    let title = collapse_whitespace(&fields[..title_end]);

    let link = link_at
        .map(|m| {
            fields[m.end()..]
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string()
        })
        .unwrap_or_default();

    let abstract_text = abstract_at
        .map(|m| collapse_whitespace(&fields[m.end()..]))
        .unwrap_or_default();

    if title.is_empty() && link.is_empty() {
        return None;
    }

    Some(RawCitation {
        title,
        link,
        abstract_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_block() {
        let found = parse_blocks("Title: A\nLink: https://ex.org/a\nAbstract: first\nsecond line\n");
        assert_eq!(
            found,
            vec![RawCitation {
                title: "A".to_string(),
                link: "https://ex.org/a".to_string(),
                abstract_text: "first second line".to_string(),
            }]
        );
    }

    #[test]
    fn test_multiline_title_and_preamble() {
        let body = "Here are your new results.\n\n\
                    Title: A rather long title\n  that wraps\n\
                    Link: https://ex.org/long\n\
                    Abstract: text\n";
        let found = parse_blocks(body);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "A rather long title that wraps");
    }

    #[test]
    fn test_duplicate_blocks_are_kept() {
        let body = "Title: Paper A\nLink: https://ex.org/a\nAbstract: abs A\n\n\
                    Title: Paper A\nLink: https://ex.org/a\nAbstract: abs A (dup)\n";
        let found = parse_blocks(body);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].abstract_text, "abs A (dup)");
    }

    #[test]
    fn test_missing_fields() {
        let found = parse_blocks("Title: Only a title\n\nTitle:\nLink: https://ex.org/x\n");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].link, "");
        assert_eq!(found[0].abstract_text, "");
        assert_eq!(found[1].title, "");
        assert_eq!(found[1].link, "https://ex.org/x");
    }

    #[test]
    fn test_fields_on_one_line() {
        let found = parse_blocks("Title: Inline paper Link: https://ex.org/i Abstract: short\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Inline paper");
        assert_eq!(found[0].link, "https://ex.org/i");
        assert_eq!(found[0].abstract_text, "short");
    }

    #[test]
    fn test_empty_block_dropped() {
        assert!(parse_blocks("Title:\n\n").is_empty());
        assert!(parse_blocks("no markers here").is_empty());
    }
}
