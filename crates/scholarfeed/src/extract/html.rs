use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{collapse_whitespace, RawCitation};

static ALERT_PARTS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.gse_alrt_title, div.gse_alrt_sni").unwrap());

/// Parses a Google Scholar alert body.
///
/// Each `a.gse_alrt_title` anchor starts a citation. The first
/// `div.gse_alrt_sni` that follows it in document order, before the next
/// anchor, is its abstract.
pub(crate) fn parse_alert(html: &str) -> Vec<RawCitation> {
    let document = Html::parse_document(html);
    let mut found: Vec<RawCitation> = Vec::new();
    let mut awaiting_snippet = false;

    for element in document.select(&ALERT_PARTS) {
        if element.value().name() == "a" {
            found.push(RawCitation {
                title: collapse_whitespace(&element.text().collect::<String>()),
                link: element.value().attr("href").unwrap_or_default().to_string(),
                abstract_text: String::new(),
            });
            awaiting_snippet = true;
        } else if awaiting_snippet {
            if let Some(last) = found.last_mut() {
                last.abstract_text = collapse_whitespace(&element.text().collect::<String>());
            }
            awaiting_snippet = false;
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_and_snippet_pairing() {
        let html = r#"
            <div class="gse_alrt_sni">orphan snippet before any title</div>
            <h3><a class="gse_alrt_title" href="https://ex.org/1">One</a></h3>
            <div class="gse_alrt_sni">snippet <br>one</div>
            <div class="gse_alrt_sni">stray second snippet</div>
            <h3><a class="gse_alrt_title" href="https://ex.org/2">Two</a></h3>
        "#;
        let found = parse_alert(html);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].abstract_text, "snippet one");
        assert_eq!(found[1].link, "https://ex.org/2");
        assert_eq!(found[1].abstract_text, "");
    }

    #[test]
    fn test_entities_decoded_and_missing_href() {
        let html = r#"<a class="gse_alrt_title">Cats &amp; Dogs</a>"#;
        let found = parse_alert(html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Cats & Dogs");
        assert_eq!(found[0].link, "");
    }

    #[test]
    fn test_other_anchors_ignored() {
        let html = r#"<a href="https://scholar.google.com/scholar_alerts?view_op=list_alerts">Manage alerts</a>"#;
        assert!(parse_alert(html).is_empty());
    }
}
