//! Builders for raw RFC 822 alert messages.

#![allow(dead_code)]

use scholarfeed::{Message, MessageId};

/// A citation as it should appear in a plain-text alert.
pub type Cite<'a> = (&'a str, &'a str, &'a str);

/// Plain-text alert with `Title:/Link:/Abstract:` blocks.
pub fn text_alert(id: &str, citations: &[Cite<'_>]) -> Message {
    let body = citations
        .iter()
        .map(|(title, link, abs)| format!("Title: {}\nLink: {}\nAbstract: {}\n", title, link, abs))
        .collect::<Vec<_>>()
        .join("\n");

    Message::new(
        MessageId::new(id),
        format!(
            "From: Google Scholar Alerts <scholaralerts-noreply@google.com>\r\n\
             To: reader@example.com\r\n\
             Subject: New articles in your alert\r\n\
             Content-Type: text/plain; charset=utf-8\r\n\
             \r\n\
             {}",
            body
        ),
    )
}

/// HTML alert in the layout Google Scholar sends.
pub fn html_alert(id: &str, citations: &[Cite<'_>]) -> Message {
    let items = citations
        .iter()
        .map(|(title, link, abs)| {
            format!(
                "<h3><a class=\"gse_alrt_title\" href=\"{}\">{}</a></h3>\n\
                 <div>Some Author - Some Venue, 2026</div>\n\
                 <div class=\"gse_alrt_sni\">{}</div>\n",
                link, title, abs
            )
        })
        .collect::<String>();

    Message::new(
        MessageId::new(id),
        format!(
            "From: Google Scholar Alerts <scholaralerts-noreply@google.com>\r\n\
             Subject: New results\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: text/html; charset=utf-8\r\n\
             \r\n\
             <html><body>{}</body></html>",
            items
        ),
    )
}

/// A blob the extractor cannot parse.
pub fn unparseable(id: &str) -> Message {
    Message::new(MessageId::new(id), " \r\n ")
}

pub fn ids(messages: &[Message]) -> Vec<MessageId> {
    messages.iter().map(|m| m.id.clone()).collect()
}
