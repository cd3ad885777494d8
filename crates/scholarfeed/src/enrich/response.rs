use serde::Deserialize;

use crate::paper::Enrichment;

use super::AnnotationError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

impl TextOrList {
    fn into_items(self) -> Vec<String> {
        let items = match self {
            Self::List(items) => items,
            Self::Text(text) => text
                .split(['\n', ';', '；'])
                .map(|s| s.trim_start_matches(['-', '*', '•', ' ']).to_string())
                .collect(),
        };
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct AnnotationPayload {
    #[serde(default, alias = "chinese_abstract", alias = "abstract")]
    summary: Option<String>,
    #[serde(default)]
    highlights: Option<TextOrList>,
    #[serde(default)]
    applications: Option<TextOrList>,
}

/// Parses a model reply into an [`Enrichment`].
///
/// Accepts bare JSON, JSON inside a Markdown code fence, or a JSON object
/// embedded in surrounding prose.
pub fn parse_annotation(content: &str) -> Result<Enrichment, AnnotationError> {
    let payload = candidates(content)
        .into_iter()
        .find_map(|candidate| serde_json::from_str::<AnnotationPayload>(candidate).ok())
        .ok_or_else(|| {
            AnnotationError::InvalidResponse(format!(
                "no JSON annotation in reply: {}",
                content.chars().take(120).collect::<String>()
            ))
        })?;

    let enrichment = Enrichment {
        summary: payload.summary.unwrap_or_default().trim().to_string(),
        highlights: payload.highlights.map(TextOrList::into_items).unwrap_or_default(),
        applications: payload.applications.map(TextOrList::into_items).unwrap_or_default(),
    };

    if enrichment.is_empty() {
        return Err(AnnotationError::Empty);
    }
    Ok(enrichment)
}

fn candidates(content: &str) -> Vec<&str> {
    let mut found = vec![content.trim()];

    if let Some(start) = content.find("```") {
        let after = &content[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            found.push(after[..end].trim());
        }
    }

    if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
            found.push(&content[start..=end]);
        }
    }

    found
}
