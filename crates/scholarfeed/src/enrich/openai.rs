//! Annotator for OpenAI-compatible chat completion endpoints.
//!
//! Works with OpenAI itself, Ollama's `/v1` API, and self-hosted servers that
//! speak the same protocol.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::{AnnotationProvider, EnrichmentConfig};
use crate::paper::Enrichment;

use super::response::parse_annotation;
use super::{AnnotationError, Annotator};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    code: Option<String>,
}

pub struct OpenAiAnnotator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    language: String,
    temperature: f32,
}

impl OpenAiAnnotator {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AnnotationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnnotationError::Setup(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            language: "Chinese".to_string(),
            temperature: 0.7,
        })
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Resolves endpoint and key from the enrichment config. OpenAI requires a
    /// key; the other providers use one only when configured.
    pub fn from_config(config: &EnrichmentConfig) -> Result<Self, AnnotationError> {
        let endpoint = config.resolved_endpoint().ok_or_else(|| {
            AnnotationError::Setup("no endpoint configured for the custom provider".to_string())
        })?;

        let key_source = config.api_key();
        let api_key = if config.provider.requires_api_key() {
            Some(
                key_source
                    .resolve()
                    .map_err(|e| AnnotationError::Setup(format!("API key: {}", e)))?,
            )
        } else {
            key_source
                .resolve_optional()
                .map_err(|e| AnnotationError::Setup(format!("API key: {}", e)))?
        };

        if config.provider == AnnotationProvider::OpenAi && config.api_key_insecure.is_some() {
            log::warn!(
                "Using an inline API key (api_key_insecure) is not recommended. \
                 Consider api_key_env_var or api_key_file instead."
            );
        }

        Ok(Self::new(
            endpoint,
            api_key,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs.max(1)),
        )?
        .with_language(config.language.clone())
        .with_temperature(config.temperature))
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &self.api_key {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret())) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        headers
    }

    fn prompt(&self, title: &str, abstract_text: &str) -> String {
        let abstract_text = if abstract_text.trim().is_empty() {
            "(no abstract available)"
        } else {
            abstract_text
        };

        format!(
            "You are preparing a research digest entry for a paper.\n\
             <title>{title}</title>\n\
             <abstract>{abstract_text}</abstract>\n\n\
             Write, in {language}:\n\
             - a faithful summary of the abstract\n\
             - 3 to 5 research highlights (core contributions or findings)\n\
             - the potential application areas\n\n\
             Reply with JSON only, in exactly this shape:\n\
             {{\"summary\": \"...\", \"highlights\": [\"...\"], \"applications\": [\"...\"]}}",
            title = title,
            abstract_text = abstract_text,
            language = self.language,
        )
    }

    async fn error_from_response(response: reqwest::Response) -> AnnotationError {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return AnnotationError::Quota { retry_after_secs };
        }

        match response.json::<ApiErrorBody>().await {
            Ok(body) if status == 401 || body.error.code.as_deref() == Some("invalid_api_key") => {
                AnnotationError::Authentication(body.error.message)
            }
            Ok(body) => AnnotationError::Api {
                status,
                message: body.error.message,
            },
            Err(_) => AnnotationError::Api {
                status,
                message: format!("HTTP {}", status),
            },
        }
    }
}

fn transport_error(e: reqwest::Error) -> AnnotationError {
    if e.is_timeout() {
        AnnotationError::Timeout
    } else {
        AnnotationError::Transport(e.to_string())
    }
}

#[async_trait]
impl Annotator for OpenAiAnnotator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn annotate(&self, title: &str, abstract_text: &str) -> Result<Enrichment, AnnotationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: self.prompt(title, abstract_text),
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .headers(self.headers())
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnnotationError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(AnnotationError::Empty)?;

        parse_annotation(&content)
    }
}
