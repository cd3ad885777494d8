use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::secrets::SecretSource;

pub const CONFIG_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            mail: MailConfig::default(),
            ingest: IngestConfig::default(),
            enrichment: EnrichmentConfig::default(),
            output: OutputConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// IMAP account and the folder that receives the alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default = "default_imap_host")]
    pub host: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub use_tls: bool,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password_insecure: Option<String>,
    #[serde(default)]
    pub password_file: Option<String>,
    #[serde(default = "default_password_env_var")]
    pub password_env_var: Option<String>,
    #[serde(default = "default_folder")]
    pub folder: String,
    /// Only messages from this sender are listed. `None` lists the whole folder.
    #[serde(default = "default_sender")]
    pub sender: Option<String>,
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

fn default_imap_host() -> String {
    "imap.qq.com".to_string()
}

fn default_imap_port() -> u16 {
    993
}

fn default_true() -> bool {
    true
}

fn default_password_env_var() -> Option<String> {
    Some("SCHOLARFEED_EMAIL_PASSWORD".to_string())
}

fn default_folder() -> String {
    "INBOX".to_string()
}

fn default_sender() -> Option<String> {
    Some("scholaralerts-noreply@google.com".to_string())
}

fn default_mail_timeout() -> u64 {
    60
}

impl MailConfig {
    pub fn password(&self) -> SecretSource {
        SecretSource::new(
            self.password_insecure.clone(),
            self.password_file.clone(),
            self.password_env_var.clone(),
        )
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            host: default_imap_host(),
            port: default_imap_port(),
            use_tls: true,
            username: String::new(),
            password_insecure: None,
            password_file: None,
            password_env_var: default_password_env_var(),
            folder: default_folder(),
            sender: default_sender(),
            timeout_secs: default_mail_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Upper bound on messages examined per run, newest first.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// Messages per committed batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_max_messages() -> usize {
    10
}

fn default_batch_size() -> usize {
    5
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationProvider {
    OpenAi,
    Ollama,
    Custom,
}

impl AnnotationProvider {
    /// Endpoint used when none is configured. `Custom` has no default.
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("https://api.openai.com/v1"),
            Self::Ollama => Some("http://localhost:11434/v1"),
            Self::Custom => None,
        }
    }

    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAi)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_provider")]
    pub provider: AnnotationProvider,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key_insecure: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env_var")]
    pub api_key_env_var: Option<String>,
    /// Language of the generated summary.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_annotation_timeout")]
    pub timeout_secs: u64,
    /// Minimum delay between two annotation calls. 0 disables throttling.
    #[serde(default)]
    pub min_interval_ms: u64,
}

fn default_provider() -> AnnotationProvider {
    AnnotationProvider::OpenAi
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_key_env_var() -> Option<String> {
    Some("SCHOLARFEED_LLM_API_KEY".to_string())
}

fn default_language() -> String {
    "Chinese".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_annotation_timeout() -> u64 {
    60
}

impl EnrichmentConfig {
    pub fn api_key(&self) -> SecretSource {
        SecretSource::new(
            self.api_key_insecure.clone(),
            self.api_key_file.clone(),
            self.api_key_env_var.clone(),
        )
    }

    /// Configured endpoint, falling back to the provider default.
    pub fn resolved_endpoint(&self) -> Option<String> {
        self.endpoint
            .clone()
            .or_else(|| self.provider.default_endpoint().map(str::to_string))
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            endpoint: None,
            model: default_model(),
            api_key_insecure: None,
            api_key_file: None,
            api_key_env_var: default_api_key_env_var(),
            language: default_language(),
            temperature: default_temperature(),
            timeout_secs: default_annotation_timeout(),
            min_interval_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    /// Export format. Inferred from the path extension when omitted.
    #[serde(default)]
    pub format: Option<ExportFormat>,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("scholar_results.csv")
}

impl OutputConfig {
    pub fn resolved_format(&self) -> ExportFormat {
        self.format
            .or_else(|| {
                self.path
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(ExportFormat::from_extension)
            })
            .unwrap_or(ExportFormat::Csv)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            format: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite file. Defaults to `~/.scholarfeed/data/scholarfeed.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(crate::db::default_database_path)
    }
}
