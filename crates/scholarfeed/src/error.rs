use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScholarfeedError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Mail source error: {0}")]
    Mail(#[from] crate::mail::MailError),

    #[error("Ingestion failed: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Annotator setup failed: {0}")]
    Annotation(#[from] crate::enrich::AnnotationError),

    #[error("Export failed: {0}")]
    Export(#[from] crate::export::ExportError),

    #[error("Secret resolution failed: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid value for environment variable '{name}': {reason}")]
    InvalidEnv { name: String, reason: String },

    #[error("Could not determine a store location (no home directory)")]
    NoStoreLocation,
}

pub type Result<T> = std::result::Result<T, ScholarfeedError>;
