//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use quiz_core::model::{AppSettingsError, DocumentId, SessionError, SessionId, StudyMode};
use storage::repository::StorageError;

/// Errors emitted by the generation collaborators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question generation is not configured")]
    Disabled,
    #[error("generation service returned an empty response")]
    EmptyResponse,
    #[error("generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not decode generated content: {0}")]
    Decode(String),
}

/// Errors emitted by `StudyOrchestrator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    #[error("document {0} not found")]
    DocumentNotFound(DocumentId),
    #[error("document {0} is not ready for generation")]
    DocumentNotReady(DocumentId),
    #[error("a session is already in progress")]
    SessionActive,
    #[error("no session is in progress")]
    NoActiveSession,
    #[error("the active session is not in {expected} mode")]
    WrongMode { expected: StudyMode },
    #[error("no questions could be generated from the document")]
    NoQuestionsGenerated,
    #[error("session {0} not found in history")]
    SessionNotFound(SessionId),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while loading `ServiceConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid {key} value: {raw}")]
    InvalidValue { key: &'static str, raw: String },
    #[error(transparent)]
    Settings(#[from] AppSettingsError),
}
