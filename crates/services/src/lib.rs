#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod generation;
pub mod orchestrator;

pub use quiz_core::Clock;

pub use config::{GenerationConfig, ServiceConfig};
pub use error::{ConfigError, GenerationError, OrchestratorError};
pub use generation::{CoverImageGenerator, GenerationRequest, HttpGenerator, QuestionGenerator};
pub use orchestrator::{PracticeStep, StudyOrchestrator};
