//! Contracts for the external content generators.

use async_trait::async_trait;
use quiz_core::model::{CoverImage, Depth, Difficulty, Question, QuestionKind, SourceDocument};

use crate::error::GenerationError;

mod http;
mod prompt;

pub use http::HttpGenerator;
pub use prompt::{GeneratedQuestion, build_prompt, cover_image_prompt, parse_questions};

/// Everything a generator needs to produce a question set.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub document: &'a SourceDocument,
    pub count: u32,
    pub kind: QuestionKind,
    pub difficulty: Difficulty,
    pub depth: Depth,
    /// Sample text whose style the questions should imitate.
    pub reference_style: Option<&'a str>,
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Produce up to `request.count` questions. Fewer, or none, is not an
    /// error at this level.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` if the generator cannot be reached or its
    /// output cannot be decoded.
    async fn generate_questions(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<Vec<Question>, GenerationError>;
}

#[async_trait]
pub trait CoverImageGenerator: Send + Sync {
    /// Produce an illustrative image for `topic`, if the generator has one.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` on transport or decoding failures.
    async fn cover_image(&self, topic: &str) -> Result<Option<CoverImage>, GenerationError>;
}
