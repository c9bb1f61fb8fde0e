use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use quiz_core::model::{CoverImage, DocumentKind, Question, SourceDocument};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::prompt::{build_prompt, cover_image_prompt, parse_questions};
use super::{CoverImageGenerator, GenerationRequest, QuestionGenerator};
use crate::config::GenerationConfig;
use crate::error::GenerationError;

/// Generator backed by an OpenAI-compatible HTTP API.
///
/// Without a config every call fails with `GenerationError::Disabled`.
#[derive(Clone)]
pub struct HttpGenerator {
    client: Client,
    config: Option<GenerationConfig>,
}

impl HttpGenerator {
    #[must_use]
    pub fn new(config: Option<GenerationConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    fn config(&self) -> Result<&GenerationConfig, GenerationError> {
        self.config.as_ref().ok_or(GenerationError::Disabled)
    }

    fn endpoint(config: &GenerationConfig, path: &str) -> String {
        format!("{}/{path}", config.base_url.trim_end_matches('/'))
    }
}

/// Data URI embedding the raw document bytes.
fn document_data_uri(document: &SourceDocument) -> String {
    format!(
        "data:{};base64,{}",
        document.kind().mime_type(),
        STANDARD.encode(document.data())
    )
}

/// Message parts carrying the instructions and the document.
///
/// Plain-text documents are inlined; binary formats travel as a file part.
fn message_parts(prompt: String, document: &SourceDocument) -> Vec<ContentPart> {
    let mut parts = vec![ContentPart::Text { text: prompt }];
    match document.kind() {
        DocumentKind::Text => parts.push(ContentPart::Text {
            text: String::from_utf8_lossy(document.data()).into_owned(),
        }),
        DocumentKind::Pdf | DocumentKind::Docx => parts.push(ContentPart::File {
            file: FilePayload {
                filename: document.name().to_string(),
                file_data: document_data_uri(document),
            },
        }),
    }
    parts
}

#[async_trait]
impl QuestionGenerator for HttpGenerator {
    async fn generate_questions(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<Vec<Question>, GenerationError> {
        let config = self.config()?;

        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: message_parts(build_prompt(&request), request.document),
            }],
            temperature: 0.2,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        debug!(
            document = request.document.name(),
            count = request.count,
            model = %config.model,
            "requesting questions"
        );
        let response = self
            .client
            .post(Self::endpoint(config, "chat/completions"))
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        parse_questions(&content, request.kind)
    }
}

#[async_trait]
impl CoverImageGenerator for HttpGenerator {
    async fn cover_image(&self, topic: &str) -> Result<Option<CoverImage>, GenerationError> {
        let config = self.config()?;

        let payload = ImageRequest {
            model: config.image_model.clone(),
            prompt: cover_image_prompt(topic),
            size: "1536x1024",
            n: 1,
        };
        let response = self
            .client
            .post(Self::endpoint(config, "images/generations"))
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ImageResponse = response.json().await?;
        Ok(body.data.into_iter().next().and_then(|image| {
            image
                .b64_json
                .map(|data| CoverImage::new(format!("data:image/png;base64,{data}")))
                .or_else(|| image.url.map(CoverImage::new))
        }))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    File { file: FilePayload },
}

#[derive(Debug, Serialize)]
struct FilePayload {
    filename: String,
    file_data: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    size: &'static str,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}
