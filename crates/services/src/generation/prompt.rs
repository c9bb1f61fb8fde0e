use std::collections::HashSet;

use quiz_core::model::{Depth, Difficulty, Question, QuestionId, QuestionKind};
use serde::Deserialize;

use super::GenerationRequest;
use crate::error::GenerationError;

fn difficulty_instructions(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => {
            "Direct questions, clear definitions and distractors that are plainly wrong."
        }
        Difficulty::Medium => {
            "Conceptual questions that require relating topics to each other. Plausible distractors."
        }
        Difficulty::Hard => {
            "Complex practical cases or technical dilemmas. Distractors so close to each other that \
             only precise knowledge separates them."
        }
    }
}

fn depth_instructions(depth: Depth) -> &'static str {
    match depth {
        Depth::Short => "Brief questions (one sentence) and concise explanations (about 30 words).",
        Depth::Medium => "Developed questions and detailed explanations (60 to 80 words).",
        Depth::Long => {
            "Long questions with rich context such as case studies, and exhaustive explanations \
             (120 words or more)."
        }
    }
}

fn kind_label(kind: QuestionKind) -> &'static str {
    match kind {
        QuestionKind::MultipleChoice => "multiple-choice",
        QuestionKind::TrueFalse => "true/false (options exactly \"True\" and \"False\")",
        QuestionKind::Mixed => "a mix of multiple-choice and true/false",
    }
}

/// Instruction text sent alongside the document.
#[must_use]
pub fn build_prompt(request: &GenerationRequest<'_>) -> String {
    let mut prompt = format!(
        "You write exam questions that imitate the style, tone and complexity of the learner's \
         material.\n\n\
         QUALITY GUIDELINES:\n\
         - Difficulty ({difficulty}): {difficulty_text}\n\
         - Length ({depth}): {depth_text}\n\n\
         TECHNICAL RULES:\n\
         1. \"correctAnswer\" must be EXACTLY equal to one of the options.\n\
         2. Do not prefix options with letters such as \"A)\" or \"B)\".\n\
         3. The explanation is one fluent paragraph on why the answer is right.\n\
         4. Reply with JSON only: {{\"questions\": [{{\"id\", \"text\", \"options\", \
         \"correctAnswer\", \"explanation\"}}]}}.",
        difficulty = request.difficulty.as_str(),
        difficulty_text = difficulty_instructions(request.difficulty),
        depth = request.depth.as_str(),
        depth_text = depth_instructions(request.depth),
    );

    if let Some(style) = request.reference_style.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str("\n\nGOLD STANDARD (imitate this): \"");
        prompt.push_str(style);
        prompt.push('"');
    }

    prompt.push_str(&format!(
        "\n\nAnalyze the attached document \"{}\" and write EXACTLY {} {} questions.",
        request.document.name(),
        request.count,
        kind_label(request.kind),
    ));
    prompt
}

#[must_use]
pub fn cover_image_prompt(topic: &str) -> String {
    format!(
        "Professional 3D isometric icon representing {topic}, dark blue background, cinematic \
         lighting."
    )
}

/// One question as emitted by the generator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
}

impl GeneratedQuestion {
    /// The id the generator supplied, if it is not blank.
    #[must_use]
    pub fn explicit_id(&self) -> Option<QuestionId> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(QuestionId::new)
    }

    /// Convert into a domain question carrying `id`.
    #[must_use]
    pub fn into_question(self, id: QuestionId, kind: QuestionKind) -> Question {
        Question::new(
            id,
            self.text,
            kind,
            self.options,
            self.correct_answer,
            self.explanation,
        )
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GeneratedPayload {
    Wrapped { questions: Vec<GeneratedQuestion> },
    Bare(Vec<GeneratedQuestion>),
}

/// Decode a generator reply, accepting either `{"questions": [...]}` or a
/// bare array, optionally inside a Markdown code fence. Questions without an
/// id get the first unused `q-<n>`.
///
/// # Errors
///
/// Returns `GenerationError::Decode` if the reply is not valid question JSON.
pub fn parse_questions(raw: &str, kind: QuestionKind) -> Result<Vec<Question>, GenerationError> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let payload: GeneratedPayload =
        serde_json::from_str(body).map_err(|e| GenerationError::Decode(e.to_string()))?;
    let generated = match payload {
        GeneratedPayload::Wrapped { questions } | GeneratedPayload::Bare(questions) => questions,
    };
    // Minted ids must not collide with ids the generator chose itself.
    let mut taken: HashSet<QuestionId> = generated
        .iter()
        .filter_map(GeneratedQuestion::explicit_id)
        .collect();
    Ok(generated
        .into_iter()
        .enumerate()
        .map(|(index, q)| {
            let id = q.explicit_id().unwrap_or_else(|| {
                let id = QuestionId::unused_positional(index, |id| taken.contains(id));
                taken.insert(id.clone());
                id
            });
            q.into_question(id, kind)
        })
        .collect())
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{DocumentId, DocumentKind, DocumentStatus, SourceDocument};
    use quiz_core::time::fixed_now;

    fn document() -> SourceDocument {
        SourceDocument::new(
            DocumentId::new(1),
            "Constitutional Law.pdf",
            DocumentKind::Pdf,
            DocumentStatus::Ready,
            fixed_now(),
            vec![1_u8, 2, 3],
        )
    }

    #[test]
    fn prompt_carries_settings_and_style() {
        let doc = document();
        let request = GenerationRequest {
            document: &doc,
            count: 12,
            kind: QuestionKind::TrueFalse,
            difficulty: Difficulty::Hard,
            depth: Depth::Short,
            reference_style: Some("  Cite the article number.  "),
        };
        let prompt = build_prompt(&request);

        assert!(prompt.contains("Difficulty (hard)"));
        assert!(prompt.contains("Length (short)"));
        assert!(prompt.contains("EXACTLY 12 true/false"));
        assert!(prompt.contains("\"Cite the article number.\""));
        assert!(prompt.contains("Constitutional Law.pdf"));
    }

    #[test]
    fn blank_style_is_left_out() {
        let doc = document();
        let request = GenerationRequest {
            document: &doc,
            count: 3,
            kind: QuestionKind::MultipleChoice,
            difficulty: Difficulty::Easy,
            depth: Depth::Medium,
            reference_style: Some("   "),
        };
        assert!(!build_prompt(&request).contains("GOLD STANDARD"));
    }

    #[test]
    fn parses_wrapped_payload_and_fills_missing_ids() {
        let raw = r#"{"questions": [
            {"id": "intro", "text": "Q1", "options": ["A", "B"], "correctAnswer": "A", "explanation": "E1"},
            {"text": "Q2", "options": ["A", "B"], "correctAnswer": "B"},
            {"id": "  ", "text": "Q3", "options": ["A", "B"], "correctAnswer": "B", "explanation": ""}
        ]}"#;
        let questions = parse_questions(raw, QuestionKind::MultipleChoice).unwrap();

        assert_eq!(questions.len(), 3);
        assert_eq!(questions[0].id.as_str(), "intro");
        assert_eq!(questions[1].id.as_str(), "q-2");
        assert_eq!(questions[2].id.as_str(), "q-3");
        assert_eq!(questions[1].explanation, "");
        assert!(questions.iter().all(|q| !q.is_graded()));
    }

    #[test]
    fn minted_ids_avoid_explicit_ones() {
        let raw = r#"[
            {"id": "q-2", "text": "Q1", "options": ["A", "B"], "correctAnswer": "A"},
            {"text": "Q2", "options": ["A", "B"], "correctAnswer": "B"},
            {"text": "Q3", "options": ["A", "B"], "correctAnswer": "A"}
        ]"#;
        let questions = parse_questions(raw, QuestionKind::MultipleChoice).unwrap();
        let ids: Vec<_> = questions.iter().map(|q| q.id.as_str()).collect();

        assert_eq!(ids, vec!["q-2", "q-2-2", "q-3"]);
    }

    #[test]
    fn parses_fenced_bare_array() {
        let raw = "```json\n[{\"text\": \"Q\", \"options\": [\"True\", \"False\"], \"correctAnswer\": \"True\"}]\n```";
        let questions = parse_questions(raw, QuestionKind::TrueFalse).unwrap();

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].kind, QuestionKind::TrueFalse);
    }

    #[test]
    fn empty_reply_yields_no_questions() {
        assert!(parse_questions("  ", QuestionKind::Mixed).unwrap().is_empty());
    }

    #[test]
    fn garbage_reply_is_a_decode_error() {
        let err = parse_questions("not json", QuestionKind::Mixed).unwrap_err();
        assert!(matches!(err, GenerationError::Decode(_)));
    }
}
