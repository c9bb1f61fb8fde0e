use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, SessionId};
use crate::model::question::{Grade, Question};
use crate::model::settings::{Depth, Difficulty, StudyMode};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("a session needs at least one question")]
    Empty,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CompletedSessionError {
    #[error("a completed session needs at least one question")]
    Empty,

    #[error("score {score} exceeds question count {total}")]
    ScoreOutOfRange { score: u32, total: u32 },

    #[error("score {score} does not match {correct} correctly graded questions")]
    ScoreMismatch { score: u32, correct: u32 },

    #[error("question {index} has not been graded")]
    Ungraded { index: usize },

    #[error("question {index} is marked inconsistently with its recorded answer")]
    GradeMismatch { index: usize },

    #[error("too many questions for a single session: {len}")]
    TooManyQuestions { len: usize },
}

/// Opaque reference to a generated cover image (typically a data URI).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverImage(String);

impl CoverImage {
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Descriptive header shared by configured and completed sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub title: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub mode: StudyMode,
    pub difficulty: Difficulty,
    pub depth: Depth,
    pub cover_image: Option<CoverImage>,
}

impl SessionInfo {
    /// Session header for a document-derived topic.
    #[must_use]
    pub fn for_topic(
        id: SessionId,
        topic: impl Into<String>,
        created_at: DateTime<Utc>,
        mode: StudyMode,
        difficulty: Difficulty,
        depth: Depth,
    ) -> Self {
        let topic = topic.into();
        Self {
            id,
            title: format!("Mock exam: {topic}"),
            topic,
            created_at,
            mode,
            difficulty,
            depth,
            cover_image: None,
        }
    }

    #[must_use]
    pub fn with_cover_image(mut self, cover_image: Option<CoverImage>) -> Self {
        self.cover_image = cover_image;
        self
    }
}

//
// ─── CONFIGURED SESSION ────────────────────────────────────────────────────────
//

/// A configured session that has not been played yet.
///
/// Every question is unanswered and the score is implicitly zero. The question
/// list is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    info: SessionInfo,
    questions: Vec<Question>,
}

impl Session {
    /// Create a configured session. Any grades on `questions` are cleared and
    /// a repeated question id is replaced with an unused positional one, so
    /// answers keyed by id never collide.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `questions` is empty.
    pub fn new(info: SessionInfo, questions: Vec<Question>) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        let questions = with_unique_ids(questions.into_iter().map(Question::cleared).collect());
        Ok(Self { info, questions })
    }

    #[must_use]
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.info.id
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.info.mode
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub(crate) fn into_parts(self) -> (SessionInfo, Vec<Question>) {
        (self.info, self.questions)
    }
}

/// First occurrence of an id keeps it; later duplicates are renamed.
fn with_unique_ids(mut questions: Vec<Question>) -> Vec<Question> {
    let mut taken: HashSet<QuestionId> = questions.iter().map(|q| q.id.clone()).collect();
    let mut seen = HashSet::with_capacity(questions.len());
    for (index, question) in questions.iter_mut().enumerate() {
        if seen.insert(question.id.clone()) {
            continue;
        }
        let fresh = QuestionId::unused_positional(index, |id| taken.contains(id));
        taken.insert(fresh.clone());
        seen.insert(fresh.clone());
        question.id = fresh;
    }
    questions
}

//
// ─── COMPLETED SESSION ─────────────────────────────────────────────────────────
//

/// A finalized session. Immutable; the only form that enters history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedSession {
    info: SessionInfo,
    questions: Vec<Question>,
    score: u32,
    time_elapsed_secs: Option<u32>,
}

impl CompletedSession {
    /// Produced only by session finalization, which upholds every invariant.
    pub(crate) fn finalized(
        info: SessionInfo,
        questions: Vec<Question>,
        score: u32,
        time_elapsed_secs: u32,
    ) -> Self {
        Self {
            info,
            questions,
            score,
            time_elapsed_secs: Some(time_elapsed_secs),
        }
    }

    /// Rehydrate a completed session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `CompletedSessionError` if the questions are empty or ungraded,
    /// if a stored correctness flag disagrees with its recorded answer, or if
    /// `score` disagrees with the graded questions.
    pub fn from_persisted(
        info: SessionInfo,
        questions: Vec<Question>,
        score: u32,
        time_elapsed_secs: Option<u32>,
    ) -> Result<Self, CompletedSessionError> {
        if questions.is_empty() {
            return Err(CompletedSessionError::Empty);
        }
        let total = u32::try_from(questions.len()).map_err(|_| {
            CompletedSessionError::TooManyQuestions {
                len: questions.len(),
            }
        })?;
        if score > total {
            return Err(CompletedSessionError::ScoreOutOfRange { score, total });
        }

        let mut correct = 0_u32;
        for (index, question) in questions.iter().enumerate() {
            let Some(grade) = question.grade() else {
                return Err(CompletedSessionError::Ungraded { index });
            };
            let expected = Grade::evaluate(&question.correct_answer, grade.user_answer());
            if expected.is_correct() != grade.is_correct() {
                return Err(CompletedSessionError::GradeMismatch { index });
            }
            if grade.is_correct() {
                correct += 1;
            }
        }
        if correct != score {
            return Err(CompletedSessionError::ScoreMismatch { score, correct });
        }

        Ok(Self {
            info,
            questions,
            score,
            time_elapsed_secs,
        })
    }

    /// Configure a fresh attempt at the same questions.
    ///
    /// The new session gets its own id and creation time; this session is left
    /// untouched.
    #[must_use]
    pub fn retry(&self, id: SessionId, created_at: DateTime<Utc>) -> Session {
        let info = SessionInfo {
            id,
            created_at,
            ..self.info.clone()
        };
        Session {
            info,
            questions: self.questions.iter().cloned().map(Question::cleared).collect(),
        }
    }

    #[must_use]
    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.info.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.info.title
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.info.topic
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.info.created_at
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.info.mode
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        u32::try_from(self.questions.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn incorrect_count(&self) -> u32 {
        self.total_questions() - self.score
    }

    #[must_use]
    pub fn time_elapsed_secs(&self) -> Option<u32> {
        self.time_elapsed_secs
    }

    /// Score as a rounded percentage of the question count.
    #[must_use]
    pub fn percentage(&self) -> u32 {
        rounded_percentage(u64::from(self.score), u64::from(self.total_questions()))
    }

    /// Score rendered as `correct/total`.
    #[must_use]
    pub fn raw_fraction(&self) -> String {
        format!("{}/{}", self.score, self.total_questions())
    }

    /// Average seconds spent per question, or 0 when no time was recorded.
    #[must_use]
    pub fn pace_secs(&self) -> u32 {
        self.time_elapsed_secs.map_or(0, |secs| {
            rounded_ratio(u64::from(secs), u64::from(self.total_questions()))
        })
    }
}

/// `round(100 * part / whole)` with halves rounded up; 0 when `whole` is 0.
#[must_use]
pub fn rounded_percentage(part: u64, whole: u64) -> u32 {
    rounded_ratio(part.saturating_mul(100), whole)
}

/// `round(num / den)` with halves rounded up; 0 when `den` is 0.
#[must_use]
pub fn rounded_ratio(num: u64, den: u64) -> u32 {
    if den == 0 {
        return 0;
    }
    let rounded = (num.saturating_mul(2).saturating_add(den)) / den.saturating_mul(2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Format seconds as `m:ss`.
#[must_use]
pub fn format_elapsed(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}
