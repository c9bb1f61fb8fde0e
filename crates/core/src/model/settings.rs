use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::question::QuestionKind;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSettingsError {
    #[error("question count must be between {min} and {max}, got {count}")]
    InvalidQuestionCount { count: u32, min: u32, max: u32 },
}

/// Error returned when a setting name cannot be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {setting}: {raw}")]
pub struct ParseSettingError {
    setting: &'static str,
    raw: String,
}

impl ParseSettingError {
    pub(crate) fn new(setting: &'static str, raw: &str) -> Self {
        Self {
            setting,
            raw: raw.to_owned(),
        }
    }
}

//
// ─── ENUMS ─────────────────────────────────────────────────────────────────────
//

/// How a session delivers its questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    /// One question at a time with immediate feedback.
    Practice,
    /// All questions open at once, graded on submit.
    Exam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Length of question stems and explanations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    Short,
    #[default]
    Medium,
    Long,
}

impl StudyMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StudyMode::Practice => "practice",
            StudyMode::Exam => "exam",
        }
    }
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl Depth {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Short => "short",
            Depth::Medium => "medium",
            Depth::Long => "long",
        }
    }
}

impl FromStr for StudyMode {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "practice" => Ok(Self::Practice),
            "exam" => Ok(Self::Exam),
            other => Err(ParseSettingError::new("study mode", other)),
        }
    }
}

impl FromStr for Difficulty {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(ParseSettingError::new("difficulty", other)),
        }
    }
}

impl FromStr for Depth {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "short" => Ok(Self::Short),
            "medium" => Ok(Self::Medium),
            "long" => Ok(Self::Long),
            other => Err(ParseSettingError::new("depth", other)),
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── SESSION SETTINGS ──────────────────────────────────────────────────────────
//

/// Parameters chosen by the learner when configuring a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    mode: StudyMode,
    kind: QuestionKind,
    difficulty: Difficulty,
    depth: Depth,
    question_count: u32,
}

impl SessionSettings {
    pub const MIN_QUESTIONS: u32 = 3;
    pub const MAX_QUESTIONS: u32 = 50;
    pub const DEFAULT_QUESTIONS: u32 = 10;

    /// Build validated settings.
    ///
    /// # Errors
    ///
    /// Returns `SessionSettingsError::InvalidQuestionCount` when `question_count`
    /// is outside `[MIN_QUESTIONS, MAX_QUESTIONS]`.
    pub fn new(
        mode: StudyMode,
        kind: QuestionKind,
        difficulty: Difficulty,
        depth: Depth,
        question_count: u32,
    ) -> Result<Self, SessionSettingsError> {
        if !(Self::MIN_QUESTIONS..=Self::MAX_QUESTIONS).contains(&question_count) {
            return Err(SessionSettingsError::InvalidQuestionCount {
                count: question_count,
                min: Self::MIN_QUESTIONS,
                max: Self::MAX_QUESTIONS,
            });
        }
        Ok(Self {
            mode,
            kind,
            difficulty,
            depth,
            question_count,
        })
    }

    /// Practice session with ten medium multiple-choice questions.
    #[must_use]
    pub fn practice_default() -> Self {
        Self {
            mode: StudyMode::Practice,
            kind: QuestionKind::MultipleChoice,
            difficulty: Difficulty::Medium,
            depth: Depth::Medium,
            question_count: Self::DEFAULT_QUESTIONS,
        }
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.mode
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn depth(&self) -> Depth {
        self.depth
    }

    #[must_use]
    pub fn question_count(&self) -> u32 {
        self.question_count
    }

    #[must_use]
    pub fn with_mode(mut self, mode: StudyMode) -> Self {
        self.mode = mode;
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
