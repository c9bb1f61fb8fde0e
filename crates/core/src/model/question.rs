use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::settings::ParseSettingError;

//
// ─── QUESTION KIND ─────────────────────────────────────────────────────────────
//

/// Shape of the questions requested from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
    /// A blend of multiple-choice and true/false questions.
    Mixed,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple_choice",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::Mixed => "mixed",
        }
    }
}

impl std::str::FromStr for QuestionKind {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" | "multiple-choice" | "mc" => Ok(Self::MultipleChoice),
            "true_false" | "true-false" | "tf" => Ok(Self::TrueFalse),
            "mixed" => Ok(Self::Mixed),
            other => Err(ParseSettingError::new("question kind", other)),
        }
    }
}

//
// ─── GRADE ─────────────────────────────────────────────────────────────────────
//

/// Grade stamped onto a question when its session is finalized.
///
/// `user_answer` is `None` when the learner never answered; such a question is
/// still graded, and always as incorrect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    user_answer: Option<String>,
    is_correct: bool,
}

impl Grade {
    /// Grades `user_answer` against `correct_answer` by exact, case-sensitive equality.
    #[must_use]
    pub fn evaluate(correct_answer: &str, user_answer: Option<&str>) -> Self {
        Self {
            user_answer: user_answer.map(str::to_owned),
            is_correct: user_answer == Some(correct_answer),
        }
    }

    #[must_use]
    pub fn user_answer(&self) -> Option<&str> {
        self.user_answer.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single generated question.
///
/// Content fields are plain data. The grade is only ever set by session
/// finalization (or by rehydrating a finalized session from storage).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    grade: Option<Grade>,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        kind: QuestionKind,
        options: Vec<String>,
        correct_answer: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            kind,
            options,
            correct_answer: correct_answer.into(),
            explanation: explanation.into(),
            grade: None,
        }
    }

    /// Rehydrate a question, possibly graded, from persisted storage.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuestionId,
        text: String,
        kind: QuestionKind,
        options: Vec<String>,
        correct_answer: String,
        explanation: String,
        user_answer: Option<String>,
        is_correct: Option<bool>,
    ) -> Self {
        let grade = is_correct.map(|is_correct| Grade {
            user_answer,
            is_correct,
        });
        Self {
            id,
            text,
            kind,
            options,
            correct_answer,
            explanation,
            grade,
        }
    }

    /// The learner's recorded answer. `None` before finalization or when unanswered.
    #[must_use]
    pub fn user_answer(&self) -> Option<&str> {
        self.grade.as_ref().and_then(Grade::user_answer)
    }

    /// Correctness after finalization; `None` while the session is still open.
    #[must_use]
    pub fn is_correct(&self) -> Option<bool> {
        self.grade.as_ref().map(Grade::is_correct)
    }

    #[must_use]
    pub fn grade(&self) -> Option<&Grade> {
        self.grade.as_ref()
    }

    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }

    /// True when the options are distinct, there are at least two of them, and
    /// the correct answer is exactly one of them.
    ///
    /// Nothing rejects a malformed question; this only feeds diagnostics.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        if self.options.len() < 2 {
            return false;
        }
        let mut seen = std::collections::HashSet::with_capacity(self.options.len());
        if !self.options.iter().all(|opt| seen.insert(opt.as_str())) {
            return false;
        }
        self.options.iter().any(|opt| *opt == self.correct_answer)
    }

    /// Returns this question with its grade applied.
    #[must_use]
    pub(crate) fn graded(mut self, user_answer: Option<&str>) -> Self {
        self.grade = Some(Grade::evaluate(&self.correct_answer, user_answer));
        self
    }

    /// Returns an unanswered copy of this question.
    #[must_use]
    pub(crate) fn cleared(mut self) -> Self {
        self.grade = None;
        self
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn capital_question() -> Question {
        Question::new(
            QuestionId::new("q-1"),
            "Capital of France?",
            QuestionKind::MultipleChoice,
            vec!["Paris".into(), "Lyon".into(), "Nice".into()],
            "Paris",
            "Paris has been the capital since 987.",
        )
    }

    #[test]
    fn new_question_is_ungraded() {
        let q = capital_question();
        assert!(!q.is_graded());
        assert_eq!(q.user_answer(), None);
        assert_eq!(q.is_correct(), None);
    }

    #[test]
    fn grading_uses_exact_equality() {
        let q = capital_question().graded(Some("paris"));
        assert_eq!(q.user_answer(), Some("paris"));
        assert_eq!(q.is_correct(), Some(false));

        let q = capital_question().graded(Some("Paris"));
        assert_eq!(q.is_correct(), Some(true));
    }

    #[test]
    fn unanswered_grade_is_incorrect() {
        let q = capital_question().graded(None);
        assert_eq!(q.user_answer(), None);
        assert_eq!(q.is_correct(), Some(false));
    }

    #[test]
    fn cleared_drops_grade() {
        let q = capital_question().graded(Some("Paris")).cleared();
        assert!(!q.is_graded());
    }

    #[test]
    fn well_formed_detects_missing_correct_answer() {
        let mut q = capital_question();
        assert!(q.is_well_formed());
        q.correct_answer = "Marseille".into();
        assert!(!q.is_well_formed());
    }

    #[test]
    fn well_formed_rejects_duplicate_options() {
        let mut q = capital_question();
        q.options = vec!["Paris".into(), "Paris".into()];
        assert!(!q.is_well_formed());
    }

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("tf".parse::<QuestionKind>().unwrap(), QuestionKind::TrueFalse);
        assert_eq!(
            "multiple_choice".parse::<QuestionKind>().unwrap(),
            QuestionKind::MultipleChoice
        );
        assert!("essay".parse::<QuestionKind>().is_err());
    }
}
