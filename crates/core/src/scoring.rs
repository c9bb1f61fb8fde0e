//! Literal-equality scoring of answered questions.

use std::collections::HashMap;

use crate::model::{Question, QuestionId};

/// The learner's chosen option per question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: HashMap<QuestionId, String>,
}

impl AnswerSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `option` for `question`, replacing any earlier choice.
    pub fn record(&mut self, question: QuestionId, option: impl Into<String>) {
        self.answers.insert(question, option.into());
    }

    #[must_use]
    pub fn get(&self, question: &QuestionId) -> Option<&str> {
        self.answers.get(question).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, question: &QuestionId) -> bool {
        self.answers.contains_key(question)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

/// Graded copy of a question set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreReport {
    pub graded: Vec<Question>,
    pub correct_count: u32,
}

/// Whether `answer` is correct for `question`.
#[must_use]
pub fn is_correct(question: &Question, answer: Option<&str>) -> bool {
    answer == Some(question.correct_answer.as_str())
}

/// Grade every question against `answers`.
///
/// Never fails: an unanswered question grades as incorrect, and a question
/// whose correct answer is missing from its options simply never scores.
#[must_use]
pub fn score(questions: &[Question], answers: &AnswerSheet) -> ScoreReport {
    let mut correct_count = 0_u32;
    let graded = questions
        .iter()
        .map(|question| {
            let answer = answers.get(&question.id);
            if is_correct(question, answer) {
                correct_count = correct_count.saturating_add(1);
            }
            question.clone().graded(answer)
        })
        .collect();

    ScoreReport {
        graded,
        correct_count,
    }
}
