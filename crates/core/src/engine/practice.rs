use crate::model::{CompletedSession, Question, QuestionId, Session, SessionId};
use crate::scoring::{self, AnswerSheet};

use super::timer::SessionTimer;
use super::{SessionProgress, finalize};

/// Immediate feedback shown once a practice question is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub question_id: QuestionId,
    pub selected: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: String,
}

/// Where a practice run stands on its current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticePhase {
    /// Waiting for the learner to pick an option.
    Presenting { index: usize },
    /// Answer locked in; feedback visible until the learner advances.
    Revealed { index: usize, feedback: Feedback },
}

impl PracticePhase {
    #[must_use]
    pub fn index(&self) -> usize {
        match self {
            PracticePhase::Presenting { index } | PracticePhase::Revealed { index, .. } => *index,
        }
    }
}

/// Result of selecting an option in practice mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    Revealed(Feedback),
    /// The current question was already answered; the selection was ignored.
    AlreadyRevealed,
}

/// Result of advancing a practice run.
#[derive(Debug)]
pub enum PracticeAdvance {
    /// Moved on to the next question.
    Next(PracticeRun),
    /// The current question has not been answered yet; nothing changed.
    NotRevealed(PracticeRun),
    /// The last question was advanced past and the session was finalized.
    Finished(CompletedSession),
}

/// Sequential-reveal run over a practice session.
///
/// Each question is answered exactly once and its feedback is shown before
/// moving on. Finishing consumes the run, so finalize cannot happen twice.
#[derive(Debug)]
pub struct PracticeRun {
    session: Session,
    phase: PracticePhase,
    answers: AnswerSheet,
    timer: SessionTimer,
}

impl PracticeRun {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session,
            phase: PracticePhase::Presenting { index: 0 },
            answers: AnswerSheet::new(),
            timer: SessionTimer::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn phase(&self) -> &PracticePhase {
        &self.phase
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.session.questions()[self.phase.index()]
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.phase.index() + 1 >= self.session.total_questions()
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.timer.elapsed_secs()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.session.total_questions();
        let answered = self.answers.len();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            position: Some(self.phase.index() + 1),
        }
    }

    /// Answer the current question.
    ///
    /// The first selection is recorded and graded immediately; later
    /// selections for the same question have no effect.
    pub fn select(&mut self, option: impl Into<String>) -> SelectOutcome {
        let PracticePhase::Presenting { index } = self.phase else {
            return SelectOutcome::AlreadyRevealed;
        };

        let selected = option.into();
        let question = &self.session.questions()[index];
        let feedback = Feedback {
            question_id: question.id.clone(),
            is_correct: scoring::is_correct(question, Some(selected.as_str())),
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
            selected: selected.clone(),
        };
        self.answers.record(question.id.clone(), selected);
        self.phase = PracticePhase::Revealed {
            index,
            feedback: feedback.clone(),
        };
        SelectOutcome::Revealed(feedback)
    }

    /// Move past a revealed question, finalizing after the last one.
    #[must_use]
    pub fn advance(mut self) -> PracticeAdvance {
        let PracticePhase::Revealed { index, .. } = self.phase else {
            return PracticeAdvance::NotRevealed(self);
        };

        let next = index + 1;
        if next < self.session.total_questions() {
            self.phase = PracticePhase::Presenting { index: next };
            return PracticeAdvance::Next(self);
        }

        let elapsed = self.timer.elapsed_secs();
        PracticeAdvance::Finished(finalize(self.session, &self.answers, elapsed))
    }

    pub fn tick(&mut self) {
        self.timer.tick();
    }

    /// Drop the run without finalizing. Recorded answers are discarded.
    #[must_use]
    pub fn abandon(self) -> SessionId {
        self.session.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::session_with;
    use crate::model::StudyMode;

    fn expect_next(advance: PracticeAdvance) -> PracticeRun {
        match advance {
            PracticeAdvance::Next(run) => run,
            other => panic!("expected next question, got {other:?}"),
        }
    }

    fn expect_finished(advance: PracticeAdvance) -> CompletedSession {
        match advance {
            PracticeAdvance::Finished(done) => done,
            other => panic!("expected finished session, got {other:?}"),
        }
    }

    #[test]
    fn single_correct_answer_scores_one() {
        let session = session_with(StudyMode::Practice, &[("Capital of France?", "Paris")]);
        let mut run = PracticeRun::new(session);

        let SelectOutcome::Revealed(feedback) = run.select("Paris") else {
            panic!("first selection must reveal");
        };
        assert!(feedback.is_correct);

        let done = expect_finished(run.advance());
        assert_eq!(done.score(), 1);
        assert_eq!(done.questions()[0].is_correct(), Some(true));
        assert_eq!(done.questions()[0].user_answer(), Some("Paris"));
    }

    #[test]
    fn revealed_answer_is_frozen() {
        let session = session_with(StudyMode::Practice, &[("Q1", "A"), ("Q2", "B")]);
        let mut run = PracticeRun::new(session);

        assert!(matches!(run.select("C"), SelectOutcome::Revealed(ref f) if !f.is_correct));
        assert_eq!(run.select("A"), SelectOutcome::AlreadyRevealed);

        let mut run = expect_next(run.advance());
        run.select("B");
        let done = expect_finished(run.advance());

        assert_eq!(done.questions()[0].user_answer(), Some("C"));
        assert_eq!(done.questions()[0].is_correct(), Some(false));
        assert_eq!(done.score(), 1);
    }

    #[test]
    fn advance_before_answer_is_a_no_op() {
        let session = session_with(StudyMode::Practice, &[("Q1", "A"), ("Q2", "B")]);
        let run = PracticeRun::new(session);

        let run = match run.advance() {
            PracticeAdvance::NotRevealed(run) => run,
            other => panic!("expected no-op, got {other:?}"),
        };
        assert_eq!(run.phase(), &PracticePhase::Presenting { index: 0 });
    }

    #[test]
    fn feedback_exposes_explanation() {
        let session = session_with(StudyMode::Practice, &[("Q1", "A")]);
        let mut run = PracticeRun::new(session);
        run.select("A");

        match run.phase() {
            PracticePhase::Revealed { feedback, .. } => {
                assert_eq!(feedback.explanation, "Because A.");
                assert_eq!(feedback.correct_answer, "A");
            }
            PracticePhase::Presenting { .. } => panic!("expected revealed phase"),
        }
    }

    #[test]
    fn finalize_captures_timer() {
        let session = session_with(StudyMode::Practice, &[("Q1", "A")]);
        let mut run = PracticeRun::new(session);
        for _ in 0..42 {
            run.tick();
        }
        run.select("A");
        run.tick();

        let done = expect_finished(run.advance());
        assert_eq!(done.time_elapsed_secs(), Some(43));
    }

    #[test]
    fn progress_tracks_position_and_answers() {
        let session = session_with(StudyMode::Practice, &[("Q1", "A"), ("Q2", "B"), ("Q3", "C")]);
        let mut run = PracticeRun::new(session);
        run.select("A");
        let run = expect_next(run.advance());

        let progress = run.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.remaining, 2);
        assert_eq!(progress.position, Some(2));
        assert!(!run.is_last_question());
    }
}
