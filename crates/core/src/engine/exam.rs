use crate::model::{CompletedSession, QuestionId, Session, SessionId};
use crate::scoring::AnswerSheet;

use super::timer::SessionTimer;
use super::{SessionProgress, finalize};

/// Deferred-grading run over an exam session.
///
/// Answers can be changed freely, in any order, until `submit`. Correctness is
/// never revealed before then.
#[derive(Debug)]
pub struct ExamRun {
    session: Session,
    answers: AnswerSheet,
    timer: SessionTimer,
}

impl ExamRun {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session,
            answers: AnswerSheet::new(),
            timer: SessionTimer::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.timer.elapsed_secs()
    }

    /// Record `option` for `question`, overwriting any earlier selection.
    ///
    /// Returns `false` (and records nothing) if the question is not part of
    /// this session.
    pub fn select(&mut self, question: &QuestionId, option: impl Into<String>) -> bool {
        if !self.session.questions().iter().any(|q| &q.id == question) {
            return false;
        }
        self.answers.record(question.clone(), option);
        true
    }

    /// Current selection for `question`, if any.
    #[must_use]
    pub fn selection(&self, question: &QuestionId) -> Option<&str> {
        self.answers.get(question)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.session.total_questions();
        let answered = self.answers.len();
        SessionProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            position: None,
        }
    }

    /// Grade the answers as they stand and close the session.
    #[must_use]
    pub fn submit(self) -> CompletedSession {
        let elapsed = self.timer.elapsed_secs();
        finalize(self.session, &self.answers, elapsed)
    }

    pub fn tick(&mut self) {
        self.timer.tick();
    }

    /// Drop the run without grading. Selections are discarded.
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

    fn qid(run: &ExamRun, index: usize) -> QuestionId {
        run.session().questions()[index].id.clone()
    }

    #[test]
    fn partial_exam_grades_unanswered_as_incorrect() {
        let session = session_with(StudyMode::Exam, &[("Q1", "A"), ("Q2", "B"), ("Q3", "C")]);
        let mut run = ExamRun::new(session);
        let (q1, q3) = (qid(&run, 0), qid(&run, 2));

        assert!(run.select(&q1, "A"));
        assert!(run.select(&q3, "A"));
        let done = run.submit();

        assert_eq!(done.score(), 1);
        assert_eq!(done.questions()[0].is_correct(), Some(true));
        assert_eq!(done.questions()[1].user_answer(), None);
        assert_eq!(done.questions()[1].is_correct(), Some(false));
        assert_eq!(done.questions()[2].user_answer(), Some("A"));
        assert_eq!(done.questions()[2].is_correct(), Some(false));
    }

    #[test]
    fn last_selection_wins() {
        let session = session_with(StudyMode::Exam, &[("Q1", "A"), ("Q2", "B"), ("Q3", "C")]);
        let mut run = ExamRun::new(session);
        let (q1, q2) = (qid(&run, 0), qid(&run, 1));

        run.select(&q2, "B");
        run.select(&q1, "A");
        run.select(&q1, "C");
        run.select(&q1, "B");
        assert_eq!(run.selection(&q1), Some("B"));
        assert_eq!(run.answered_count(), 2);

        let done = run.submit();
        assert_eq!(done.questions()[0].user_answer(), Some("B"));
        assert_eq!(done.score(), 1);
    }

    #[test]
    fn unknown_question_is_ignored() {
        let session = session_with(StudyMode::Exam, &[("Q1", "A")]);
        let mut run = ExamRun::new(session);

        assert!(!run.select(&QuestionId::new("missing"), "A"));
        assert_eq!(run.answered_count(), 0);
    }

    #[test]
    fn submit_records_elapsed_time() {
        let session = session_with(StudyMode::Exam, &[("Q1", "A")]);
        let mut run = ExamRun::new(session);
        for _ in 0..125 {
            run.tick();
        }
        let done = run.submit();
        assert_eq!(done.time_elapsed_secs(), Some(125));
    }

    #[test]
    fn progress_has_no_position() {
        let session = session_with(StudyMode::Exam, &[("Q1", "A"), ("Q2", "B")]);
        let mut run = ExamRun::new(session);
        let q2 = qid(&run, 1);
        run.select(&q2, "B");

        let progress = run.progress();
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.remaining, 1);
        assert_eq!(progress.position, None);
        assert_eq!(progress.percent_answered(), 50);
    }
}
