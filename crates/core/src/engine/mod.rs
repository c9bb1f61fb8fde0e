//! Session state machines.
//!
//! A configured [`Session`] is started as either a [`PracticeRun`] (immediate
//! feedback, one answer per question) or an [`ExamRun`] (free navigation,
//! graded on submit). Both finish by consuming themselves into a
//! [`CompletedSession`].

mod exam;
mod practice;
mod timer;

pub use exam::ExamRun;
pub use practice::{Feedback, PracticeAdvance, PracticePhase, PracticeRun, SelectOutcome};
pub use timer::SessionTimer;

use crate::model::{CompletedSession, Session, SessionId, StudyMode};
use crate::scoring::{self, AnswerSheet};

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    /// 1-based position of the current question. `None` in exam mode, where
    /// there is no single current question.
    pub position: Option<usize>,
}

impl SessionProgress {
    #[must_use]
    pub fn percent_answered(&self) -> u32 {
        crate::model::rounded_percentage(self.answered as u64, self.total as u64)
    }
}

/// Grade `answers` against the session and seal the result.
pub(crate) fn finalize(
    session: Session,
    answers: &AnswerSheet,
    time_elapsed_secs: u32,
) -> CompletedSession {
    let (info, questions) = session.into_parts();
    let report = scoring::score(&questions, answers);
    CompletedSession::finalized(info, report.graded, report.correct_count, time_elapsed_secs)
}

/// The in-progress session, in whichever mode it was configured for.
#[derive(Debug)]
pub enum ActiveSession {
    Practice(PracticeRun),
    Exam(ExamRun),
}

impl ActiveSession {
    /// Start a run over `session` using its configured mode.
    #[must_use]
    pub fn start(session: Session) -> Self {
        match session.mode() {
            StudyMode::Practice => ActiveSession::Practice(PracticeRun::new(session)),
            StudyMode::Exam => ActiveSession::Exam(ExamRun::new(session)),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        match self {
            ActiveSession::Practice(run) => run.session(),
            ActiveSession::Exam(run) => run.session(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.session().id()
    }

    #[must_use]
    pub fn mode(&self) -> StudyMode {
        self.session().mode()
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        match self {
            ActiveSession::Practice(run) => run.elapsed_secs(),
            ActiveSession::Exam(run) => run.elapsed_secs(),
        }
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        match self {
            ActiveSession::Practice(run) => run.progress(),
            ActiveSession::Exam(run) => run.progress(),
        }
    }

    /// Advance the session clock by one second.
    pub fn tick(&mut self) {
        match self {
            ActiveSession::Practice(run) => run.tick(),
            ActiveSession::Exam(run) => run.tick(),
        }
    }

    /// Discard the run. Nothing is graded and nothing enters history.
    #[must_use]
    pub fn abandon(self) -> SessionId {
        match self {
            ActiveSession::Practice(run) => run.abandon(),
            ActiveSession::Exam(run) => run.abandon(),
        }
    }
}
