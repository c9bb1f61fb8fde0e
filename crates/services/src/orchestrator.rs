use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::analytics::{AnalyticsOptions, HistoryStats, summarize};
use quiz_core::engine::{ActiveSession, PracticeAdvance, SelectOutcome, SessionProgress};
use quiz_core::model::{
    CompletedSession, CoverImage, DocumentId, DocumentKind, DocumentStatus, QuestionId, Session,
    SessionId, SessionInfo, SessionSettings, SourceDocument, StudyMode,
};
use storage::repository::SessionHistoryRepository;
use tracing::{debug, error, info, warn};

use crate::error::OrchestratorError;
use crate::generation::{CoverImageGenerator, GenerationRequest, QuestionGenerator};

/// What happened when a practice session was advanced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PracticeStep {
    /// Moved on to the next question.
    Next,
    /// The current question is still unanswered; nothing changed.
    NotRevealed,
    /// The session finished and was added to history.
    Finished(CompletedSession),
}

/// Owns the document library, the session history and the one active session.
///
/// History is kept most-recent-first and only ever grows at the front.
pub struct StudyOrchestrator {
    clock: Clock,
    questions: Arc<dyn QuestionGenerator>,
    images: Arc<dyn CoverImageGenerator>,
    store: Arc<dyn SessionHistoryRepository>,
    analytics: AnalyticsOptions,
    reference_style: Option<String>,
    // Most recent first.
    documents: Vec<SourceDocument>,
    next_document_id: u64,
    history: Vec<CompletedSession>,
    active: Option<ActiveSession>,
}

impl StudyOrchestrator {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionGenerator>,
        images: Arc<dyn CoverImageGenerator>,
        store: Arc<dyn SessionHistoryRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            images,
            store,
            analytics: AnalyticsOptions::default(),
            reference_style: None,
            documents: Vec::new(),
            next_document_id: 1,
            history: Vec::new(),
            active: None,
        }
    }

    #[must_use]
    pub fn with_analytics(mut self, options: AnalyticsOptions) -> Self {
        self.analytics = options;
        self
    }

    /// Default style sample for generation when a request carries none.
    #[must_use]
    pub fn with_reference_style(mut self, style: Option<String>) -> Self {
        self.reference_style = style;
        self
    }

    /// Replace in-memory history with what the store holds.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Storage` if the store cannot be read.
    pub async fn load_history(&mut self) -> Result<usize, OrchestratorError> {
        self.history = self.store.list_sessions(None).await?;
        debug!(sessions = self.history.len(), "history loaded");
        Ok(self.history.len())
    }

    //
    // ─── DOCUMENTS ─────────────────────────────────────────────────────────────
    //

    /// Add a document to the library. Empty payloads are stored with status
    /// `Error` and cannot feed generation.
    pub fn add_document(
        &mut self,
        name: impl Into<String>,
        kind: DocumentKind,
        data: impl Into<Arc<[u8]>>,
    ) -> DocumentId {
        let id = DocumentId::new(self.next_document_id);
        self.next_document_id += 1;

        let data = data.into();
        let status = if data.is_empty() {
            DocumentStatus::Error
        } else {
            DocumentStatus::Ready
        };
        let document = SourceDocument::new(id, name, kind, status, self.clock.now(), data);
        info!(document_id = %id, name = document.name(), ?status, "document added");
        self.documents.insert(0, document);
        id
    }

    /// Update the ingestion status of a document.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::DocumentNotFound` for an unknown id.
    pub fn set_document_status(
        &mut self,
        id: DocumentId,
        status: DocumentStatus,
    ) -> Result<(), OrchestratorError> {
        let document = self
            .documents
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or(OrchestratorError::DocumentNotFound(id))?;
        document.set_status(status);
        Ok(())
    }

    #[must_use]
    pub fn documents(&self) -> &[SourceDocument] {
        &self.documents
    }

    pub fn ready_documents(&self) -> impl Iterator<Item = &SourceDocument> {
        self.documents.iter().filter(|d| d.is_ready())
    }

    #[must_use]
    pub fn document(&self, id: DocumentId) -> Option<&SourceDocument> {
        self.documents.iter().find(|d| d.id() == id)
    }

    //
    // ─── SESSION LIFECYCLE ─────────────────────────────────────────────────────
    //

    /// Generate questions from a document and start a session over them.
    ///
    /// On any error nothing is started and history is untouched. A failed
    /// cover image is not an error.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` if a session is already active, the
    /// document is missing or not ready, generation fails, or it yields no
    /// questions.
    pub async fn create_session(
        &mut self,
        document_id: DocumentId,
        settings: SessionSettings,
        reference_style: Option<&str>,
    ) -> Result<SessionId, OrchestratorError> {
        if self.active.is_some() {
            return Err(OrchestratorError::SessionActive);
        }
        let document = self
            .document(document_id)
            .cloned()
            .ok_or(OrchestratorError::DocumentNotFound(document_id))?;
        if !document.is_ready() {
            return Err(OrchestratorError::DocumentNotReady(document_id));
        }

        let request = GenerationRequest {
            document: &document,
            count: settings.question_count(),
            kind: settings.kind(),
            difficulty: settings.difficulty(),
            depth: settings.depth(),
            reference_style: reference_style.or(self.reference_style.as_deref()),
        };
        let questions = match self.questions.generate_questions(request).await {
            Ok(questions) => questions,
            Err(err) => {
                warn!(document_id = %document_id, error = %err, "question generation failed");
                return Err(err.into());
            }
        };
        if questions.is_empty() {
            warn!(document_id = %document_id, "generator returned no questions");
            return Err(OrchestratorError::NoQuestionsGenerated);
        }
        if questions.len() < settings.question_count() as usize {
            warn!(
                requested = settings.question_count(),
                received = questions.len(),
                "generator returned fewer questions than requested"
            );
        }
        for question in questions.iter().filter(|q| !q.is_well_formed()) {
            warn!(question_id = %question.id, "generated question is malformed");
        }

        let cover_image = self.cover_image(document.topic()).await;
        let info = SessionInfo::for_topic(
            SessionId::generate(),
            document.topic(),
            self.clock.now(),
            settings.mode(),
            settings.difficulty(),
            settings.depth(),
        )
        .with_cover_image(cover_image);
        let session = Session::new(info, questions)?;
        Ok(self.start(session))
    }

    async fn cover_image(&self, topic: &str) -> Option<CoverImage> {
        match self.images.cover_image(topic).await {
            Ok(image) => image,
            Err(err) => {
                warn!(topic, error = %err, "cover image generation failed");
                None
            }
        }
    }

    /// Start a fresh attempt at a finished session. History is not modified.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` if a session is already active or `id` is
    /// not in history.
    pub fn retry(&mut self, id: SessionId) -> Result<SessionId, OrchestratorError> {
        if self.active.is_some() {
            return Err(OrchestratorError::SessionActive);
        }
        let previous = self
            .history
            .iter()
            .find(|s| s.id() == id)
            .ok_or(OrchestratorError::SessionNotFound(id))?;
        let session = previous.retry(SessionId::generate(), self.clock.now());
        info!(retry_of = %id, "retrying session");
        Ok(self.start(session))
    }

    fn start(&mut self, session: Session) -> SessionId {
        let id = session.id();
        info!(
            session_id = %id,
            mode = %session.mode(),
            questions = session.total_questions(),
            "session started"
        );
        self.active = Some(ActiveSession::start(session));
        id
    }

    #[must_use]
    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        self.active.as_ref().map(ActiveSession::progress)
    }

    /// Advance the active session's clock by one second. Returns `false` when
    /// nothing is active.
    pub fn tick(&mut self) -> bool {
        match self.active.as_mut() {
            Some(active) => {
                active.tick();
                true
            }
            None => false,
        }
    }

    /// Discard the active session without recording it.
    pub fn abandon(&mut self) -> Option<SessionId> {
        let id = self.active.take()?.abandon();
        info!(session_id = %id, "session abandoned");
        Some(id)
    }

    //
    // ─── PRACTICE ──────────────────────────────────────────────────────────────
    //

    /// Answer the current practice question.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` if no practice session is active.
    pub fn select_practice(
        &mut self,
        option: impl Into<String>,
    ) -> Result<SelectOutcome, OrchestratorError> {
        match self.active.as_mut() {
            Some(ActiveSession::Practice(run)) => Ok(run.select(option)),
            Some(ActiveSession::Exam(_)) => Err(OrchestratorError::WrongMode {
                expected: StudyMode::Practice,
            }),
            None => Err(OrchestratorError::NoActiveSession),
        }
    }

    /// Move past the revealed practice question, finishing after the last.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` if no practice session is active.
    pub async fn advance_practice(&mut self) -> Result<PracticeStep, OrchestratorError> {
        let run = match self.active.take() {
            Some(ActiveSession::Practice(run)) => run,
            other => {
                let err = if other.is_some() {
                    OrchestratorError::WrongMode {
                        expected: StudyMode::Practice,
                    }
                } else {
                    OrchestratorError::NoActiveSession
                };
                self.active = other;
                return Err(err);
            }
        };

        match run.advance() {
            PracticeAdvance::Next(run) => {
                self.active = Some(ActiveSession::Practice(run));
                Ok(PracticeStep::Next)
            }
            PracticeAdvance::NotRevealed(run) => {
                self.active = Some(ActiveSession::Practice(run));
                Ok(PracticeStep::NotRevealed)
            }
            PracticeAdvance::Finished(done) => Ok(PracticeStep::Finished(self.record(done).await)),
        }
    }

    //
    // ─── EXAM ──────────────────────────────────────────────────────────────────
    //

    /// Record an exam answer, replacing any earlier one for that question.
    /// Returns `false` if the question is not part of the session.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` if no exam session is active.
    pub fn select_exam(
        &mut self,
        question: &QuestionId,
        option: impl Into<String>,
    ) -> Result<bool, OrchestratorError> {
        match self.active.as_mut() {
            Some(ActiveSession::Exam(run)) => Ok(run.select(question, option)),
            Some(ActiveSession::Practice(_)) => Err(OrchestratorError::WrongMode {
                expected: StudyMode::Exam,
            }),
            None => Err(OrchestratorError::NoActiveSession),
        }
    }

    /// Grade the exam as answered so far and add it to history.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` if no exam session is active.
    pub async fn submit_exam(&mut self) -> Result<CompletedSession, OrchestratorError> {
        let run = match self.active.take() {
            Some(ActiveSession::Exam(run)) => run,
            other => {
                let err = if other.is_some() {
                    OrchestratorError::WrongMode {
                        expected: StudyMode::Exam,
                    }
                } else {
                    OrchestratorError::NoActiveSession
                };
                self.active = other;
                return Err(err);
            }
        };
        Ok(self.record(run.submit()).await)
    }

    //
    // ─── HISTORY ───────────────────────────────────────────────────────────────
    //

    /// Prepend a finished session to history and persist it.
    ///
    /// A persistence failure is logged; the session stays in memory.
    async fn record(&mut self, done: CompletedSession) -> CompletedSession {
        info!(
            session_id = %done.id(),
            score = done.score(),
            total = done.total_questions(),
            elapsed_secs = done.time_elapsed_secs(),
            "session finished"
        );
        if let Err(err) = self.store.append_session(&done).await {
            error!(session_id = %done.id(), error = %err, "failed to persist session");
        }
        self.history.insert(0, done.clone());
        done
    }

    /// Finished sessions, most recent first.
    #[must_use]
    pub fn history(&self) -> &[CompletedSession] {
        &self.history
    }

    #[must_use]
    pub fn session(&self, id: SessionId) -> Option<&CompletedSession> {
        self.history.iter().find(|s| s.id() == id)
    }

    /// Analytics over the full current history.
    #[must_use]
    pub fn stats(&self) -> HistoryStats {
        summarize(&self.history, &self.analytics)
    }
}
