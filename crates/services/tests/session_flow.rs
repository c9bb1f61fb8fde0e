use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quiz_core::engine::{ActiveSession, SelectOutcome};
use quiz_core::model::{
    CompletedSession, CoverImage, Depth, Difficulty, DocumentId, DocumentKind, Question,
    QuestionId, QuestionKind, SessionId, SessionSettings, StudyMode,
};
use quiz_core::time::fixed_now;
use services::{
    Clock, CoverImageGenerator, GenerationError, GenerationRequest, OrchestratorError,
    PracticeStep, QuestionGenerator, StudyOrchestrator,
};
use storage::repository::{InMemoryRepository, SessionHistoryRepository, Storage, StorageError};

/// Generator that replays a fixed question set and remembers what it was asked.
#[derive(Default)]
struct ScriptedGenerator {
    questions: Vec<Question>,
    fail: bool,
    styles: Mutex<Vec<Option<String>>>,
}

impl ScriptedGenerator {
    fn with(questions: Vec<Question>) -> Self {
        Self {
            questions,
            ..Self::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl QuestionGenerator for ScriptedGenerator {
    async fn generate_questions(
        &self,
        request: GenerationRequest<'_>,
    ) -> Result<Vec<Question>, GenerationError> {
        self.styles
            .lock()
            .unwrap()
            .push(request.reference_style.map(str::to_string));
        if self.fail {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(self
            .questions
            .iter()
            .take(request.count as usize)
            .cloned()
            .collect())
    }
}

struct Images {
    fail: bool,
}

#[async_trait]
impl CoverImageGenerator for Images {
    async fn cover_image(&self, topic: &str) -> Result<Option<CoverImage>, GenerationError> {
        if self.fail {
            return Err(GenerationError::Decode("no image".into()));
        }
        Ok(Some(CoverImage::new(format!("cover:{topic}"))))
    }
}

/// Store whose writes always fail.
struct BrokenStore;

#[async_trait]
impl SessionHistoryRepository for BrokenStore {
    async fn append_session(&self, _session: &CompletedSession) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk full".into()))
    }

    async fn get_session(&self, _id: SessionId) -> Result<CompletedSession, StorageError> {
        Err(StorageError::NotFound)
    }

    async fn list_sessions(
        &self,
        _limit: Option<u32>,
    ) -> Result<Vec<CompletedSession>, StorageError> {
        Ok(Vec::new())
    }
}

fn question(id: &str, text: &str, options: &[&str], correct: &str) -> Question {
    Question::new(
        QuestionId::new(id),
        text,
        QuestionKind::MultipleChoice,
        options.iter().map(|o| (*o).to_string()).collect(),
        correct,
        format!("The answer is {correct}."),
    )
}

fn three_questions() -> Vec<Question> {
    vec![
        question("q-1", "Q1", &["A", "B", "C"], "A"),
        question("q-2", "Q2", &["A", "B", "C"], "B"),
        question("q-3", "Q3", &["A", "B", "C"], "C"),
    ]
}

fn settings(mode: StudyMode, count: u32) -> SessionSettings {
    SessionSettings::new(
        mode,
        QuestionKind::MultipleChoice,
        Difficulty::Medium,
        Depth::Medium,
        count,
    )
    .unwrap()
}

struct Harness {
    orch: StudyOrchestrator,
    generator: Arc<ScriptedGenerator>,
    store: Arc<InMemoryRepository>,
    doc: DocumentId,
}

fn harness_with(generator: ScriptedGenerator, images_fail: bool) -> Harness {
    let generator = Arc::new(generator);
    let store = Arc::new(InMemoryRepository::new());
    let mut orch = StudyOrchestrator::new(
        Clock::fixed(fixed_now()),
        generator.clone(),
        Arc::new(Images { fail: images_fail }),
        store.clone(),
    );
    let doc = orch.add_document("Geography", DocumentKind::Text, b"Paris is in France.".to_vec());
    Harness {
        orch,
        generator,
        store,
        doc,
    }
}

fn harness() -> Harness {
    harness_with(ScriptedGenerator::with(three_questions()), false)
}

#[tokio::test]
async fn practice_single_correct_answer() {
    let mut h = harness_with(
        ScriptedGenerator::with(vec![question(
            "capital",
            "Capital of France?",
            &["Paris", "Lyon", "Nice"],
            "Paris",
        )]),
        false,
    );
    h.orch
        .create_session(h.doc, settings(StudyMode::Practice, 3), None)
        .await
        .unwrap();

    let outcome = h.orch.select_practice("Paris").unwrap();
    assert!(matches!(outcome, SelectOutcome::Revealed(ref f) if f.is_correct));

    let PracticeStep::Finished(done) = h.orch.advance_practice().await.unwrap() else {
        panic!("single-question session should finish");
    };
    assert_eq!(done.score(), 1);
    assert_eq!(done.questions()[0].is_correct(), Some(true));
    assert_eq!(done.title(), "Mock exam: Geography");
    assert!(h.orch.active().is_none());
    assert_eq!(h.orch.history(), [done.clone()]);
    assert_eq!(h.store.get_session(done.id()).await.unwrap(), done);
}

#[tokio::test]
async fn practice_answers_stay_frozen_when_generator_repeats_ids() {
    let mut h = harness_with(
        ScriptedGenerator::with(vec![
            question("q-2", "Q1", &["A", "B"], "A"),
            question("q-2", "Q2", &["A", "B"], "B"),
        ]),
        false,
    );
    h.orch
        .create_session(h.doc, settings(StudyMode::Practice, 3), None)
        .await
        .unwrap();

    let first = h.orch.select_practice("A").unwrap();
    assert!(matches!(first, SelectOutcome::Revealed(ref f) if f.is_correct));
    assert_eq!(h.orch.advance_practice().await.unwrap(), PracticeStep::Next);
    h.orch.select_practice("B").unwrap();
    let PracticeStep::Finished(done) = h.orch.advance_practice().await.unwrap() else {
        panic!("two-question session should finish");
    };

    let q1 = &done.questions()[0];
    let q2 = &done.questions()[1];
    assert_ne!(q1.id, q2.id);
    assert_eq!(q1.user_answer(), Some("A"));
    assert_eq!(q1.is_correct(), Some(true));
    assert_eq!(q2.user_answer(), Some("B"));
    assert_eq!(done.score(), 2);
}

#[tokio::test]
async fn exam_partial_submission() {
    let mut h = harness();
    h.orch
        .create_session(h.doc, settings(StudyMode::Exam, 3), None)
        .await
        .unwrap();

    assert!(h.orch.select_exam(&QuestionId::new("q-1"), "A").unwrap());
    assert!(h.orch.select_exam(&QuestionId::new("q-3"), "B").unwrap());
    assert!(!h.orch.select_exam(&QuestionId::new("q-9"), "A").unwrap());
    for _ in 0..90 {
        h.orch.tick();
    }

    let done = h.orch.submit_exam().await.unwrap();
    assert_eq!(done.score(), 1);
    assert_eq!(done.questions()[1].user_answer(), None);
    assert_eq!(done.questions()[1].is_correct(), Some(false));
    assert_eq!(done.time_elapsed_secs(), Some(90));
    assert_eq!(done.pace_secs(), 30);
    assert_eq!(done.info().cover_image, Some(CoverImage::new("cover:Geography")));
}

#[tokio::test]
async fn abandon_never_touches_history() {
    let mut h = harness();

    h.orch
        .create_session(h.doc, settings(StudyMode::Practice, 3), None)
        .await
        .unwrap();
    h.orch.select_practice("A").unwrap();
    let abandoned = h.orch.abandon().unwrap();

    h.orch
        .create_session(h.doc, settings(StudyMode::Exam, 3), None)
        .await
        .unwrap();
    h.orch.select_exam(&QuestionId::new("q-2"), "B").unwrap();
    h.orch.abandon().unwrap();

    assert!(h.orch.history().is_empty());
    assert!(h.orch.active().is_none());
    assert!(h.store.list_sessions(None).await.unwrap().is_empty());
    assert!(h.orch.session(abandoned).is_none());
}

#[tokio::test]
async fn one_session_at_a_time() {
    let mut h = harness();
    h.orch
        .create_session(h.doc, settings(StudyMode::Exam, 3), None)
        .await
        .unwrap();

    let err = h
        .orch
        .create_session(h.doc, settings(StudyMode::Practice, 3), None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::SessionActive));
    assert!(matches!(h.orch.active(), Some(ActiveSession::Exam(_))));
}

#[tokio::test]
async fn wrong_mode_actions_leave_session_intact() {
    let mut h = harness();
    h.orch
        .create_session(h.doc, settings(StudyMode::Exam, 3), None)
        .await
        .unwrap();

    assert!(matches!(
        h.orch.select_practice("A"),
        Err(OrchestratorError::WrongMode {
            expected: StudyMode::Practice
        })
    ));
    assert!(matches!(
        h.orch.advance_practice().await,
        Err(OrchestratorError::WrongMode { .. })
    ));
    assert!(matches!(h.orch.active(), Some(ActiveSession::Exam(_))));
}

#[tokio::test]
async fn generation_failure_creates_nothing() {
    let mut h = harness_with(ScriptedGenerator::failing(), false);

    let err = h
        .orch
        .create_session(h.doc, settings(StudyMode::Practice, 5), None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Generation(_)));
    assert!(h.orch.active().is_none());
    assert!(h.orch.history().is_empty());
}

#[tokio::test]
async fn image_failure_is_not_fatal() {
    let mut h = harness_with(ScriptedGenerator::with(three_questions()), true);
    h.orch
        .create_session(h.doc, settings(StudyMode::Exam, 3), None)
        .await
        .unwrap();

    let active = h.orch.active().unwrap();
    assert_eq!(active.session().info().cover_image, None);
}

#[tokio::test]
async fn short_generation_is_tolerated() {
    let mut h = harness();
    h.orch
        .create_session(h.doc, settings(StudyMode::Exam, 10), None)
        .await
        .unwrap();

    assert_eq!(h.orch.progress().unwrap().total, 3);
}

#[tokio::test]
async fn reference_style_falls_back_to_default() {
    let generator = ScriptedGenerator::with(three_questions());
    let mut h = harness_with(generator, false);
    h.orch = h
        .orch
        .with_reference_style(Some("Socratic dialogue.".into()));
    let doc = h
        .orch
        .add_document("History", DocumentKind::Text, b"Rome.".to_vec());

    h.orch
        .create_session(doc, settings(StudyMode::Exam, 3), None)
        .await
        .unwrap();
    h.orch.abandon();
    h.orch
        .create_session(doc, settings(StudyMode::Exam, 3), Some("Case law."))
        .await
        .unwrap();

    let styles = h.generator.styles.lock().unwrap().clone();
    assert_eq!(
        styles,
        vec![
            Some("Socratic dialogue.".to_string()),
            Some("Case law.".to_string())
        ]
    );
}

#[tokio::test]
async fn retry_creates_a_new_record() {
    let mut h = harness();
    h.orch
        .create_session(h.doc, settings(StudyMode::Exam, 3), None)
        .await
        .unwrap();
    let first = h.orch.submit_exam().await.unwrap();

    let retry_id = h.orch.retry(first.id()).unwrap();
    assert_ne!(retry_id, first.id());
    assert_eq!(h.orch.history().len(), 1);
    assert!(h
        .orch
        .active()
        .unwrap()
        .session()
        .questions()
        .iter()
        .all(|q| !q.is_graded()));

    for (id, answer) in [("q-1", "A"), ("q-2", "B"), ("q-3", "C")] {
        h.orch.select_exam(&QuestionId::new(id), answer).unwrap();
    }
    let second = h.orch.submit_exam().await.unwrap();

    assert_eq!(second.score(), 3);
    let ids: Vec<_> = h.orch.history().iter().map(CompletedSession::id).collect();
    assert_eq!(ids, vec![second.id(), first.id()]);
    assert_eq!(h.orch.session(first.id()).unwrap().score(), 0);
}

#[tokio::test]
async fn stats_pool_sessions_on_the_same_topic() {
    let ten: Vec<Question> = (0..10)
        .map(|i| question(&format!("q-{i}"), "Q", &["A", "B"], "A"))
        .collect();
    let mut h = harness_with(ScriptedGenerator::with(ten), false);
    let algebra = h
        .orch
        .add_document("Algebra", DocumentKind::Text, b"x + 1 = 2".to_vec());

    for correct in [8, 4] {
        h.orch
            .create_session(algebra, settings(StudyMode::Exam, 10), None)
            .await
            .unwrap();
        for i in 0..10 {
            let answer = if i < correct { "A" } else { "B" };
            h.orch
                .select_exam(&QuestionId::new(format!("q-{i}")), answer)
                .unwrap();
        }
        h.orch.submit_exam().await.unwrap();
    }

    let stats = h.orch.stats();
    let topic = &stats.topics[0];
    assert_eq!(topic.topic, "Algebra");
    assert_eq!((topic.correct, topic.total_questions), (12, 20));
    assert_eq!(topic.percentage, 60);
    assert_eq!(stats.weak_points[0].topic, "Algebra");
    assert_eq!(stats.evolution.len(), 2);
    assert_eq!(stats.evolution[0].raw_fraction, "8/10");
}

#[tokio::test]
async fn persistence_failure_keeps_session_in_memory() {
    let mut orch = StudyOrchestrator::new(
        Clock::fixed(fixed_now()),
        Arc::new(ScriptedGenerator::with(three_questions())),
        Arc::new(Images { fail: false }),
        Arc::new(BrokenStore),
    );
    let doc = orch.add_document("Geography", DocumentKind::Text, b"x".to_vec());
    orch.create_session(doc, settings(StudyMode::Exam, 3), None)
        .await
        .unwrap();

    let done = orch.submit_exam().await.unwrap();
    assert_eq!(orch.history(), [done]);
}

#[tokio::test]
async fn history_survives_restart_with_sqlite() {
    let storage = Storage::sqlite("sqlite:file:memdb_session_flow?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    let generator = Arc::new(ScriptedGenerator::with(three_questions()));

    let mut orch = StudyOrchestrator::new(
        Clock::fixed(fixed_now()),
        generator.clone(),
        Arc::new(Images { fail: false }),
        Arc::clone(&storage.history),
    );
    let doc = orch.add_document("Geography", DocumentKind::Text, b"x".to_vec());
    orch.create_session(doc, settings(StudyMode::Exam, 3), None)
        .await
        .unwrap();
    orch.select_exam(&QuestionId::new("q-2"), "B").unwrap();
    let done = orch.submit_exam().await.unwrap();

    let mut reopened = StudyOrchestrator::new(
        Clock::fixed(fixed_now()),
        generator,
        Arc::new(Images { fail: false }),
        Arc::clone(&storage.history),
    );
    assert_eq!(reopened.load_history().await.unwrap(), 1);
    assert_eq!(reopened.history(), [done]);
    assert_eq!(reopened.stats().accuracy, Some(33));
}
