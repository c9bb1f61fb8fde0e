use async_trait::async_trait;
use quiz_core::model::{CompletedSession, SessionId};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Append/read contract for the history of completed sessions.
///
/// History is append-only: there is no update or delete.
#[async_trait]
pub trait SessionHistoryRepository: Send + Sync {
    /// Append a completed session to history.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a session with the same id was
    /// already appended, or other storage errors.
    async fn append_session(&self, session: &CompletedSession) -> Result<(), StorageError>;

    /// Fetch a single session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<CompletedSession, StorageError>;

    /// List sessions most-recent-first (reverse append order).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the sessions cannot be read or rehydrated.
    async fn list_sessions(&self, limit: Option<u32>)
    -> Result<Vec<CompletedSession>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    // Oldest first.
    sessions: Arc<Mutex<Vec<CompletedSession>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionHistoryRepository for InMemoryRepository {
    async fn append_session(&self, session: &CompletedSession) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.iter().any(|s| s.id() == session.id()) {
            return Err(StorageError::Conflict);
        }
        guard.push(session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<CompletedSession, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_sessions(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<CompletedSession>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let take = limit.map_or(usize::MAX, |l| l as usize);
        Ok(guard.iter().rev().take(take).cloned().collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub history: Arc<dyn SessionHistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let history: Arc<dyn SessionHistoryRepository> = Arc::new(InMemoryRepository::new());
        Self { history }
    }
}
