use quiz_core::model::{CompletedSession, Question, SessionId};
use uuid::Uuid;

use super::SqliteRepository;
use super::mapping::{map_completed_session, map_question_row, options_to_json, ser};
use crate::repository::{SessionHistoryRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn insert_error(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => conn(e),
    }
}

impl SqliteRepository {
    async fn questions_for(&self, session_id: Uuid) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    question_id, text, kind, options, correct_answer,
                    explanation, user_answer, is_correct
                FROM session_questions
                WHERE session_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }
}

#[async_trait::async_trait]
impl SessionHistoryRepository for SqliteRepository {
    async fn append_session(&self, session: &CompletedSession) -> Result<(), StorageError> {
        let id = session.id().as_uuid();
        let info = session.info();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO sessions (
                    id, title, topic, created_at, mode, difficulty, depth,
                    cover_image, score, total_questions, time_elapsed_secs
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ",
        )
        .bind(id)
        .bind(&info.title)
        .bind(&info.topic)
        .bind(info.created_at)
        .bind(info.mode.as_str())
        .bind(info.difficulty.as_str())
        .bind(info.depth.as_str())
        .bind(info.cover_image.as_ref().map(|c| c.as_str().to_owned()))
        .bind(i64::from(session.score()))
        .bind(i64::from(session.total_questions()))
        .bind(session.time_elapsed_secs().map(i64::from))
        .execute(&mut *tx)
        .await
        .map_err(insert_error)?;

        for (position, question) in session.questions().iter().enumerate() {
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            sqlx::query(
                r"
                    INSERT INTO session_questions (
                        session_id, position, question_id, text, kind, options,
                        correct_answer, explanation, user_answer, is_correct
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ",
            )
            .bind(id)
            .bind(position)
            .bind(question.id.as_str())
            .bind(&question.text)
            .bind(question.kind.as_str())
            .bind(options_to_json(&question.options)?)
            .bind(&question.correct_answer)
            .bind(&question.explanation)
            .bind(question.user_answer())
            .bind(question.is_correct().unwrap_or(false))
            .execute(&mut *tx)
            .await
            .map_err(insert_error)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<CompletedSession, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, title, topic, created_at, mode, difficulty, depth,
                    cover_image, score, time_elapsed_secs
                FROM sessions
                WHERE id = ?1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let questions = self.questions_for(id.as_uuid()).await?;
        map_completed_session(&row, questions)
    }

    async fn list_sessions(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<CompletedSession>, StorageError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, i64::from);
        let rows = sqlx::query(
            r"
                SELECT
                    id, title, topic, created_at, mode, difficulty, depth,
                    cover_image, score, time_elapsed_secs
                FROM sessions
                ORDER BY seq DESC
                LIMIT ?1
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = sqlx::Row::try_get(&row, "id").map_err(ser)?;
            let questions = self.questions_for(id).await?;
            out.push(map_completed_session(&row, questions)?);
        }
        Ok(out)
    }
}
