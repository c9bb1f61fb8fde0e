use quiz_core::model::{
    CompletedSession, CoverImage, Depth, Difficulty, Question, QuestionId, QuestionKind,
    SessionId, SessionInfo, StudyMode,
};
use sqlx::Row;
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

fn options_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

/// Session header columns; questions are read separately.
pub(crate) fn map_session_info(row: &sqlx::sqlite::SqliteRow) -> Result<SessionInfo, StorageError> {
    let id: Uuid = row.try_get("id").map_err(ser)?;
    let mode: String = row.try_get("mode").map_err(ser)?;
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    let depth: String = row.try_get("depth").map_err(ser)?;

    Ok(SessionInfo {
        id: SessionId::from_uuid(id),
        title: row.try_get("title").map_err(ser)?,
        topic: row.try_get("topic").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        mode: mode.parse::<StudyMode>().map_err(ser)?,
        difficulty: difficulty.parse::<Difficulty>().map_err(ser)?,
        depth: depth.parse::<Depth>().map_err(ser)?,
        cover_image: row
            .try_get::<Option<String>, _>("cover_image")
            .map_err(ser)?
            .map(CoverImage::new),
    })
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    let options: String = row.try_get("options").map_err(ser)?;

    Ok(Question::from_persisted(
        QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?),
        row.try_get("text").map_err(ser)?,
        kind.parse::<QuestionKind>().map_err(ser)?,
        options_from_json(&options)?,
        row.try_get("correct_answer").map_err(ser)?,
        row.try_get("explanation").map_err(ser)?,
        row.try_get("user_answer").map_err(ser)?,
        Some(row.try_get::<bool, _>("is_correct").map_err(ser)?),
    ))
}

/// Reassemble a completed session, re-checking its invariants.
pub(crate) fn map_completed_session(
    row: &sqlx::sqlite::SqliteRow,
    questions: Vec<Question>,
) -> Result<CompletedSession, StorageError> {
    let info = map_session_info(row)?;
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let time_elapsed_secs = row
        .try_get::<Option<i64>, _>("time_elapsed_secs")
        .map_err(ser)?
        .map(|secs| u32_from_i64("time_elapsed_secs", secs))
        .transpose()?;

    CompletedSession::from_persisted(info, questions, score, time_elapsed_secs).map_err(ser)
}
