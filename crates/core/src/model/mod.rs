mod app_settings;
mod document;
mod ids;
mod question;
mod session;
mod settings;

pub use app_settings::{AppSettings, AppSettingsDraft, AppSettingsError};
pub use document::{DocumentKind, DocumentStatus, SourceDocument};
pub use ids::{DocumentId, ParseIdError, QuestionId, SessionId};
pub use question::{Grade, Question, QuestionKind};
pub use session::{
    CompletedSession, CompletedSessionError, CoverImage, Session, SessionError, SessionInfo,
    format_elapsed, rounded_percentage, rounded_ratio,
};
pub use settings::{
    Depth, Difficulty, ParseSettingError, SessionSettings, SessionSettingsError, StudyMode,
};
