//! History persistence for completed quiz sessions.

pub mod repository;
pub mod sqlite;
