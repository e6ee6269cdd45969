pub mod database;
pub mod error;
pub mod fake;
pub mod models;
pub mod postgres;
pub mod sqlite;


pub use database::AttendanceStore;
pub use error::DatabaseError;
pub use fake::FakeAttendanceStore;
pub use models::{
    initial_face_state, AttendanceRecord, FaceFields, FaceRecognitionStatus, FaceResult, Location,
    NewAttendance, Subject,
};
pub use postgres::PostgresAttendanceStore;
pub use sqlite::SqliteAttendanceStore;

use crate::config::DatabaseConfig;
use std::sync::Arc;

/// Path of a SQLite database named by a `sqlite:` URL, or None for any other URL
pub fn sqlite_path(url: &str) -> Option<&str> {
    let rest = url.strip_prefix("sqlite:")?;
    Some(rest.strip_prefix("//").unwrap_or(rest))
}

/// Open the attendance store selected by the database URL
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn AttendanceStore>, DatabaseError> {
    match sqlite_path(&config.url) {
        Some(path) => Ok(Arc::new(SqliteAttendanceStore::new(path)?)),
        None => Ok(Arc::new(PostgresAttendanceStore::new(config).await?)),
    }
}
