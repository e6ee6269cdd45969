use thiserror::Error;

/// Errors that can occur when interacting with the attendance store
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Attendance record not found: {0}")]
    AttendanceNotFound(i64),

    #[error("Subject not found: {0}")]
    SubjectNotFound(i64),

    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Query execution failed: {0}")]
    QueryError(String),

    #[error("Failed to deserialize database row: {0}")]
    DeserializationError(String),

    #[error("Database is locked")]
    Locked,

    #[error("Database call timed out: {0}")]
    Timeout(String),

    #[error("Other database error: {0}")]
    Other(#[from] anyhow::Error),
}

impl DatabaseError {
    /// A referenced record or subject does not exist; retrying cannot help
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DatabaseError::AttendanceNotFound(_) | DatabaseError::SubjectNotFound(_)
        )
    }
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => DatabaseError::Timeout(e.to_string()),
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                DatabaseError::ConnectionError(e.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::DeserializationError(e.to_string())
            }
            other => DatabaseError::QueryError(other.to_string()),
        }
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                DatabaseError::Locked
            }
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..) => {
                DatabaseError::DeserializationError(e.to_string())
            }
            other => DatabaseError::QueryError(other.to_string()),
        }
    }
}
