use crate::db::database::AttendanceStore;
use crate::db::error::DatabaseError;
use crate::db::models::{
    AttendanceRecord, FaceResult, Location, NewAttendance, Subject,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::task;
use tracing::{debug, error, info};

const ATTENDANCE_COLUMNS: &str = "id, session_id, subject_id, face_recognition_status, \
     is_present, face_image_ref, longitude, latitude, created_at";

/// A SQLite implementation of the AttendanceStore trait
pub struct SqliteAttendanceStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteAttendanceStore {
    /// Open (or create) the database at `db_path`; `:memory:` opens a private in-memory database
    pub fn new(db_path: &str) -> Result<Self, DatabaseError> {
        info!("Opening SQLite attendance store at path: {db_path}");

        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    debug!("Creating parent directory: {:?}", parent);
                    fs::create_dir_all(parent).map_err(|e| {
                        error!("Failed to create directory {parent:?}: {e}");
                        DatabaseError::ConnectionError(format!("Failed to create directory: {e}"))
                    })?;
                }
            }
        }

        let connection = Connection::open(db_path).map_err(|e| {
            error!("Failed to open SQLite database at {db_path}: {e}");
            DatabaseError::ConnectionError(format!("Failed to open SQLite database: {e}"))
        })?;

        connection
            .execute_batch(
                "PRAGMA foreign_keys = ON;
                CREATE TABLE IF NOT EXISTS subjects (
                    id INTEGER PRIMARY KEY,
                    has_reference_image INTEGER NOT NULL DEFAULT 0
                );
                CREATE TABLE IF NOT EXISTS attendance (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id INTEGER NOT NULL,
                    subject_id INTEGER NOT NULL REFERENCES subjects(id),
                    face_recognition_status TEXT NOT NULL,
                    is_present INTEGER NOT NULL DEFAULT 0,
                    face_image_ref TEXT,
                    longitude REAL,
                    latitude REAL,
                    created_at TEXT NOT NULL,
                    UNIQUE (session_id, subject_id)
                );",
            )
            .map_err(|e| {
                error!("Failed to create attendance tables: {e}");
                DatabaseError::ConnectionError(format!("Failed to create tables: {e}"))
            })?;

        info!("SQLite attendance store initialized at: {db_path}");
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_connection<T, F>(&self, f: F) -> Result<T, DatabaseError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, DatabaseError> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        task::spawn_blocking(move || {
            let mut conn = match connection.lock() {
                Ok(conn) => conn,
                Err(_) => {
                    error!("Failed to acquire database lock");
                    return Err(DatabaseError::Locked);
                }
            };
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            error!("Task panic while accessing SQLite: {e}");
            DatabaseError::Other(anyhow::anyhow!("Task panic: {e}"))
        })?
    }

    fn record_from_row(row: &Row<'_>) -> Result<AttendanceRecord, DatabaseError> {
        let status: String = row.get(3)?;
        let longitude: Option<f64> = row.get(6)?;
        let latitude: Option<f64> = row.get(7)?;
        let created_at: String = row.get(8)?;

        Ok(AttendanceRecord {
            id: row.get(0)?,
            session_id: row.get(1)?,
            subject_id: row.get(2)?,
            face_recognition_status: status.parse()?,
            is_present: row.get(4)?,
            face_image_ref: row.get(5)?,
            location: longitude
                .zip(latitude)
                .map(|(longitude, latitude)| Location {
                    longitude,
                    latitude,
                }),
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    DatabaseError::DeserializationError(format!("Failed to parse datetime: {e}"))
                })?,
        })
    }

    fn find_attendance(
        conn: &Connection,
        attendance_id: i64,
    ) -> Result<Option<AttendanceRecord>, DatabaseError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = ?1"
        ))?;
        let mut rows = stmt.query(params![attendance_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::record_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_session(
        conn: &Connection,
        session_id: i64,
        subject_id: i64,
    ) -> Result<Option<AttendanceRecord>, DatabaseError> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE session_id = ?1 AND subject_id = ?2"
        ))?;
        let mut rows = stmt.query(params![session_id, subject_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::record_from_row(row)?)),
            None => Ok(None),
        }
    }

    fn subject_exists(conn: &Connection, subject_id: i64) -> Result<bool, DatabaseError> {
        Ok(conn
            .query_row(
                "SELECT 1 FROM subjects WHERE id = ?1",
                params![subject_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }

    fn write_face_fields(
        conn: &Connection,
        record: &AttendanceRecord,
    ) -> Result<(), DatabaseError> {
        conn.execute(
            "UPDATE attendance
             SET face_recognition_status = ?1, is_present = ?2, face_image_ref = ?3
             WHERE id = ?4",
            params![
                record.face_recognition_status.as_str(),
                record.is_present,
                record.face_image_ref,
                record.id
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for SqliteAttendanceStore {
    async fn update_face_result(
        &self,
        attendance_id: i64,
        result: FaceResult,
    ) -> Result<AttendanceRecord, DatabaseError> {
        debug!(
            "Updating face result: attendance_id={}, status={}, is_present={}",
            attendance_id, result.status, result.is_present
        );

        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let mut record = Self::find_attendance(&tx, attendance_id)?
                .ok_or(DatabaseError::AttendanceNotFound(attendance_id))?;

            record.set_face_fields(result.apply_to(&record.face_fields()));
            Self::write_face_fields(&tx, &record)?;
            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn register_reference_image(
        &self,
        subject_id: i64,
        attendance_id: i64,
        image_ref: &str,
    ) -> Result<AttendanceRecord, DatabaseError> {
        debug!(
            "Registering reference image: subject_id={}, attendance_id={}",
            subject_id, attendance_id
        );

        let image_ref = image_ref.to_string();
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            let flagged = tx.execute(
                "UPDATE subjects SET has_reference_image = 1 WHERE id = ?1",
                params![subject_id],
            )?;
            if flagged == 0 {
                return Err(DatabaseError::SubjectNotFound(subject_id));
            }

            let mut record = Self::find_attendance(&tx, attendance_id)?
                .ok_or(DatabaseError::AttendanceNotFound(attendance_id))?;
            record.set_face_fields(FaceResult::verified(image_ref).apply_to(&record.face_fields()));
            Self::write_face_fields(&tx, &record)?;
            tx.commit()?;
            Ok(record)
        })
        .await
    }

    async fn create_attendance(
        &self,
        new: NewAttendance,
    ) -> Result<(AttendanceRecord, bool), DatabaseError> {
        self.with_connection(move |conn| {
            let tx = conn.transaction()?;
            if !Self::subject_exists(&tx, new.subject_id)? {
                return Err(DatabaseError::SubjectNotFound(new.subject_id));
            }
            if let Some(existing) = Self::find_by_session(&tx, new.session_id, new.subject_id)? {
                return Ok((existing, false));
            }

            let (status, is_present) = new.initial_state();
            tx.execute(
                "INSERT INTO attendance
                 (session_id, subject_id, face_recognition_status, is_present, longitude, latitude, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    new.session_id,
                    new.subject_id,
                    status.as_str(),
                    is_present,
                    new.location.map(|l| l.longitude),
                    new.location.map(|l| l.latitude),
                    Utc::now().to_rfc3339()
                ],
            )?;
            let id = tx.last_insert_rowid();
            let record = Self::find_attendance(&tx, id)?
                .ok_or(DatabaseError::AttendanceNotFound(id))?;
            tx.commit()?;

            info!(
                "Created attendance record {} for subject {} in session {} ({})",
                record.id, record.subject_id, record.session_id, status
            );
            Ok((record, true))
        })
        .await
    }

    async fn get_attendance(&self, attendance_id: i64) -> Result<AttendanceRecord, DatabaseError> {
        self.with_connection(move |conn| {
            Self::find_attendance(conn, attendance_id)?
                .ok_or(DatabaseError::AttendanceNotFound(attendance_id))
        })
        .await
    }

    async fn get_subject(&self, subject_id: i64) -> Result<Subject, DatabaseError> {
        self.with_connection(move |conn| {
            conn.query_row(
                "SELECT id, has_reference_image FROM subjects WHERE id = ?1",
                params![subject_id],
                |row| {
                    Ok(Subject {
                        id: row.get(0)?,
                        has_reference_image: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or(DatabaseError::SubjectNotFound(subject_id))
        })
        .await
    }

    #[cfg(test)]
    async fn add_subject(&self, subject: Subject) -> Result<(), DatabaseError> {
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO subjects (id, has_reference_image) VALUES (?1, ?2)",
                params![subject.id, subject.has_reference_image],
            )?;
            Ok(())
        })
        .await
    }
}
