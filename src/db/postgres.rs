use crate::config::DatabaseConfig;
use crate::db::database::AttendanceStore;
use crate::db::error::DatabaseError;
use crate::db::models::{AttendanceRecord, FaceResult, Location, NewAttendance, Subject};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgConnection, PgPool, Row};
use std::time::Duration;
use tracing::{debug, error, info};

const ATTENDANCE_COLUMNS: &str = "id, session_id, subject_id, face_recognition_status, \
     is_present, face_image_ref, longitude, latitude, created_at";

/// A PostgreSQL implementation of the AttendanceStore trait
pub struct PostgresAttendanceStore {
    pool: PgPool,
}

impl PostgresAttendanceStore {
    /// Connect to the database and make sure the attendance tables exist
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(Duration::from_secs(60))
            .connect_lazy(&config.url)
            .map_err(|e| {
                error!("Failed to create connection pool: {}", e);
                DatabaseError::ConnectionError(e.to_string())
            })?;

        if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
            error!("Database connectivity test failed: {}", e);
            return Err(DatabaseError::ConnectionError(format!(
                "Database is not accessible: {}",
                e
            )));
        };

        let store = Self { pool };
        store.initialize_schema().await?;

        info!("PostgreSQL database connection established successfully");
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        debug!("Ensuring subjects and attendance tables exist");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subjects (
                id BIGINT PRIMARY KEY,
                has_reference_image BOOLEAN NOT NULL DEFAULT FALSE
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create subjects table: {}", e);
            DatabaseError::QueryError(format!("Failed to create table: {}", e))
        })?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attendance (
                id BIGSERIAL PRIMARY KEY,
                session_id BIGINT NOT NULL,
                subject_id BIGINT NOT NULL REFERENCES subjects(id),
                face_recognition_status TEXT NOT NULL,
                is_present BOOLEAN NOT NULL DEFAULT FALSE,
                face_image_ref TEXT,
                longitude DOUBLE PRECISION,
                latitude DOUBLE PRECISION,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                UNIQUE (session_id, subject_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to create attendance table: {}", e);
            DatabaseError::QueryError(format!("Failed to create table: {}", e))
        })?;

        Ok(())
    }

    fn record_from_row(row: &PgRow) -> Result<AttendanceRecord, DatabaseError> {
        let status: String = row.try_get("face_recognition_status")?;
        let longitude: Option<f64> = row.try_get("longitude")?;
        let latitude: Option<f64> = row.try_get("latitude")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;

        Ok(AttendanceRecord {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            subject_id: row.try_get("subject_id")?,
            face_recognition_status: status.parse()?,
            is_present: row.try_get("is_present")?,
            face_image_ref: row.try_get("face_image_ref")?,
            location: longitude
                .zip(latitude)
                .map(|(longitude, latitude)| Location {
                    longitude,
                    latitude,
                }),
            created_at,
        })
    }

    /// Read a record and lock its row for the rest of the transaction
    async fn lock_attendance(
        conn: &mut PgConnection,
        attendance_id: i64,
    ) -> Result<AttendanceRecord, DatabaseError> {
        let row = sqlx::query(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = $1 FOR UPDATE"
        ))
        .bind(attendance_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(DatabaseError::AttendanceNotFound(attendance_id))?;

        Self::record_from_row(&row)
    }

    async fn write_face_fields(
        conn: &mut PgConnection,
        record: &AttendanceRecord,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE attendance
             SET face_recognition_status = $1, is_present = $2, face_image_ref = $3
             WHERE id = $4",
        )
        .bind(record.face_recognition_status.as_str())
        .bind(record.is_present)
        .bind(record.face_image_ref.as_deref())
        .bind(record.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AttendanceStore for PostgresAttendanceStore {
    async fn update_face_result(
        &self,
        attendance_id: i64,
        result: FaceResult,
    ) -> Result<AttendanceRecord, DatabaseError> {
        debug!(
            "Updating face result: attendance_id={}, status={}, is_present={}",
            attendance_id, result.status, result.is_present
        );

        let mut tx = self.pool.begin().await?;
        let mut record = Self::lock_attendance(&mut tx, attendance_id).await?;
        record.set_face_fields(result.apply_to(&record.face_fields()));
        Self::write_face_fields(&mut tx, &record).await?;
        tx.commit().await?;

        Ok(record)
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

        let mut tx = self.pool.begin().await?;
        let flagged = sqlx::query("UPDATE subjects SET has_reference_image = TRUE WHERE id = $1")
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
        if flagged.rows_affected() == 0 {
            // Dropping the transaction rolls it back
            return Err(DatabaseError::SubjectNotFound(subject_id));
        }

        let mut record = Self::lock_attendance(&mut tx, attendance_id).await?;
        record.set_face_fields(FaceResult::verified(image_ref).apply_to(&record.face_fields()));
        Self::write_face_fields(&mut tx, &record).await?;
        tx.commit().await?;

        Ok(record)
    }

    async fn create_attendance(
        &self,
        new: NewAttendance,
    ) -> Result<(AttendanceRecord, bool), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let subject = sqlx::query("SELECT id FROM subjects WHERE id = $1")
            .bind(new.subject_id)
            .fetch_optional(&mut *tx)
            .await?;
        if subject.is_none() {
            return Err(DatabaseError::SubjectNotFound(new.subject_id));
        }

        let (status, is_present) = new.initial_state();
        let inserted = sqlx::query(&format!(
            "INSERT INTO attendance
             (session_id, subject_id, face_recognition_status, is_present, longitude, latitude)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (session_id, subject_id) DO NOTHING
             RETURNING {ATTENDANCE_COLUMNS}"
        ))
        .bind(new.session_id)
        .bind(new.subject_id)
        .bind(status.as_str())
        .bind(is_present)
        .bind(new.location.map(|l| l.longitude))
        .bind(new.location.map(|l| l.latitude))
        .fetch_optional(&mut *tx)
        .await?;

        let (row, created) = match inserted {
            Some(row) => {
                info!(
                    "Created attendance record for subject {} in session {} ({})",
                    new.subject_id, new.session_id, status
                );
                (row, true)
            }
            None => {
                let row = sqlx::query(&format!(
                    "SELECT {ATTENDANCE_COLUMNS} FROM attendance
                     WHERE session_id = $1 AND subject_id = $2"
                ))
                .bind(new.session_id)
                .bind(new.subject_id)
                .fetch_one(&mut *tx)
                .await?;
                (row, false)
            }
        };
        let record = Self::record_from_row(&row)?;
        tx.commit().await?;

        Ok((record, created))
    }

    async fn get_attendance(&self, attendance_id: i64) -> Result<AttendanceRecord, DatabaseError> {
        let row = sqlx::query(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = $1"
        ))
        .bind(attendance_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DatabaseError::AttendanceNotFound(attendance_id))?;

        Self::record_from_row(&row)
    }

    async fn get_subject(&self, subject_id: i64) -> Result<Subject, DatabaseError> {
        let row = sqlx::query("SELECT id, has_reference_image FROM subjects WHERE id = $1")
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DatabaseError::SubjectNotFound(subject_id))?;

        Ok(Subject {
            id: row.try_get("id")?,
            has_reference_image: row.try_get("has_reference_image")?,
        })
    }

    #[cfg(test)]
    async fn add_subject(&self, subject: Subject) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO subjects (id, has_reference_image) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET has_reference_image = EXCLUDED.has_reference_image",
        )
        .bind(subject.id)
        .bind(subject.has_reference_image)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
