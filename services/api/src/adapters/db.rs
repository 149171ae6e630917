//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use roster_core::domain::{
    Chapter, Frequency, MentorToStudentAssignment, NewSession, ParticipantKind, SchoolTerm,
    Session, SessionKey, Student, User, UserCredentials,
};
use roster_core::ports::{DatabaseService, PortError, PortResult, SessionFilter};
use roster_core::roles::Role;
use roster_core::session_state::{SessionState, SessionStatus};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::warn;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(what: String) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    full_name: String,
    role: String,
    chapter_id: Option<Uuid>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let role = self.role.parse::<Role>().map_err(PortError::Unexpected)?;
        Ok(User {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            role,
            chapter_id: self.chapter_id,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    hashed_password: String,
}

#[derive(FromRow)]
struct ChapterRecord {
    id: Uuid,
    name: String,
}
impl ChapterRecord {
    fn to_domain(self) -> Chapter {
        Chapter {
            id: self.id,
            name: self.name,
        }
    }
}

#[derive(FromRow)]
struct SchoolTermRecord {
    id: Uuid,
    year: i32,
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
}
impl SchoolTermRecord {
    fn to_domain(self) -> SchoolTerm {
        SchoolTerm {
            id: self.id,
            year: self.year,
            name: self.name,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[derive(FromRow)]
struct StudentRecord {
    id: Uuid,
    chapter_id: Uuid,
    full_name: String,
    year_level: Option<i32>,
    archived_at: Option<DateTime<Utc>>,
}
impl StudentRecord {
    fn to_domain(self) -> Student {
        Student {
            id: self.id,
            chapter_id: self.chapter_id,
            full_name: self.full_name,
            year_level: self.year_level,
            archived_at: self.archived_at,
        }
    }
}

#[derive(FromRow)]
struct AssignmentRecord {
    mentor_id: Uuid,
    student_id: Uuid,
    frequency_in_days: i32,
}
impl AssignmentRecord {
    fn to_domain(self) -> PortResult<MentorToStudentAssignment> {
        Ok(MentorToStudentAssignment {
            mentor_id: self.mentor_id,
            student_id: self.student_id,
            frequency: Frequency::try_from(self.frequency_in_days).map_err(PortError::Unexpected)?,
        })
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    chapter_id: Uuid,
    participant_kind: String,
    participant_id: Uuid,
    attended_on: NaiveDate,
    counterpart_id: Option<Uuid>,
    status: String,
    reason: Option<String>,
    completed_on: Option<NaiveDate>,
    signed_off_on: Option<NaiveDate>,
    cancelled_at: Option<DateTime<Utc>>,
    report: Option<String>,
    report_feedback: Option<String>,
    created_at: DateTime<Utc>,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<Session> {
        let kind = self
            .participant_kind
            .parse::<ParticipantKind>()
            .map_err(PortError::Unexpected)?;
        let status = self.status.parse::<SessionStatus>().map_err(PortError::Unexpected)?;
        let state = SessionState::from_columns(
            status,
            self.reason,
            self.completed_on,
            self.signed_off_on,
            self.cancelled_at,
        )
        .map_err(PortError::Unexpected)?;
        Ok(Session {
            id: self.id,
            key: SessionKey {
                chapter_id: self.chapter_id,
                participant: kind.with_id(self.participant_id),
                attended_on: self.attended_on,
            },
            counterpart_id: self.counterpart_id,
            state,
            report: self.report,
            report_feedback: self.report_feedback,
            created_at: self.created_at,
        })
    }
}

const SESSION_COLUMNS: &str = "id, chapter_id, participant_kind, participant_id, attended_on, \
     counterpart_id, status, reason, completed_on, signed_off_on, cancelled_at, report, \
     report_feedback, created_at";

/// The columns a state is stored as. Signed-off sessions keep the
/// `COMPLETED` status and are told apart by `signed_off_on`.
struct StateColumns {
    status: &'static str,
    reason: Option<String>,
    completed_on: Option<NaiveDate>,
    signed_off_on: Option<NaiveDate>,
    cancelled_at: Option<DateTime<Utc>>,
}

fn state_columns(state: &SessionState) -> StateColumns {
    let status = match state.status() {
        SessionStatus::SignedOff => SessionStatus::Completed,
        other => other,
    };
    StateColumns {
        status: status.as_str(),
        reason: state.reason().map(str::to_string),
        completed_on: state.completed_on(),
        signed_off_on: state.signed_off_on(),
        cancelled_at: state.cancelled_at(),
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, full_name, role, chapter_id FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User {} not found", user_id)))?;
        record.to_domain()
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, hashed_password FROM users WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("User {} not found", email)))?;
        Ok(UserCredentials {
            user_id: record.id,
            email: record.email,
            hashed_password: record.hashed_password,
        })
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        user_id.ok_or(PortError::Unauthorized)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_chapters(&self) -> PortResult<Vec<Chapter>> {
        let records = sqlx::query_as::<_, ChapterRecord>("SELECT id, name FROM chapters ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_chapter(&self, chapter_id: Uuid) -> PortResult<Chapter> {
        let record = sqlx::query_as::<_, ChapterRecord>("SELECT id, name FROM chapters WHERE id = $1")
            .bind(chapter_id)
            .fetch_one(&self.pool)
            .await
            .map_err(not_found_or_unexpected(format!("Chapter {} not found", chapter_id)))?;
        Ok(record.to_domain())
    }

    async fn list_school_terms(&self) -> PortResult<Vec<SchoolTerm>> {
        let records = sqlx::query_as::<_, SchoolTermRecord>(
            "SELECT id, year, name, start_date, end_date FROM school_terms ORDER BY start_date",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_active_students(&self, chapter_id: Uuid) -> PortResult<Vec<Student>> {
        let records = sqlx::query_as::<_, StudentRecord>(
            "SELECT id, chapter_id, full_name, year_level, archived_at FROM students \
             WHERE chapter_id = $1 AND archived_at IS NULL ORDER BY full_name",
        )
        .bind(chapter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_student(&self, student_id: Uuid) -> PortResult<Student> {
        let record = sqlx::query_as::<_, StudentRecord>(
            "SELECT id, chapter_id, full_name, year_level, archived_at FROM students WHERE id = $1",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("Student {} not found", student_id)))?;
        Ok(record.to_domain())
    }

    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> PortResult<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, full_name, role, chapter_id FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn list_assignments_for_student(
        &self,
        student_id: Uuid,
    ) -> PortResult<Vec<MentorToStudentAssignment>> {
        let records = sqlx::query_as::<_, AssignmentRecord>(
            "SELECT mentor_id, student_id, frequency_in_days FROM mentor_to_student_assignments \
             WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn find_session(&self, key: &SessionKey) -> PortResult<Option<Session>> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {} FROM sessions WHERE chapter_id = $1 AND participant_kind = $2 \
             AND participant_id = $3 AND attended_on = $4",
            SESSION_COLUMNS
        ))
        .bind(key.chapter_id)
        .bind(key.participant.kind().as_str())
        .bind(key.participant.id())
        .bind(key.attended_on)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        record.map(|r| r.to_domain()).transpose()
    }

    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {} FROM sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("Session {} not found", session_id)))?;
        record.to_domain()
    }

    async fn list_sessions(&self, chapter_id: Uuid, filter: &SessionFilter) -> PortResult<Vec<Session>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        query.push(SESSION_COLUMNS);
        query.push(" FROM sessions WHERE chapter_id = ");
        query.push_bind(chapter_id);
        if let Some(kind) = filter.kind {
            query.push(" AND participant_kind = ").push_bind(kind.as_str());
        }
        if let Some(start) = filter.start_date {
            query.push(" AND attended_on >= ").push_bind(start);
        }
        if let Some(end) = filter.end_date {
            query.push(" AND attended_on <= ").push_bind(end);
        }
        query.push(" ORDER BY attended_on DESC, created_at DESC");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            query.push(" OFFSET ").push_bind(offset);
        }

        let records = query
            .build_query_as::<SessionRecord>()
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn insert_session(&self, session: NewSession) -> PortResult<Session> {
        let columns = state_columns(&session.state);
        let result = sqlx::query_as::<_, SessionRecord>(&format!(
            "INSERT INTO sessions (id, chapter_id, participant_kind, participant_id, attended_on, \
             counterpart_id, status, reason, completed_on, signed_off_on, cancelled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(session.key.chapter_id)
        .bind(session.key.participant.kind().as_str())
        .bind(session.key.participant.id())
        .bind(session.key.attended_on)
        .bind(session.counterpart_id)
        .bind(columns.status)
        .bind(columns.reason)
        .bind(columns.completed_on)
        .bind(columns.signed_off_on)
        .bind(columns.cancelled_at)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(record) => record.to_domain(),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                warn!("Duplicate session insert for {:?}", session.key);
                let existing = self.find_session(&session.key).await?;
                Err(PortError::Conflict {
                    existing_id: existing.map(|s| s.id),
                })
            }
            Err(e) => Err(unexpected(e)),
        }
    }

    async fn update_session_state(
        &self,
        session_id: Uuid,
        state: &SessionState,
        report: Option<&str>,
        report_feedback: Option<&str>,
    ) -> PortResult<Session> {
        let columns = state_columns(state);
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "UPDATE sessions SET status = $2, reason = $3, completed_on = $4, signed_off_on = $5, \
             cancelled_at = $6, report = COALESCE($7, report), \
             report_feedback = COALESCE($8, report_feedback) \
             WHERE id = $1 RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .bind(columns.status)
        .bind(columns.reason)
        .bind(columns.completed_on)
        .bind(columns.signed_off_on)
        .bind(columns.cancelled_at)
        .bind(report)
        .bind(report_feedback)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found_or_unexpected(format!("Session {} not found", session_id)))?;
        record.to_domain()
    }
}
