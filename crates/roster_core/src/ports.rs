//! crates/roster_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the storage implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    Chapter, MentorToStudentAssignment, NewSession, ParticipantKind, SchoolTerm, Session,
    SessionKey, Student, User, UserCredentials,
};
use crate::session_state::SessionState;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The single failure channel for every port operation and mutation.
/// This abstracts away the specific errors from external services (e.g., database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A record already exists for a unique key.
    #[error("Record already exists: {existing_id:?}")]
    Conflict { existing_id: Option<Uuid> },
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Optional bounds for listing sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub kind: Option<ParticipantKind>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Users & Auth ---
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Returns the user id behind a live (unexpired) auth session.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Chapters & Terms ---
    async fn list_chapters(&self) -> PortResult<Vec<Chapter>>;

    async fn get_chapter(&self, chapter_id: Uuid) -> PortResult<Chapter>;

    async fn list_school_terms(&self) -> PortResult<Vec<SchoolTerm>>;

    // --- Students & Mentors ---
    /// Non-archived students of a chapter.
    async fn list_active_students(&self, chapter_id: Uuid) -> PortResult<Vec<Student>>;

    async fn get_student(&self, student_id: Uuid) -> PortResult<Student>;

    /// Users with any of the given ids, whatever their role or chapter.
    /// Unknown ids are skipped.
    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> PortResult<Vec<User>>;

    async fn list_assignments_for_student(
        &self,
        student_id: Uuid,
    ) -> PortResult<Vec<MentorToStudentAssignment>>;

    // --- Attendance Sessions ---
    async fn find_session(&self, key: &SessionKey) -> PortResult<Option<Session>>;

    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session>;

    async fn list_sessions(&self, chapter_id: Uuid, filter: &SessionFilter) -> PortResult<Vec<Session>>;

    /// Inserts a record. Fails with `PortError::Conflict` when one already
    /// exists for the same key.
    async fn insert_session(&self, session: NewSession) -> PortResult<Session>;

    async fn update_session_state(
        &self,
        session_id: Uuid,
        state: &SessionState,
        report: Option<&str>,
        report_feedback: Option<&str>,
    ) -> PortResult<Session>;
}
