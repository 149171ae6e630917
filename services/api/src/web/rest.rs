//! services/api/src/web/rest.rs
//!
//! Contains the shared REST payload structs and the master definition for
//! the OpenAPI specification.

use chrono::{DateTime, NaiveDate, Utc};
use roster_core::domain::{Chapter, SchoolTerm, Session};
use roster_core::session_state::reason_is_read_only;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::web::{auth, roster, sessions, terms};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login_handler,
        auth::logout_handler,
        terms::list_chapters_handler,
        terms::list_terms_handler,
        terms::current_term_handler,
        roster::roster_handler,
        roster::roster_export_handler,
        roster::expected_sessions_handler,
        sessions::list_sessions_handler,
        sessions::create_session_handler,
        sessions::student_unavailable_form_handler,
        sessions::mark_student_unavailable_handler,
        sessions::mentor_unavailable_form_handler,
        sessions::mark_mentor_unavailable_handler,
        sessions::get_session_handler,
        sessions::cancel_form_handler,
        sessions::cancel_session_handler,
        sessions::submit_report_handler,
        sessions::sign_off_handler,
    ),
    components(
        schemas(
            auth::LoginRequest,
            auth::AuthResponse,
            ChapterView,
            TermView,
            SessionView,
            terms::CurrentTermResponse,
            roster::RosterResponse,
            roster::RosterRowView,
            roster::AssignedMentorView,
            roster::ExpectedSessionsView,
            sessions::SessionPage,
            sessions::CreateSessionForm,
            sessions::UnavailableForm,
            sessions::CancelForm,
            sessions::ReasonFormView,
            sessions::ReportForm,
            sessions::SignOffForm,
        )
    ),
    tags(
        (name = "Mentor Roster API", description = "Roster, term and session attendance endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response Structs
//=========================================================================================

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterView {
    pub id: Uuid,
    pub name: String,
}

impl From<Chapter> for ChapterView {
    fn from(c: Chapter) -> Self {
        Self { id: c.id, name: c.name }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TermView {
    pub id: Uuid,
    pub year: i32,
    pub name: String,
    pub label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl From<&SchoolTerm> for TermView {
    fn from(t: &SchoolTerm) -> Self {
        Self {
            id: t.id,
            year: t.year,
            name: t.name.clone(),
            label: t.label(),
            start_date: t.start_date,
            end_date: t.end_date,
        }
    }
}

/// A single attendance record as presented to the client.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub participant_kind: String,
    pub participant_id: Uuid,
    pub attended_on: NaiveDate,
    pub counterpart_id: Option<Uuid>,
    pub status: String,
    pub reason: Option<String>,
    /// Once a reason has been recorded the form shows it read-only.
    pub reason_read_only: bool,
    pub can_cancel: bool,
    pub completed_on: Option<NaiveDate>,
    pub signed_off_on: Option<NaiveDate>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub report: Option<String>,
    pub report_feedback: Option<String>,
}

impl From<&Session> for SessionView {
    fn from(s: &Session) -> Self {
        Self {
            id: s.id,
            chapter_id: s.key.chapter_id,
            participant_kind: s.key.participant.kind().as_str().to_string(),
            participant_id: s.key.participant.id(),
            attended_on: s.key.attended_on,
            counterpart_id: s.counterpart_id,
            status: s.status().as_str().to_string(),
            reason: s.state.reason().map(str::to_string),
            reason_read_only: reason_is_read_only(&s.state),
            can_cancel: s.state.can_cancel(),
            completed_on: s.state.completed_on(),
            signed_off_on: s.state.signed_off_on(),
            cancelled_at: s.state.cancelled_at(),
            report: s.report.clone(),
            report_feedback: s.report_feedback.clone(),
        }
    }
}
