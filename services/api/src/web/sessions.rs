//! services/api/src/web/sessions.rs
//!
//! Attendance session workflows: assigning a mentor for a roster date,
//! marking a student or mentor unavailable, cancelling, submitting a report
//! and signing off.
//!
//! Every mutation goes through `roster_core::session_state::transition`, so
//! the legality of a move is decided in one place. Creation routes never
//! produce a second record for the same `(chapter, participant, date)`: they
//! redirect to the existing one instead.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect, Response},
    Extension, Form,
};
use chrono::{NaiveDate, Utc};
use roster_core::domain::{NewSession, Participant, Session, SessionKey, Student, User};
use roster_core::ports::{PortError, SessionFilter};
use roster_core::roles::{Permission, RequestContext, Role};
use roster_core::session_state::{transition, SessionEvent, SessionState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::rest::SessionView;
use crate::web::state::AppState;
use crate::web::{authorize, port_error_response};

pub const PAGE_SIZE: i64 = 20;

type HandlerResult<T> = Result<T, (StatusCode, String)>;

//=========================================================================================
// Forms, Queries and Views
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionForm {
    pub attended_on: NaiveDate,
    pub mentor_id: Uuid,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableForm {
    pub attended_on: NaiveDate,
    pub reason: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableQuery {
    pub attended_on: NaiveDate,
}

#[derive(Deserialize, ToSchema)]
pub struct CancelForm {
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReportForm {
    pub report: String,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SignOffForm {
    pub report_feedback: Option<String>,
}

/// What a reason form (unavailability or cancellation) should present.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReasonFormView {
    pub session_id: Option<Uuid>,
    pub attended_on: NaiveDate,
    pub reason: Option<String>,
    pub read_only: bool,
}

#[derive(Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct SessionsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Zero-based.
    pub page_number: Option<i64>,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionPage {
    pub page_number: i64,
    pub page_size: i64,
    pub sessions: Vec<SessionView>,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn session_path(session_id: Uuid) -> String {
    format!("/sessions/{}", session_id)
}

fn redirect_to_session(session_id: Uuid) -> Response {
    Redirect::to(&session_path(session_id)).into_response()
}

fn created(session: &Session) -> Response {
    (StatusCode::CREATED, Json(SessionView::from(session))).into_response()
}

async fn load_session(state: &AppState, session_id: Uuid) -> HandlerResult<Session> {
    state
        .db
        .get_session_by_id(session_id)
        .await
        .map_err(port_error_response)
}

async fn active_student_in_chapter(
    state: &AppState,
    chapter_id: Uuid,
    student_id: Uuid,
) -> HandlerResult<Student> {
    let student = state.db.get_student(student_id).await.map_err(port_error_response)?;
    if student.chapter_id != chapter_id || !student.is_active() {
        return Err(port_error_response(PortError::NotFound(format!(
            "Student {} not found in chapter {}",
            student_id, chapter_id
        ))));
    }
    Ok(student)
}

async fn mentor_in_chapter(state: &AppState, chapter_id: Uuid, mentor_id: Uuid) -> HandlerResult<User> {
    let mentor = state.db.get_user_by_id(mentor_id).await.map_err(port_error_response)?;
    if mentor.chapter_id != Some(chapter_id) {
        return Err(port_error_response(PortError::NotFound(format!(
            "Mentor {} not found in chapter {}",
            mentor_id, chapter_id
        ))));
    }
    Ok(mentor)
}

/// Inserts a new record, or redirects to the one that won a concurrent insert.
async fn insert_or_redirect(state: &AppState, new_session: NewSession) -> HandlerResult<Response> {
    match state.db.insert_session(new_session).await {
        Ok(session) => {
            info!(
                "Created {} session {} for {:?}",
                session.status(),
                session.id,
                session.key
            );
            Ok(created(&session))
        }
        Err(PortError::Conflict {
            existing_id: Some(existing_id),
        }) => Ok(redirect_to_session(existing_id)),
        Err(e) => Err(port_error_response(e)),
    }
}

/// Validates `event` against the record's current state and persists the result.
async fn apply_event(
    state: &AppState,
    session: &Session,
    event: SessionEvent,
    report: Option<&str>,
    report_feedback: Option<&str>,
) -> HandlerResult<Session> {
    let next = transition(Some(&session.state), event).map_err(|e| {
        warn!("Rejected transition on session {}: {}", session.id, e);
        port_error_response(PortError::from(e))
    })?;
    state
        .db
        .update_session_state(session.id, &next, report, report_feedback)
        .await
        .map_err(port_error_response)
}

fn unavailable_session(key: SessionKey, reason: String) -> HandlerResult<NewSession> {
    let state = transition(None, SessionEvent::MarkUnavailable { reason })
        .map_err(|e| port_error_response(PortError::from(e)))?;
    Ok(NewSession {
        key,
        counterpart_id: None,
        state,
    })
}

/// Loader shared by both unavailability forms.
async fn unavailable_form(state: &AppState, key: SessionKey) -> HandlerResult<Response> {
    match state.db.find_session(&key).await.map_err(port_error_response)? {
        Some(existing) => Ok(redirect_to_session(existing.id)),
        None => Ok(Json(ReasonFormView {
            session_id: None,
            attended_on: key.attended_on,
            reason: None,
            read_only: false,
        })
        .into_response()),
    }
}

/// Action shared by both unavailability forms.
async fn mark_unavailable(state: &AppState, key: SessionKey, reason: String) -> HandlerResult<Response> {
    if let Some(existing) = state.db.find_session(&key).await.map_err(port_error_response)? {
        return Ok(redirect_to_session(existing.id));
    }
    let new_session = unavailable_session(key, reason)?;
    insert_or_redirect(state, new_session).await
}

fn authorize_mentor_self_service(
    ctx: &RequestContext,
    chapter_id: Uuid,
    mentor_id: Uuid,
) -> HandlerResult<()> {
    if ctx.user_id() == mentor_id {
        authorize(ctx, Permission::MarkOwnUnavailability, chapter_id)
    } else {
        authorize(ctx, Permission::ManageSessions, chapter_id)
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List a chapter's sessions, newest first, one page at a time.
#[utoipa::path(
    get,
    path = "/chapters/{chapter_id}/sessions",
    params(("chapter_id" = Uuid, Path, description = "Chapter id"), SessionsQuery),
    responses(
        (status = 200, description = "A page of sessions", body = SessionPage),
        (status = 422, description = "pageNumber out of range")
    )
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(chapter_id): Path<Uuid>,
    Query(query): Query<SessionsQuery>,
) -> HandlerResult<Json<SessionPage>> {
    authorize(&ctx, Permission::ViewRoster, chapter_id)?;
    let page_number = query.page_number.unwrap_or(0).max(0);
    let offset = page_number.checked_mul(PAGE_SIZE).ok_or_else(|| {
        port_error_response(PortError::Invalid(format!(
            "pageNumber {} is out of range",
            page_number
        )))
    })?;
    let filter = SessionFilter {
        kind: None,
        start_date: query.start_date,
        end_date: query.end_date,
        limit: Some(PAGE_SIZE),
        offset: Some(offset),
    };
    let sessions = state
        .db
        .list_sessions(chapter_id, &filter)
        .await
        .map_err(port_error_response)?;
    Ok(Json(SessionPage {
        page_number,
        page_size: PAGE_SIZE,
        sessions: sessions.iter().map(SessionView::from).collect(),
    }))
}

/// Assign a mentor to a student for a roster date.
#[utoipa::path(
    post,
    path = "/chapters/{chapter_id}/students/{student_id}/sessions",
    params(
        ("chapter_id" = Uuid, Path, description = "Chapter id"),
        ("student_id" = Uuid, Path, description = "Student id")
    ),
    request_body(content = CreateSessionForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Session scheduled", body = SessionView),
        (status = 303, description = "A session already exists for this date"),
        (status = 422, description = "Mentor is not assigned to this student")
    )
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((chapter_id, student_id)): Path<(Uuid, Uuid)>,
    Form(form): Form<CreateSessionForm>,
) -> HandlerResult<Response> {
    authorize(&ctx, Permission::ManageSessions, chapter_id)?;
    active_student_in_chapter(&state, chapter_id, student_id).await?;

    let key = SessionKey {
        chapter_id,
        participant: Participant::Student(student_id),
        attended_on: form.attended_on,
    };
    if let Some(existing) = state.db.find_session(&key).await.map_err(port_error_response)? {
        return Ok(redirect_to_session(existing.id));
    }

    let assignments = state
        .db
        .list_assignments_for_student(student_id)
        .await
        .map_err(port_error_response)?;
    if !assignments.iter().any(|a| a.mentor_id == form.mentor_id) {
        return Err(port_error_response(PortError::Invalid(format!(
            "Mentor {} is not assigned to student {}",
            form.mentor_id, student_id
        ))));
    }

    let scheduled = transition(None, SessionEvent::Schedule)
        .map_err(|e| port_error_response(PortError::from(e)))?;
    insert_or_redirect(
        &state,
        NewSession {
            key,
            counterpart_id: Some(form.mentor_id),
            state: scheduled,
        },
    )
    .await
}

/// Loader for the student unavailability form.
#[utoipa::path(
    get,
    path = "/chapters/{chapter_id}/students/{student_id}/unavailable",
    params(
        ("chapter_id" = Uuid, Path, description = "Chapter id"),
        ("student_id" = Uuid, Path, description = "Student id"),
        UnavailableQuery
    ),
    responses(
        (status = 200, description = "Empty form", body = ReasonFormView),
        (status = 303, description = "A record already exists; see its read-only view")
    )
)]
pub async fn student_unavailable_form_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((chapter_id, student_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<UnavailableQuery>,
) -> HandlerResult<Response> {
    authorize(&ctx, Permission::ManageSessions, chapter_id)?;
    active_student_in_chapter(&state, chapter_id, student_id).await?;
    let key = SessionKey {
        chapter_id,
        participant: Participant::Student(student_id),
        attended_on: query.attended_on,
    };
    unavailable_form(&state, key).await
}

/// Mark a student unavailable for a roster date.
#[utoipa::path(
    post,
    path = "/chapters/{chapter_id}/students/{student_id}/unavailable",
    params(
        ("chapter_id" = Uuid, Path, description = "Chapter id"),
        ("student_id" = Uuid, Path, description = "Student id")
    ),
    request_body(content = UnavailableForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Student marked unavailable", body = SessionView),
        (status = 303, description = "A record already exists for this date"),
        (status = 422, description = "Missing reason")
    )
)]
pub async fn mark_student_unavailable_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((chapter_id, student_id)): Path<(Uuid, Uuid)>,
    Form(form): Form<UnavailableForm>,
) -> HandlerResult<Response> {
    authorize(&ctx, Permission::ManageSessions, chapter_id)?;
    active_student_in_chapter(&state, chapter_id, student_id).await?;
    let key = SessionKey {
        chapter_id,
        participant: Participant::Student(student_id),
        attended_on: form.attended_on,
    };
    mark_unavailable(&state, key, form.reason).await
}

/// Loader for the mentor unavailability form.
#[utoipa::path(
    get,
    path = "/chapters/{chapter_id}/mentors/{mentor_id}/unavailable",
    params(
        ("chapter_id" = Uuid, Path, description = "Chapter id"),
        ("mentor_id" = Uuid, Path, description = "Mentor id"),
        UnavailableQuery
    ),
    responses(
        (status = 200, description = "Empty form", body = ReasonFormView),
        (status = 303, description = "A record already exists; see its read-only view")
    )
)]
pub async fn mentor_unavailable_form_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((chapter_id, mentor_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<UnavailableQuery>,
) -> HandlerResult<Response> {
    authorize_mentor_self_service(&ctx, chapter_id, mentor_id)?;
    mentor_in_chapter(&state, chapter_id, mentor_id).await?;
    let key = SessionKey {
        chapter_id,
        participant: Participant::Mentor(mentor_id),
        attended_on: query.attended_on,
    };
    unavailable_form(&state, key).await
}

/// Mark a mentor unavailable for a roster date.
#[utoipa::path(
    post,
    path = "/chapters/{chapter_id}/mentors/{mentor_id}/unavailable",
    params(
        ("chapter_id" = Uuid, Path, description = "Chapter id"),
        ("mentor_id" = Uuid, Path, description = "Mentor id")
    ),
    request_body(content = UnavailableForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Mentor marked unavailable", body = SessionView),
        (status = 303, description = "A record already exists for this date"),
        (status = 422, description = "Missing reason")
    )
)]
pub async fn mark_mentor_unavailable_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((chapter_id, mentor_id)): Path<(Uuid, Uuid)>,
    Form(form): Form<UnavailableForm>,
) -> HandlerResult<Response> {
    authorize_mentor_self_service(&ctx, chapter_id, mentor_id)?;
    mentor_in_chapter(&state, chapter_id, mentor_id).await?;
    let key = SessionKey {
        chapter_id,
        participant: Participant::Mentor(mentor_id),
        attended_on: form.attended_on,
    };
    mark_unavailable(&state, key, form.reason).await
}

/// View a single session.
#[utoipa::path(
    get,
    path = "/sessions/{session_id}",
    params(("session_id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "The session", body = SessionView),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(session_id): Path<Uuid>,
) -> HandlerResult<Json<SessionView>> {
    let session = load_session(&state, session_id).await?;
    authorize(&ctx, Permission::ViewRoster, session.key.chapter_id)?;
    Ok(Json(SessionView::from(&session)))
}

/// Loader for the cancel form. Completed sessions redirect back to the session.
#[utoipa::path(
    get,
    path = "/sessions/{session_id}/cancel",
    params(("session_id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 200, description = "Cancel form", body = ReasonFormView),
        (status = 303, description = "The session can no longer be cancelled")
    )
)]
pub async fn cancel_form_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(session_id): Path<Uuid>,
) -> HandlerResult<Response> {
    let session = load_session(&state, session_id).await?;
    authorize(&ctx, Permission::ManageSessions, session.key.chapter_id)?;

    match &session.state {
        SessionState::Scheduled => Ok(Json(ReasonFormView {
            session_id: Some(session.id),
            attended_on: session.key.attended_on,
            reason: None,
            read_only: false,
        })
        .into_response()),
        SessionState::Cancelled { reason, .. } => Ok(Json(ReasonFormView {
            session_id: Some(session.id),
            attended_on: session.key.attended_on,
            reason: Some(reason.clone()),
            read_only: true,
        })
        .into_response()),
        _ => Ok(redirect_to_session(session.id)),
    }
}

/// Cancel a scheduled session.
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/cancel",
    params(("session_id" = Uuid, Path, description = "Session id")),
    request_body(content = CancelForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Session cancelled", body = SessionView),
        (status = 422, description = "Missing reason or session not cancellable")
    )
)]
pub async fn cancel_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(session_id): Path<Uuid>,
    Form(form): Form<CancelForm>,
) -> HandlerResult<Json<SessionView>> {
    let session = load_session(&state, session_id).await?;
    authorize(&ctx, Permission::ManageSessions, session.key.chapter_id)?;
    let event = SessionEvent::Cancel {
        reason: form.reason,
        at: Utc::now(),
    };
    let updated = apply_event(&state, &session, event, None, None).await?;
    info!("Session {} cancelled by {}", updated.id, ctx.user_id());
    Ok(Json(SessionView::from(&updated)))
}

/// Submit the session report, completing the session.
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/report",
    params(("session_id" = Uuid, Path, description = "Session id")),
    request_body(content = ReportForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Session completed", body = SessionView),
        (status = 403, description = "Not the assigned mentor"),
        (status = 422, description = "Empty report or session not scheduled")
    )
)]
pub async fn submit_report_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(session_id): Path<Uuid>,
    Form(form): Form<ReportForm>,
) -> HandlerResult<Json<SessionView>> {
    let session = load_session(&state, session_id).await?;
    authorize(&ctx, Permission::SubmitReport, session.key.chapter_id)?;
    if ctx.role() == Role::Mentor && session.assigned_mentor_id() != Some(ctx.user_id()) {
        return Err(port_error_response(PortError::Forbidden(
            "Only the assigned mentor can report on this session".to_string(),
        )));
    }
    let report = form.report.trim();
    if report.is_empty() {
        return Err(port_error_response(PortError::Invalid(
            "A report is required to complete a session".to_string(),
        )));
    }

    let event = SessionEvent::Complete {
        on: Utc::now().date_naive(),
    };
    let updated = apply_event(&state, &session, event, Some(report), None).await?;
    Ok(Json(SessionView::from(&updated)))
}

/// Sign off a completed session.
#[utoipa::path(
    post,
    path = "/sessions/{session_id}/sign-off",
    params(("session_id" = Uuid, Path, description = "Session id")),
    request_body(content = SignOffForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Session signed off", body = SessionView),
        (status = 422, description = "Session not completed")
    )
)]
pub async fn sign_off_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(session_id): Path<Uuid>,
    Form(form): Form<SignOffForm>,
) -> HandlerResult<Json<SessionView>> {
    let session = load_session(&state, session_id).await?;
    authorize(&ctx, Permission::SignOffSessions, session.key.chapter_id)?;
    let feedback = form
        .report_feedback
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());
    let event = SessionEvent::SignOff {
        on: Utc::now().date_naive(),
    };
    let updated = apply_event(&state, &session, event, None, feedback).await?;
    info!("Session {} signed off by {}", updated.id, ctx.user_id());
    Ok(Json(SessionView::from(&updated)))
}
