//! services/api/src/web/roster.rs
//!
//! The roster grid (on-screen JSON and spreadsheet export) and the expected
//! session dates of a student's mentoring assignments.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{NaiveDate, Utc};
use roster_core::dates::expected_session_dates;
use roster_core::domain::SchoolTerm;
use roster_core::ports::PortError;
use roster_core::roles::{Permission, RequestContext};
use roster_core::roster::{load_roster, Roster};
use roster_core::term::resolve_term;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::web::rest::TermView;
use crate::web::state::AppState;
use crate::web::{authorize, port_error_response};

//=========================================================================================
// Query and Response Types
//=========================================================================================

#[derive(Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct RosterQuery {
    /// Defaults to the term containing (or nearest to) today, or to `date`.
    pub term_id: Option<Uuid>,
    /// Restricts the roster to a single date.
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssignedMentorView {
    pub mentor_id: Uuid,
    pub full_name: String,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RosterRowView {
    pub student_id: Uuid,
    pub label: String,
    /// One cell per entry of `dates`, null where no mentor is assigned.
    pub cells: Vec<Option<AssignedMentorView>>,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RosterResponse {
    pub chapter_id: Uuid,
    pub term: TermView,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<RosterRowView>,
}

impl RosterResponse {
    fn new(chapter_id: Uuid, term: &SchoolTerm, roster: Roster) -> Self {
        let rows = roster
            .rows
            .into_iter()
            .map(|row| RosterRowView {
                student_id: row.student_id,
                label: row.label,
                cells: roster
                    .dates
                    .iter()
                    .map(|d| {
                        row.cells.get(d).cloned().flatten().map(|m| AssignedMentorView {
                            mentor_id: m.mentor_id,
                            full_name: m.full_name,
                        })
                    })
                    .collect(),
            })
            .collect();
        Self {
            chapter_id,
            term: TermView::from(term),
            dates: roster.dates,
            rows,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedSessionsQuery {
    pub term_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedSessionsView {
    pub mentor_id: Uuid,
    pub frequency_in_days: i64,
    pub dates: Vec<NaiveDate>,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Loads the terms and picks the one the request is about. A lone `date`
/// selects the term around that date rather than around today; a `date`
/// given with an explicit term must fall inside it.
async fn requested_term(
    state: &AppState,
    term_id: Option<Uuid>,
    date: Option<NaiveDate>,
) -> Result<SchoolTerm, (StatusCode, String)> {
    let terms = state.db.list_school_terms().await.map_err(port_error_response)?;
    let anchor = date.unwrap_or_else(|| Utc::now().date_naive());
    let term = resolve_term(&terms, term_id, anchor)
        .cloned()
        .map_err(|e| port_error_response(PortError::from(e)))?;
    if let (Some(_), Some(date)) = (term_id, date) {
        if !term.contains(date) {
            return Err(port_error_response(PortError::Invalid(format!(
                "{} is outside {}",
                date,
                term.label()
            ))));
        }
    }
    Ok(term)
}

async fn chapter_roster(
    state: &AppState,
    ctx: &RequestContext,
    chapter_id: Uuid,
    query: &RosterQuery,
) -> Result<(SchoolTerm, Roster), (StatusCode, String)> {
    authorize(ctx, Permission::ViewRoster, chapter_id)?;
    state.db.get_chapter(chapter_id).await.map_err(port_error_response)?;
    let term = requested_term(state, query.term_id, query.date).await?;
    let roster = load_roster(state.db.as_ref(), chapter_id, &term, query.date)
        .await
        .map_err(port_error_response)?;
    Ok((term, roster))
}

/// Serializes the roster as a spreadsheet-compatible CSV document.
pub fn roster_csv(roster: &Roster) -> Result<Vec<u8>, PortError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(roster.headers())
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
    for record in roster.export_rows() {
        writer
            .write_record(&record)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| PortError::Unexpected(e.to_string()))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// The student x date roster for a chapter.
#[utoipa::path(
    get,
    path = "/chapters/{chapter_id}/roster",
    params(("chapter_id" = Uuid, Path, description = "Chapter id"), RosterQuery),
    responses(
        (status = 200, description = "Roster grid", body = RosterResponse),
        (status = 403, description = "Not allowed to view this chapter"),
        (status = 404, description = "Unknown chapter or term"),
        (status = 422, description = "Date lies outside the requested term")
    )
)]
pub async fn roster_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(chapter_id): Path<Uuid>,
    Query(query): Query<RosterQuery>,
) -> Result<Json<RosterResponse>, (StatusCode, String)> {
    let (term, roster) = chapter_roster(&state, &ctx, chapter_id, &query).await?;
    Ok(Json(RosterResponse::new(chapter_id, &term, roster)))
}

/// The same roster as a downloadable spreadsheet.
#[utoipa::path(
    get,
    path = "/chapters/{chapter_id}/roster/export",
    params(("chapter_id" = Uuid, Path, description = "Chapter id"), RosterQuery),
    responses(
        (status = 200, description = "CSV attachment", content_type = "text/csv"),
        (status = 403, description = "Not allowed to view this chapter"),
        (status = 404, description = "Unknown chapter or term"),
        (status = 422, description = "Date lies outside the requested term")
    )
)]
pub async fn roster_export_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(chapter_id): Path<Uuid>,
    Query(query): Query<RosterQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let (term, roster) = chapter_roster(&state, &ctx, chapter_id, &query).await?;
    let body = roster_csv(&roster).map_err(port_error_response)?;

    let suffix = match query.date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => term.label().replace(' ', "-"),
    };
    info!(
        "Exported roster for chapter {} ({} students, {} dates)",
        chapter_id,
        roster.rows.len(),
        roster.dates.len()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"roster-{}.csv\"", suffix),
            ),
        ],
        body,
    ))
}

/// The dates each of a student's mentors is expected to attend in a term.
#[utoipa::path(
    get,
    path = "/chapters/{chapter_id}/students/{student_id}/expected-sessions",
    params(
        ("chapter_id" = Uuid, Path, description = "Chapter id"),
        ("student_id" = Uuid, Path, description = "Student id"),
        ExpectedSessionsQuery
    ),
    responses((status = 200, description = "Expected dates per assignment", body = [ExpectedSessionsView]))
)]
pub async fn expected_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((chapter_id, student_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ExpectedSessionsQuery>,
) -> Result<Json<Vec<ExpectedSessionsView>>, (StatusCode, String)> {
    authorize(&ctx, Permission::ViewRoster, chapter_id)?;
    let student = state.db.get_student(student_id).await.map_err(port_error_response)?;
    if student.chapter_id != chapter_id {
        return Err(port_error_response(PortError::NotFound(format!(
            "Student {} not found in chapter {}",
            student_id, chapter_id
        ))));
    }
    let term = requested_term(&state, query.term_id, None).await?;
    let assignments = state
        .db
        .list_assignments_for_student(student_id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(
        assignments
            .into_iter()
            .map(|a| ExpectedSessionsView {
                mentor_id: a.mentor_id,
                frequency_in_days: a.frequency.in_days(),
                dates: expected_session_dates(&term, a.frequency).collect(),
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::domain::Student;
    use roster_core::roster::build_roster;

    #[test]
    fn csv_has_header_and_blank_cells() {
        let student = Student {
            id: Uuid::new_v4(),
            chapter_id: Uuid::new_v4(),
            full_name: "Sam Lee".to_string(),
            year_level: Some(5),
            archived_at: None,
        };
        let dates = [
            NaiveDate::from_ymd_opt(2024, 10, 7).unwrap(),
            NaiveDate::from_ymd_opt(2024, 10, 14).unwrap(),
        ];
        let roster = build_roster(&[student], &dates, &[], &[]);

        let csv = String::from_utf8(roster_csv(&roster).unwrap()).unwrap();
        assert_eq!(csv, "Students,2024-10-07,2024-10-14\nSam Lee (Year 5),,\n");
    }
}
