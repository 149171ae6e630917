//! services/api/src/web/terms.rs
//!
//! Chapter and school-term lookups.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{NaiveDate, Utc};
use roster_core::roles::RequestContext;
use roster_core::term::{find_current_term, nearest_term, terms_for_year};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::web::port_error_response;
use crate::web::rest::{ChapterView, TermView};
use crate::web::state::AppState;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TermsQuery {
    pub year: Option<i32>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CurrentTermQuery {
    /// Defaults to today.
    pub date: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTermResponse {
    pub date: NaiveDate,
    /// The term containing `date`; null during school holidays.
    pub term: Option<TermView>,
    /// The term rosters default to when `term` is null.
    pub nearest: Option<TermView>,
}

/// List the chapters visible to the caller.
#[utoipa::path(
    get,
    path = "/chapters",
    responses((status = 200, description = "Accessible chapters", body = [ChapterView]))
)]
pub async fn list_chapters_handler(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Vec<ChapterView>>, (StatusCode, String)> {
    let chapters = state.db.list_chapters().await.map_err(port_error_response)?;
    Ok(Json(
        ctx.accessible_chapters(chapters)
            .into_iter()
            .map(ChapterView::from)
            .collect(),
    ))
}

/// List school terms, optionally for one year.
#[utoipa::path(
    get,
    path = "/terms",
    params(TermsQuery),
    responses((status = 200, description = "School terms ordered by start date", body = [TermView]))
)]
pub async fn list_terms_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TermsQuery>,
) -> Result<Json<Vec<TermView>>, (StatusCode, String)> {
    let mut terms = state.db.list_school_terms().await.map_err(port_error_response)?;
    if let Some(year) = query.year {
        terms = terms_for_year(&terms, year);
    }
    Ok(Json(terms.iter().map(TermView::from).collect()))
}

/// Resolve the term containing a date.
#[utoipa::path(
    get,
    path = "/terms/current",
    params(CurrentTermQuery),
    responses((status = 200, description = "The current term, if any", body = CurrentTermResponse))
)]
pub async fn current_term_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CurrentTermQuery>,
) -> Result<Json<CurrentTermResponse>, (StatusCode, String)> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let terms = state.db.list_school_terms().await.map_err(port_error_response)?;
    Ok(Json(CurrentTermResponse {
        date,
        term: find_current_term(&terms, date).map(TermView::from),
        nearest: nearest_term(&terms, date).map(TermView::from),
    }))
}
