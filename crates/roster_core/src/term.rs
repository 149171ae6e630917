//! crates/roster_core/src/term.rs
//!
//! Resolves which school term a date (or an explicit request) refers to.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::SchoolTerm;
use crate::ports::PortError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TermError {
    #[error("School term {0} not found")]
    NotFound(Uuid),
    #[error("No school terms have been configured")]
    NoTerms,
}

impl From<TermError> for PortError {
    fn from(e: TermError) -> Self {
        PortError::NotFound(e.to_string())
    }
}

/// Returns the term whose inclusive date range contains `date`.
///
/// `None` means the date falls outside every term (school holidays); callers
/// treat that as "no current term".
pub fn find_current_term(terms: &[SchoolTerm], date: NaiveDate) -> Option<&SchoolTerm> {
    terms.iter().find(|t| t.contains(date))
}

/// The term containing `date`, else the next term to start, else the most
/// recently finished one.
pub fn nearest_term(terms: &[SchoolTerm], date: NaiveDate) -> Option<&SchoolTerm> {
    find_current_term(terms, date)
        .or_else(|| {
            terms
                .iter()
                .filter(|t| t.start_date > date)
                .min_by_key(|t| t.start_date)
        })
        .or_else(|| {
            terms
                .iter()
                .filter(|t| t.end_date < date)
                .max_by_key(|t| t.end_date)
        })
}

/// Picks the term a request is about.
///
/// An explicit id must exist; it is never replaced by today's term.
pub fn resolve_term(
    terms: &[SchoolTerm],
    requested_id: Option<Uuid>,
    today: NaiveDate,
) -> Result<&SchoolTerm, TermError> {
    match requested_id {
        Some(id) => terms
            .iter()
            .find(|t| t.id == id)
            .ok_or(TermError::NotFound(id)),
        None => nearest_term(terms, today).ok_or(TermError::NoTerms),
    }
}

/// The terms of one year, earliest first.
pub fn terms_for_year(terms: &[SchoolTerm], year: i32) -> Vec<SchoolTerm> {
    let mut selected: Vec<SchoolTerm> = terms.iter().filter(|t| t.year == year).cloned().collect();
    selected.sort_by_key(|t| t.start_date);
    selected
}
