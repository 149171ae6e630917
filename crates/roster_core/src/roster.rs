//! crates/roster_core/src/roster.rs
//!
//! Builds the student x date roster grid for a chapter and term, annotated
//! with the mentor assigned to each student on each date.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::dates::dates_for_term;
use crate::domain::{Participant, ParticipantKind, SchoolTerm, Session, Student, User};
use crate::ports::{DatabaseService, PortResult, SessionFilter};

pub const STUDENTS_COLUMN: &str = "Students";
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedMentor {
    pub mentor_id: Uuid,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub student_id: Uuid,
    pub label: String,
    pub cells: BTreeMap<NaiveDate, Option<AssignedMentor>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<RosterRow>,
}

impl Roster {
    /// Column headers for the tabular presentations: `Students` then one per date.
    pub fn headers(&self) -> Vec<String> {
        std::iter::once(STUDENTS_COLUMN.to_string())
            .chain(self.dates.iter().map(|d| d.format(DATE_KEY_FORMAT).to_string()))
            .collect()
    }

    /// One record per student, aligned with `headers()`. Empty cells are blank.
    pub fn export_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                std::iter::once(row.label.clone())
                    .chain(self.dates.iter().map(|d| {
                        row.cells
                            .get(d)
                            .and_then(|cell| cell.as_ref())
                            .map(|m| m.full_name.clone())
                            .unwrap_or_default()
                    }))
                    .collect()
            })
            .collect()
    }
}

/// The dates a roster covers: every week of the term, or just `date_filter`.
pub fn roster_dates(term: &SchoolTerm, date_filter: Option<NaiveDate>) -> Vec<NaiveDate> {
    match date_filter {
        Some(date) => vec![date],
        None => dates_for_term(term.start_date, term.end_date).collect(),
    }
}

/// Assembles the grid from already-loaded records.
///
/// Archived students are skipped. Only student-side records with an assigned
/// mentor fill a cell; anything else leaves it blank. `mentors` must hold the
/// user behind every counterpart id, whatever that user's role or chapter.
pub fn build_roster(
    students: &[Student],
    dates: &[NaiveDate],
    sessions: &[Session],
    mentors: &[User],
) -> Roster {
    let mentor_names: HashMap<Uuid, &str> =
        mentors.iter().map(|m| (m.id, m.full_name.as_str())).collect();

    let mut assigned: HashMap<(Uuid, NaiveDate), AssignedMentor> = HashMap::new();
    for session in sessions {
        let Participant::Student(student_id) = session.key.participant else {
            continue;
        };
        let Some(mentor_id) = session.counterpart_id else {
            continue;
        };
        let full_name = mentor_names
            .get(&mentor_id)
            .map(|n| n.to_string())
            .unwrap_or_default();
        assigned.insert(
            (student_id, session.key.attended_on),
            AssignedMentor { mentor_id, full_name },
        );
    }

    let mut active: Vec<&Student> = students.iter().filter(|s| s.is_active()).collect();
    active.sort_by(|a, b| a.full_name.cmp(&b.full_name));

    let rows = active
        .into_iter()
        .map(|student| RosterRow {
            student_id: student.id,
            label: student.roster_label(),
            cells: dates
                .iter()
                .map(|d| (*d, assigned.get(&(student.id, *d)).cloned()))
                .collect(),
        })
        .collect();

    Roster {
        dates: dates.to_vec(),
        rows,
    }
}

fn counterpart_ids(sessions: &[Session]) -> BTreeSet<Uuid> {
    sessions
        .iter()
        .filter(|s| s.key.participant.kind() == ParticipantKind::Student)
        .filter_map(|s| s.counterpart_id)
        .collect()
}

/// Loads everything a chapter's roster needs and builds it.
pub async fn load_roster(
    db: &dyn DatabaseService,
    chapter_id: Uuid,
    term: &SchoolTerm,
    date_filter: Option<NaiveDate>,
) -> PortResult<Roster> {
    let dates = roster_dates(term, date_filter);
    let filter = SessionFilter {
        kind: Some(ParticipantKind::Student),
        start_date: dates.first().copied(),
        end_date: dates.last().copied(),
        ..SessionFilter::default()
    };

    let (students, sessions) = futures::try_join!(
        db.list_active_students(chapter_id),
        db.list_sessions(chapter_id, &filter),
    )?;
    let mentor_ids: Vec<Uuid> = counterpart_ids(&sessions).into_iter().collect();
    let mentors = db.get_users_by_ids(&mentor_ids).await?;

    Ok(build_roster(&students, &dates, &sessions, &mentors))
}
