//! crates/roster_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::roles::Role;
use crate::session_state::{SessionState, SessionStatus};

/// A regional branch of the mentoring program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub id: Uuid,
    pub name: String,
}

/// A named date range (e.g. "Term 4") bounding roster generation.
///
/// Terms are seeded administratively and never change afterwards. Terms for a
/// year are expected to be contiguous and non-overlapping, but nothing here
/// enforces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolTerm {
    pub id: Uuid,
    pub year: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SchoolTerm {
    /// Whether `date` falls inside the term, both ends inclusive.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// "Term 4 2024" style label.
    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.year)
    }
}

// Represents a user - mentors, coordinators and admins alike
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    /// The chapter the user belongs to. Admins may have none.
    pub chapter_id: Option<Uuid>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie)
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// A mentee enrolled in the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub full_name: String,
    pub year_level: Option<i32>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Student {
    pub fn is_active(&self) -> bool {
        self.archived_at.is_none()
    }

    /// The label used for the first column of roster rows, e.g. "Ada Lovelace (Year 5)".
    pub fn roster_label(&self) -> String {
        match self.year_level {
            Some(year) => format!("{} (Year {})", self.full_name, year),
            None => self.full_name.clone(),
        }
    }
}

/// How often a mentor/student pair is expected to meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Weekly,
    Fortnightly,
}

impl Frequency {
    pub fn in_days(self) -> i64 {
        match self {
            Frequency::Weekly => 7,
            Frequency::Fortnightly => 14,
        }
    }
}

impl TryFrom<i32> for Frequency {
    type Error = String;

    fn try_from(days: i32) -> Result<Self, Self::Error> {
        match days {
            7 => Ok(Frequency::Weekly),
            14 => Ok(Frequency::Fortnightly),
            other => Err(format!("unsupported session frequency of {} days", other)),
        }
    }
}

/// Many-to-many edge between a mentor and a student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentorToStudentAssignment {
    pub mentor_id: Uuid,
    pub student_id: Uuid,
    pub frequency: Frequency,
}

/// Which side of the mentoring pair an attendance record belongs to.
///
/// `Mentor` records are the mentor-side `Session`, `Student` records the
/// student-side `StudentSession`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Participant {
    Mentor(Uuid),
    Student(Uuid),
}

impl Participant {
    pub fn id(&self) -> Uuid {
        match self {
            Participant::Mentor(id) | Participant::Student(id) => *id,
        }
    }

    pub fn kind(&self) -> ParticipantKind {
        match self {
            Participant::Mentor(_) => ParticipantKind::Mentor,
            Participant::Student(_) => ParticipantKind::Student,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantKind {
    Mentor,
    Student,
}

impl ParticipantKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantKind::Mentor => "mentor",
            ParticipantKind::Student => "student",
        }
    }

    pub fn with_id(self, id: Uuid) -> Participant {
        match self {
            ParticipantKind::Mentor => Participant::Mentor(id),
            ParticipantKind::Student => Participant::Student(id),
        }
    }
}

impl std::str::FromStr for ParticipantKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mentor" => Ok(ParticipantKind::Mentor),
            "student" => Ok(ParticipantKind::Student),
            other => Err(format!("unknown participant kind '{}'", other)),
        }
    }
}

/// The compound key that identifies at most one attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub chapter_id: Uuid,
    pub participant: Participant,
    pub attended_on: NaiveDate,
}

/// An attendance record for one participant on one roster date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub key: SessionKey,
    /// For a student record, the assigned mentor. For a mentor record, the
    /// student being mentored, when known.
    pub counterpart_id: Option<Uuid>,
    pub state: SessionState,
    pub report: Option<String>,
    pub report_feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    /// The mentor assigned to a student-side record, if any.
    pub fn assigned_mentor_id(&self) -> Option<Uuid> {
        match self.key.participant {
            Participant::Student(_) => self.counterpart_id,
            Participant::Mentor(id) => Some(id),
        }
    }
}

/// A session not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub key: SessionKey,
    pub counterpart_id: Option<Uuid>,
    pub state: SessionState,
}
