//! crates/roster_core/src/session_state.rs
//!
//! The lifecycle of a single attendance record, modelled as an explicit state
//! enum with one transition function that validates every move.
//!
//! ```text
//!   (none) --Schedule--------> Scheduled --Complete--> Completed --SignOff--> SignedOff
//!   (none) --MarkUnavailable-> Unavailable
//!                              Scheduled --Cancel----> Cancelled
//! ```

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::SessionKey;
use crate::ports::{DatabaseService, PortError, PortResult};

/// The flat status stored alongside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    Scheduled,
    Unavailable,
    Cancelled,
    Completed,
    SignedOff,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "SCHEDULED",
            SessionStatus::Unavailable => "UNAVAILABLE",
            SessionStatus::Cancelled => "CANCELLED",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::SignedOff => "SIGNED_OFF",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(SessionStatus::Scheduled),
            "UNAVAILABLE" => Ok(SessionStatus::Unavailable),
            "CANCELLED" => Ok(SessionStatus::Cancelled),
            "COMPLETED" => Ok(SessionStatus::Completed),
            "SIGNED_OFF" => Ok(SessionStatus::SignedOff),
            other => Err(format!("unknown session status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Scheduled,
    Unavailable {
        reason: String,
    },
    Cancelled {
        reason: String,
        cancelled_at: DateTime<Utc>,
    },
    Completed {
        completed_on: NaiveDate,
    },
    SignedOff {
        completed_on: NaiveDate,
        signed_off_on: NaiveDate,
    },
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionState::Scheduled => SessionStatus::Scheduled,
            SessionState::Unavailable { .. } => SessionStatus::Unavailable,
            SessionState::Cancelled { .. } => SessionStatus::Cancelled,
            SessionState::Completed { .. } => SessionStatus::Completed,
            SessionState::SignedOff { .. } => SessionStatus::SignedOff,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            SessionState::Unavailable { reason } | SessionState::Cancelled { reason, .. } => {
                Some(reason)
            }
            _ => None,
        }
    }

    pub fn completed_on(&self) -> Option<NaiveDate> {
        match self {
            SessionState::Completed { completed_on }
            | SessionState::SignedOff { completed_on, .. } => Some(*completed_on),
            _ => None,
        }
    }

    pub fn signed_off_on(&self) -> Option<NaiveDate> {
        match self {
            SessionState::SignedOff { signed_off_on, .. } => Some(*signed_off_on),
            _ => None,
        }
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        match self {
            SessionState::Cancelled { cancelled_at, .. } => Some(*cancelled_at),
            _ => None,
        }
    }

    /// Whether the cancel form may still be offered for this record.
    pub fn can_cancel(&self) -> bool {
        matches!(self, SessionState::Scheduled)
    }

    /// Rebuilds a state from its stored columns.
    ///
    /// A `COMPLETED` row with `signed_off_on` set is a signed-off session.
    pub fn from_columns(
        status: SessionStatus,
        reason: Option<String>,
        completed_on: Option<NaiveDate>,
        signed_off_on: Option<NaiveDate>,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Result<Self, String> {
        let non_blank = |reason: Option<String>| {
            reason
                .filter(|r| !r.trim().is_empty())
                .ok_or_else(|| format!("{} session is missing its reason", status))
        };
        match status {
            SessionStatus::Scheduled => Ok(SessionState::Scheduled),
            SessionStatus::Unavailable => Ok(SessionState::Unavailable {
                reason: non_blank(reason)?,
            }),
            SessionStatus::Cancelled => Ok(SessionState::Cancelled {
                reason: non_blank(reason)?,
                cancelled_at: cancelled_at
                    .ok_or_else(|| "CANCELLED session is missing cancelled_at".to_string())?,
            }),
            SessionStatus::Completed | SessionStatus::SignedOff => {
                let completed_on = completed_on
                    .ok_or_else(|| format!("{} session is missing completed_on", status))?;
                Ok(match signed_off_on {
                    Some(signed_off_on) => SessionState::SignedOff {
                        completed_on,
                        signed_off_on,
                    },
                    None => SessionState::Completed { completed_on },
                })
            }
        }
    }
}

/// The actions that move a record through its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Schedule,
    MarkUnavailable { reason: String },
    Cancel { reason: String, at: DateTime<Utc> },
    Complete { on: NaiveDate },
    SignOff { on: NaiveDate },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Schedule => "schedule",
            SessionEvent::MarkUnavailable { .. } => "mark unavailable",
            SessionEvent::Cancel { .. } => "cancel",
            SessionEvent::Complete { .. } => "complete",
            SessionEvent::SignOff { .. } => "sign off",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("A reason is required to {0}")]
    MissingReason(&'static str),
    #[error("Cannot {event} a session that is {from}")]
    InvalidTransition {
        from: SessionStatus,
        event: &'static str,
    },
    #[error("Cannot {0} a session that does not exist yet")]
    NoSession(&'static str),
    #[error("A session already exists for this date ({0})")]
    AlreadyExists(SessionStatus),
}

impl From<TransitionError> for PortError {
    fn from(e: TransitionError) -> Self {
        PortError::Invalid(e.to_string())
    }
}

fn required_reason(reason: &str, event: &'static str) -> Result<String, TransitionError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(TransitionError::MissingReason(event));
    }
    Ok(trimmed.to_string())
}

/// Applies `event` to the current state of a record (`None` when no record
/// exists for the date yet) and returns the new state.
pub fn transition(
    current: Option<&SessionState>,
    event: SessionEvent,
) -> Result<SessionState, TransitionError> {
    let name = event.name();
    match (current, event) {
        (None, SessionEvent::Schedule) => Ok(SessionState::Scheduled),
        (None, SessionEvent::MarkUnavailable { reason }) => Ok(SessionState::Unavailable {
            reason: required_reason(&reason, name)?,
        }),
        (None, _) => Err(TransitionError::NoSession(name)),
        (Some(existing), SessionEvent::Schedule | SessionEvent::MarkUnavailable { .. }) => {
            Err(TransitionError::AlreadyExists(existing.status()))
        }
        (Some(SessionState::Scheduled), SessionEvent::Cancel { reason, at }) => {
            Ok(SessionState::Cancelled {
                reason: required_reason(&reason, name)?,
                cancelled_at: at,
            })
        }
        (Some(SessionState::Scheduled), SessionEvent::Complete { on }) => {
            Ok(SessionState::Completed { completed_on: on })
        }
        (Some(SessionState::Completed { completed_on }), SessionEvent::SignOff { on }) => {
            Ok(SessionState::SignedOff {
                completed_on: *completed_on,
                signed_off_on: on,
            })
        }
        (Some(existing), _) => Err(TransitionError::InvalidTransition {
            from: existing.status(),
            event: name,
        }),
    }
}

/// Whether a form presenting this record must show the reason read-only.
pub fn reason_is_read_only(state: &SessionState) -> bool {
    state.reason().is_some()
}

/// The status of the record for `key`, or `None` when the date is still open.
pub async fn get_status(db: &dyn DatabaseService, key: &SessionKey) -> PortResult<Option<SessionStatus>> {
    Ok(db.find_session(key).await?.map(|s| s.status()))
}
