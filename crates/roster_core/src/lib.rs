pub mod dates;
pub mod domain;
pub mod ports;
pub mod roles;
pub mod roster;
pub mod session_state;
pub mod term;

pub use dates::{dates_for_term, expected_session_dates, TermDates};
pub use domain::{
    AuthSession, Chapter, Frequency, MentorToStudentAssignment, NewSession, Participant,
    ParticipantKind, SchoolTerm, Session, SessionKey, Student, User, UserCredentials,
};
pub use ports::{DatabaseService, PortError, PortResult, SessionFilter};
pub use roles::{highest_role, Permission, RequestContext, Role};
pub use roster::{build_roster, load_roster, roster_dates, AssignedMentor, Roster, RosterRow};
pub use session_state::{
    get_status, reason_is_read_only, transition, SessionEvent, SessionState, SessionStatus,
    TransitionError,
};
pub use term::{find_current_term, nearest_term, resolve_term, terms_for_year, TermError};
