//! In-memory `DatabaseService` and fixtures shared by the service tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use api_lib::config::Config;
use api_lib::web::state::AppState;
use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use roster_core::domain::{
    Chapter, Frequency, MentorToStudentAssignment, NewSession, SchoolTerm, Session, SessionKey,
    Student, User, UserCredentials,
};
use roster_core::ports::{DatabaseService, PortError, PortResult, SessionFilter};
use roster_core::roles::{RequestContext, Role};
use roster_core::session_state::SessionState;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<(User, String)>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    chapters: Vec<Chapter>,
    terms: Vec<SchoolTerm>,
    students: Vec<Student>,
    assignments: Vec<MentorToStudentAssignment>,
    sessions: Vec<Session>,
    /// `find_session` reports every date as open, as when a concurrent
    /// request inserts between the lookup and the insert.
    lookups_miss: bool,
    /// Duplicate inserts report a conflict without naming the winner.
    conflicts_hide_id: bool,
}

#[derive(Default, Clone)]
pub struct InMemoryDb {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryDb {
    pub fn add_user(&self, user: User, hashed_password: &str) {
        self.tables
            .lock()
            .unwrap()
            .users
            .push((user, hashed_password.to_string()));
    }

    pub fn add_chapter(&self, chapter: Chapter) {
        self.tables.lock().unwrap().chapters.push(chapter);
    }

    pub fn add_term(&self, term: SchoolTerm) {
        self.tables.lock().unwrap().terms.push(term);
    }

    pub fn add_student(&self, student: Student) {
        self.tables.lock().unwrap().students.push(student);
    }

    pub fn add_assignment(&self, assignment: MentorToStudentAssignment) {
        self.tables.lock().unwrap().assignments.push(assignment);
    }

    pub fn add_session(&self, session: Session) {
        self.tables.lock().unwrap().sessions.push(session);
    }

    pub fn sessions(&self) -> Vec<Session> {
        self.tables.lock().unwrap().sessions.clone()
    }

    pub fn miss_lookups(&self) {
        self.tables.lock().unwrap().lookups_miss = true;
    }

    pub fn hide_conflict_ids(&self) {
        self.tables.lock().unwrap().conflicts_hide_id = true;
    }

    pub fn auth_session_count(&self) -> usize {
        self.tables.lock().unwrap().auth_sessions.len()
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn get_user_by_id(&self, user_id: Uuid) -> PortResult<User> {
        let tables = self.tables.lock().unwrap();
        tables
            .users
            .iter()
            .find(|(u, _)| u.id == user_id)
            .map(|(u, _)| u.clone())
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.lock().unwrap();
        tables
            .users
            .iter()
            .find(|(u, _)| u.email.eq_ignore_ascii_case(email))
            .map(|(u, hash)| UserCredentials {
                user_id: u.id,
                email: u.email.clone(),
                hashed_password: hash.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.tables
            .lock()
            .unwrap()
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let tables = self.tables.lock().unwrap();
        match tables.auth_sessions.get(session_id) {
            Some((user_id, expires_at)) if *expires_at > Utc::now() => Ok(*user_id),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.lock().unwrap().auth_sessions.remove(session_id);
        Ok(())
    }

    async fn list_chapters(&self) -> PortResult<Vec<Chapter>> {
        Ok(self.tables.lock().unwrap().chapters.clone())
    }

    async fn get_chapter(&self, chapter_id: Uuid) -> PortResult<Chapter> {
        let tables = self.tables.lock().unwrap();
        tables
            .chapters
            .iter()
            .find(|c| c.id == chapter_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Chapter {} not found", chapter_id)))
    }

    async fn list_school_terms(&self) -> PortResult<Vec<SchoolTerm>> {
        Ok(self.tables.lock().unwrap().terms.clone())
    }

    async fn list_active_students(&self, chapter_id: Uuid) -> PortResult<Vec<Student>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .students
            .iter()
            .filter(|s| s.chapter_id == chapter_id && s.is_active())
            .cloned()
            .collect())
    }

    async fn get_student(&self, student_id: Uuid) -> PortResult<Student> {
        let tables = self.tables.lock().unwrap();
        tables
            .students
            .iter()
            .find(|s| s.id == student_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Student {} not found", student_id)))
    }

    async fn get_users_by_ids(&self, user_ids: &[Uuid]) -> PortResult<Vec<User>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .map(|(u, _)| u)
            .filter(|u| user_ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list_assignments_for_student(
        &self,
        student_id: Uuid,
    ) -> PortResult<Vec<MentorToStudentAssignment>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .assignments
            .iter()
            .filter(|a| a.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn find_session(&self, key: &SessionKey) -> PortResult<Option<Session>> {
        let tables = self.tables.lock().unwrap();
        if tables.lookups_miss {
            return Ok(None);
        }
        Ok(tables.sessions.iter().find(|s| s.key == *key).cloned())
    }

    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<Session> {
        let tables = self.tables.lock().unwrap();
        tables
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn list_sessions(&self, chapter_id: Uuid, filter: &SessionFilter) -> PortResult<Vec<Session>> {
        let tables = self.tables.lock().unwrap();
        let mut sessions: Vec<Session> = tables
            .sessions
            .iter()
            .filter(|s| s.key.chapter_id == chapter_id)
            .filter(|s| filter.kind.map_or(true, |k| s.key.participant.kind() == k))
            .filter(|s| filter.start_date.map_or(true, |d| s.key.attended_on >= d))
            .filter(|s| filter.end_date.map_or(true, |d| s.key.attended_on <= d))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.key.attended_on.cmp(&a.key.attended_on));
        let offset = filter.offset.unwrap_or(0) as usize;
        let limit = filter.limit.map_or(usize::MAX, |l| l as usize);
        Ok(sessions.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert_session(&self, session: NewSession) -> PortResult<Session> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(existing) = tables.sessions.iter().find(|s| s.key == session.key) {
            let existing_id = (!tables.conflicts_hide_id).then_some(existing.id);
            return Err(PortError::Conflict { existing_id });
        }
        let created = Session {
            id: Uuid::new_v4(),
            key: session.key,
            counterpart_id: session.counterpart_id,
            state: session.state,
            report: None,
            report_feedback: None,
            created_at: Utc::now(),
        };
        tables.sessions.push(created.clone());
        Ok(created)
    }

    async fn update_session_state(
        &self,
        session_id: Uuid,
        state: &SessionState,
        report: Option<&str>,
        report_feedback: Option<&str>,
    ) -> PortResult<Session> {
        let mut tables = self.tables.lock().unwrap();
        let session = tables
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))?;
        session.state = state.clone();
        if let Some(report) = report {
            session.report = Some(report.to_string());
        }
        if let Some(feedback) = report_feedback {
            session.report_feedback = Some(feedback.to_string());
        }
        Ok(session.clone())
    }
}

//=========================================================================================
// Fixtures
//=========================================================================================

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn user(role: Role, chapter_id: Option<Uuid>, full_name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: format!("{}@example.org", full_name.to_lowercase().replace(' ', ".")),
        full_name: full_name.to_string(),
        role,
        chapter_id,
    }
}

pub fn context(user: &User) -> RequestContext {
    RequestContext::new(user.clone(), "test-token")
}

/// One chapter with Term 4 2024, a coordinator, a mentor (Jane Doe) assigned
/// weekly to one Year 5 student (S).
pub struct Fixture {
    pub db: InMemoryDb,
    pub state: Arc<AppState>,
    pub chapter: Chapter,
    pub term: SchoolTerm,
    pub coordinator: User,
    pub mentor: User,
    pub student: Student,
}

impl Fixture {
    pub fn new() -> Self {
        let db = InMemoryDb::default();
        let chapter = Chapter {
            id: Uuid::new_v4(),
            name: "Northside".to_string(),
        };
        let term = SchoolTerm {
            id: Uuid::new_v4(),
            year: 2024,
            name: "Term 4".to_string(),
            start_date: date(2024, 10, 7),
            end_date: date(2024, 12, 12),
        };
        let coordinator = user(Role::ChapterCoordinator, Some(chapter.id), "Casey Coordinator");
        let mentor = user(Role::Mentor, Some(chapter.id), "Jane Doe");
        let student = Student {
            id: Uuid::new_v4(),
            chapter_id: chapter.id,
            full_name: "S".to_string(),
            year_level: Some(5),
            archived_at: None,
        };

        db.add_chapter(chapter.clone());
        db.add_term(term.clone());
        db.add_user(coordinator.clone(), "unused");
        db.add_user(mentor.clone(), "unused");
        db.add_student(student.clone());
        db.add_assignment(MentorToStudentAssignment {
            mentor_id: mentor.id,
            student_id: student.id,
            frequency: Frequency::Weekly,
        });

        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://localhost/roster_test".to_string()),
            _ => None,
        })
        .unwrap();
        let state = Arc::new(AppState {
            db: Arc::new(db.clone()),
            config: Arc::new(config),
        });

        Self {
            db,
            state,
            chapter,
            term,
            coordinator,
            mentor,
            student,
        }
    }
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
