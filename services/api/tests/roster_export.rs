mod common;

use api_lib::web::roster::{
    expected_sessions_handler, roster_export_handler, roster_handler, ExpectedSessionsQuery,
    RosterQuery,
};
use api_lib::web::sessions::{create_session_handler, CreateSessionForm};
use api_lib::web::terms::{current_term_handler, list_chapters_handler, CurrentTermQuery};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Form};
use chrono::Utc;
use common::{body_string, context, date, user, Fixture};
use roster_core::domain::{
    Chapter, Frequency, MentorToStudentAssignment, Participant, Session, SessionKey, Student,
};
use roster_core::roles::Role;
use roster_core::session_state::SessionState;
use uuid::Uuid;

fn term_query(fx: &Fixture) -> RosterQuery {
    RosterQuery {
        term_id: Some(fx.term.id),
        date: None,
    }
}

fn add_student_session(fx: &Fixture, on: chrono::NaiveDate) {
    fx.db.add_session(Session {
        id: Uuid::new_v4(),
        key: SessionKey {
            chapter_id: fx.chapter.id,
            participant: Participant::Student(fx.student.id),
            attended_on: on,
        },
        counterpart_id: Some(fx.mentor.id),
        state: SessionState::Scheduled,
        report: None,
        report_feedback: None,
        created_at: Utc::now(),
    });
}

#[tokio::test]
async fn roster_grid_marks_the_assigned_mentor() {
    let fx = Fixture::new();
    add_student_session(&fx, date(2024, 10, 14));

    let roster = roster_handler(
        State(fx.state.clone()),
        Extension(context(&fx.mentor)),
        Path(fx.chapter.id),
        Query(term_query(&fx)),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(roster.term.label, "Term 4 2024");
    assert_eq!(roster.dates.len(), 10);
    assert_eq!(roster.rows.len(), 1);
    let row = &roster.rows[0];
    assert_eq!(row.label, "S (Year 5)");
    assert!(row.cells[0].is_none());
    assert_eq!(row.cells[1].as_ref().map(|m| m.full_name.as_str()), Some("Jane Doe"));
    assert!(row.cells[2..].iter().all(Option::is_none));
}

#[tokio::test]
async fn export_produces_one_row_per_student_and_column_per_date() {
    let fx = Fixture::new();
    add_student_session(&fx, date(2024, 10, 14));
    fx.db.add_student(Student {
        id: Uuid::new_v4(),
        chapter_id: fx.chapter.id,
        full_name: "Archie".to_string(),
        year_level: Some(6),
        archived_at: Some(Utc::now()),
    });

    let response = roster_export_handler(
        State(fx.state.clone()),
        Extension(context(&fx.coordinator)),
        Path(fx.chapter.id),
        Query(term_query(&fx)),
    )
    .await
    .unwrap()
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"roster-Term-4-2024.csv\""
    );
    let csv = body_string(response).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        "Students,2024-10-07,2024-10-14,2024-10-21,2024-10-28,2024-11-04,2024-11-11,\
         2024-11-18,2024-11-25,2024-12-02,2024-12-09"
    );
    assert_eq!(lines[1], "S (Year 5),,Jane Doe,,,,,,,,");
}

#[tokio::test]
async fn single_date_export_has_one_date_column() {
    let fx = Fixture::new();
    add_student_session(&fx, date(2024, 10, 14));

    let response = roster_export_handler(
        State(fx.state.clone()),
        Extension(context(&fx.coordinator)),
        Path(fx.chapter.id),
        Query(RosterQuery {
            term_id: None,
            date: Some(date(2024, 10, 14)),
        }),
    )
    .await
    .unwrap()
    .into_response();

    let csv = body_string(response).await;
    assert_eq!(csv, "Students,2024-10-14\nS (Year 5),Jane Doe\n");
}

#[tokio::test]
async fn unknown_term_is_not_silently_replaced() {
    let fx = Fixture::new();
    let err = roster_handler(
        State(fx.state.clone()),
        Extension(context(&fx.coordinator)),
        Path(fx.chapter.id),
        Query(RosterQuery {
            term_id: Some(Uuid::new_v4()),
            date: None,
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn roster_of_another_chapter_is_forbidden() {
    let fx = Fixture::new();
    let outsider = user(Role::Mentor, Some(Uuid::new_v4()), "Far Away");
    let err = roster_handler(
        State(fx.state.clone()),
        Extension(context(&outsider)),
        Path(fx.chapter.id),
        Query(term_query(&fx)),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn fortnightly_assignment_expects_every_other_week() {
    let fx = Fixture::new();
    let second_mentor = user(Role::Mentor, Some(fx.chapter.id), "Fran Fortnight");
    fx.db.add_user(second_mentor.clone(), "unused");
    fx.db.add_assignment(MentorToStudentAssignment {
        mentor_id: second_mentor.id,
        student_id: fx.student.id,
        frequency: Frequency::Fortnightly,
    });

    let expected = expected_sessions_handler(
        State(fx.state.clone()),
        Extension(context(&fx.coordinator)),
        Path((fx.chapter.id, fx.student.id)),
        Query(ExpectedSessionsQuery {
            term_id: Some(fx.term.id),
        }),
    )
    .await
    .unwrap()
    .0;

    assert_eq!(expected.len(), 2);
    let weekly = expected.iter().find(|e| e.mentor_id == fx.mentor.id).unwrap();
    assert_eq!(weekly.dates.len(), 10);
    let fortnightly = expected.iter().find(|e| e.mentor_id == second_mentor.id).unwrap();
    assert_eq!(fortnightly.frequency_in_days, 14);
    assert_eq!(fortnightly.dates.len(), 5);
}

#[tokio::test]
async fn current_term_is_null_during_holidays() {
    let fx = Fixture::new();

    let in_term = current_term_handler(
        State(fx.state.clone()),
        Query(CurrentTermQuery {
            date: Some(date(2024, 11, 1)),
        }),
    )
    .await
    .unwrap()
    .0;
    assert_eq!(in_term.term.map(|t| t.id), Some(fx.term.id));

    let holidays = current_term_handler(
        State(fx.state.clone()),
        Query(CurrentTermQuery {
            date: Some(date(2024, 12, 24)),
        }),
    )
    .await
    .unwrap()
    .0;
    assert!(holidays.term.is_none());
    assert_eq!(holidays.nearest.map(|t| t.id), Some(fx.term.id));
}

#[tokio::test]
async fn chapter_list_is_filtered_by_membership() {
    let fx = Fixture::new();
    fx.db.add_chapter(Chapter {
        id: Uuid::new_v4(),
        name: "Southside".to_string(),
    });

    let visible = list_chapters_handler(State(fx.state.clone()), Extension(context(&fx.mentor)))
        .await
        .unwrap()
        .0;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].name, "Northside");

    let admin = user(Role::Admin, None, "Ada Admin");
    let all = list_chapters_handler(State(fx.state.clone()), Extension(context(&admin)))
        .await
        .unwrap()
        .0;
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn coordinator_assigned_as_mentor_is_named_in_the_roster() {
    let fx = Fixture::new();
    fx.db.add_assignment(MentorToStudentAssignment {
        mentor_id: fx.coordinator.id,
        student_id: fx.student.id,
        frequency: Frequency::Weekly,
    });
    let created = create_session_handler(
        State(fx.state.clone()),
        Extension(context(&fx.coordinator)),
        Path((fx.chapter.id, fx.student.id)),
        Form(CreateSessionForm {
            attended_on: date(2024, 10, 14),
            mentor_id: fx.coordinator.id,
        }),
    )
    .await
    .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let roster = roster_handler(
        State(fx.state.clone()),
        Extension(context(&fx.coordinator)),
        Path(fx.chapter.id),
        Query(term_query(&fx)),
    )
    .await
    .unwrap()
    .0;

    let cell = roster.rows[0].cells[1].as_ref().unwrap();
    assert_eq!(cell.mentor_id, fx.coordinator.id);
    assert_eq!(cell.full_name, "Casey Coordinator");
}

#[tokio::test]
async fn mentor_from_another_chapter_is_still_named() {
    let fx = Fixture::new();
    let moved = user(Role::Mentor, Some(Uuid::new_v4()), "Morgan Moved");
    fx.db.add_user(moved.clone(), "unused");
    fx.db.add_session(Session {
        id: Uuid::new_v4(),
        key: SessionKey {
            chapter_id: fx.chapter.id,
            participant: Participant::Student(fx.student.id),
            attended_on: date(2024, 10, 7),
        },
        counterpart_id: Some(moved.id),
        state: SessionState::Scheduled,
        report: None,
        report_feedback: None,
        created_at: Utc::now(),
    });

    let response = roster_export_handler(
        State(fx.state.clone()),
        Extension(context(&fx.coordinator)),
        Path(fx.chapter.id),
        Query(RosterQuery {
            term_id: None,
            date: Some(date(2024, 10, 7)),
        }),
    )
    .await
    .unwrap()
    .into_response();

    assert_eq!(body_string(response).await, "Students,2024-10-07\nS (Year 5),Morgan Moved\n");
}

#[tokio::test]
async fn date_outside_the_requested_term_is_rejected() {
    let fx = Fixture::new();
    let err = roster_handler(
        State(fx.state.clone()),
        Extension(context(&fx.coordinator)),
        Path(fx.chapter.id),
        Query(RosterQuery {
            term_id: Some(fx.term.id),
            date: Some(date(2025, 2, 3)),
        }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.0, StatusCode::UNPROCESSABLE_ENTITY);
}
