//! Integration tests for the tutorhub REST API
//!
//! Every test drives the full router in-process against a private in-memory
//! database. Accounts are inserted directly and tokens issued with the same
//! `TokenService` the router verifies with.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;
use tutorhub_api::db::tutors::{self, TutorProfile};
use tutorhub_api::db::users::{self, NewUser};
use tutorhub_api::db::exercise_types;
use tutorhub_api::mail::{MailQueue, MailReceiver};
use tutorhub_api::{build_router, scheduling, AppState};
use tutorhub_common::api::TokenService;
use tutorhub_common::config::TomlConfig;
use tutorhub_common::db::{init_memory_database, Role};
use tutorhub_common::events::EventBus;
use tutorhub_common::time;

struct TestApp {
    router: Router,
    pool: SqlitePool,
    tokens: TokenService,
    _mail: MailReceiver,
    _media: tempfile::TempDir,
}

struct Account {
    id: i64,
    token: String,
}

impl TestApp {
    async fn new() -> Self {
        let pool = init_memory_database().await.unwrap();
        let tokens = TokenService::new("tutorhub-integration-test-signing-secret".to_string(), 60).unwrap();
        let (mail, mail_rx) = MailQueue::new("test-mail", 16);
        let media = tempfile::tempdir().unwrap();

        let state = AppState::new(
            pool.clone(),
            TomlConfig::default(),
            tokens.clone(),
            EventBus::new(64),
            mail,
            media.path().to_path_buf(),
        );

        Self {
            router: build_router(state),
            pool,
            tokens,
            _mail: mail_rx,
            _media: media,
        }
    }

    async fn account(&self, email: &str, role: Role) -> Account {
        let id = users::insert(
            &self.pool,
            &NewUser {
                email,
                full_name: email.split('@').next().unwrap_or(email),
                phone_number: Some("0900000000"),
                address: None,
                image_url: None,
                password_hash: "not-a-real-hash",
                role,
            },
        )
        .await
        .unwrap();

        if role == Role::Tutor {
            tutors::insert(
                &self.pool,
                id,
                &TutorProfile {
                    date_of_birth: None,
                    start_age: 3,
                    end_age: 10,
                    about_me: "",
                    price_per_hour: 20.0,
                },
            )
            .await
            .unwrap();
        }

        let token = self.tokens.issue(id, email, role).unwrap();
        Account { id, token }
    }

    async fn request(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, path, Some(token), None).await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, path, Some(token), Some(body)).await
    }

    async fn put(&self, path: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, path, Some(token), Some(body)).await
    }

    async fn delete(&self, path: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, Some(token), None).await
    }
}

/// Parent, tutor and an approved tutor request for the parent's child
async fn approved_request(app: &TestApp) -> (Account, Account, i64) {
    let parent = app.account("parent@example.com", Role::Parent).await;
    let tutor = app.account("tutor@example.com", Role::Tutor).await;

    let (status, body) = app
        .post(
            "/api/v1/children",
            &parent.token,
            json!({ "name": "Minh", "isMale": true, "birthDate": "2018-03-01" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let child_id = body["result"]["id"].as_i64().unwrap();

    let (status, body) = app
        .post(
            "/api/v1/tutor-requests",
            &parent.token,
            json!({ "tutorId": tutor.id, "childId": child_id, "description": "Speech practice" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = body["result"]["id"].as_i64().unwrap();

    let (status, _) = app
        .put(
            &format!("/api/v1/tutor-requests/{}/status", request_id),
            &tutor.token,
            json!({ "status": "APPROVE" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    (parent, tutor, request_id)
}

#[tokio::test]
async fn test_health_has_no_envelope() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("isSuccess").is_none());
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/api/v1/children", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["statusCode"], 401);
    assert!(!body["errorMessages"][0].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_role_is_forbidden() {
    let app = TestApp::new().await;
    let parent = app.account("parent@example.com", Role::Parent).await;

    let (status, body) = app
        .post(
            "/api/v1/exercise-types",
            &parent.token,
            json!({ "exerciseTypeName": "Matching" }),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["statusCode"], 403);
}

#[tokio::test]
async fn test_duplicate_exercise_name_rejected() {
    let app = TestApp::new().await;
    let staff = app.account("staff@example.com", Role::Staff).await;
    let tutor = app.account("tutor@example.com", Role::Tutor).await;
    let type_id = exercise_types::insert(&app.pool, "Matching", staff.id).await.unwrap();

    let exercise = json!({
        "exerciseTypeId": type_id,
        "exerciseName": "Colour cards",
        "description": "Match cards by colour"
    });
    let (status, body) = app.post("/api/v1/exercises", &tutor.token, exercise.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["isSuccess"], true);
    assert_eq!(body["result"]["requestStatus"], "PENDING");

    let (status, body) = app.post("/api/v1/exercises", &tutor.token, exercise).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorMessages"][0], "Exercise already exists.");
}

#[tokio::test]
async fn test_delete_missing_resource_is_not_found() {
    let app = TestApp::new().await;
    let tutor = app.account("tutor@example.com", Role::Tutor).await;
    let manager = app.account("manager@example.com", Role::Manager).await;

    let (status, body) = app.delete("/api/v1/curriculums/999", &tutor.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorMessages"][0], "Curriculum was not found.");

    let (status, _) = app.delete("/api/v1/score-ranges/999", &manager.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approving_new_curriculum_version_deactivates_previous() {
    let app = TestApp::new().await;
    let tutor = app.account("tutor@example.com", Role::Tutor).await;
    let staff = app.account("staff@example.com", Role::Staff).await;

    let (status, body) = app
        .post(
            "/api/v1/curriculums",
            &tutor.token,
            json!({ "ageFrom": 3, "ageEnd": 5, "description": "Early communication" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let first = body["result"]["id"].as_i64().unwrap();

    let approve = json!({ "status": "APPROVE" });
    let (status, body) = app
        .put(&format!("/api/v1/curriculums/{}/status", first), &staff.token, approve.clone())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["isActive"], true);

    let (status, body) = app
        .post(
            "/api/v1/curriculums",
            &tutor.token,
            json!({
                "ageFrom": 3,
                "ageEnd": 5,
                "description": "Early communication, revised",
                "originalCurriculumId": first
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["versionNumber"], 2);
    let second = body["result"]["id"].as_i64().unwrap();

    let (status, _) = app
        .put(&format!("/api/v1/curriculums/{}/status", second), &staff.token, approve.clone())
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get(&format!("/api/v1/curriculums/{}", first), &tutor.token).await;
    assert_eq!(body["result"]["isActive"], false);
    let (_, body) = app.get(&format!("/api/v1/curriculums/{}", second), &tutor.token).await;
    assert_eq!(body["result"]["isActive"], true);

    // A processed version cannot be reviewed again
    let (status, _) = app
        .put(&format!("/api/v1/curriculums/{}/status", second), &staff.token, approve)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_overlapping_time_slots_rejected() {
    let app = TestApp::new().await;
    let (_parent, tutor, request_id) = approved_request(&app).await;

    let (status, body) = app
        .post(
            "/api/v1/student-profiles",
            &tutor.token,
            json!({
                "tutorRequestId": request_id,
                "initialCondition": "Non-verbal",
                "scheduleTimeSlots": [
                    { "weekday": 1, "fromTime": "09:00:00", "toTime": "10:00:00" },
                    { "weekday": 1, "fromTime": "09:30:00", "toTime": "10:30:00" }
                ]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["errorMessages"][0].as_str().unwrap();
    assert!(message.contains("overlaps"), "unexpected message: {}", message);

    // Touching intervals are fine
    let (status, _) = app
        .post(
            "/api/v1/student-profiles",
            &tutor.token,
            json!({
                "tutorRequestId": request_id,
                "scheduleTimeSlots": [
                    { "weekday": 1, "fromTime": "09:00:00", "toTime": "10:00:00" },
                    { "weekday": 1, "fromTime": "10:00:00", "toTime": "11:00:00" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_accepted_profile_materializes_sessions_once() {
    let app = TestApp::new().await;
    let (parent, tutor, request_id) = approved_request(&app).await;
    let today = time::today();
    let weekday = time::weekday_index(today);

    let (status, body) = app
        .post(
            "/api/v1/student-profiles",
            &tutor.token,
            json!({
                "tutorRequestId": request_id,
                "scheduleTimeSlots": [
                    { "weekday": weekday, "fromTime": "14:00:00", "toTime": "15:00:00" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let profile_id = body["result"]["id"].as_i64().unwrap();

    let (status, body) = app
        .put(
            &format!("/api/v1/student-profiles/{}/approval", profile_id),
            &parent.token,
            json!({ "status": "TEACHING" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["status"], "TEACHING");

    // Today, next week's same weekday, and the one after when the window
    // reaches it: at least two sessions, all on the slot's weekday
    let dates: Vec<NaiveDate> =
        sqlx::query_scalar("SELECT schedule_date FROM schedules WHERE student_profile_id = ?")
            .bind(profile_id)
            .fetch_all(&app.pool)
            .await
            .unwrap();
    assert!(dates.len() >= 2);
    assert!(dates.iter().all(|d| time::weekday_index(*d) == weekday));

    let inserted = scheduling::generate_for_profile(&app.pool, profile_id, today).await.unwrap();
    assert_eq!(inserted, 0);

    let (status, body) = app.get("/api/v1/schedules", &parent.token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["result"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_score_range_bounds_and_overlap() {
    let app = TestApp::new().await;
    let manager = app.account("manager@example.com", Role::Manager).await;

    let (status, body) = app
        .post(
            "/api/v1/score-ranges",
            &manager.token,
            json!({ "description": "Mild", "minScore": 20, "maxScore": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], false);

    let (status, _) = app
        .post(
            "/api/v1/score-ranges",
            &manager.token,
            json!({ "description": "Mild", "minScore": 0, "maxScore": 10 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post(
            "/api/v1/score-ranges",
            &manager.token,
            json!({ "description": "Moderate", "minScore": 10, "maxScore": 20 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_listing_is_paginated_envelope() {
    let app = TestApp::new().await;
    let staff = app.account("staff@example.com", Role::Staff).await;
    for name in ["Matching", "Sorting", "Naming"] {
        exercise_types::insert(&app.pool, name, staff.id).await.unwrap();
    }

    let (status, body) = app.get("/api/v1/exercise-types?orderBy=exerciseTypeName&sort=asc", &staff.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["result"][0]["exerciseTypeName"], "Matching");
}

/// Parent, tutor and an accepted student profile with one weekly slot on
/// today's weekday
async fn teaching_profile(app: &TestApp) -> (Account, Account, i64) {
    let (parent, tutor, request_id) = approved_request(app).await;
    let weekday = time::weekday_index(time::today());

    let (status, body) = app
        .post(
            "/api/v1/student-profiles",
            &tutor.token,
            json!({
                "tutorRequestId": request_id,
                "scheduleTimeSlots": [
                    { "weekday": weekday, "fromTime": "14:00:00", "toTime": "15:00:00" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let profile_id = body["result"]["id"].as_i64().unwrap();

    let (status, _) = app
        .put(
            &format!("/api/v1/student-profiles/{}/approval", profile_id),
            &parent.token,
            json!({ "status": "TEACHING" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    (parent, tutor, profile_id)
}

async fn session_count(app: &TestApp, profile_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM schedules WHERE student_profile_id = ?")
        .bind(profile_id)
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_approved_registration_creates_tutor_with_qualifications() {
    let app = TestApp::new().await;
    let staff = app.account("staff@example.com", Role::Staff).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/tutor-registration-requests",
            None,
            Some(json!({
                "email": "lan@example.com",
                "fullName": "Lan Nguyen",
                "phoneNumber": "0912345678",
                "dateOfBirth": "1990-05-04",
                "startAge": 2,
                "endAge": 8,
                "aboutMe": "Speech therapist",
                "pricePerHour": 25.0,
                "certificates": [{
                    "certificateName": "Speech Therapy Diploma",
                    "issuingInstitution": "Hanoi Medical University",
                    "issuingDate": "2015-06-01"
                }],
                "workExperiences": [{
                    "companyName": "Sunrise Clinic",
                    "position": "Therapist",
                    "startDate": "2016-01-01",
                    "endDate": "2020-12-31"
                }],
                "curriculums": [{ "ageFrom": 2, "ageEnd": 5, "description": "Early language" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["requestStatus"], "PENDING");
    let request_id = body["result"]["id"].as_i64().unwrap();

    let (status, body) = app
        .put(
            &format!("/api/v1/tutor-registration-requests/{}/status", request_id),
            &staff.token,
            json!({ "status": "APPROVE" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["requestStatus"], "APPROVE");

    let (tutor_id, role): (i64, String) = sqlx::query_as("SELECT id, role FROM users WHERE email = ?")
        .bind("lan@example.com")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(role, "TUTOR");

    let (status, body) = app.get(&format!("/api/v1/tutors/{}", tutor_id), &staff.token).await;
    assert_eq!(status, StatusCode::OK);
    let tutor = &body["result"];
    assert_eq!(tutor["certificates"].as_array().unwrap().len(), 1);
    assert_eq!(tutor["certificates"][0]["requestStatus"], "APPROVE");
    assert_eq!(tutor["workExperiences"].as_array().unwrap().len(), 1);
    assert_eq!(tutor["workExperiences"][0]["requestStatus"], "APPROVE");
    assert_eq!(tutor["curriculums"].as_array().unwrap().len(), 1);
    assert_eq!(tutor["curriculums"][0]["isActive"], true);
    assert_eq!(tutor["curriculums"][0]["versionNumber"], 1);

    // A decided request cannot be decided again
    let (status, _) = app
        .put(
            &format!("/api/v1/tutor-registration-requests/{}/status", request_id),
            &staff.token,
            json!({ "status": "APPROVE" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_second_pending_tutor_request_rejected() {
    let app = TestApp::new().await;
    let parent = app.account("parent@example.com", Role::Parent).await;
    let tutor = app.account("tutor@example.com", Role::Tutor).await;

    let (_, body) = app
        .post(
            "/api/v1/children",
            &parent.token,
            json!({ "name": "An", "isMale": false, "birthDate": "2019-09-12" }),
        )
        .await;
    let child_id = body["result"]["id"].as_i64().unwrap();

    let request = json!({ "tutorId": tutor.id, "childId": child_id, "description": "Reading" });
    let (status, _) = app.post("/api/v1/tutor-requests", &parent.token, request.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.post("/api/v1/tutor-requests", &parent.token, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorMessages"][0], "Tutor request already exists.");
}

#[tokio::test]
async fn test_test_result_scored_from_chosen_options() {
    let app = TestApp::new().await;
    let staff = app.account("staff@example.com", Role::Staff).await;
    let parent = app.account("parent@example.com", Role::Parent).await;

    let (status, body) = app
        .post(
            "/api/v1/tests",
            &staff.token,
            json!({ "testName": "Communication screening", "testDescription": "Short screening" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let test_id = body["result"]["id"].as_i64().unwrap();

    let mut questions = Vec::new();
    for question in ["Responds to name?", "Points to objects?"] {
        let (status, body) = app
            .post(
                &format!("/api/v1/tests/{}/questions", test_id),
                &staff.token,
                json!({
                    "question": question,
                    "options": [
                        { "optionAnswer": "Often", "point": 0 },
                        { "optionAnswer": "Rarely", "point": 3 }
                    ]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["result"]["id"].as_i64().unwrap();
        let options: Vec<i64> = body["result"]["options"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["id"].as_i64().unwrap())
            .collect();
        questions.push((id, options));
    }
    let (first, first_options) = &questions[0];
    let (second, second_options) = &questions[1];

    let (status, body) = app
        .post(
            "/api/v1/test-results",
            &parent.token,
            json!({
                "testId": test_id,
                "answers": [
                    { "questionId": first, "optionId": first_options[0] },
                    { "questionId": first, "optionId": first_options[1] }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errorMessages"][0],
        format!("Question {} was answered more than once.", first)
    );

    let (status, body) = app
        .post(
            "/api/v1/test-results",
            &parent.token,
            json!({
                "testId": test_id,
                "answers": [{ "questionId": first, "optionId": second_options[1] }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errorMessages"][0],
        format!("The selected option does not belong to question {}.", first)
    );

    let (status, body) = app
        .post(
            "/api/v1/test-results",
            &parent.token,
            json!({
                "testId": test_id,
                "answers": [
                    { "questionId": first, "optionId": first_options[1] },
                    { "questionId": second, "optionId": second_options[1] }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["result"]["totalPoint"].as_f64(), Some(6.0));
}

#[tokio::test]
async fn test_progress_report_periods_cannot_overlap() {
    let app = TestApp::new().await;
    let (_parent, tutor, profile_id) = teaching_profile(&app).await;
    let today = time::today();
    let days_ago = |n: i64| (today - chrono::Duration::days(n)).to_string();

    let (status, body) = app
        .post(
            "/api/v1/progress-reports",
            &tutor.token,
            json!({
                "studentProfileId": profile_id,
                "from": days_ago(14),
                "to": days_ago(7),
                "achieved": "Names colours"
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let report_id = body["result"]["id"].as_i64().unwrap();

    let (status, _) = app
        .post(
            "/api/v1/progress-reports",
            &tutor.token,
            json!({ "studentProfileId": profile_id, "from": days_ago(10), "to": days_ago(3) }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The report's own period does not count against itself
    let (status, body) = app
        .put(
            &format!("/api/v1/progress-reports/{}", report_id),
            &tutor.token,
            json!({ "from": days_ago(14), "to": days_ago(7), "achieved": "Names colours and shapes" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["achieved"], "Names colours and shapes");

    let (status, _) = app
        .post(
            "/api/v1/progress-reports",
            &tutor.token,
            json!({ "studentProfileId": profile_id, "from": days_ago(6), "to": days_ago(0) }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_closing_profile_removes_upcoming_sessions() {
    let app = TestApp::new().await;
    let (parent, _tutor, profile_id) = teaching_profile(&app).await;
    assert!(session_count(&app, profile_id).await > 0);

    let (status, body) = app
        .put(
            &format!("/api/v1/student-profiles/{}/close", profile_id),
            &parent.token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["status"], "STOP");
    assert_eq!(session_count(&app, profile_id).await, 0);

    let (status, _) = app
        .put(
            &format!("/api/v1/student-profiles/{}/close", profile_id),
            &parent.token,
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleting_slot_of_taught_profile_removes_its_sessions() {
    let app = TestApp::new().await;
    let (_parent, tutor, profile_id) = teaching_profile(&app).await;
    assert!(session_count(&app, profile_id).await > 0);

    let slot_id: i64 = sqlx::query_scalar("SELECT id FROM schedule_time_slots WHERE student_profile_id = ?")
        .bind(profile_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let (status, body) = app.delete(&format!("/api/v1/time-slots/{}", slot_id), &tutor.token).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    assert_eq!(session_count(&app, profile_id).await, 0);
}

#[tokio::test]
async fn test_moving_slot_of_taught_profile_moves_its_sessions() {
    let app = TestApp::new().await;
    let (_parent, tutor, profile_id) = teaching_profile(&app).await;
    let weekday = time::weekday_index(time::today());

    let slot_id: i64 = sqlx::query_scalar("SELECT id FROM schedule_time_slots WHERE student_profile_id = ?")
        .bind(profile_id)
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let (status, _) = app
        .put(
            &format!("/api/v1/time-slots/{}", slot_id),
            &tutor.token,
            json!({ "weekday": weekday, "fromTime": "16:00:00", "toTime": "17:00:00" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let starts: Vec<String> = sqlx::query_scalar(
        "SELECT start_time FROM schedules WHERE student_profile_id = ? AND attendance_status = 'NOT_YET'",
    )
    .bind(profile_id)
    .fetch_all(&app.pool)
    .await
    .unwrap();
    assert!(!starts.is_empty());
    assert!(starts.iter().all(|s| s.starts_with("16:00")), "unexpected starts: {:?}", starts);
}

#[tokio::test]
async fn test_media_upload_requires_multipart_body() {
    let app = TestApp::new().await;
    let parent = app.account("parent@example.com", Role::Parent).await;

    let (status, body) = app.post("/api/v1/media", &parent.token, json!({ "file": "avatar.png" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["isSuccess"], false);
    assert_eq!(body["statusCode"], 400);
}
