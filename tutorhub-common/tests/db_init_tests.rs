//! Tests for database creation and schema initialization

use tutorhub_common::db::init::{create_schema, init_database};
use tutorhub_common::db::settings::{get_setting, set_setting};

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("tutorhub.db");

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_reopen_keeps_data() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tutorhub.db");

    let pool = init_database(&db_path).await.unwrap();
    set_setting(&pool, "jwt_secret", "persisted").await.unwrap();
    pool.close().await;

    let pool = init_database(&db_path).await.unwrap();
    assert_eq!(
        get_setting(&pool, "jwt_secret").await.unwrap().as_deref(),
        Some("persisted")
    );
}

#[tokio::test]
async fn test_schema_creation_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("tutorhub.db")).await.unwrap();

    create_schema(&pool).await.unwrap();
    create_schema(&pool).await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in [
        "users",
        "tutors",
        "tutor_registration_requests",
        "certificates",
        "curriculums",
        "exercises",
        "syllabuses",
        "student_profiles",
        "schedule_time_slots",
        "schedules",
        "assessment_score_ranges",
        "test_results",
        "notifications",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
    }
}

#[tokio::test]
async fn test_duplicate_email_rejected_case_insensitively() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("tutorhub.db")).await.unwrap();

    let insert = "INSERT INTO users (email, full_name, password_hash, role, created_date) \
                  VALUES (?, 'Name', 'hash', 'PARENT', '2026-01-01T00:00:00Z')";
    sqlx::query(insert).bind("Parent@Example.com").execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).bind("parent@example.com").execute(&pool).await;
    assert!(duplicate.is_err());
}
