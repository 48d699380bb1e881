//! Database initialization
//!
//! Opens (creating if needed) the SQLite database and brings the schema up to
//! date. Every statement is `CREATE ... IF NOT EXISTS`, so initialization is
//! idempotent and safe on every start.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Open a private in-memory database with the full schema
///
/// Limited to one connection: every pooled connection to `sqlite::memory:`
/// would otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create every table and index used by the service
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_users_tables(pool).await?;
    create_registration_tables(pool).await?;
    create_qualification_tables(pool).await?;
    create_content_tables(pool).await?;
    create_family_tables(pool).await?;
    create_scheduling_tables(pool).await?;
    create_assessment_tables(pool).await?;
    create_test_tables(pool).await?;
    create_notifications_table(pool).await?;
    Ok(())
}

async fn execute_all(pool: &SqlitePool, statements: &[&str]) -> Result<()> {
    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// Stores runtime key-value settings such as the token signing secret
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#],
    )
    .await
}

async fn create_users_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                full_name TEXT NOT NULL,
                phone_number TEXT,
                address TEXT,
                image_url TEXT,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                is_locked_out INTEGER NOT NULL DEFAULT 0,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS tutors (
                user_id INTEGER PRIMARY KEY REFERENCES users(id),
                date_of_birth TEXT,
                start_age INTEGER NOT NULL,
                end_age INTEGER NOT NULL,
                about_me TEXT NOT NULL DEFAULT '',
                price_per_hour REAL NOT NULL DEFAULT 0,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
        ],
    )
    .await
}

async fn create_registration_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[r#"
        CREATE TABLE IF NOT EXISTS tutor_registration_requests (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL COLLATE NOCASE,
            full_name TEXT NOT NULL,
            phone_number TEXT NOT NULL,
            image_url TEXT,
            address TEXT,
            date_of_birth TEXT NOT NULL,
            start_age INTEGER NOT NULL,
            end_age INTEGER NOT NULL,
            about_me TEXT NOT NULL DEFAULT '',
            price_per_hour REAL NOT NULL DEFAULT 0,
            request_status TEXT NOT NULL,
            rejection_reason TEXT,
            approved_by_id INTEGER REFERENCES users(id),
            created_date TEXT NOT NULL,
            updated_date TEXT
        )
        "#],
    )
    .await
}

/// Certificates and work experiences belong to a registration request until
/// it is approved, then to the tutor
async fn create_qualification_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS certificates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tutor_id INTEGER REFERENCES users(id),
                tutor_registration_request_id INTEGER REFERENCES tutor_registration_requests(id),
                certificate_name TEXT NOT NULL,
                issuing_institution TEXT NOT NULL,
                identity_card_number TEXT,
                issuing_date TEXT NOT NULL,
                expiration_date TEXT,
                request_status TEXT NOT NULL,
                rejection_reason TEXT,
                approved_by_id INTEGER REFERENCES users(id),
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS certificate_medias (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                certificate_id INTEGER NOT NULL REFERENCES certificates(id),
                url_path TEXT NOT NULL,
                created_date TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS work_experiences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tutor_id INTEGER REFERENCES users(id),
                tutor_registration_request_id INTEGER REFERENCES tutor_registration_requests(id),
                company_name TEXT NOT NULL,
                position TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT,
                request_status TEXT NOT NULL,
                rejection_reason TEXT,
                approved_by_id INTEGER REFERENCES users(id),
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
        ],
    )
    .await
}

/// Versioned pedagogical content: curriculums, exercises, syllabuses
async fn create_content_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS curriculums (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tutor_id INTEGER REFERENCES users(id),
                tutor_registration_request_id INTEGER REFERENCES tutor_registration_requests(id),
                age_from INTEGER NOT NULL,
                age_end INTEGER NOT NULL,
                description TEXT NOT NULL,
                original_curriculum_id INTEGER REFERENCES curriculums(id),
                version_number INTEGER NOT NULL DEFAULT 1,
                is_active INTEGER NOT NULL DEFAULT 0,
                request_status TEXT NOT NULL,
                rejection_reason TEXT,
                approved_by_id INTEGER REFERENCES users(id),
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS exercise_types (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                exercise_type_name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                is_hide INTEGER NOT NULL DEFAULT 0,
                submitter_id INTEGER REFERENCES users(id),
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS exercises (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tutor_id INTEGER NOT NULL REFERENCES users(id),
                exercise_type_id INTEGER NOT NULL REFERENCES exercise_types(id),
                exercise_name TEXT NOT NULL,
                description TEXT NOT NULL,
                original_exercise_id INTEGER REFERENCES exercises(id),
                version_number INTEGER NOT NULL DEFAULT 1,
                is_active INTEGER NOT NULL DEFAULT 0,
                request_status TEXT NOT NULL,
                rejection_reason TEXT,
                approved_by_id INTEGER REFERENCES users(id),
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS syllabuses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tutor_id INTEGER NOT NULL REFERENCES users(id),
                age_from INTEGER NOT NULL,
                age_end INTEGER NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                original_syllabus_id INTEGER REFERENCES syllabuses(id),
                version_number INTEGER NOT NULL DEFAULT 1,
                is_active INTEGER NOT NULL DEFAULT 0,
                request_status TEXT NOT NULL,
                rejection_reason TEXT,
                approved_by_id INTEGER REFERENCES users(id),
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS syllabus_exercises (
                syllabus_id INTEGER NOT NULL REFERENCES syllabuses(id),
                exercise_type_id INTEGER NOT NULL REFERENCES exercise_types(id),
                exercise_id INTEGER NOT NULL REFERENCES exercises(id),
                PRIMARY KEY (syllabus_id, exercise_id)
            )
            "#,
        ],
    )
    .await
}

async fn create_family_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS child_informations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER NOT NULL REFERENCES users(id),
                name TEXT NOT NULL,
                is_male INTEGER NOT NULL,
                birth_date TEXT NOT NULL,
                image_url TEXT,
                medical_history TEXT,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS tutor_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER NOT NULL REFERENCES users(id),
                tutor_id INTEGER NOT NULL REFERENCES users(id),
                child_id INTEGER NOT NULL REFERENCES child_informations(id),
                description TEXT NOT NULL DEFAULT '',
                request_status TEXT NOT NULL,
                rejection_reason TEXT,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS student_profiles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tutor_id INTEGER NOT NULL REFERENCES users(id),
                child_id INTEGER NOT NULL REFERENCES child_informations(id),
                tutor_request_id INTEGER NOT NULL UNIQUE REFERENCES tutor_requests(id),
                initial_condition TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
        ],
    )
    .await
}

async fn create_scheduling_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS schedule_time_slots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_profile_id INTEGER NOT NULL REFERENCES student_profiles(id),
                weekday INTEGER NOT NULL CHECK (weekday BETWEEN 0 AND 6),
                from_time TEXT NOT NULL,
                to_time TEXT NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS schedules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tutor_id INTEGER NOT NULL REFERENCES users(id),
                student_profile_id INTEGER NOT NULL REFERENCES student_profiles(id),
                schedule_time_slot_id INTEGER REFERENCES schedule_time_slots(id),
                slot_date TEXT,
                schedule_date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                attendance_status TEXT NOT NULL DEFAULT 'NOT_YET',
                passing_status TEXT NOT NULL DEFAULT 'NOT_YET',
                note TEXT,
                syllabus_id INTEGER REFERENCES syllabuses(id),
                exercise_type_id INTEGER REFERENCES exercise_types(id),
                exercise_id INTEGER REFERENCES exercises(id),
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_schedules_slot_date
            ON schedules (schedule_time_slot_id, slot_date)
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_schedules_tutor_date
            ON schedules (tutor_id, schedule_date)
            "#,
        ],
    )
    .await
}

async fn create_assessment_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS assessment_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                is_hidden INTEGER NOT NULL DEFAULT 0,
                submitter_id INTEGER REFERENCES users(id),
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS assessment_options (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL REFERENCES assessment_questions(id),
                option_text TEXT NOT NULL,
                point REAL NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS progress_reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_profile_id INTEGER NOT NULL REFERENCES student_profiles(id),
                tutor_id INTEGER NOT NULL REFERENCES users(id),
                from_date TEXT NOT NULL,
                to_date TEXT NOT NULL,
                achieved TEXT NOT NULL DEFAULT '',
                failed TEXT NOT NULL DEFAULT '',
                note_from_tutor TEXT NOT NULL DEFAULT '',
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS assessment_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                student_profile_id INTEGER REFERENCES student_profiles(id),
                progress_report_id INTEGER REFERENCES progress_reports(id),
                question_id INTEGER NOT NULL REFERENCES assessment_questions(id),
                option_id INTEGER NOT NULL REFERENCES assessment_options(id),
                created_date TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS assessment_score_ranges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                min_score REAL NOT NULL,
                max_score REAL NOT NULL,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
        ],
    )
    .await
}

async fn create_test_tables(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS tests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_name TEXT NOT NULL,
                test_description TEXT NOT NULL DEFAULT '',
                submitter_id INTEGER REFERENCES users(id),
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_date TEXT NOT NULL,
                updated_date TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS test_questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_id INTEGER NOT NULL REFERENCES tests(id),
                question TEXT NOT NULL,
                created_date TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS test_question_options (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL REFERENCES test_questions(id),
                option_answer TEXT NOT NULL,
                point REAL NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS test_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_id INTEGER NOT NULL REFERENCES tests(id),
                parent_id INTEGER NOT NULL REFERENCES users(id),
                child_id INTEGER REFERENCES child_informations(id),
                total_point REAL NOT NULL,
                created_date TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS test_result_details (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                test_result_id INTEGER NOT NULL REFERENCES test_results(id),
                question_id INTEGER NOT NULL REFERENCES test_questions(id),
                option_id INTEGER NOT NULL REFERENCES test_question_options(id)
            )
            "#,
        ],
    )
    .await
}

async fn create_notifications_table(pool: &SqlitePool) -> Result<()> {
    execute_all(
        pool,
        &[
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                receiver_id INTEGER NOT NULL REFERENCES users(id),
                message TEXT NOT NULL,
                url_link TEXT,
                is_read INTEGER NOT NULL DEFAULT 0,
                created_date TEXT NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_notifications_receiver
            ON notifications (receiver_id, is_read)
            "#,
        ],
    )
    .await
}
