//! Assessment questions, recorded results and score ranges

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqliteExecutor, SqlitePool};
use std::collections::HashMap;
use tutorhub_common::time;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentQuestion {
    pub id: i64,
    pub question: String,
    pub is_hidden: bool,
    pub submitter_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub options: Vec<AssessmentOption>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentOption {
    pub id: i64,
    #[serde(skip)]
    pub question_id: i64,
    pub option_text: String,
    pub point: f64,
}

/// A chosen option, with the question and option text resolved
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub id: i64,
    #[serde(skip)]
    pub progress_report_id: Option<i64>,
    pub question_id: i64,
    pub question: String,
    pub option_id: i64,
    pub option_text: String,
    pub point: f64,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRange {
    pub id: i64,
    pub description: String,
    pub min_score: f64,
    pub max_score: f64,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

/// What an assessment result is attached to
#[derive(Debug, Clone, Copy)]
pub enum ResultOwner {
    /// Initial assessment taken when the profile was created
    StudentProfile(i64),
    ProgressReport(i64),
}

const QUESTION_COLUMNS: &str = "id, question, is_hidden, submitter_id, created_date, updated_date";

const RESULT_SELECT: &str = r#"
    SELECT r.id, r.progress_report_id, r.question_id, q.question, r.option_id,
           o.option_text, o.point
    FROM assessment_results r
    JOIN assessment_questions q ON q.id = r.question_id
    JOIN assessment_options o ON o.id = r.option_id
"#;

pub async fn insert_question(
    conn: &mut SqliteConnection,
    question: &str,
    options: &[(&str, f64)],
    submitter_id: i64,
) -> sqlx::Result<i64> {
    let id = sqlx::query(
        "INSERT INTO assessment_questions (question, is_hidden, submitter_id, created_date) VALUES (?, 0, ?, ?)",
    )
    .bind(question.trim())
    .bind(submitter_id)
    .bind(time::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    for (text, point) in options {
        sqlx::query("INSERT INTO assessment_options (question_id, option_text, point) VALUES (?, ?, ?)")
            .bind(id)
            .bind(text.trim())
            .bind(point)
            .execute(&mut *conn)
            .await?;
    }
    Ok(id)
}

pub async fn question_exists(pool: &SqlitePool, question: &str) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM assessment_questions WHERE question = ? COLLATE NOCASE",
    )
    .bind(question.trim())
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn find_question(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<AssessmentQuestion>> {
    let question = sqlx::query_as::<_, AssessmentQuestion>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM assessment_questions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match question {
        Some(mut q) => {
            q.options = load_options(pool, &[q.id]).await?.remove(&q.id).unwrap_or_default();
            Ok(Some(q))
        }
        None => Ok(None),
    }
}

pub async fn list_questions(pool: &SqlitePool, include_hidden: bool) -> sqlx::Result<Vec<AssessmentQuestion>> {
    let mut rows = sqlx::query_as::<_, AssessmentQuestion>(&format!(
        "SELECT {QUESTION_COLUMNS} FROM assessment_questions \
         WHERE (?1 = 1 OR is_hidden = 0) ORDER BY id"
    ))
    .bind(include_hidden)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = rows.iter().map(|q| q.id).collect();
    let mut options = load_options(pool, &ids).await?;
    for row in rows.iter_mut() {
        row.options = options.remove(&row.id).unwrap_or_default();
    }
    Ok(rows)
}

pub async fn set_question_hidden(pool: &SqlitePool, id: i64, hidden: bool) -> sqlx::Result<()> {
    sqlx::query("UPDATE assessment_questions SET is_hidden = ?, updated_date = ? WHERE id = ?")
        .bind(hidden)
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// True when `option_id` is one of the options of `question_id`
pub async fn option_belongs(pool: &SqlitePool, question_id: i64, option_id: i64) -> sqlx::Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM assessment_options WHERE id = ? AND question_id = ?")
            .bind(option_id)
            .bind(question_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

pub async fn insert_result<'e, E: SqliteExecutor<'e>>(
    executor: E,
    owner: ResultOwner,
    question_id: i64,
    option_id: i64,
) -> sqlx::Result<i64> {
    let (profile_id, report_id) = match owner {
        ResultOwner::StudentProfile(id) => (Some(id), None),
        ResultOwner::ProgressReport(id) => (None, Some(id)),
    };
    let result = sqlx::query(
        r#"
        INSERT INTO assessment_results (student_profile_id, progress_report_id, question_id,
                                        option_id, created_date)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile_id)
    .bind(report_id)
    .bind(question_id)
    .bind(option_id)
    .bind(time::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn delete_results_for_report<'e, E: SqliteExecutor<'e>>(executor: E, report_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM assessment_results WHERE progress_report_id = ?")
        .bind(report_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Initial assessment of a profile
pub async fn results_for_profile(pool: &SqlitePool, profile_id: i64) -> sqlx::Result<Vec<AssessmentResult>> {
    sqlx::query_as::<_, AssessmentResult>(&format!(
        "{RESULT_SELECT} WHERE r.student_profile_id = ? AND r.progress_report_id IS NULL ORDER BY q.id"
    ))
    .bind(profile_id)
    .fetch_all(pool)
    .await
}

pub async fn results_for_reports(
    pool: &SqlitePool,
    report_ids: &[i64],
) -> sqlx::Result<HashMap<i64, Vec<AssessmentResult>>> {
    let mut by_report: HashMap<i64, Vec<AssessmentResult>> = HashMap::new();
    if report_ids.is_empty() {
        return Ok(by_report);
    }

    let placeholders = vec!["?"; report_ids.len()].join(", ");
    let sql = format!("{RESULT_SELECT} WHERE r.progress_report_id IN ({placeholders}) ORDER BY q.id");
    let mut query = sqlx::query_as::<_, AssessmentResult>(&sql);
    for id in report_ids {
        query = query.bind(id);
    }

    for row in query.fetch_all(pool).await? {
        if let Some(report_id) = row.progress_report_id {
            by_report.entry(report_id).or_default().push(row);
        }
    }
    Ok(by_report)
}

async fn load_options(pool: &SqlitePool, question_ids: &[i64]) -> sqlx::Result<HashMap<i64, Vec<AssessmentOption>>> {
    let mut by_question: HashMap<i64, Vec<AssessmentOption>> = HashMap::new();
    if question_ids.is_empty() {
        return Ok(by_question);
    }

    let placeholders = vec!["?"; question_ids.len()].join(", ");
    let sql = format!(
        "SELECT id, question_id, option_text, point FROM assessment_options \
         WHERE question_id IN ({placeholders}) ORDER BY point, id"
    );
    let mut query = sqlx::query_as::<_, AssessmentOption>(&sql);
    for id in question_ids {
        query = query.bind(id);
    }

    for row in query.fetch_all(pool).await? {
        by_question.entry(row.question_id).or_default().push(row);
    }
    Ok(by_question)
}

// Score ranges

const RANGE_COLUMNS: &str = "id, description, min_score, max_score, created_date, updated_date";

pub async fn insert_score_range(pool: &SqlitePool, description: &str, min: f64, max: f64) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO assessment_score_ranges (description, min_score, max_score, created_date) VALUES (?, ?, ?, ?)",
    )
    .bind(description.trim())
    .bind(min)
    .bind(max)
    .bind(time::now())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update_score_range(
    pool: &SqlitePool,
    id: i64,
    description: &str,
    min: f64,
    max: f64,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE assessment_score_ranges
        SET description = ?, min_score = ?, max_score = ?, updated_date = ?
        WHERE id = ?
        "#,
    )
    .bind(description.trim())
    .bind(min)
    .bind(max)
    .bind(time::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_score_range(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let result = sqlx::query("DELETE FROM assessment_score_ranges WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_score_range(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<ScoreRange>> {
    sqlx::query_as::<_, ScoreRange>(&format!(
        "SELECT {RANGE_COLUMNS} FROM assessment_score_ranges WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_score_ranges(pool: &SqlitePool) -> sqlx::Result<Vec<ScoreRange>> {
    sqlx::query_as::<_, ScoreRange>(&format!(
        "SELECT {RANGE_COLUMNS} FROM assessment_score_ranges ORDER BY min_score, id"
    ))
    .fetch_all(pool)
    .await
}

/// Closed-interval overlap with any other range
pub async fn score_range_overlaps(
    pool: &SqlitePool,
    min: f64,
    max: f64,
    except_id: Option<i64>,
) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM assessment_score_ranges
        WHERE min_score <= ?2 AND max_score >= ?1 AND (?3 IS NULL OR id != ?3)
        "#,
    )
    .bind(min)
    .bind(max)
    .bind(except_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Range containing `score`, if any
pub async fn score_range_for(pool: &SqlitePool, score: f64) -> sqlx::Result<Option<ScoreRange>> {
    sqlx::query_as::<_, ScoreRange>(&format!(
        "SELECT {RANGE_COLUMNS} FROM assessment_score_ranges \
         WHERE min_score <= ?1 AND max_score >= ?1 ORDER BY min_score LIMIT 1"
    ))
    .bind(score)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_common::db::init_memory_database;

    #[tokio::test]
    async fn test_question_with_options() {
        let pool = init_memory_database().await.unwrap();
        let staff = sqlx::query(
            "INSERT INTO users (email, password_hash, full_name, role, created_date) VALUES ('s@x.io', 'h', 'S', 'STAFF', ?)",
        )
        .bind(time::now())
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let mut conn = pool.acquire().await.unwrap();
        let id = insert_question(&mut conn, "Eye contact", &[("Rarely", 1.0), ("Often", 3.0)], staff)
            .await
            .unwrap();
        drop(conn);

        assert!(question_exists(&pool, "eye contact").await.unwrap());
        let question = find_question(&pool, id).await.unwrap().unwrap();
        assert_eq!(question.options.len(), 2);
        assert!(option_belongs(&pool, id, question.options[0].id).await.unwrap());
        assert!(!option_belongs(&pool, id + 1, question.options[0].id).await.unwrap());

        set_question_hidden(&pool, id, true).await.unwrap();
        assert!(list_questions(&pool, false).await.unwrap().is_empty());
        assert_eq!(list_questions(&pool, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_score_range_overlap_and_lookup() {
        let pool = init_memory_database().await.unwrap();
        let low = insert_score_range(&pool, "Mild", 0.0, 10.0).await.unwrap();
        insert_score_range(&pool, "Moderate", 10.5, 20.0).await.unwrap();

        assert!(score_range_overlaps(&pool, 5.0, 12.0, None).await.unwrap());
        assert!(score_range_overlaps(&pool, 10.0, 10.2, None).await.unwrap());
        assert!(!score_range_overlaps(&pool, 20.5, 30.0, None).await.unwrap());
        assert!(!score_range_overlaps(&pool, 0.0, 9.0, Some(low)).await.unwrap());

        let found = score_range_for(&pool, 15.0).await.unwrap().unwrap();
        assert_eq!(found.description, "Moderate");
        assert!(score_range_for(&pool, 10.2).await.unwrap().is_none());

        assert!(delete_score_range(&pool, low).await.unwrap());
        assert!(!delete_score_range(&pool, low).await.unwrap());
    }
}
