//! Progress report queries

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tutorhub_common::time;

use super::assessments::{self, AssessmentResult};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub id: i64,
    pub student_profile_id: i64,
    pub tutor_id: i64,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub achieved: String,
    pub failed: String,
    pub note_from_tutor: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub assessment_results: Vec<AssessmentResult>,
}

#[derive(Debug, Clone)]
pub struct ReportFields<'a> {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub achieved: &'a str,
    pub failed: &'a str,
    pub note_from_tutor: &'a str,
}

const COLUMNS: &str = "id, student_profile_id, tutor_id, from_date, to_date, achieved, failed, \
                       note_from_tutor, created_date, updated_date";

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    student_profile_id: i64,
    tutor_id: i64,
    report: &ReportFields<'_>,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO progress_reports (student_profile_id, tutor_id, from_date, to_date, achieved,
                                      failed, note_from_tutor, created_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(student_profile_id)
    .bind(tutor_id)
    .bind(report.from_date)
    .bind(report.to_date)
    .bind(report.achieved)
    .bind(report.failed)
    .bind(report.note_from_tutor)
    .bind(time::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update<'e, E: SqliteExecutor<'e>>(executor: E, id: i64, report: &ReportFields<'_>) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE progress_reports
        SET from_date = ?, to_date = ?, achieved = ?, failed = ?, note_from_tutor = ?,
            updated_date = ?
        WHERE id = ?
        "#,
    )
    .bind(report.from_date)
    .bind(report.to_date)
    .bind(report.achieved)
    .bind(report.failed)
    .bind(report.note_from_tutor)
    .bind(time::now())
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<ProgressReport>> {
    let report = sqlx::query_as::<_, ProgressReport>(&format!(
        "SELECT {COLUMNS} FROM progress_reports WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match report {
        Some(mut r) => {
            r.assessment_results = assessments::results_for_reports(pool, &[r.id])
                .await?
                .remove(&r.id)
                .unwrap_or_default();
            Ok(Some(r))
        }
        None => Ok(None),
    }
}

/// Reports of a profile intersecting `[from, to]`, newest first
pub async fn list_for_profile(
    pool: &SqlitePool,
    student_profile_id: i64,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> sqlx::Result<Vec<ProgressReport>> {
    let mut rows = sqlx::query_as::<_, ProgressReport>(&format!(
        r#"
        SELECT {COLUMNS} FROM progress_reports
        WHERE student_profile_id = ?1
          AND (?2 IS NULL OR to_date >= ?2)
          AND (?3 IS NULL OR from_date <= ?3)
        ORDER BY from_date DESC, id DESC
        "#
    ))
    .bind(student_profile_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut results = assessments::results_for_reports(pool, &ids).await?;
    for row in rows.iter_mut() {
        row.assessment_results = results.remove(&row.id).unwrap_or_default();
    }
    Ok(rows)
}

/// True when another report of the profile shares at least one day with `[from, to]`
pub async fn period_overlaps(
    pool: &SqlitePool,
    student_profile_id: i64,
    from: NaiveDate,
    to: NaiveDate,
    except_id: Option<i64>,
) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM progress_reports
        WHERE student_profile_id = ?1 AND from_date <= ?3 AND to_date >= ?2
          AND (?4 IS NULL OR id != ?4)
        "#,
    )
    .bind(student_profile_id)
    .bind(from)
    .bind(to)
    .bind(except_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}
