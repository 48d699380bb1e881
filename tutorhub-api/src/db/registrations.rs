//! Tutor registration request queries

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tutorhub_common::db::ApprovalStatus;
use tutorhub_common::time;

use super::ReviewFilter;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorRegistrationRequest {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub phone_number: String,
    pub image_url: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: NaiveDate,
    pub start_age: i64,
    pub end_age: i64,
    pub about_me: String,
    pub price_per_hour: f64,
    pub request_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub approved_by_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewRegistration<'a> {
    pub email: &'a str,
    pub full_name: &'a str,
    pub phone_number: &'a str,
    pub image_url: Option<&'a str>,
    pub address: Option<&'a str>,
    pub date_of_birth: NaiveDate,
    pub start_age: i64,
    pub end_age: i64,
    pub about_me: &'a str,
    pub price_per_hour: f64,
}

const COLUMNS: &str = "id, email, full_name, phone_number, image_url, address, date_of_birth, \
                       start_age, end_age, about_me, price_per_hour, request_status, \
                       rejection_reason, approved_by_id, created_date, updated_date";

const FILTER: &str = r#"
    WHERE (?1 IS NULL OR request_status = ?1)
      AND (?2 IS NULL OR full_name LIKE ?2 OR email LIKE ?2)
"#;

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    request: &NewRegistration<'_>,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO tutor_registration_requests (email, full_name, phone_number, image_url,
                                                 address, date_of_birth, start_age, end_age,
                                                 about_me, price_per_hour, request_status,
                                                 created_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'PENDING', ?)
        "#,
    )
    .bind(request.email.trim())
    .bind(request.full_name)
    .bind(request.phone_number)
    .bind(request.image_url)
    .bind(request.address)
    .bind(request.date_of_birth)
    .bind(request.start_age)
    .bind(request.end_age)
    .bind(request.about_me)
    .bind(request.price_per_hour)
    .bind(time::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<TutorRegistrationRequest>> {
    sqlx::query_as::<_, TutorRegistrationRequest>(&format!(
        "SELECT {COLUMNS} FROM tutor_registration_requests WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn pending_exists_for_email(pool: &SqlitePool, email: &str) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tutor_registration_requests WHERE email = ? AND request_status = 'PENDING'",
    )
    .bind(email.trim())
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn count(pool: &SqlitePool, filter: &ReviewFilter) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tutor_registration_requests {FILTER}"))
        .bind(filter.status)
        .bind(&filter.search)
        .fetch_one(pool)
        .await
}

pub async fn list(
    pool: &SqlitePool,
    filter: &ReviewFilter,
    order: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<TutorRegistrationRequest>> {
    sqlx::query_as::<_, TutorRegistrationRequest>(&format!(
        "SELECT {COLUMNS} FROM tutor_registration_requests {FILTER} {order} LIMIT ?3 OFFSET ?4"
    ))
    .bind(filter.status)
    .bind(&filter.search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
