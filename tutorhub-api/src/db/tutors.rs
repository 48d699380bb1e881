//! Tutor profile queries
//!
//! A tutor is a `users` row with role `TUTOR` plus a `tutors` row keyed by
//! the same id.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tutorhub_common::time;

/// Tutor joined with its account
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tutor {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub start_age: i64,
    pub end_age: i64,
    pub about_me: String,
    pub price_per_hour: f64,
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TutorProfile<'a> {
    pub date_of_birth: Option<NaiveDate>,
    pub start_age: i64,
    pub end_age: i64,
    pub about_me: &'a str,
    pub price_per_hour: f64,
}

/// Listing filters
#[derive(Debug, Clone, Default)]
pub struct TutorFilter {
    pub search: Option<String>,
    pub start_age: Option<i64>,
    pub end_age: Option<i64>,
}

const TUTOR_SELECT: &str = r#"
    SELECT u.id, u.email, u.full_name, u.phone_number, u.address, u.image_url,
           t.date_of_birth, t.start_age, t.end_age, t.about_me, t.price_per_hour,
           t.created_date
    FROM tutors t
    JOIN users u ON u.id = t.user_id
"#;

// Age filter keeps tutors whose teaching range overlaps the requested one
const TUTOR_FILTER: &str = r#"
    WHERE u.is_locked_out = 0
      AND (?1 IS NULL OR u.full_name LIKE ?1 OR u.email LIKE ?1)
      AND (?2 IS NULL OR t.end_age >= ?2)
      AND (?3 IS NULL OR t.start_age <= ?3)
"#;

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
    profile: &TutorProfile<'_>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO tutors (user_id, date_of_birth, start_age, end_age, about_me,
                            price_per_hour, created_date)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(profile.date_of_birth)
    .bind(profile.start_age)
    .bind(profile.end_age)
    .bind(profile.about_me)
    .bind(profile.price_per_hour)
    .bind(time::now())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn update<'e, E: SqliteExecutor<'e>>(
    executor: E,
    user_id: i64,
    profile: &TutorProfile<'_>,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE tutors
        SET date_of_birth = ?, start_age = ?, end_age = ?, about_me = ?,
            price_per_hour = ?, updated_date = ?
        WHERE user_id = ?
        "#,
    )
    .bind(profile.date_of_birth)
    .bind(profile.start_age)
    .bind(profile.end_age)
    .bind(profile.about_me)
    .bind(profile.price_per_hour)
    .bind(time::now())
    .bind(user_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Tutor>> {
    sqlx::query_as::<_, Tutor>(&format!("{TUTOR_SELECT} WHERE t.user_id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn exists(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tutors WHERE user_id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn count(pool: &SqlitePool, filter: &TutorFilter) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM tutors t JOIN users u ON u.id = t.user_id {TUTOR_FILTER}"
    ))
    .bind(&filter.search)
    .bind(filter.start_age)
    .bind(filter.end_age)
    .fetch_one(pool)
    .await
}

/// One page of tutors; `order` is a whitelisted `ORDER BY` clause
pub async fn list(
    pool: &SqlitePool,
    filter: &TutorFilter,
    order: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Tutor>> {
    sqlx::query_as::<_, Tutor>(&format!(
        "{TUTOR_SELECT} {TUTOR_FILTER} {order} LIMIT ?4 OFFSET ?5"
    ))
    .bind(&filter.search)
    .bind(filter.start_age)
    .bind(filter.end_age)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
