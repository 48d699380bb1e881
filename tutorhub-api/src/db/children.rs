//! Child information queries

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tutorhub_common::time;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildInformation {
    pub id: i64,
    pub parent_id: i64,
    pub name: String,
    pub is_male: bool,
    pub birth_date: NaiveDate,
    pub image_url: Option<String>,
    pub medical_history: Option<String>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ChildFields<'a> {
    pub name: &'a str,
    pub is_male: bool,
    pub birth_date: NaiveDate,
    pub image_url: Option<&'a str>,
    pub medical_history: Option<&'a str>,
}

const COLUMNS: &str = "id, parent_id, name, is_male, birth_date, image_url, medical_history, \
                       created_date, updated_date";

pub async fn insert(pool: &SqlitePool, parent_id: i64, child: &ChildFields<'_>) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO child_informations (parent_id, name, is_male, birth_date, image_url,
                                        medical_history, created_date)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(parent_id)
    .bind(child.name.trim())
    .bind(child.is_male)
    .bind(child.birth_date)
    .bind(child.image_url)
    .bind(child.medical_history)
    .bind(time::now())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, child: &ChildFields<'_>) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE child_informations
        SET name = ?, is_male = ?, birth_date = ?, image_url = ?, medical_history = ?,
            updated_date = ?
        WHERE id = ?
        "#,
    )
    .bind(child.name.trim())
    .bind(child.is_male)
    .bind(child.birth_date)
    .bind(child.image_url)
    .bind(child.medical_history)
    .bind(time::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<ChildInformation>> {
    sqlx::query_as::<_, ChildInformation>(&format!(
        "SELECT {COLUMNS} FROM child_informations WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_for_parent(pool: &SqlitePool, parent_id: i64) -> sqlx::Result<Vec<ChildInformation>> {
    sqlx::query_as::<_, ChildInformation>(&format!(
        "SELECT {COLUMNS} FROM child_informations WHERE parent_id = ? ORDER BY name, id"
    ))
    .bind(parent_id)
    .fetch_all(pool)
    .await
}
