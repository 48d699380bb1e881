//! Student profile queries

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tutorhub_common::db::StudentProfileStatus;
use tutorhub_common::time;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: i64,
    pub tutor_id: i64,
    pub tutor_name: String,
    pub child_id: i64,
    pub child_name: String,
    pub parent_id: i64,
    pub tutor_request_id: i64,
    pub initial_condition: String,
    pub status: StudentProfileStatus,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct StudentProfileFilter {
    pub tutor_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub status: Option<StudentProfileStatus>,
    pub search: Option<String>,
}

const SELECT: &str = r#"
    SELECT sp.id, sp.tutor_id, u.full_name AS tutor_name, sp.child_id, c.name AS child_name,
           c.parent_id, sp.tutor_request_id, sp.initial_condition, sp.status,
           sp.created_date, sp.updated_date
    FROM student_profiles sp
    JOIN users u ON u.id = sp.tutor_id
    JOIN child_informations c ON c.id = sp.child_id
"#;

const FILTER: &str = r#"
    WHERE (?1 IS NULL OR sp.tutor_id = ?1)
      AND (?2 IS NULL OR c.parent_id = ?2)
      AND (?3 IS NULL OR sp.status = ?3)
      AND (?4 IS NULL OR c.name LIKE ?4 OR u.full_name LIKE ?4)
"#;

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    tutor_id: i64,
    child_id: i64,
    tutor_request_id: i64,
    initial_condition: &str,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO student_profiles (tutor_id, child_id, tutor_request_id, initial_condition,
                                      status, created_date)
        VALUES (?, ?, ?, ?, 'PENDING', ?)
        "#,
    )
    .bind(tutor_id)
    .bind(child_id)
    .bind(tutor_request_id)
    .bind(initial_condition)
    .bind(time::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn exists_for_request(pool: &SqlitePool, tutor_request_id: i64) -> sqlx::Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM student_profiles WHERE tutor_request_id = ?")
            .bind(tutor_request_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<StudentProfile>> {
    sqlx::query_as::<_, StudentProfile>(&format!("{SELECT} WHERE sp.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn count(pool: &SqlitePool, filter: &StudentProfileFilter) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!(
        r#"
        SELECT COUNT(*) FROM student_profiles sp
        JOIN users u ON u.id = sp.tutor_id
        JOIN child_informations c ON c.id = sp.child_id
        {FILTER}
        "#
    ))
    .bind(filter.tutor_id)
    .bind(filter.parent_id)
    .bind(filter.status)
    .bind(&filter.search)
    .fetch_one(pool)
    .await
}

pub async fn list(
    pool: &SqlitePool,
    filter: &StudentProfileFilter,
    order: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<StudentProfile>> {
    sqlx::query_as::<_, StudentProfile>(&format!("{SELECT} {FILTER} {order} LIMIT ?5 OFFSET ?6"))
        .bind(filter.tutor_id)
        .bind(filter.parent_id)
        .bind(filter.status)
        .bind(&filter.search)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

/// Move a profile from `from` to `to`; false when it was not in `from`
pub async fn transition<'e, E: SqliteExecutor<'e>>(
    executor: E,
    id: i64,
    from: StudentProfileStatus,
    to: StudentProfileStatus,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE student_profiles SET status = ?, updated_date = ? WHERE id = ? AND status = ?",
    )
    .bind(to)
    .bind(time::now())
    .bind(id)
    .bind(from)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Ids of every profile currently being taught
pub async fn teaching_ids(pool: &SqlitePool) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar("SELECT id FROM student_profiles WHERE status = 'TEACHING' ORDER BY id")
        .fetch_all(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_common::db::init_memory_database;

    async fn seed(pool: &SqlitePool) -> (i64, i64, i64) {
        let now = time::now();
        let tutor: i64 = sqlx::query(
            "INSERT INTO users (email, password_hash, full_name, phone_number, role, created_date) \
             VALUES ('t@x.io', 'h', 'Tutor', '1', 'TUTOR', ?)",
        )
        .bind(now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();
        let parent: i64 = sqlx::query(
            "INSERT INTO users (email, password_hash, full_name, phone_number, role, created_date) \
             VALUES ('p@x.io', 'h', 'Parent', '2', 'PARENT', ?)",
        )
        .bind(now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();
        let child: i64 = sqlx::query(
            "INSERT INTO child_informations (parent_id, name, is_male, birth_date, created_date) \
             VALUES (?, 'Kid', 1, '2018-01-01', ?)",
        )
        .bind(parent)
        .bind(now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();
        let request: i64 = sqlx::query(
            "INSERT INTO tutor_requests (parent_id, tutor_id, child_id, description, request_status, created_date) \
             VALUES (?, ?, ?, '', 'APPROVE', ?)",
        )
        .bind(parent)
        .bind(tutor)
        .bind(child)
        .bind(now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();
        (tutor, child, request)
    }

    #[tokio::test]
    async fn test_transition_only_from_expected_status() {
        let pool = init_memory_database().await.unwrap();
        let (tutor, child, request) = seed(&pool).await;
        let id = insert(&pool, tutor, child, request, "calm").await.unwrap();

        assert!(exists_for_request(&pool, request).await.unwrap());
        assert!(!transition(&pool, id, StudentProfileStatus::Teaching, StudentProfileStatus::Stop)
            .await
            .unwrap());
        assert!(transition(&pool, id, StudentProfileStatus::Pending, StudentProfileStatus::Teaching)
            .await
            .unwrap());

        let profile = find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(profile.status, StudentProfileStatus::Teaching);
        assert_eq!(profile.child_name, "Kid");
        assert_eq!(teaching_ids(&pool).await.unwrap(), vec![id]);
    }
}
