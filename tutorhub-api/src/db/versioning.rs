//! Version lineages of curriculums, exercises and syllabuses
//!
//! The first row of a lineage has a NULL original id; every later version
//! points at that first row. The lineage root is therefore either the row
//! itself or its original id, and versions are numbered within the lineage.

use sqlx::SqliteExecutor;
use tutorhub_common::time;

/// Versioned content tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Versioned {
    Curriculum,
    Exercise,
    Syllabus,
}

impl Versioned {
    pub fn table(&self) -> &'static str {
        match self {
            Versioned::Curriculum => "curriculums",
            Versioned::Exercise => "exercises",
            Versioned::Syllabus => "syllabuses",
        }
    }

    pub fn original_column(&self) -> &'static str {
        match self {
            Versioned::Curriculum => "original_curriculum_id",
            Versioned::Exercise => "original_exercise_id",
            Versioned::Syllabus => "original_syllabus_id",
        }
    }
}

/// Root id of the lineage `id` belongs to, `None` if the row is missing
pub async fn lineage_root<'e, E: SqliteExecutor<'e>>(
    executor: E,
    kind: Versioned,
    id: i64,
) -> sqlx::Result<Option<i64>> {
    let sql = format!(
        "SELECT COALESCE({}, id) FROM {} WHERE id = ?",
        kind.original_column(),
        kind.table()
    );
    sqlx::query_scalar(&sql).bind(id).fetch_optional(executor).await
}

/// Next free version number in the lineage rooted at `root_id`
pub async fn next_version_number<'e, E: SqliteExecutor<'e>>(
    executor: E,
    kind: Versioned,
    root_id: i64,
) -> sqlx::Result<i64> {
    let sql = format!(
        "SELECT COALESCE(MAX(version_number), 0) + 1 FROM {} WHERE id = ?1 OR {} = ?1",
        kind.table(),
        kind.original_column()
    );
    sqlx::query_scalar(&sql).bind(root_id).fetch_one(executor).await
}

/// Deactivate every version in the lineage except `keep_id`
///
/// Called when a new version is approved; at most one version of a lineage
/// is active afterwards.
pub async fn deactivate_previous_versions<'e, E: SqliteExecutor<'e>>(
    executor: E,
    kind: Versioned,
    root_id: i64,
    keep_id: i64,
) -> sqlx::Result<u64> {
    let sql = format!(
        r#"
        UPDATE {table}
        SET is_active = 0, updated_date = ?3
        WHERE (id = ?1 OR {original} = ?1) AND id != ?2 AND is_active = 1
        "#,
        table = kind.table(),
        original = kind.original_column()
    );
    let result = sqlx::query(&sql)
        .bind(root_id)
        .bind(keep_id)
        .bind(time::now())
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Mark one version active
pub async fn activate<'e, E: SqliteExecutor<'e>>(
    executor: E,
    kind: Versioned,
    id: i64,
) -> sqlx::Result<()> {
    let sql = format!(
        "UPDATE {} SET is_active = 1, updated_date = ? WHERE id = ?",
        kind.table()
    );
    sqlx::query(&sql)
        .bind(time::now())
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_common::db::init_memory_database;

    async fn insert_curriculum(
        pool: &sqlx::SqlitePool,
        id: i64,
        original: Option<i64>,
        version: i64,
        active: bool,
    ) {
        sqlx::query(
            "INSERT INTO curriculums (id, age_from, age_end, description, original_curriculum_id, \
             version_number, is_active, request_status, created_date) \
             VALUES (?, 3, 6, 'Early communication', ?, ?, ?, 'APPROVE', '2026-01-01T00:00:00Z')",
        )
        .bind(id)
        .bind(original)
        .bind(version)
        .bind(active)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_version_numbers_follow_lineage() {
        let pool = init_memory_database().await.unwrap();
        insert_curriculum(&pool, 1, None, 1, true).await;

        assert_eq!(next_version_number(&pool, Versioned::Curriculum, 1).await.unwrap(), 2);

        insert_curriculum(&pool, 2, Some(1), 2, false).await;
        assert_eq!(next_version_number(&pool, Versioned::Curriculum, 1).await.unwrap(), 3);

        assert_eq!(lineage_root(&pool, Versioned::Curriculum, 2).await.unwrap(), Some(1));
        assert_eq!(lineage_root(&pool, Versioned::Curriculum, 1).await.unwrap(), Some(1));
        assert_eq!(lineage_root(&pool, Versioned::Curriculum, 99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_deactivate_keeps_only_approved_version() {
        let pool = init_memory_database().await.unwrap();
        insert_curriculum(&pool, 1, None, 1, true).await;
        insert_curriculum(&pool, 2, Some(1), 2, false).await;

        let changed = deactivate_previous_versions(&pool, Versioned::Curriculum, 1, 2)
            .await
            .unwrap();
        activate(&pool, Versioned::Curriculum, 2).await.unwrap();
        assert_eq!(changed, 1);

        let active: Vec<i64> = sqlx::query_scalar("SELECT id FROM curriculums WHERE is_active = 1")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(active, vec![2]);
    }
}
