//! Certificate queries

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use std::collections::HashMap;
use tutorhub_common::db::ApprovalStatus;
use tutorhub_common::time;

use super::{Owner, ReviewFilter};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i64,
    pub tutor_id: Option<i64>,
    pub tutor_registration_request_id: Option<i64>,
    pub certificate_name: String,
    pub issuing_institution: String,
    pub identity_card_number: Option<String>,
    pub issuing_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub request_status: ApprovalStatus,
    pub rejection_reason: Option<String>,
    pub approved_by_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
    /// Scanned pages; loaded separately
    #[sqlx(skip)]
    pub medias: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewCertificate<'a> {
    pub certificate_name: &'a str,
    pub issuing_institution: &'a str,
    pub identity_card_number: Option<&'a str>,
    pub issuing_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub medias: &'a [String],
}

const COLUMNS: &str = "id, tutor_id, tutor_registration_request_id, certificate_name, \
                       issuing_institution, identity_card_number, issuing_date, expiration_date, \
                       request_status, rejection_reason, approved_by_id, created_date, updated_date";

const FILTER: &str = r#"
    WHERE is_deleted = 0 AND tutor_id IS NOT NULL
      AND (?1 IS NULL OR tutor_id = ?1)
      AND (?2 IS NULL OR request_status = ?2)
      AND (?3 IS NULL OR certificate_name LIKE ?3 OR issuing_institution LIKE ?3)
"#;

/// Insert a certificate with its media; new certificates start `PENDING`
///
/// Takes a connection so the certificate and its media rows share the
/// caller's transaction.
pub async fn insert(
    conn: &mut sqlx::SqliteConnection,
    owner: Owner,
    certificate: &NewCertificate<'_>,
) -> sqlx::Result<i64> {
    let (tutor_id, request_id) = owner.split();
    let now = time::now();

    let id = sqlx::query(
        r#"
        INSERT INTO certificates (tutor_id, tutor_registration_request_id, certificate_name,
                                  issuing_institution, identity_card_number, issuing_date,
                                  expiration_date, request_status, created_date)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'PENDING', ?)
        "#,
    )
    .bind(tutor_id)
    .bind(request_id)
    .bind(certificate.certificate_name.trim())
    .bind(certificate.issuing_institution)
    .bind(certificate.identity_card_number)
    .bind(certificate.issuing_date)
    .bind(certificate.expiration_date)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    for url in certificate.medias {
        sqlx::query(
            "INSERT INTO certificate_medias (certificate_id, url_path, created_date) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(url)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    Ok(id)
}

/// Whether the tutor already holds a live certificate with this name
pub async fn name_exists_for_tutor(pool: &SqlitePool, tutor_id: i64, name: &str) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM certificates
        WHERE tutor_id = ? AND certificate_name = ? COLLATE NOCASE
          AND is_deleted = 0 AND request_status != 'REJECT'
        "#,
    )
    .bind(tutor_id)
    .bind(name.trim())
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Certificate>> {
    let certificate = sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {COLUMNS} FROM certificates WHERE id = ? AND is_deleted = 0"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match certificate {
        Some(mut c) => {
            c.medias = load_medias(pool, &[c.id]).await?.remove(&c.id).unwrap_or_default();
            Ok(Some(c))
        }
        None => Ok(None),
    }
}

pub async fn count(pool: &SqlitePool, filter: &ReviewFilter) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM certificates {FILTER}"))
        .bind(filter.owner_id)
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
) -> sqlx::Result<Vec<Certificate>> {
    let mut rows = sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {COLUMNS} FROM certificates {FILTER} {order} LIMIT ?4 OFFSET ?5"
    ))
    .bind(filter.owner_id)
    .bind(filter.status)
    .bind(&filter.search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    attach_medias(pool, &mut rows).await?;
    Ok(rows)
}

/// Approved, live certificates of a tutor
pub async fn approved_for_tutor(pool: &SqlitePool, tutor_id: i64) -> sqlx::Result<Vec<Certificate>> {
    let mut rows = sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {COLUMNS} FROM certificates \
         WHERE tutor_id = ? AND is_deleted = 0 AND request_status = 'APPROVE' ORDER BY issuing_date DESC"
    ))
    .bind(tutor_id)
    .fetch_all(pool)
    .await?;

    attach_medias(pool, &mut rows).await?;
    Ok(rows)
}

pub async fn for_registration(pool: &SqlitePool, request_id: i64) -> sqlx::Result<Vec<Certificate>> {
    let mut rows = sqlx::query_as::<_, Certificate>(&format!(
        "SELECT {COLUMNS} FROM certificates WHERE tutor_registration_request_id = ? ORDER BY id"
    ))
    .bind(request_id)
    .fetch_all(pool)
    .await?;

    attach_medias(pool, &mut rows).await?;
    Ok(rows)
}

/// Hand the certificates of an approved registration to the new tutor
pub async fn transfer_from_registration<'e, E: SqliteExecutor<'e>>(
    executor: E,
    request_id: i64,
    tutor_id: i64,
    status: ApprovalStatus,
    reviewer_id: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE certificates
        SET tutor_id = ?, request_status = ?, approved_by_id = ?, updated_date = ?
        WHERE tutor_registration_request_id = ?
        "#,
    )
    .bind(tutor_id)
    .bind(status)
    .bind(reviewer_id)
    .bind(time::now())
    .bind(request_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Reject every certificate of a rejected registration
pub async fn reject_for_registration<'e, E: SqliteExecutor<'e>>(
    executor: E,
    request_id: i64,
    reviewer_id: i64,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE certificates
        SET request_status = 'REJECT', approved_by_id = ?, updated_date = ?
        WHERE tutor_registration_request_id = ?
        "#,
    )
    .bind(reviewer_id)
    .bind(time::now())
    .bind(request_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE certificates SET is_deleted = 1, updated_date = ? WHERE id = ?")
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn load_medias(pool: &SqlitePool, ids: &[i64]) -> sqlx::Result<HashMap<i64, Vec<String>>> {
    let mut by_certificate: HashMap<i64, Vec<String>> = HashMap::new();
    if ids.is_empty() {
        return Ok(by_certificate);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT certificate_id, url_path FROM certificate_medias \
         WHERE certificate_id IN ({placeholders}) ORDER BY id"
    );
    let mut query = sqlx::query_as::<_, (i64, String)>(&sql);
    for id in ids {
        query = query.bind(id);
    }

    for (certificate_id, url) in query.fetch_all(pool).await? {
        by_certificate.entry(certificate_id).or_default().push(url);
    }
    Ok(by_certificate)
}

async fn attach_medias(pool: &SqlitePool, rows: &mut [Certificate]) -> sqlx::Result<()> {
    let ids: Vec<i64> = rows.iter().map(|c| c.id).collect();
    let mut medias = load_medias(pool, &ids).await?;
    for row in rows.iter_mut() {
        row.medias = medias.remove(&row.id).unwrap_or_default();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_common::db::init_memory_database;

    async fn seed_tutor(pool: &SqlitePool) -> i64 {
        sqlx::query(
            "INSERT INTO users (email, full_name, password_hash, role, created_date) \
             VALUES ('tutor@example.com', 'Tutor', 'x', 'TUTOR', '2026-01-01T00:00:00Z')",
        )
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    fn aba(medias: &[String]) -> NewCertificate<'_> {
        NewCertificate {
            certificate_name: "ABA Therapy Level 1",
            issuing_institution: "Behavior Analyst Board",
            identity_card_number: None,
            issuing_date: NaiveDate::from_ymd_opt(2022, 5, 1).unwrap(),
            expiration_date: None,
            medias,
        }
    }

    #[tokio::test]
    async fn test_insert_with_medias_and_duplicate_check() {
        let pool = init_memory_database().await.unwrap();
        let tutor_id = seed_tutor(&pool).await;
        let medias = vec!["/media/a.png".to_string(), "/media/b.png".to_string()];

        let mut conn = pool.acquire().await.unwrap();
        let id = insert(&mut conn, Owner::Tutor(tutor_id), &aba(&medias)).await.unwrap();
        drop(conn);

        let certificate = find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(certificate.request_status, ApprovalStatus::Pending);
        assert_eq!(certificate.medias, medias);

        assert!(name_exists_for_tutor(&pool, tutor_id, "aba therapy level 1").await.unwrap());
        soft_delete(&pool, id).await.unwrap();
        assert!(!name_exists_for_tutor(&pool, tutor_id, "ABA Therapy Level 1").await.unwrap());
        assert!(find_by_id(&pool, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_owner() {
        let pool = init_memory_database().await.unwrap();
        let tutor_id = seed_tutor(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        insert(&mut conn, Owner::Tutor(tutor_id), &aba(&[])).await.unwrap();
        drop(conn);

        let mine = ReviewFilter {
            owner_id: Some(tutor_id),
            ..Default::default()
        };
        let other = ReviewFilter {
            owner_id: Some(tutor_id + 1),
            ..Default::default()
        };
        assert_eq!(count(&pool, &mine).await.unwrap(), 1);
        assert_eq!(count(&pool, &other).await.unwrap(), 0);

        let rows = list(&pool, &mine, "ORDER BY id DESC", 10, 0).await.unwrap();
        assert_eq!(rows.len(), 1);
    }
}
