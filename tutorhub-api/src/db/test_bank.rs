//! Screening tests, their questions and submitted results

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tutorhub_common::time;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: i64,
    pub test_name: String,
    pub test_description: String,
    pub submitter_id: Option<i64>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
    #[sqlx(skip)]
    pub questions: Vec<TestQuestion>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestQuestion {
    pub id: i64,
    pub test_id: i64,
    pub question: String,
    pub created_date: DateTime<Utc>,
    #[sqlx(skip)]
    pub options: Vec<TestQuestionOption>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestQuestionOption {
    pub id: i64,
    #[serde(skip)]
    pub question_id: i64,
    pub option_answer: String,
    pub point: f64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: i64,
    pub test_id: i64,
    pub test_name: String,
    pub parent_id: i64,
    pub child_id: Option<i64>,
    pub child_name: Option<String>,
    pub total_point: f64,
    pub created_date: DateTime<Utc>,
    #[sqlx(skip)]
    pub details: Vec<TestResultDetail>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultDetail {
    #[serde(skip)]
    pub test_result_id: i64,
    pub question_id: i64,
    pub question: String,
    pub option_id: i64,
    pub option_answer: String,
    pub point: f64,
}

const TEST_COLUMNS: &str = "id, test_name, test_description, submitter_id, created_date, updated_date";

const TEST_FILTER: &str = "WHERE is_deleted = 0 AND (?1 IS NULL OR test_name LIKE ?1)";

const RESULT_SELECT: &str = r#"
    SELECT r.id, r.test_id, t.test_name, r.parent_id, r.child_id, c.name AS child_name,
           r.total_point, r.created_date
    FROM test_results r
    JOIN tests t ON t.id = r.test_id
    LEFT JOIN child_informations c ON c.id = r.child_id
"#;

const RESULT_FILTER: &str = r#"
    WHERE (?1 IS NULL OR r.parent_id = ?1)
      AND (?2 IS NULL OR r.test_id = ?2)
"#;

// Tests

pub async fn insert_test(
    pool: &SqlitePool,
    name: &str,
    description: &str,
    submitter_id: i64,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO tests (test_name, test_description, submitter_id, created_date) VALUES (?, ?, ?, ?)",
    )
    .bind(name.trim())
    .bind(description)
    .bind(submitter_id)
    .bind(time::now())
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn test_name_exists(pool: &SqlitePool, name: &str, except_id: Option<i64>) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM tests WHERE test_name = ?1 COLLATE NOCASE AND is_deleted = 0 \
         AND (?2 IS NULL OR id != ?2)",
    )
    .bind(name.trim())
    .bind(except_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn update_test(pool: &SqlitePool, id: i64, name: &str, description: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE tests SET test_name = ?, test_description = ?, updated_date = ? WHERE id = ?")
        .bind(name.trim())
        .bind(description)
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn soft_delete_test(pool: &SqlitePool, id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE tests SET is_deleted = 1, updated_date = ? WHERE id = ?")
        .bind(time::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// A test with its questions and options
pub async fn find_test(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Test>> {
    let test = sqlx::query_as::<_, Test>(&format!(
        "SELECT {TEST_COLUMNS} FROM tests WHERE id = ? AND is_deleted = 0"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match test {
        Some(mut t) => {
            t.questions = questions_for_test(pool, t.id).await?;
            Ok(Some(t))
        }
        None => Ok(None),
    }
}

pub async fn count_tests(pool: &SqlitePool, search: &Option<String>) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tests {TEST_FILTER}"))
        .bind(search)
        .fetch_one(pool)
        .await
}

/// Tests without their questions
pub async fn list_tests(
    pool: &SqlitePool,
    search: &Option<String>,
    order: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<Test>> {
    sqlx::query_as::<_, Test>(&format!(
        "SELECT {TEST_COLUMNS} FROM tests {TEST_FILTER} {order} LIMIT ?2 OFFSET ?3"
    ))
    .bind(search)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

// Questions

pub async fn insert_question(
    conn: &mut SqliteConnection,
    test_id: i64,
    question: &str,
    options: &[(&str, f64)],
) -> sqlx::Result<i64> {
    let id = sqlx::query("INSERT INTO test_questions (test_id, question, created_date) VALUES (?, ?, ?)")
        .bind(test_id)
        .bind(question.trim())
        .bind(time::now())
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    for (answer, point) in options {
        sqlx::query("INSERT INTO test_question_options (question_id, option_answer, point) VALUES (?, ?, ?)")
            .bind(id)
            .bind(answer.trim())
            .bind(point)
            .execute(&mut *conn)
            .await?;
    }
    Ok(id)
}

pub async fn find_question(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<TestQuestion>> {
    let question = sqlx::query_as::<_, TestQuestion>(
        "SELECT id, test_id, question, created_date FROM test_questions WHERE id = ?",
    )
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

pub async fn question_exists_in_test(pool: &SqlitePool, test_id: i64, question: &str) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM test_questions WHERE test_id = ? AND question = ? COLLATE NOCASE",
    )
    .bind(test_id)
    .bind(question.trim())
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Questions already referenced by a submitted result cannot be removed
pub async fn question_answered(pool: &SqlitePool, question_id: i64) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM test_result_details WHERE question_id = ?")
        .bind(question_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn delete_question(conn: &mut SqliteConnection, question_id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM test_question_options WHERE question_id = ?")
        .bind(question_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM test_questions WHERE id = ?")
        .bind(question_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn questions_for_test(pool: &SqlitePool, test_id: i64) -> sqlx::Result<Vec<TestQuestion>> {
    let mut questions = sqlx::query_as::<_, TestQuestion>(
        "SELECT id, test_id, question, created_date FROM test_questions WHERE test_id = ? ORDER BY id",
    )
    .bind(test_id)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
    let mut options = load_options(pool, &ids).await?;
    for q in questions.iter_mut() {
        q.options = options.remove(&q.id).unwrap_or_default();
    }
    Ok(questions)
}

async fn load_options(pool: &SqlitePool, question_ids: &[i64]) -> sqlx::Result<HashMap<i64, Vec<TestQuestionOption>>> {
    let mut by_question: HashMap<i64, Vec<TestQuestionOption>> = HashMap::new();
    if question_ids.is_empty() {
        return Ok(by_question);
    }

    let placeholders = vec!["?"; question_ids.len()].join(", ");
    let sql = format!(
        "SELECT id, question_id, option_answer, point FROM test_question_options \
         WHERE question_id IN ({placeholders}) ORDER BY id"
    );
    let mut query = sqlx::query_as::<_, TestQuestionOption>(&sql);
    for id in question_ids {
        query = query.bind(id);
    }

    for row in query.fetch_all(pool).await? {
        by_question.entry(row.question_id).or_default().push(row);
    }
    Ok(by_question)
}

// Results

/// Point of `option_id` when it answers `question_id` of `test_id`
pub async fn answer_point(
    pool: &SqlitePool,
    test_id: i64,
    question_id: i64,
    option_id: i64,
) -> sqlx::Result<Option<f64>> {
    sqlx::query_scalar(
        r#"
        SELECT o.point FROM test_question_options o
        JOIN test_questions q ON q.id = o.question_id
        WHERE o.id = ? AND q.id = ? AND q.test_id = ?
        "#,
    )
    .bind(option_id)
    .bind(question_id)
    .bind(test_id)
    .fetch_optional(pool)
    .await
}

pub async fn insert_result(
    conn: &mut SqliteConnection,
    test_id: i64,
    parent_id: i64,
    child_id: Option<i64>,
    total_point: f64,
    answers: &[(i64, i64)],
) -> sqlx::Result<i64> {
    let id = sqlx::query(
        "INSERT INTO test_results (test_id, parent_id, child_id, total_point, created_date) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(test_id)
    .bind(parent_id)
    .bind(child_id)
    .bind(total_point)
    .bind(time::now())
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    for (question_id, option_id) in answers {
        sqlx::query("INSERT INTO test_result_details (test_result_id, question_id, option_id) VALUES (?, ?, ?)")
            .bind(id)
            .bind(question_id)
            .bind(option_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(id)
}

pub async fn find_result(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<TestResult>> {
    let result = sqlx::query_as::<_, TestResult>(&format!("{RESULT_SELECT} WHERE r.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    match result {
        Some(mut r) => {
            r.details = load_details(pool, &[r.id]).await?.remove(&r.id).unwrap_or_default();
            Ok(Some(r))
        }
        None => Ok(None),
    }
}

pub async fn count_results(pool: &SqlitePool, parent_id: Option<i64>, test_id: Option<i64>) -> sqlx::Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM test_results r {RESULT_FILTER}"))
        .bind(parent_id)
        .bind(test_id)
        .fetch_one(pool)
        .await
}

pub async fn list_results(
    pool: &SqlitePool,
    parent_id: Option<i64>,
    test_id: Option<i64>,
    order: &str,
    limit: i64,
    offset: i64,
) -> sqlx::Result<Vec<TestResult>> {
    let mut rows = sqlx::query_as::<_, TestResult>(&format!(
        "{RESULT_SELECT} {RESULT_FILTER} {order} LIMIT ?3 OFFSET ?4"
    ))
    .bind(parent_id)
    .bind(test_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut details = load_details(pool, &ids).await?;
    for row in rows.iter_mut() {
        row.details = details.remove(&row.id).unwrap_or_default();
    }
    Ok(rows)
}

async fn load_details(pool: &SqlitePool, result_ids: &[i64]) -> sqlx::Result<HashMap<i64, Vec<TestResultDetail>>> {
    let mut by_result: HashMap<i64, Vec<TestResultDetail>> = HashMap::new();
    if result_ids.is_empty() {
        return Ok(by_result);
    }

    let placeholders = vec!["?"; result_ids.len()].join(", ");
    let sql = format!(
        r#"
        SELECT d.test_result_id, d.question_id, q.question, d.option_id, o.option_answer, o.point
        FROM test_result_details d
        JOIN test_questions q ON q.id = d.question_id
        JOIN test_question_options o ON o.id = d.option_id
        WHERE d.test_result_id IN ({placeholders})
        ORDER BY d.question_id
        "#
    );
    let mut query = sqlx::query_as::<_, TestResultDetail>(&sql);
    for id in result_ids {
        query = query.bind(id);
    }

    for row in query.fetch_all(pool).await? {
        by_result.entry(row.test_result_id).or_default().push(row);
    }
    Ok(by_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorhub_common::db::init_memory_database;

    #[tokio::test]
    async fn test_answer_point_requires_matching_question_and_test() {
        let pool = init_memory_database().await.unwrap();
        let staff = sqlx::query(
            "INSERT INTO users (email, password_hash, full_name, role, created_date) VALUES ('s@x.io', 'h', 'S', 'STAFF', ?)",
        )
        .bind(time::now())
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let first = insert_test(&pool, "M-CHAT", "", staff).await.unwrap();
        let second = insert_test(&pool, "ATEC", "", staff).await.unwrap();
        assert!(test_name_exists(&pool, "m-chat", None).await.unwrap());
        assert!(!test_name_exists(&pool, "m-chat", Some(first)).await.unwrap());

        let mut conn = pool.acquire().await.unwrap();
        let q1 = insert_question(&mut conn, first, "Points at objects?", &[("Yes", 0.0), ("No", 1.0)])
            .await
            .unwrap();
        let q2 = insert_question(&mut conn, second, "Speaks?", &[("Yes", 0.0), ("No", 2.0)])
            .await
            .unwrap();
        drop(conn);

        let test = find_test(&pool, first).await.unwrap().unwrap();
        let no = test.questions[0].options.iter().find(|o| o.option_answer == "No").unwrap();
        assert_eq!(answer_point(&pool, first, q1, no.id).await.unwrap(), Some(1.0));
        assert_eq!(answer_point(&pool, second, q1, no.id).await.unwrap(), None);
        assert_eq!(answer_point(&pool, first, q2, no.id).await.unwrap(), None);

        soft_delete_test(&pool, second).await.unwrap();
        assert!(find_test(&pool, second).await.unwrap().is_none());
        assert_eq!(count_tests(&pool, &None).await.unwrap(), 1);
    }
}
