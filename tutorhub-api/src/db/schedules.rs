//! Concrete session queries
//!
//! Generated sessions remember the slot and the date they were generated
//! for (`slot_date`), so a session moved to another day is never generated a
//! second time.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tutorhub_common::db::{AttendanceStatus, PassingStatus};
use tutorhub_common::time;

use crate::scheduling::PlannedSession;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: i64,
    pub tutor_id: i64,
    pub student_profile_id: i64,
    pub child_name: String,
    pub schedule_time_slot_id: Option<i64>,
    pub schedule_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub attendance_status: AttendanceStatus,
    pub passing_status: PassingStatus,
    pub note: Option<String>,
    pub syllabus_id: Option<i64>,
    pub exercise_type_id: Option<i64>,
    pub exercise_type_name: Option<String>,
    pub exercise_id: Option<i64>,
    pub exercise_name: Option<String>,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

/// Tutor's record of what happened in a session
#[derive(Debug, Clone)]
pub struct SessionOutcome<'a> {
    pub attendance_status: AttendanceStatus,
    pub passing_status: PassingStatus,
    pub note: Option<&'a str>,
    pub syllabus_id: Option<i64>,
    pub exercise_type_id: Option<i64>,
    pub exercise_id: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub tutor_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub student_profile_id: Option<i64>,
}

const SELECT: &str = r#"
    SELECT s.id, s.tutor_id, s.student_profile_id, c.name AS child_name,
           s.schedule_time_slot_id, s.schedule_date, s.start_time, s.end_time,
           s.attendance_status, s.passing_status, s.note, s.syllabus_id,
           s.exercise_type_id, et.exercise_type_name, s.exercise_id, e.exercise_name,
           s.created_date, s.updated_date
    FROM schedules s
    JOIN student_profiles sp ON sp.id = s.student_profile_id
    JOIN child_informations c ON c.id = sp.child_id
    LEFT JOIN exercise_types et ON et.id = s.exercise_type_id
    LEFT JOIN exercises e ON e.id = s.exercise_id
"#;

/// Insert a generated session unless that (slot, date) already exists or
/// the tutor already has an overlapping session that day
///
/// A session moved onto a later date occupies its new time, so the slot
/// occurrence it collides with is skipped. Returns 1 when a row was created,
/// 0 otherwise.
pub async fn insert_generated<'e, E: SqliteExecutor<'e>>(
    executor: E,
    tutor_id: i64,
    student_profile_id: i64,
    session: &PlannedSession,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO schedules (tutor_id, student_profile_id, schedule_time_slot_id,
                                         slot_date, schedule_date, start_time, end_time,
                                         attendance_status, passing_status, created_date)
        SELECT ?1, ?2, ?3, ?4, ?4, ?5, ?6, 'NOT_YET', 'NOT_YET', ?7
        WHERE NOT EXISTS (
            SELECT 1 FROM schedules
            WHERE tutor_id = ?1 AND schedule_date = ?4
              AND start_time < ?6 AND end_time > ?5
        )
        "#,
    )
    .bind(tutor_id)
    .bind(student_profile_id)
    .bind(session.slot_id)
    .bind(session.date)
    .bind(session.start)
    .bind(session.end)
    .bind(time::now())
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Schedule>> {
    sqlx::query_as::<_, Schedule>(&format!("{SELECT} WHERE s.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Sessions within `[from, to]` ordered chronologically
pub async fn list_range(
    pool: &SqlitePool,
    filter: &ScheduleFilter,
    from: NaiveDate,
    to: NaiveDate,
) -> sqlx::Result<Vec<Schedule>> {
    sqlx::query_as::<_, Schedule>(&format!(
        r#"
        {SELECT}
        WHERE (?1 IS NULL OR s.tutor_id = ?1)
          AND (?2 IS NULL OR c.parent_id = ?2)
          AND (?3 IS NULL OR s.student_profile_id = ?3)
          AND s.schedule_date BETWEEN ?4 AND ?5
        ORDER BY s.schedule_date, s.start_time, s.id
        "#
    ))
    .bind(filter.tutor_id)
    .bind(filter.parent_id)
    .bind(filter.student_profile_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// The tutor's sessions on one date, optionally leaving one out
pub async fn tutor_sessions_on(
    pool: &SqlitePool,
    tutor_id: i64,
    date: NaiveDate,
    except_id: Option<i64>,
) -> sqlx::Result<Vec<Schedule>> {
    sqlx::query_as::<_, Schedule>(&format!(
        "{SELECT} WHERE s.tutor_id = ?1 AND s.schedule_date = ?2 AND (?3 IS NULL OR s.id != ?3) \
         ORDER BY s.start_time"
    ))
    .bind(tutor_id)
    .bind(date)
    .bind(except_id)
    .fetch_all(pool)
    .await
}

pub async fn record_outcome(pool: &SqlitePool, id: i64, outcome: &SessionOutcome<'_>) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE schedules
        SET attendance_status = ?, passing_status = ?, note = ?, syllabus_id = ?,
            exercise_type_id = ?, exercise_id = ?, updated_date = ?
        WHERE id = ?
        "#,
    )
    .bind(outcome.attendance_status)
    .bind(outcome.passing_status)
    .bind(outcome.note)
    .bind(outcome.syllabus_id)
    .bind(outcome.exercise_type_id)
    .bind(outcome.exercise_id)
    .bind(time::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn reschedule(
    pool: &SqlitePool,
    id: i64,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE schedules SET schedule_date = ?, start_time = ?, end_time = ?, updated_date = ? WHERE id = ?",
    )
    .bind(date)
    .bind(start)
    .bind(end)
    .bind(time::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove not-yet-held sessions of a profile from `from` onwards
pub async fn delete_upcoming_for_profile<'e, E: SqliteExecutor<'e>>(
    executor: E,
    student_profile_id: i64,
    from: NaiveDate,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM schedules
        WHERE student_profile_id = ? AND schedule_date >= ? AND attendance_status = 'NOT_YET'
        "#,
    )
    .bind(student_profile_id)
    .bind(from)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

/// Remove not-yet-held sessions generated from a slot, from `from` onwards
pub async fn delete_upcoming_for_slot<'e, E: SqliteExecutor<'e>>(
    executor: E,
    slot_id: i64,
    from: NaiveDate,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM schedules
        WHERE schedule_time_slot_id = ? AND schedule_date >= ? AND attendance_status = 'NOT_YET'
        "#,
    )
    .bind(slot_id)
    .bind(from)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{student_profiles, time_slots};
    use crate::scheduling::{self, WeeklySlot};
    use tutorhub_common::db::{init_memory_database, StudentProfileStatus};

    async fn teaching_profile(pool: &SqlitePool) -> (i64, i64) {
        let now = time::now();
        let mut ids = Vec::new();
        for (email, role) in [("tutor@x.io", "TUTOR"), ("parent@x.io", "PARENT")] {
            let id = sqlx::query(
                "INSERT INTO users (email, password_hash, full_name, role, created_date) VALUES (?, 'h', ?, ?, ?)",
            )
            .bind(email)
            .bind(email)
            .bind(role)
            .bind(now)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid();
            ids.push(id);
        }
        let (tutor, parent) = (ids[0], ids[1]);
        let child = sqlx::query(
            "INSERT INTO child_informations (parent_id, name, is_male, birth_date, created_date) VALUES (?, 'Kid', 0, '2019-03-01', ?)",
        )
        .bind(parent)
        .bind(now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();
        let request = sqlx::query(
            "INSERT INTO tutor_requests (parent_id, tutor_id, child_id, request_status, created_date) VALUES (?, ?, ?, 'APPROVE', ?)",
        )
        .bind(parent)
        .bind(tutor)
        .bind(child)
        .bind(now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();
        let profile = student_profiles::insert(pool, tutor, child, request, "").await.unwrap();
        student_profiles::transition(pool, profile, StudentProfileStatus::Pending, StudentProfileStatus::Teaching)
            .await
            .unwrap();
        (tutor, profile)
    }

    #[tokio::test]
    async fn test_generation_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        let (tutor, profile) = teaching_profile(&pool).await;
        let slot = WeeklySlot::new(
            2,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
        .unwrap();
        time_slots::insert(&pool, profile, &slot).await.unwrap();

        // Monday 2026-10-19: window runs to Sunday 2026-11-01, two Tuesdays
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(scheduling::generate_for_profile(&pool, profile, today).await.unwrap(), 2);
        assert_eq!(scheduling::generate_for_profile(&pool, profile, today).await.unwrap(), 0);

        let filter = ScheduleFilter {
            tutor_id: Some(tutor),
            ..Default::default()
        };
        let sessions = list_range(&pool, &filter, today, today + chrono::Duration::days(13))
            .await
            .unwrap();
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().all(|s| time::weekday_index(s.schedule_date) == 2));
        assert_eq!(sessions[0].attendance_status, AttendanceStatus::NotYet);
    }

    #[tokio::test]
    async fn test_moved_session_not_regenerated() {
        let pool = init_memory_database().await.unwrap();
        let (_, profile) = teaching_profile(&pool).await;
        let slot = WeeklySlot::new(
            2,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
        .unwrap();
        time_slots::insert(&pool, profile, &slot).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        scheduling::generate_for_profile(&pool, profile, today).await.unwrap();

        let filter = ScheduleFilter {
            student_profile_id: Some(profile),
            ..Default::default()
        };
        let first = list_range(&pool, &filter, today, today + chrono::Duration::days(13))
            .await
            .unwrap()
            .remove(0);
        reschedule(
            &pool,
            first.id,
            NaiveDate::from_ymd_opt(2026, 10, 22).unwrap(),
            NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(scheduling::generate_for_profile(&pool, profile, today).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_generation_skips_slot_taken_by_moved_session() {
        let pool = init_memory_database().await.unwrap();
        let (tutor, profile) = teaching_profile(&pool).await;
        let at = |h| NaiveTime::from_hms_opt(h, 0, 0).unwrap();
        time_slots::insert(&pool, profile, &WeeklySlot::new(2, at(9), at(10)).unwrap())
            .await
            .unwrap();
        time_slots::insert(&pool, profile, &WeeklySlot::new(3, at(13), at(14)).unwrap())
            .await
            .unwrap();

        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        scheduling::generate_for_profile(&pool, profile, monday).await.unwrap();

        // Tuesday's session moves to a Wednesday past the current window, onto
        // the time the Wednesday slot will claim once the window reaches it
        let tuesday = NaiveDate::from_ymd_opt(2026, 10, 20).unwrap();
        let moved = tutor_sessions_on(&pool, tutor, tuesday, None).await.unwrap().remove(0);
        let target = NaiveDate::from_ymd_opt(2026, 11, 4).unwrap();
        assert!(tutor_sessions_on(&pool, tutor, target, None).await.unwrap().is_empty());
        reschedule(&pool, moved.id, target, at(13), at(14)).await.unwrap();

        // Only Tuesday 2026-11-03 is new; Wednesday 2026-11-04 is taken
        let next_monday = NaiveDate::from_ymd_opt(2026, 10, 26).unwrap();
        assert_eq!(scheduling::generate_for_profile(&pool, profile, next_monday).await.unwrap(), 1);

        let on_target = tutor_sessions_on(&pool, tutor, target, None).await.unwrap();
        assert_eq!(on_target.len(), 1);
        assert_eq!(on_target[0].id, moved.id);

        // Running again still leaves the day alone
        assert_eq!(scheduling::generate_for_profile(&pool, profile, next_monday).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_upcoming_keeps_attended() {
        let pool = init_memory_database().await.unwrap();
        let (_, profile) = teaching_profile(&pool).await;
        let slot = WeeklySlot::new(
            2,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        )
        .unwrap();
        time_slots::insert(&pool, profile, &slot).await.unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        scheduling::generate_for_profile(&pool, profile, today).await.unwrap();

        let filter = ScheduleFilter {
            student_profile_id: Some(profile),
            ..Default::default()
        };
        let sessions = list_range(&pool, &filter, today, today + chrono::Duration::days(13))
            .await
            .unwrap();
        record_outcome(
            &pool,
            sessions[0].id,
            &SessionOutcome {
                attendance_status: AttendanceStatus::Attended,
                passing_status: PassingStatus::Passed,
                note: Some("good"),
                syllabus_id: None,
                exercise_type_id: None,
                exercise_id: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(delete_upcoming_for_profile(&pool, profile, today).await.unwrap(), 1);
        let left = list_range(&pool, &filter, today, today + chrono::Duration::days(13))
            .await
            .unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].passing_status, PassingStatus::Passed);
    }
}
