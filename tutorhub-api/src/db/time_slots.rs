//! Weekly schedule time slot queries

use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor, SqlitePool};
use tutorhub_common::time;

use crate::scheduling::{SlotError, WeeklySlot};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTimeSlot {
    pub id: i64,
    pub student_profile_id: i64,
    pub weekday: i64,
    pub from_time: NaiveTime,
    pub to_time: NaiveTime,
    pub created_date: DateTime<Utc>,
    pub updated_date: Option<DateTime<Utc>>,
}

impl ScheduleTimeSlot {
    pub fn weekly(&self) -> Result<WeeklySlot, SlotError> {
        WeeklySlot::new(self.weekday, self.from_time, self.to_time)
    }
}

const COLUMNS: &str = "id, student_profile_id, weekday, from_time, to_time, created_date, updated_date";

pub async fn insert<'e, E: SqliteExecutor<'e>>(
    executor: E,
    student_profile_id: i64,
    slot: &WeeklySlot,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO schedule_time_slots (student_profile_id, weekday, from_time, to_time, created_date)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(student_profile_id)
    .bind(slot.weekday as i64)
    .bind(slot.from)
    .bind(slot.to)
    .bind(time::now())
    .execute(executor)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<ScheduleTimeSlot>> {
    sqlx::query_as::<_, ScheduleTimeSlot>(&format!(
        "SELECT {COLUMNS} FROM schedule_time_slots WHERE id = ? AND is_deleted = 0"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn for_profile(pool: &SqlitePool, student_profile_id: i64) -> sqlx::Result<Vec<ScheduleTimeSlot>> {
    sqlx::query_as::<_, ScheduleTimeSlot>(&format!(
        "SELECT {COLUMNS} FROM schedule_time_slots \
         WHERE student_profile_id = ? AND is_deleted = 0 \
         ORDER BY weekday, from_time"
    ))
    .bind(student_profile_id)
    .fetch_all(pool)
    .await
}

/// Slots the tutor is already committed to: profiles still pending or teaching
///
/// `except_slot` leaves one slot out, for updates.
pub async fn committed_for_tutor(
    pool: &SqlitePool,
    tutor_id: i64,
    except_slot: Option<i64>,
) -> sqlx::Result<Vec<ScheduleTimeSlot>> {
    sqlx::query_as::<_, ScheduleTimeSlot>(
        r#"
        SELECT s.id, s.student_profile_id, s.weekday, s.from_time, s.to_time,
               s.created_date, s.updated_date
        FROM schedule_time_slots s
        JOIN student_profiles sp ON sp.id = s.student_profile_id
        WHERE sp.tutor_id = ?1
          AND sp.status IN ('PENDING', 'TEACHING')
          AND s.is_deleted = 0
          AND (?2 IS NULL OR s.id != ?2)
        "#,
    )
    .bind(tutor_id)
    .bind(except_slot)
    .fetch_all(pool)
    .await
}

pub async fn update<'e, E: SqliteExecutor<'e>>(executor: E, id: i64, slot: &WeeklySlot) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        UPDATE schedule_time_slots
        SET weekday = ?, from_time = ?, to_time = ?, updated_date = ?
        WHERE id = ?
        "#,
    )
    .bind(slot.weekday as i64)
    .bind(slot.from)
    .bind(slot.to)
    .bind(time::now())
    .bind(id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn soft_delete<'e, E: SqliteExecutor<'e>>(executor: E, id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE schedule_time_slots SET is_deleted = 1, updated_date = ? WHERE id = ?")
        .bind(time::now())
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}
