//! Weekly time slots and concrete session generation
//!
//! A student profile has weekly slots (weekday + time interval). Sessions are
//! materialized from those slots for a rolling window: today through the
//! Sunday that ends next week (weeks start on Monday). Generation is
//! idempotent per (slot, date), so the background generator can rerun it as
//! often as it likes.

use chrono::{Duration, NaiveDate, NaiveTime};
use sqlx::SqlitePool;
use std::time::Duration as StdDuration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use tutorhub_common::events::{EventBus, TutorHubEvent};
use tutorhub_common::time;

use crate::db::{schedules, student_profiles, time_slots};

/// One weekly recurring interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySlot {
    /// 0 = Sunday … 6 = Saturday
    pub weekday: u8,
    pub from: NaiveTime,
    pub to: NaiveTime,
}

/// Why a slot is invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    InvalidWeekday,
    InvalidTimeRange,
}

impl WeeklySlot {
    pub fn new(weekday: i64, from: NaiveTime, to: NaiveTime) -> Result<Self, SlotError> {
        if !(0..=6).contains(&weekday) {
            return Err(SlotError::InvalidWeekday);
        }
        if from >= to {
            return Err(SlotError::InvalidTimeRange);
        }
        Ok(Self {
            weekday: weekday as u8,
            from,
            to,
        })
    }

    /// Same weekday and intersecting intervals; touching ends do not overlap
    pub fn overlaps(&self, other: &WeeklySlot) -> bool {
        self.weekday == other.weekday && intervals_overlap(self.from, self.to, other.from, other.to)
    }

    /// `Wed 09:00-10:00` style label used in error messages
    pub fn label(&self) -> String {
        const DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
        format!(
            "{} {}-{}",
            DAYS[self.weekday as usize],
            self.from.format("%H:%M"),
            self.to.format("%H:%M")
        )
    }
}

/// Half-open interval intersection
pub fn intervals_overlap(a_from: NaiveTime, a_to: NaiveTime, b_from: NaiveTime, b_to: NaiveTime) -> bool {
    a_from < b_to && b_from < a_to
}

/// First slot in `slots` that overlaps another slot of the same list
pub fn find_internal_overlap(slots: &[WeeklySlot]) -> Option<WeeklySlot> {
    slots.iter().enumerate().find_map(|(i, a)| {
        slots[i + 1..]
            .iter()
            .any(|b| a.overlaps(b))
            .then_some(*a)
    })
}

/// First slot in `candidates` that overlaps one of `existing`
pub fn find_conflict(candidates: &[WeeklySlot], existing: &[WeeklySlot]) -> Option<WeeklySlot> {
    candidates
        .iter()
        .find(|c| existing.iter().any(|e| c.overlaps(e)))
        .copied()
}

/// A session to create from a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedSession {
    pub slot_id: i64,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Expand weekly slots into one session per matching date in `[from, to]`
pub fn materialize(slots: &[(i64, WeeklySlot)], from: NaiveDate, to: NaiveDate) -> Vec<PlannedSession> {
    let mut sessions = Vec::new();
    let mut date = from;
    while date <= to {
        let weekday = time::weekday_index(date);
        for (slot_id, slot) in slots {
            if slot.weekday == weekday {
                sessions.push(PlannedSession {
                    slot_id: *slot_id,
                    date,
                    start: slot.from,
                    end: slot.to,
                });
            }
        }
        date += Duration::days(1);
    }
    sessions
}

/// Today through the Sunday that ends next week
pub fn generation_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today, time::week_end(today) + Duration::days(7))
}

/// Create the missing sessions of one profile for the window starting `today`
///
/// Returns the number of sessions inserted.
pub async fn generate_for_profile(pool: &SqlitePool, profile_id: i64, today: NaiveDate) -> sqlx::Result<u64> {
    let Some(profile) = student_profiles::find_by_id(pool, profile_id).await? else {
        return Ok(0);
    };

    let slots: Vec<(i64, WeeklySlot)> = time_slots::for_profile(pool, profile_id)
        .await?
        .into_iter()
        .filter_map(|s| s.weekly().ok().map(|w| (s.id, w)))
        .collect();

    let (from, to) = generation_window(today);
    let mut inserted = 0;
    for session in materialize(&slots, from, to) {
        inserted += schedules::insert_generated(pool, profile.tutor_id, profile_id, &session).await?;
    }

    if inserted > 0 {
        debug!(
            "Generated {} sessions for student profile {} ({} to {})",
            inserted, profile_id, from, to
        );
    }
    Ok(inserted)
}

/// Regenerate the window for every teaching profile
pub async fn generate_all(pool: &SqlitePool, event_bus: &EventBus, today: NaiveDate) -> sqlx::Result<u64> {
    let mut total = 0;
    for profile_id in student_profiles::teaching_ids(pool).await? {
        let inserted = generate_for_profile(pool, profile_id, today).await?;
        if inserted > 0 {
            notify_schedules_changed(pool, event_bus, profile_id).await?;
        }
        total += inserted;
    }
    Ok(total)
}

/// Push a calendar refresh to the tutor and the parent of a profile
pub async fn notify_schedules_changed(
    pool: &SqlitePool,
    event_bus: &EventBus,
    profile_id: i64,
) -> sqlx::Result<()> {
    if let Some(profile) = student_profiles::find_by_id(pool, profile_id).await? {
        event_bus.emit_lossy(TutorHubEvent::SchedulesChanged {
            student_profile_id: profile_id,
            receiver_ids: vec![profile.tutor_id, profile.parent_id],
            timestamp: time::now(),
        });
    }
    Ok(())
}

/// Spawn the periodic generator task
pub fn spawn_generator(pool: SqlitePool, event_bus: EventBus, interval_minutes: u64) -> JoinHandle<()> {
    let period = StdDuration::from_secs(interval_minutes.max(1) * 60);
    info!("Schedule generator running every {} minutes", interval_minutes.max(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match generate_all(&pool, &event_bus, time::today()).await {
                Ok(0) => debug!("Schedule generator: nothing to create"),
                Ok(count) => info!("Schedule generator created {} sessions", count),
                Err(e) => error!("Schedule generator failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_slot_validation() {
        assert_eq!(WeeklySlot::new(7, t(9, 0), t(10, 0)), Err(SlotError::InvalidWeekday));
        assert_eq!(WeeklySlot::new(-1, t(9, 0), t(10, 0)), Err(SlotError::InvalidWeekday));
        assert_eq!(WeeklySlot::new(1, t(10, 0), t(10, 0)), Err(SlotError::InvalidTimeRange));
        assert!(WeeklySlot::new(0, t(9, 0), t(10, 0)).is_ok());
    }

    #[test]
    fn test_overlap_rules() {
        let a = WeeklySlot::new(1, t(9, 0), t(10, 0)).unwrap();
        let b = WeeklySlot::new(1, t(9, 30), t(11, 0)).unwrap();
        let touching = WeeklySlot::new(1, t(10, 0), t(11, 0)).unwrap();
        let other_day = WeeklySlot::new(2, t(9, 0), t(10, 0)).unwrap();

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&touching));
        assert!(!a.overlaps(&other_day));
    }

    #[test]
    fn test_internal_overlap_detected() {
        let slots = [
            WeeklySlot::new(3, t(8, 0), t(9, 0)).unwrap(),
            WeeklySlot::new(5, t(8, 0), t(9, 0)).unwrap(),
            WeeklySlot::new(3, t(8, 30), t(9, 30)).unwrap(),
        ];
        assert_eq!(find_internal_overlap(&slots), Some(slots[0]));
        assert_eq!(find_internal_overlap(&slots[..2]), None);
    }

    #[test]
    fn test_conflict_with_existing() {
        let existing = [WeeklySlot::new(4, t(14, 0), t(15, 0)).unwrap()];
        let ok = [WeeklySlot::new(4, t(15, 0), t(16, 0)).unwrap()];
        let clash = [WeeklySlot::new(4, t(14, 30), t(15, 30)).unwrap()];
        assert_eq!(find_conflict(&ok, &existing), None);
        assert_eq!(find_conflict(&clash, &existing), Some(clash[0]));
    }

    #[test]
    fn test_materialize_one_session_per_matching_day() {
        // 2026-10-19 is a Monday
        let monday = WeeklySlot::new(1, t(9, 0), t(10, 0)).unwrap();
        let saturday = WeeklySlot::new(6, t(15, 0), t(16, 30)).unwrap();
        let sessions = materialize(&[(1, monday), (2, saturday)], d(2026, 10, 19), d(2026, 11, 1));

        assert_eq!(sessions.len(), 4);
        assert_eq!(
            sessions.iter().filter(|s| s.slot_id == 1).map(|s| s.date).collect::<Vec<_>>(),
            vec![d(2026, 10, 19), d(2026, 10, 26)]
        );
        assert_eq!(
            sessions.iter().filter(|s| s.slot_id == 2).map(|s| s.date).collect::<Vec<_>>(),
            vec![d(2026, 10, 24), d(2026, 10, 31)]
        );
        assert!(sessions.iter().all(|s| time::weekday_index(s.date) == if s.slot_id == 1 { 1 } else { 6 }));
    }

    #[test]
    fn test_materialize_empty_window() {
        let slot = WeeklySlot::new(1, t(9, 0), t(10, 0)).unwrap();
        assert!(materialize(&[(1, slot)], d(2026, 10, 20), d(2026, 10, 19)).is_empty());
    }

    #[test]
    fn test_generation_window_ends_next_sunday() {
        // Wednesday 2026-10-21 → Sunday 2026-11-01
        assert_eq!(generation_window(d(2026, 10, 21)), (d(2026, 10, 21), d(2026, 11, 1)));
        // Sunday 2026-10-25 → Sunday 2026-11-01
        assert_eq!(generation_window(d(2026, 10, 25)), (d(2026, 10, 25), d(2026, 11, 1)));
    }

    #[test]
    fn test_slot_label() {
        let slot = WeeklySlot::new(3, t(9, 0), t(10, 15)).unwrap();
        assert_eq!(slot.label(), "Wed 09:00-10:15");
    }
}
