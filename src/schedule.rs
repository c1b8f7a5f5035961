//! Dose projection — the next-24h medication schedule.
//!
//! A medication's next dose is never persisted; it is a pure function of
//! (treatment start, frequency, current time) recomputed on every read.
//! `now` is always a parameter so the projection stays deterministic.

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::DatabaseError;

/// How far ahead the schedule looks.
pub const LOOKAHEAD_HOURS: i64 = 24;

/// Longest dosing interval the schedule will project: one year. Anything
/// above this is not a meaningful frequency and would overflow the
/// projection arithmetic long before it ever fell inside the window.
pub const MAX_FREQUENCY_HOURS: i64 = 8760;

/// A projected administration, joined with the patient for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueDose {
    pub patient_name: String,
    pub room: String,
    pub medication: String,
    pub dosage: String,
    pub due_at: NaiveDateTime,
}

/// Next administration time for a medication started at `started_at` and
/// given every `frequency_hours` hours, as seen from `now`.
///
/// Before the treatment starts the first dose IS the start time. Afterwards
/// the next dose is the first whole period strictly after `now`, so the
/// result is always >= `now` and monotonically non-decreasing in `now`.
/// `frequency_hours` must lie in `1..=MAX_FREQUENCY_HOURS`; callers enforce
/// the bound before projecting.
pub fn next_dose(
    started_at: NaiveDateTime,
    frequency_hours: i64,
    now: NaiveDateTime,
) -> NaiveDateTime {
    if now < started_at {
        return started_at;
    }
    let elapsed_hours = (now - started_at).num_hours();
    let periods = elapsed_hours / frequency_hours;
    started_at + Duration::hours((periods + 1) * frequency_hours)
}

/// Project every scheduled medication and keep the doses falling in
/// `[now, now + 24h)`, sorted ascending by administration time.
///
/// One-off/discontinued entries (null frequency) are excluded in SQL;
/// rows with a frequency outside `1..=MAX_FREQUENCY_HOURS` cannot be
/// projected and are skipped.
pub fn upcoming_doses(conn: &Connection, now: NaiveDateTime) -> Result<Vec<DueDose>, DatabaseError> {
    let horizon = now + Duration::hours(LOOKAHEAD_HOURS);

    let mut stmt = conn.prepare(
        "SELECT p.name, p.room, m.name, m.dosage, m.started_at, m.frequency_hours
         FROM patients p
         JOIN medications m ON m.patient_id = p.id
         WHERE m.frequency_hours IS NOT NULL",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, i64>(5)?,
        ))
    })?;

    let mut due = Vec::new();
    for row in rows {
        let (patient_name, room, medication, dosage, started_at, frequency_hours) = row?;
        if !(1..=MAX_FREQUENCY_HOURS).contains(&frequency_hours) {
            tracing::warn!(%medication, frequency_hours, "skipping unprojectable frequency");
            continue;
        }
        let started_at = crate::db::repository::parse_timestamp(&started_at)?;
        let due_at = next_dose(started_at, frequency_hours, now);
        if due_at >= now && due_at < horizon {
            due.push(DueDose {
                patient_name,
                room,
                medication,
                dosage,
                due_at,
            });
        }
    }

    due.sort_by(|a, b| a.due_at.cmp(&b.due_at));
    Ok(due)
}
