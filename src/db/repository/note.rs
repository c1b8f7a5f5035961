use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::EvolutionNote;

use super::{parse_timestamp, parse_uuid};

pub fn insert_note(conn: &Connection, note: &EvolutionNote) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO evolution_notes (id, patient_id, recorded_at, note)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            note.id.to_string(),
            note.patient_id.to_string(),
            note.recorded_at.to_string(),
            note.note,
        ],
    )?;
    Ok(())
}

/// Evolution notes for a patient, newest first (display order).
pub fn get_notes_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<EvolutionNote>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, recorded_at, note
         FROM evolution_notes WHERE patient_id = ?1 ORDER BY recorded_at DESC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut notes = Vec::new();
    for row in rows {
        let (id, patient_id, recorded_at, note) = row?;
        notes.push(EvolutionNote {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient_id)?,
            recorded_at: parse_timestamp(&recorded_at)?,
            note,
        });
    }
    Ok(notes)
}
