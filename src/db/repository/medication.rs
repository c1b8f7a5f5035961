use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::Medication;

use super::{parse_timestamp, parse_uuid};

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, patient_id, name, dosage, started_at, frequency_hours)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            med.id.to_string(),
            med.patient_id.to_string(),
            med.name,
            med.dosage,
            med.started_at.to_string(),
            med.frequency_hours,
        ],
    )?;
    Ok(())
}

pub fn get_medications_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, name, dosage, started_at, frequency_hours
         FROM medications WHERE patient_id = ?1 ORDER BY started_at ASC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], |row| Ok(medication_row(row)))?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row??)?);
    }
    Ok(meds)
}

/// Mark a medication as discontinued (clears the frequency, which removes
/// it from the schedule while keeping it on the record).
pub fn discontinue_medication(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let rows_affected = conn.execute(
        "UPDATE medications SET frequency_hours = NULL WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(rows_affected > 0)
}

// Internal row type for Medication mapping
struct MedicationRow {
    id: String,
    patient_id: String,
    name: String,
    dosage: String,
    started_at: String,
    frequency_hours: Option<i64>,
}

fn medication_row(row: &rusqlite::Row<'_>) -> Result<MedicationRow, rusqlite::Error> {
    Ok(MedicationRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        name: row.get(2)?,
        dosage: row.get(3)?,
        started_at: row.get(4)?,
        frequency_hours: row.get(5)?,
    })
}

fn medication_from_row(row: MedicationRow) -> Result<Medication, DatabaseError> {
    Ok(Medication {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        name: row.name,
        dosage: row.dosage,
        started_at: parse_timestamp(&row.started_at)?,
        frequency_hours: row.frequency_hours,
    })
}
