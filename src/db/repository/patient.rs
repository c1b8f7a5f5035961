use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{EvolutionNote, Medication, Patient};

use super::{parse_timestamp, parse_uuid};

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, name, age, condition, room, admitted_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            patient.id.to_string(),
            patient.name,
            patient.age,
            patient.condition,
            patient.room,
            patient.admitted_at.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name, age, condition, room, admitted_at
         FROM patients WHERE id = ?1",
        params![id.to_string()],
        patient_row,
    );

    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All patients, ordered by name for display.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, age, condition, room, admitted_at
         FROM patients ORDER BY name ASC",
    )?;

    let rows = stmt.query_map([], |row| Ok(patient_row(row)))?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row??)?);
    }
    Ok(patients)
}

/// Delete a patient. The schema cascades to medications, notes and chat.
/// Returns false when no such patient exists.
pub fn delete_patient(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let rows_affected = conn.execute(
        "DELETE FROM patients WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(rows_affected > 0)
}

/// Rooms currently holding a patient.
pub fn occupied_rooms(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT room FROM patients")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Insert a patient together with initial medications and notes.
/// Issues the individual inserts; every statement auto-commits.
pub fn insert_patient_with_records(
    conn: &Connection,
    patient: &Patient,
    medications: &[Medication],
    notes: &[EvolutionNote],
) -> Result<(), DatabaseError> {
    insert_patient(conn, patient)?;
    for medication in medications {
        super::insert_medication(conn, medication)?;
    }
    for note in notes {
        super::insert_note(conn, note)?;
    }
    Ok(())
}

pub fn count_patients(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
    Ok(count)
}

/// A patient's full record card: identity plus medications and notes.
#[derive(Debug, Clone)]
pub struct PatientDetails {
    pub patient: Patient,
    pub medications: Vec<Medication>,
    pub notes: Vec<EvolutionNote>,
}

/// Fetch everything the record card / chat preamble needs in one call.
/// Notes come back newest-first (display order).
pub fn get_patient_details(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<PatientDetails>, DatabaseError> {
    let Some(patient) = get_patient(conn, id)? else {
        return Ok(None);
    };
    let medications = super::get_medications_by_patient(conn, id)?;
    let notes = super::get_notes_by_patient(conn, id)?;
    Ok(Some(PatientDetails {
        patient,
        medications,
        notes,
    }))
}

// Internal row type for Patient mapping
struct PatientRow {
    id: String,
    name: String,
    age: u32,
    condition: String,
    room: String,
    admitted_at: String,
}

fn patient_row(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        condition: row.get(3)?,
        room: row.get(4)?,
        admitted_at: row.get(5)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        name: row.name,
        age: row.age,
        condition: row.condition,
        room: row.room,
        admitted_at: parse_timestamp(&row.admitted_at)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn sample_patient(name: &str, room: &str) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            name: name.into(),
            age: 68,
            condition: "Severe pneumonia".into(),
            room: room.into(),
            admitted_at: NaiveDate::from_ymd_opt(2024, 3, 10)
                .unwrap()
                .and_hms_opt(8, 30, 0)
                .unwrap(),
        }
    }

    #[test]
    fn insert_and_retrieve_patient() {
        let conn = open_memory_database().unwrap();
        let patient = sample_patient("Joao da Silva", "101");
        insert_patient(&conn, &patient).unwrap();

        let loaded = get_patient(&conn, &patient.id).unwrap().unwrap();
        assert_eq!(loaded.name, "Joao da Silva");
        assert_eq!(loaded.age, 68);
        assert_eq!(loaded.room, "101");
        assert_eq!(loaded.admitted_at, patient.admitted_at);
    }

    #[test]
    fn get_missing_patient_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_patient(&conn, &Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_is_ordered_by_name() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &sample_patient("Maria Oliveira", "205")).unwrap();
        insert_patient(&conn, &sample_patient("Ana Costa", "415")).unwrap();
        insert_patient(&conn, &sample_patient("Carlos Pereira", "310")).unwrap();

        let patients = list_patients(&conn).unwrap();
        let names: Vec<_> = patients.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Ana Costa", "Carlos Pereira", "Maria Oliveira"]);
    }

    #[test]
    fn occupied_rooms_lists_all() {
        let conn = open_memory_database().unwrap();
        insert_patient(&conn, &sample_patient("A", "101")).unwrap();
        insert_patient(&conn, &sample_patient("B", "205")).unwrap();

        let mut rooms = occupied_rooms(&conn).unwrap();
        rooms.sort();
        assert_eq!(rooms, ["101", "205"]);
    }

    #[test]
    fn delete_patient_reports_outcome() {
        let conn = open_memory_database().unwrap();
        let patient = sample_patient("A", "101");
        insert_patient(&conn, &patient).unwrap();

        assert!(delete_patient(&conn, &patient.id).unwrap());
        assert!(!delete_patient(&conn, &patient.id).unwrap());
        assert_eq!(count_patients(&conn).unwrap(), 0);
    }

    #[test]
    fn delete_cascades_to_all_owned_records() {
        let conn = open_memory_database().unwrap();
        let patient = sample_patient("A", "101");
        insert_patient(&conn, &patient).unwrap();

        crate::db::repository::insert_medication(
            &conn,
            &crate::models::Medication {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                name: "Ceftriaxone".into(),
                dosage: "1g".into(),
                started_at: patient.admitted_at,
                frequency_hours: Some(12),
            },
        )
        .unwrap();
        crate::db::repository::insert_note(
            &conn,
            &crate::models::EvolutionNote {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                recorded_at: patient.admitted_at,
                note: "Stable overnight.".into(),
            },
        )
        .unwrap();
        crate::db::repository::insert_chat_message(
            &conn,
            &crate::models::ChatMessage {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                sender: crate::models::Sender::Nurse,
                text: "Any allergies on record?".into(),
                sent_at: patient.admitted_at,
            },
        )
        .unwrap();

        assert!(delete_patient(&conn, &patient.id).unwrap());

        for table in ["medications", "evolution_notes", "chat_messages"] {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE patient_id = ?1"),
                    params![patient.id.to_string()],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 0, "{table} rows survived the cascade");
        }
    }

    #[test]
    fn full_record_insert_writes_all_parts() {
        let conn = open_memory_database().unwrap();
        let patient = sample_patient("A", "101");
        let medication = crate::models::Medication {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            name: "Ceftriaxone".into(),
            dosage: "1g".into(),
            started_at: patient.admitted_at,
            frequency_hours: Some(12),
        };
        let note = crate::models::EvolutionNote {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            recorded_at: patient.admitted_at,
            note: "Admitted overnight.".into(),
        };

        insert_patient_with_records(&conn, &patient, &[medication], &[note]).unwrap();

        let details = get_patient_details(&conn, &patient.id).unwrap().unwrap();
        assert_eq!(details.medications.len(), 1);
        assert_eq!(details.notes.len(), 1);
    }

    #[test]
    fn details_for_missing_patient_is_none() {
        let conn = open_memory_database().unwrap();
        assert!(get_patient_details(&conn, &Uuid::new_v4()).unwrap().is_none());
    }
}
