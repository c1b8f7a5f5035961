//! Demo ward data, loaded on first run against an empty database.

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::repository::{count_patients, insert_patient_with_records};
use crate::db::DatabaseError;
use crate::models::{EvolutionNote, Medication, Patient};

struct SeedPatient {
    name: &'static str,
    age: u32,
    condition: &'static str,
    room: &'static str,
    admitted_hours_ago: i64,
    medications: &'static [(&'static str, &'static str, i64)],
    note: &'static str,
}

const WARD: &[SeedPatient] = &[
    SeedPatient {
        name: "Joao da Silva",
        age: 68,
        condition: "Severe pneumonia",
        room: "101",
        admitted_hours_ago: 48,
        medications: &[("Ceftriaxone", "1g IV", 12), ("Dipyrone", "1g", 6)],
        note: "Oxygen saturation improving on supplemental O2. Fever trending down.",
    },
    SeedPatient {
        name: "Maria Oliveira",
        age: 75,
        condition: "Femur fracture, post-surgical",
        room: "205",
        admitted_hours_ago: 72,
        medications: &[("Morphine", "10mg", 4), ("Clexane", "40mg SC", 24)],
        note: "Surgical wound clean and dry. Pain controlled, mobilizing with assistance.",
    },
    SeedPatient {
        name: "Carlos Pereira",
        age: 55,
        condition: "Acute myocardial infarction",
        room: "310",
        admitted_hours_ago: 24,
        medications: &[("ASA", "100mg", 24), ("Clopidogrel", "75mg", 24)],
        note: "Hemodynamically stable post-angioplasty. Continuous cardiac monitoring.",
    },
    SeedPatient {
        name: "Ana Costa",
        age: 42,
        condition: "Moderate asthma crisis",
        room: "415",
        admitted_hours_ago: 12,
        medications: &[("Prednisone", "40mg", 12), ("Salbutamol", "2 puffs", 4)],
        note: "Wheezing reduced after nebulization. Peak flow improving.",
    },
    SeedPatient {
        name: "Jose Santos",
        age: 81,
        condition: "Urinary tract infection",
        room: "520",
        admitted_hours_ago: 36,
        medications: &[("Ciprofloxacin", "500mg", 12)],
        note: "Afebrile for 12 hours. Urine culture pending.",
    },
];

/// Load the demo ward when the database holds no patients at all.
/// Safe to call on every startup.
pub fn seed_if_empty(conn: &Connection, now: NaiveDateTime) -> Result<bool, DatabaseError> {
    if count_patients(conn)? > 0 {
        return Ok(false);
    }

    for seed in WARD {
        let admitted_at = now - Duration::hours(seed.admitted_hours_ago);
        let patient = Patient {
            id: Uuid::new_v4(),
            name: seed.name.to_string(),
            age: seed.age,
            condition: seed.condition.to_string(),
            room: seed.room.to_string(),
            admitted_at,
        };
        let medications: Vec<Medication> = seed
            .medications
            .iter()
            .map(|(name, dosage, frequency_hours)| Medication {
                id: Uuid::new_v4(),
                patient_id: patient.id,
                name: name.to_string(),
                dosage: dosage.to_string(),
                started_at: admitted_at,
                frequency_hours: Some(*frequency_hours),
            })
            .collect();
        let note = EvolutionNote {
            id: Uuid::new_v4(),
            patient_id: patient.id,
            recorded_at: admitted_at + Duration::hours(2),
            note: seed.note.to_string(),
        };

        insert_patient_with_records(conn, &patient, &medications, &[note])?;
    }

    tracing::info!(patients = WARD.len(), "seeded demo ward");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::repository::{get_medications_by_patient, list_patients};
    use crate::db::sqlite::open_memory_database;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn seeds_five_patients_into_an_empty_ward() {
        let conn = open_memory_database().unwrap();
        assert!(seed_if_empty(&conn, noon()).unwrap());

        let patients = list_patients(&conn).unwrap();
        assert_eq!(patients.len(), 5);
        assert!(patients.iter().all(|p| p.admitted_at < noon()));

        let joao = patients.iter().find(|p| p.name == "Joao da Silva").unwrap();
        assert_eq!(joao.room, "101");
        let meds = get_medications_by_patient(&conn, &joao.id).unwrap();
        assert_eq!(meds.len(), 2);
        assert!(meds.iter().all(|m| m.is_scheduled()));
    }

    #[test]
    fn seeding_is_idempotent() {
        let conn = open_memory_database().unwrap();
        assert!(seed_if_empty(&conn, noon()).unwrap());
        assert!(!seed_if_empty(&conn, noon()).unwrap());
        assert_eq!(list_patients(&conn).unwrap().len(), 5);
    }

    #[test]
    fn a_partially_filled_ward_is_left_alone() {
        let conn = open_memory_database().unwrap();
        crate::admission::admit(&conn, "Walk-in", 30, "Observation", "118", noon()).unwrap();

        assert!(!seed_if_empty(&conn, noon()).unwrap());
        assert_eq!(list_patients(&conn).unwrap().len(), 1);
    }
}
