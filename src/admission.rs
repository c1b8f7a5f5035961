//! Admission workflow: room allocation, patient intake, and the
//! AI-drafted initial treatment plan.
//!
//! Admission and plan drafting are separate steps on purpose. A failed
//! generation leaves the patient admitted with no medications; the plan
//! can be drafted again later.

use chrono::NaiveDateTime;
use regex::Regex;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::repository::{get_patient, insert_medication, insert_patient, occupied_rooms};
use crate::db::DatabaseError;
use crate::llm::{ChatTurn, LlmError, TextClient};
use crate::models::{Medication, Patient};
use crate::schedule::MAX_FREQUENCY_HOURS;

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Room {0} is not available")]
    RoomUnavailable(String),

    #[error("No patient with id {0}")]
    PatientNotFound(Uuid),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Every room in the ward: floors 1 to 5, twenty rooms per floor,
/// numbered "101" through "520".
pub fn room_catalog() -> Vec<String> {
    let mut rooms = Vec::with_capacity(100);
    for floor in 1..=5 {
        for room in 1..=20 {
            rooms.push(format!("{floor}{room:02}"));
        }
    }
    rooms
}

/// Catalog rooms not currently holding a patient, in catalog order.
pub fn available_rooms(conn: &Connection) -> Result<Vec<String>, DatabaseError> {
    let occupied = occupied_rooms(conn)?;
    Ok(room_catalog()
        .into_iter()
        .filter(|room| !occupied.contains(room))
        .collect())
}

/// Admit a patient into a free room. Fails when the room is occupied
/// or not in the catalog.
pub fn admit(
    conn: &Connection,
    name: &str,
    age: u32,
    condition: &str,
    room: &str,
    now: NaiveDateTime,
) -> Result<Uuid, AdmissionError> {
    if !available_rooms(conn)?.iter().any(|r| r == room) {
        return Err(AdmissionError::RoomUnavailable(room.to_string()));
    }

    let patient = Patient {
        id: Uuid::new_v4(),
        name: name.to_string(),
        age,
        condition: condition.to_string(),
        room: room.to_string(),
        admitted_at: now,
    };
    insert_patient(conn, &patient)?;
    tracing::info!(patient = %patient.id, room, "patient admitted");
    Ok(patient.id)
}

/// A medication line extracted from a drafted plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMedication {
    pub name: String,
    pub dosage: String,
    pub frequency_hours: i64,
}

/// The single-turn prompt asking for a severity assessment and an
/// initial prescription in a machine-readable line format.
pub fn treatment_plan_prompt(patient: &Patient) -> String {
    format!(
        "You are a senior physician drafting the initial treatment plan for a newly \
         admitted hospital patient.\n\n\
         Patient: {}\nAge: {}\nCondition: {}\n\n\
         Respond with exactly two sections.\n\n\
         1. SEVERITY: one of Mild, Moderate, Severe or Critical, with a one-sentence \
         justification.\n\n\
         2. MEDICATIONS: 2 to 3 initial medications, one per line, each in exactly \
         this format:\n\
         Medication: <name>, Dosage: <dose>, Frequency: <hours> hours",
        patient.name, patient.age, patient.condition
    )
}

/// Pull the medication lines out of a drafted plan. Lines not matching
/// the expected format, or with a frequency outside the projectable
/// range, are ignored rather than failing the draft.
pub fn parse_treatment_plan(plan: &str) -> Vec<PlannedMedication> {
    let line = Regex::new(r"Medication: (.*), Dosage: (.*), Frequency: (\d+) hours").unwrap();
    line.captures_iter(plan)
        .filter_map(|caps| {
            let frequency_hours: i64 = caps[3].parse().ok()?;
            if !(1..=MAX_FREQUENCY_HOURS).contains(&frequency_hours) {
                tracing::warn!(frequency_hours, "dropping plan line with unusable frequency");
                return None;
            }
            Some(PlannedMedication {
                name: caps[1].trim().to_string(),
                dosage: caps[2].trim().to_string(),
                frequency_hours,
            })
        })
        .collect()
}

/// Draft a treatment plan for an admitted patient and persist whatever
/// medications the plan proposes, each starting now. Returns the full
/// plan text for display.
pub fn draft_treatment_plan(
    conn: &Connection,
    client: &impl TextClient,
    patient_id: &Uuid,
    now: NaiveDateTime,
) -> Result<String, AdmissionError> {
    let patient =
        get_patient(conn, patient_id)?.ok_or(AdmissionError::PatientNotFound(*patient_id))?;

    let prompt = treatment_plan_prompt(&patient);
    let plan = client.generate(&[ChatTurn::user(prompt)])?;

    let planned = parse_treatment_plan(&plan);
    tracing::info!(
        patient = %patient_id,
        medications = planned.len(),
        "treatment plan drafted"
    );
    for item in planned {
        insert_medication(
            conn,
            &Medication {
                id: Uuid::new_v4(),
                patient_id: *patient_id,
                name: item.name,
                dosage: item.dosage,
                started_at: now,
                frequency_hours: Some(item.frequency_hours),
            },
        )?;
    }

    Ok(plan)
}
