//! Core data model: a patient and the records that hang off it.
//!
//! A `Patient` owns its `Medication`s, `EvolutionNote`s and `ChatMessage`s;
//! deleting the patient cascades to all three (enforced by the schema).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub age: u32,
    /// Admitting condition, free text.
    pub condition: String,
    /// Room label, e.g. "101" (floor 1, room 01).
    pub room: String,
    pub admitted_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub dosage: String,
    pub started_at: NaiveDateTime,
    /// `None` marks a one-off or discontinued entry, excluded from scheduling.
    pub frequency_hours: Option<i64>,
}

impl Medication {
    /// Scheduled medications are the ones with a recurring frequency.
    pub fn is_scheduled(&self) -> bool {
        self.frequency_hours.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionNote {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub recorded_at: NaiveDateTime,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub sent_at: NaiveDateTime,
}

/// Who produced a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    Nurse,
    Assistant,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nurse => "nurse",
            Self::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Sender {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nurse" => Ok(Self::Nurse),
            "assistant" => Ok(Self::Assistant),
            _ => Err(DatabaseError::InvalidEnum {
                field: "sender".into(),
                value: s.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn sender_round_trips() {
        assert_eq!(Sender::from_str("nurse").unwrap(), Sender::Nurse);
        assert_eq!(Sender::from_str("assistant").unwrap(), Sender::Assistant);
        assert_eq!(Sender::Nurse.as_str(), "nurse");
        assert_eq!(Sender::Assistant.as_str(), "assistant");
    }

    #[test]
    fn sender_rejects_unknown_value() {
        let err = Sender::from_str("doctor").unwrap_err();
        assert!(err.to_string().contains("sender"));
    }

    #[test]
    fn medication_scheduled_flag() {
        let mut med = Medication {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            name: "Ceftriaxone".into(),
            dosage: "1g".into(),
            started_at: chrono::Local::now().naive_local(),
            frequency_hours: Some(12),
        };
        assert!(med.is_scheduled());

        med.frequency_hours = None;
        assert!(!med.is_scheduled());
    }
}
