use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{ChatMessage, Sender};

use super::{parse_timestamp, parse_uuid};

pub fn insert_chat_message(conn: &Connection, msg: &ChatMessage) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO chat_messages (id, patient_id, sender, text, sent_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            msg.id.to_string(),
            msg.patient_id.to_string(),
            msg.sender.as_str(),
            msg.text,
            msg.sent_at.to_string(),
        ],
    )?;
    Ok(())
}

/// Chat history for a patient, oldest first (conversation replay order).
pub fn get_chat_by_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<ChatMessage>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, sender, text, sent_at
         FROM chat_messages WHERE patient_id = ?1 ORDER BY sent_at ASC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut messages = Vec::new();
    for row in rows {
        let (id, patient_id, sender, text, sent_at) = row?;
        messages.push(ChatMessage {
            id: parse_uuid(&id)?,
            patient_id: parse_uuid(&patient_id)?,
            sender: Sender::from_str(&sender)?,
            text,
            sent_at: parse_timestamp(&sent_at)?,
        });
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::repository::insert_patient;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Patient;

    fn make_patient(conn: &Connection) -> Uuid {
        let patient = Patient {
            id: Uuid::new_v4(),
            name: "Test".into(),
            age: 50,
            condition: "Observation".into(),
            room: "101".into(),
            admitted_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        };
        insert_patient(conn, &patient).unwrap();
        patient.id
    }

    fn message_at(patient_id: Uuid, sender: Sender, text: &str, minute: u32) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            patient_id,
            sender,
            text: text.into(),
            sent_at: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(14, minute, 0)
                .unwrap(),
        }
    }

    #[test]
    fn history_replays_oldest_first() {
        let conn = open_memory_database().unwrap();
        let patient_id = make_patient(&conn);

        insert_chat_message(
            &conn,
            &message_at(patient_id, Sender::Assistant, "The usual dose is 1g.", 5),
        )
        .unwrap();
        insert_chat_message(
            &conn,
            &message_at(patient_id, Sender::Nurse, "What is the ceftriaxone dose?", 3),
        )
        .unwrap();

        let history = get_chat_by_patient(&conn, &patient_id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, Sender::Nurse);
        assert_eq!(history[1].sender, Sender::Assistant);
    }

    #[test]
    fn history_is_per_patient() {
        let conn = open_memory_database().unwrap();
        let first = make_patient(&conn);
        let second = make_patient(&conn);

        insert_chat_message(&conn, &message_at(first, Sender::Nurse, "Hello", 0)).unwrap();

        assert_eq!(get_chat_by_patient(&conn, &first).unwrap().len(), 1);
        assert!(get_chat_by_patient(&conn, &second).unwrap().is_empty());
    }
}
