//! Patient-scoped chat sessions.
//!
//! A session owns the full turn list replayed to the model on every call:
//! a grounding preamble built from the patient's record card, a seeded
//! acknowledgment, then the persisted conversation. Messages are written
//! to the database only after a successful generation, so the replayed
//! history and the stored history never diverge.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::repository::{
    get_chat_by_patient, get_patient_details, insert_chat_message, PatientDetails,
};
use crate::db::DatabaseError;
use crate::llm::{ChatTurn, LlmError, TextClient};
use crate::models::{ChatMessage, EvolutionNote, Medication, Patient, Sender};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("No patient with id {0}")]
    PatientNotFound(Uuid),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Grounding turns prepended to every conversation: the record card as
/// a user turn, then a canned model acknowledgment so the replay always
/// alternates correctly.
pub fn initial_history(
    patient: &Patient,
    medications: &[Medication],
    notes: &[EvolutionNote],
) -> Vec<ChatTurn> {
    let mut context = String::new();
    context.push_str(
        "You are a senior medical assistant supporting the nursing staff of a hospital ward. \
         Use the patient record below as your primary context, supplemented by your general \
         medical knowledge. Be concise and clinically precise.\n\n",
    );
    context.push_str("PATIENT RECORD\n");
    context.push_str(&format!("Name: {}\n", patient.name));
    context.push_str(&format!("Age: {}\n", patient.age));
    context.push_str(&format!("Condition: {}\n", patient.condition));
    context.push_str(&format!("Room: {}\n", patient.room));
    context.push_str(&format!(
        "Admitted: {}\n",
        patient.admitted_at.format("%d/%m/%Y %H:%M")
    ));

    context.push_str("\nCurrent medications:\n");
    let scheduled: Vec<&Medication> = medications.iter().filter(|m| m.is_scheduled()).collect();
    if scheduled.is_empty() {
        context.push_str("None.\n");
    } else {
        for med in scheduled {
            context.push_str(&format!(
                "- {} {}, every {} hours, since {}\n",
                med.name,
                med.dosage,
                med.frequency_hours.unwrap_or_default(),
                med.started_at.format("%d/%m/%Y %H:%M")
            ));
        }
    }

    context.push_str("\nEvolution notes (newest first):\n");
    if notes.is_empty() {
        context.push_str("No evolution notes recorded.\n");
    } else {
        for note in notes {
            context.push_str(&format!(
                "- [{}] {}\n",
                note.recorded_at.format("%d/%m/%Y %H:%M"),
                note.note
            ));
        }
    }

    context.push_str("\nAnswer the nurse's questions.");

    vec![
        ChatTurn::user(context),
        ChatTurn::model(format!(
            "Understood. I am ready to answer questions about patient {}.",
            patient.name
        )),
    ]
}

/// One patient's conversation, ready to replay.
#[derive(Debug, Clone)]
pub struct ChatSession {
    patient_id: Uuid,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    /// Rebuild the session from the record card and the persisted
    /// conversation. The turn list is deterministic for a given database
    /// state, so dropping and resuming a session loses nothing.
    pub fn resume(conn: &Connection, patient_id: &Uuid) -> Result<Self, ChatError> {
        let PatientDetails {
            patient,
            medications,
            notes,
        } = get_patient_details(conn, patient_id)?
            .ok_or(ChatError::PatientNotFound(*patient_id))?;

        let mut history = initial_history(&patient, &medications, &notes);
        for message in get_chat_by_patient(conn, patient_id)? {
            history.push(match message.sender {
                Sender::Nurse => ChatTurn::user(message.text),
                Sender::Assistant => ChatTurn::model(message.text),
            });
        }

        Ok(Self {
            patient_id: *patient_id,
            history,
        })
    }

    pub fn patient_id(&self) -> &Uuid {
        &self.patient_id
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Ask a question. On success the exchange is persisted and appended
    /// to the replay list; on failure the session is rolled back to its
    /// previous state and nothing is written.
    pub fn send(
        &mut self,
        conn: &Connection,
        question: &str,
        now: NaiveDateTime,
        client: &impl TextClient,
    ) -> Result<String, ChatError> {
        self.history.push(ChatTurn::user(question));

        let reply = match client.generate(&self.history) {
            Ok(reply) => reply,
            Err(e) => {
                self.history.pop();
                return Err(e.into());
            }
        };

        insert_chat_message(
            conn,
            &ChatMessage {
                id: Uuid::new_v4(),
                patient_id: self.patient_id,
                sender: Sender::Nurse,
                text: question.to_string(),
                sent_at: now,
            },
        )?;
        insert_chat_message(
            conn,
            &ChatMessage {
                id: Uuid::new_v4(),
                patient_id: self.patient_id,
                sender: Sender::Assistant,
                text: reply.clone(),
                sent_at: now,
            },
        )?;

        self.history.push(ChatTurn::model(reply.clone()));
        Ok(reply)
    }
}

/// Result of a background send: the session and connection come back
/// with the outcome so the caller regains ownership either way.
pub struct SendOutcome {
    pub session: ChatSession,
    pub conn: Connection,
    pub reply: Result<String, ChatError>,
}

/// Run `send` on a worker thread so a slow generation never blocks the
/// caller. The session and connection move into the thread and the
/// session is returned through the channel with the outcome.
pub fn send_in_background<C>(
    mut session: ChatSession,
    conn: Connection,
    question: String,
    now: NaiveDateTime,
    client: C,
) -> std::sync::mpsc::Receiver<SendOutcome>
where
    C: TextClient + Send + 'static,
{
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let reply = session.send(&conn, &question, now, &client);
        // The receiver may have been dropped; nothing to do then.
        let _ = tx.send(SendOutcome {
            session,
            conn,
            reply,
        });
    });
    rx
}
