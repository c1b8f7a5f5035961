//! Command-line surface for the ward.

use std::io::{BufRead, Write};

use chrono::Local;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::admission::{self, AdmissionError};
use crate::chat::{send_in_background, ChatError, ChatSession};
use crate::config::{AppConfig, APP_NAME, APP_VERSION};
use crate::db::repository::{
    delete_patient, discontinue_medication, get_patient_details, insert_note, list_patients,
};
use crate::db::sqlite::open_database;
use crate::db::DatabaseError;
use crate::llm::{GeminiClient, LlmError};
use crate::models::EvolutionNote;
use crate::schedule::upcoming_doses;
use crate::seed::seed_if_empty;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No patient with id {0}")]
    PatientNotFound(Uuid),
}

#[derive(Parser)]
#[command(name = "clinicare", version = APP_VERSION, about = "Hospital ward management")]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Admit a patient and draft an initial treatment plan
    Admit {
        name: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        condition: String,
        /// Room number, e.g. 101. Picks the first free room when omitted.
        #[arg(long)]
        room: Option<String>,
        /// Skip the AI-drafted treatment plan
        #[arg(long)]
        no_plan: bool,
    },
    /// List admitted patients
    Patients,
    /// Show one patient's record card
    Show { id: Uuid },
    /// Record an evolution note
    Note { id: Uuid, text: String },
    /// Stop a medication's schedule (keeps it on the record)
    Discontinue { medication_id: Uuid },
    /// Discharge a patient, removing the whole record
    Discharge { id: Uuid },
    /// Medication doses due in the next 24 hours
    Schedule,
    /// List free rooms
    Rooms,
    /// Chat with the assistant about one patient
    Chat { id: Uuid },
}

impl Cli {
    pub fn execute(self, config: &AppConfig) -> Result<(), CliError> {
        let conn = open_database(&config.db_path)?;
        seed_if_empty(&conn, Local::now().naive_local())?;

        match self.command {
            Command::Admit {
                name,
                age,
                condition,
                room,
                no_plan,
            } => admit(conn, config, &name, age, &condition, room, no_plan),
            Command::Patients => patients(&conn),
            Command::Show { id } => show(&conn, &id),
            Command::Note { id, text } => note(&conn, &id, &text),
            Command::Discontinue { medication_id } => discontinue(&conn, &medication_id),
            Command::Discharge { id } => discharge(&conn, &id),
            Command::Schedule => schedule(&conn),
            Command::Rooms => rooms(&conn),
            Command::Chat { id } => chat(conn, config, &id),
        }
    }
}

fn admit(
    conn: Connection,
    config: &AppConfig,
    name: &str,
    age: u32,
    condition: &str,
    room: Option<String>,
    no_plan: bool,
) -> Result<(), CliError> {
    let now = Local::now().naive_local();
    let room = match room {
        Some(room) => room,
        None => admission::available_rooms(&conn)?
            .into_iter()
            .next()
            .ok_or_else(|| AdmissionError::RoomUnavailable("none free".into()))?,
    };

    let id = admission::admit(&conn, name, age, condition, &room, now)?;
    println!("Admitted {name} to room {room} ({id})");

    if no_plan {
        return Ok(());
    }

    let client = GeminiClient::from_config(config)?;
    match admission::draft_treatment_plan(&conn, &client, &id, now) {
        Ok(plan) => {
            println!("\nInitial treatment plan:\n{plan}");
        }
        Err(e) => {
            // The admission stands; the plan can be drafted later.
            eprintln!("Could not draft a treatment plan: {e}");
        }
    }
    Ok(())
}

fn patients(conn: &Connection) -> Result<(), CliError> {
    let patients = list_patients(conn)?;
    if patients.is_empty() {
        println!("No patients admitted.");
        return Ok(());
    }
    for p in patients {
        println!(
            "{}  room {:>4}  {} ({}) - {}",
            p.id, p.room, p.name, p.age, p.condition
        );
    }
    Ok(())
}

fn show(conn: &Connection, id: &Uuid) -> Result<(), CliError> {
    let details = get_patient_details(conn, id)?.ok_or(CliError::PatientNotFound(*id))?;
    let p = &details.patient;

    println!("{} ({}), room {}", p.name, p.age, p.room);
    println!("Condition: {}", p.condition);
    println!("Admitted:  {}", p.admitted_at.format("%d/%m/%Y %H:%M"));

    println!("\nMedications:");
    if details.medications.is_empty() {
        println!("  none");
    }
    for m in &details.medications {
        match m.frequency_hours {
            Some(freq) => println!("  {}  {} {}, every {freq}h", m.id, m.name, m.dosage),
            None => println!("  {}  {} {}, discontinued", m.id, m.name, m.dosage),
        }
    }

    println!("\nEvolution notes:");
    if details.notes.is_empty() {
        println!("  none");
    }
    for n in &details.notes {
        println!("  [{}] {}", n.recorded_at.format("%d/%m/%Y %H:%M"), n.note);
    }
    Ok(())
}

fn note(conn: &Connection, id: &Uuid, text: &str) -> Result<(), CliError> {
    if crate::db::repository::get_patient(conn, id)?.is_none() {
        return Err(CliError::PatientNotFound(*id));
    }
    insert_note(
        conn,
        &EvolutionNote {
            id: Uuid::new_v4(),
            patient_id: *id,
            recorded_at: Local::now().naive_local(),
            note: text.to_string(),
        },
    )?;
    println!("Note recorded.");
    Ok(())
}

fn discontinue(conn: &Connection, medication_id: &Uuid) -> Result<(), CliError> {
    if discontinue_medication(conn, medication_id)? {
        println!("Medication discontinued.");
    } else {
        println!("No medication with id {medication_id}.");
    }
    Ok(())
}

fn discharge(conn: &Connection, id: &Uuid) -> Result<(), CliError> {
    if delete_patient(conn, id)? {
        println!("Patient discharged.");
    } else {
        return Err(CliError::PatientNotFound(*id));
    }
    Ok(())
}

fn schedule(conn: &Connection) -> Result<(), CliError> {
    let due = upcoming_doses(conn, Local::now().naive_local())?;
    if due.is_empty() {
        println!("No doses due in the next 24 hours.");
        return Ok(());
    }
    for dose in due {
        println!(
            "{}  room {:>4}  {}: {} {}",
            dose.due_at.format("%d/%m %H:%M"),
            dose.room,
            dose.patient_name,
            dose.medication,
            dose.dosage
        );
    }
    Ok(())
}

fn rooms(conn: &Connection) -> Result<(), CliError> {
    let available = admission::available_rooms(conn)?;
    println!("{} rooms free:", available.len());
    for chunk in available.chunks(10) {
        println!("  {}", chunk.join(" "));
    }
    Ok(())
}

/// Interactive chat loop. Each question runs on a worker thread so a
/// slow generation can be interrupted with Ctrl-C without corrupting
/// the stored conversation.
fn chat(conn: Connection, config: &AppConfig, id: &Uuid) -> Result<(), CliError> {
    let mut session = ChatSession::resume(&conn, id)?;
    println!("Chat started. Type 'exit' to leave.");

    let mut conn = conn;
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        let client = GeminiClient::from_config(config)?;
        let rx = send_in_background(
            session,
            conn,
            question.to_string(),
            Local::now().naive_local(),
            client,
        );
        let outcome = rx.recv().map_err(|_| {
            CliError::Io(std::io::Error::other("chat worker terminated unexpectedly"))
        })?;
        session = outcome.session;
        conn = outcome.conn;

        match outcome.reply {
            Ok(reply) => println!("{reply}\n"),
            Err(e) => eprintln!("{e}\n"),
        }
    }
    Ok(())
}

/// Entry point: load environment, set up tracing, run the command.
pub fn run() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| crate::config::default_log_filter().into()),
        )
        .init();

    let config = AppConfig::from_env();
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Cannot create data directory {}: {e}", parent.display());
                std::process::exit(1);
            }
        }
    }

    tracing::info!(version = APP_VERSION, db = %config.db_path.display(), "{APP_NAME} starting");

    let cli = Cli::parse();
    if let Err(e) = cli.execute(&config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn admit_parses_with_flags() {
        let cli = Cli::try_parse_from([
            "clinicare",
            "admit",
            "Joao da Silva",
            "--age",
            "68",
            "--condition",
            "Severe pneumonia",
            "--room",
            "101",
            "--no-plan",
        ])
        .unwrap();
        match cli.command {
            Command::Admit {
                name,
                age,
                room,
                no_plan,
                ..
            } => {
                assert_eq!(name, "Joao da Silva");
                assert_eq!(age, 68);
                assert_eq!(room.as_deref(), Some("101"));
                assert!(no_plan);
            }
            _ => panic!("parsed the wrong command"),
        }
    }

    #[test]
    fn chat_requires_a_valid_uuid() {
        assert!(Cli::try_parse_from(["clinicare", "chat", "not-a-uuid"]).is_err());
    }
}
