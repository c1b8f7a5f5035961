pub mod admission;
pub mod chat;
pub mod cli;
pub mod config;
pub mod db;
pub mod llm;
pub mod models;
pub mod schedule;
pub mod seed;

pub use cli::run;
