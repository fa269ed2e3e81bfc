//! Persona Survey Simulator
//!
//! Simulates survey answers from synthetic personas:
//! - Persona sampling (PersonaHub dataset or a local JSON Lines file)
//! - Two dependent completion calls per persona (enrichment, then answer)
//! - Concurrent fan-out per question with fail-fast collection
//! - WebSocket sessions streaming lifecycle events and results
//! - JSON persistence of every completed batch

pub mod agent;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod persona;
pub mod server;

// Re-exports for convenience
pub use agent::LLMProvider;
pub use config::SurveyConfig;
pub use error::SurveyError;
pub use orchestrator::{Orchestrator, SessionHandler, SimulationBatch};
pub use persona::PersonaSource;
