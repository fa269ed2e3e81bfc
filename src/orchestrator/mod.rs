//! Orchestrator Module
//!
//! Drives persona simulations, binds them to caller sessions and
//! persists the results.

pub mod record;
pub mod session;
pub mod simulation;
pub mod store;
pub mod summary;

pub use record::{PayloadOptions, ResponsePayload, ResponseRecord, SimulationBatch};
pub use session::{SessionHandler, SubmissionOutcome, SubmissionState, DEFAULT_PERSONA_COUNT};
pub use simulation::Orchestrator;
pub use store::{JsonFileStore, PersistenceError, ResultStore};
pub use summary::BatchSummary;
