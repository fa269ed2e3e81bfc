//! Persona Sources
//!
//! Supply up to N synthetic persona descriptions for a simulation run.
//! Sources may return fewer than requested; that is not an error.

mod file;
pub mod hub;

pub use file::FilePersonaSource;
pub use hub::HubPersonaSource;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use thiserror::Error;

/// Used when a dataset row has no usable persona text.
pub const FALLBACK_PERSONA: &str = "A person who is thoughtful and analytical.";

/// Column holding the persona text in PersonaHub-style records.
pub const PERSONA_FIELD: &str = "input persona";

#[derive(Debug, Error)]
pub enum PersonaSourceError {
    #[error("failed to read persona file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid persona record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("persona dataset request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("persona dataset returned an unexpected payload: {0}")]
    Payload(String),
}

#[async_trait]
pub trait PersonaSource: Send + Sync {
    /// Returns at most `count` persona descriptions.
    async fn load(&self, count: usize) -> Result<Vec<String>, PersonaSourceError>;
}

/// Fixed, in-memory persona list. Returned in order, without shuffling.
#[derive(Debug, Clone, Default)]
pub struct StaticPersonaSource {
    personas: Vec<String>,
}

impl StaticPersonaSource {
    pub fn new<I, S>(personas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { personas: personas.into_iter().map(Into::into).collect() }
    }
}

#[async_trait]
impl PersonaSource for StaticPersonaSource {
    async fn load(&self, count: usize) -> Result<Vec<String>, PersonaSourceError> {
        Ok(self.personas.iter().take(count).cloned().collect())
    }
}

/// Extracts the persona text from one dataset record.
pub(crate) fn persona_from_value(value: &serde_json::Value) -> String {
    let text = match value {
        serde_json::Value::String(s) => Some(s.as_str()),
        serde_json::Value::Object(map) => map.get(PERSONA_FIELD).and_then(|v| v.as_str()),
        _ => None,
    };

    match text.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => FALLBACK_PERSONA.to_string(),
    }
}

pub(crate) fn sample(mut personas: Vec<String>, count: usize) -> Vec<String> {
    personas.shuffle(&mut rand::thread_rng());
    personas.truncate(count);
    personas
}
