use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

use super::{persona_from_value, sample, PersonaSource, PersonaSourceError};

/// Personas from a local JSON Lines file.
///
/// Each non-blank line is either a JSON string or a PersonaHub-style object
/// with an `input persona` field.
pub struct FilePersonaSource {
    path: PathBuf,
}

impl FilePersonaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(contents: &str) -> Result<Vec<String>, PersonaSourceError> {
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str::<serde_json::Value>(line)
                    .map(|v| persona_from_value(&v))
                    .map_err(|source| PersonaSourceError::Parse { line: idx + 1, source })
            })
            .collect()
    }
}

#[async_trait]
impl PersonaSource for FilePersonaSource {
    async fn load(&self, count: usize) -> Result<Vec<String>, PersonaSourceError> {
        let contents = fs::read_to_string(&self.path).await
            .map_err(|source| PersonaSourceError::Io { path: self.path.display().to_string(), source })?;

        let personas = Self::parse(&contents)?;
        info!("Loaded {} personas from {}", personas.len(), self.path.display());
        Ok(sample(personas, count))
    }
}
