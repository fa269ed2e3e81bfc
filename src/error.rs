use thiserror::Error;

use crate::agent::ProviderError;
use crate::persona::PersonaSourceError;

/// Errors that end a survey submission.
///
/// Persistence failures are deliberately absent: they are logged at the
/// session boundary and never reach the caller.
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    PersonaSource(#[from] PersonaSourceError),
}

impl SurveyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type SurveyResult<T> = std::result::Result<T, SurveyError>;
