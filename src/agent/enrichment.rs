//! Persona Enrichment
//!
//! Expands a terse persona description into a fuller behavioural profile
//! with a single completion call.

use std::sync::Arc;
use tracing::debug;

use crate::agent::{LLMProvider, ProviderError};

pub const ENRICHMENT_SYSTEM_PROMPT: &str = "Given this persona description, analyze and extract:
    1. Key personality traits and values
    2. Likely background and experiences
    3. Professional expertise or interests
    4. Communication style and thought patterns
    5. Potential biases or unique perspectives

    Format the response as a natural extension of the original description, maintaining the same tone and style.";

pub struct Enricher {
    provider: Arc<dyn LLMProvider>,
    model: String,
}

impl Enricher {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self { provider, model: model.into() }
    }

    pub fn user_prompt(persona: &str) -> String {
        format!("Persona description: {}", persona)
    }

    /// Returns the enriched persona. Provider failures are passed through unchanged.
    pub async fn enrich(&self, persona: &str) -> Result<String, ProviderError> {
        let enriched = self.provider.generate(
            &self.model,
            Self::user_prompt(persona),
            Some(ENRICHMENT_SYSTEM_PROMPT.to_string()),
        ).await?;

        if enriched.trim().is_empty() {
            return Err(ProviderError::EmptyCompletion);
        }

        debug!("Enriched persona ({} -> {} chars)", persona.len(), enriched.len());
        Ok(enriched)
    }
}
