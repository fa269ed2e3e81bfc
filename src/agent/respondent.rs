//! Survey Respondent
//!
//! Answers one survey question in character as an enriched persona.

use std::sync::Arc;

use crate::agent::{LLMProvider, ProviderError};

pub struct Respondent {
    provider: Arc<dyn LLMProvider>,
    model: String,
}

impl Respondent {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self { provider, model: model.into() }
    }

    pub fn prompt(enriched_persona: &str, question: &str) -> String {
        format!(
            "You are now embodying a real person with the following background:\n\n{}\n\n\n\nQuestion: {}\n\nPlease respond in character, as if you are this person filling out a survey:",
            enriched_persona, question
        )
    }

    pub async fn respond(&self, enriched_persona: &str, question: &str) -> Result<String, ProviderError> {
        self.provider
            .generate(&self.model, Self::prompt(enriched_persona, question), None)
            .await
    }
}
