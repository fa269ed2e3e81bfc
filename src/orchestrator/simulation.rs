//! Simulation Orchestrator
//!
//! Fans out one enrichment + response chain per persona, waits for every
//! chain of a question before moving on to the next one, and fails the
//! whole run on the first provider error.

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::agent::{Enricher, LLMProvider, ProviderError, Respondent};
use crate::error::{SurveyError, SurveyResult};
use crate::orchestrator::{ResponseRecord, SimulationBatch};
use crate::persona::PersonaSource;

pub struct Orchestrator {
    personas: Arc<dyn PersonaSource>,
    enricher: Enricher,
    respondent: Respondent,
    /// `None` means every persona of a question is in flight at once.
    concurrency_limit: Option<Arc<Semaphore>>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        personas: Arc<dyn PersonaSource>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            personas,
            enricher: Enricher::new(provider.clone(), model.clone()),
            respondent: Respondent::new(provider, model),
            concurrency_limit: None,
        }
    }

    /// Caps the number of persona chains running at the same time.
    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.concurrency_limit = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    pub async fn run(&self, questions: &[String], persona_count: usize) -> SurveyResult<SimulationBatch> {
        if persona_count == 0 {
            return Err(SurveyError::validation("num_personas must be at least 1"));
        }

        let personas = self.personas.load(persona_count).await?;
        info!("Loaded {} personas (requested {})", personas.len(), persona_count);

        let mut batch = SimulationBatch::new();
        for (idx, question) in questions.iter().enumerate() {
            debug!("Question {}/{}: {}", idx + 1, questions.len(), question);
            let records = self.run_question(&personas, question).await?;
            batch.extend(records);
        }

        info!("Simulation finished with {} records", batch.len());
        Ok(batch)
    }

    async fn run_question(&self, personas: &[String], question: &str) -> SurveyResult<Vec<ResponseRecord>> {
        let mut tasks: FuturesUnordered<_> = personas
            .iter()
            .map(|persona| self.simulate(persona, question))
            .collect();

        let mut records = Vec::with_capacity(personas.len());
        while let Some(result) = tasks.next().await {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Persona task failed, abandoning {} pending: {}", tasks.len(), e);
                    return Err(e.into());
                }
            }
        }
        Ok(records)
    }

    async fn simulate(&self, persona: &str, question: &str) -> Result<ResponseRecord, ProviderError> {
        let _permit = match &self.concurrency_limit {
            Some(semaphore) => semaphore.acquire().await.ok(),
            None => None,
        };

        let enriched = self.enricher.enrich(persona).await?;
        let response = self.respondent.respond(&enriched, question).await?;

        Ok(ResponseRecord {
            persona: enriched,
            question: question.to_string(),
            response,
            source_persona: persona.to_string(),
        })
    }
}
