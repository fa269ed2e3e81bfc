//! Session Handler - binds one survey submission to one simulation run
//!
//! Validates the request, reports lifecycle events to the caller's
//! session, runs the orchestrator and persists successful batches.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{SurveyError, SurveyResult};
use crate::events::{EventSink, OutboundEvent, SubmitSurvey};
use crate::orchestrator::{Orchestrator, PayloadOptions, PersistenceError, ResponseRecord, ResultStore, SimulationBatch};

pub const DEFAULT_PERSONA_COUNT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Running,
    Completed,
    Failed,
}

impl SubmissionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn can_advance_to(self, next: SubmissionState) -> bool {
        use SubmissionState::*;
        matches!(
            (self, next),
            (Idle, Validating) | (Validating, Running) | (Validating, Failed) | (Running, Completed) | (Running, Failed)
        )
    }
}

/// Terminal result of one submission.
#[derive(Debug)]
pub enum SubmissionOutcome {
    Completed(SimulationBatch),
    Failed(SurveyError),
}

impl SubmissionOutcome {
    pub fn state(&self) -> SubmissionState {
        match self {
            Self::Completed(_) => SubmissionState::Completed,
            Self::Failed(_) => SubmissionState::Failed,
        }
    }
}

struct Submission {
    id: u64,
    state: SubmissionState,
}

impl Submission {
    fn advance(&mut self, next: SubmissionState) {
        debug_assert!(self.state.can_advance_to(next), "{:?} -> {:?}", self.state, next);
        debug!("Submission {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }
}

pub struct SessionHandler {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn ResultStore>,
    payload: PayloadOptions,
    default_personas: usize,
    next_id: std::sync::atomic::AtomicU64,
}

impl SessionHandler {
    pub fn new(orchestrator: Arc<Orchestrator>, store: Arc<dyn ResultStore>) -> Self {
        Self {
            orchestrator,
            store,
            payload: PayloadOptions::default(),
            default_personas: DEFAULT_PERSONA_COUNT,
            next_id: std::sync::atomic::AtomicU64::new(1),
        }
    }

    pub fn with_payload_options(mut self, payload: PayloadOptions) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_default_personas(mut self, count: usize) -> Self {
        self.default_personas = count;
        self
    }

    /// Handle one `submit_survey` request, reporting every transition to `sink`.
    pub async fn submit(&self, request: SubmitSurvey, sink: &dyn EventSink) -> SubmissionOutcome {
        let mut submission = Submission {
            id: self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            state: SubmissionState::Idle,
        };

        submission.advance(SubmissionState::Validating);
        let (question, persona_count) = match self.validate(request) {
            Ok(valid) => valid,
            Err(e) => {
                warn!("Submission {} rejected: {}", submission.id, e);
                submission.advance(SubmissionState::Failed);
                sink.emit(OutboundEvent::error(e.to_string())).await;
                return SubmissionOutcome::Failed(e);
            }
        };

        submission.advance(SubmissionState::Running);
        sink.emit(OutboundEvent::processing_started()).await;
        info!("Submission {}: {} personas, question: {}", submission.id, persona_count, question);

        let batch = match self.orchestrator.run(&[question], persona_count).await {
            Ok(batch) => batch,
            Err(e) => {
                let message = format!("Error processing survey: {}", e);
                error!("Submission {}: {}", submission.id, message);
                submission.advance(SubmissionState::Failed);
                sink.emit(OutboundEvent::error(message)).await;
                return SubmissionOutcome::Failed(e);
            }
        };

        if let Err(e) = self.store.save(&batch).await {
            error!("Submission {}: failed to save results: {}", submission.id, e);
        }

        submission.advance(SubmissionState::Completed);
        info!("Submission {}: sending {} responses", submission.id, batch.len());
        sink.emit(OutboundEvent::completed(batch.payload(self.payload))).await;
        SubmissionOutcome::Completed(batch)
    }

    /// Records of the last persisted batch.
    pub async fn saved_results(&self) -> Result<Vec<ResponseRecord>, PersistenceError> {
        self.store.load().await
    }

    fn validate(&self, request: SubmitSurvey) -> SurveyResult<(String, usize)> {
        let question = request
            .question
            .filter(|q| !q.is_empty())
            .ok_or_else(|| SurveyError::validation("Question is required"))?;

        let persona_count = request.num_personas.unwrap_or(self.default_personas);
        if persona_count == 0 {
            return Err(SurveyError::validation("num_personas must be at least 1"));
        }

        Ok((question, persona_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{LLMProvider, ProviderError};
    use crate::persona::StaticPersonaSource;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{mpsc, Mutex};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LLMProvider for CountingProvider {
        async fn generate(&self, _model: &str, _prompt: String, system: Option<String>) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(if system.is_some() { "enriched".into() } else { "answer".into() })
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<SimulationBatch>>,
        fail: bool,
    }

    #[async_trait]
    impl ResultStore for MemoryStore {
        async fn save(&self, batch: &SimulationBatch) -> Result<(), PersistenceError> {
            if self.fail {
                return Err(PersistenceError::Serialize(serde_json::from_str::<()>("x").unwrap_err()));
            }
            self.saved.lock().await.push(batch.clone());
            Ok(())
        }

        async fn load(&self) -> Result<Vec<ResponseRecord>, PersistenceError> {
            Ok(self.saved.lock().await.last().map(|b| b.records().to_vec()).unwrap_or_default())
        }
    }

    fn handler(provider: Arc<CountingProvider>, store: Arc<MemoryStore>) -> SessionHandler {
        let personas = Arc::new(StaticPersonaSource::new(["a", "b", "c", "d"]));
        let orchestrator = Arc::new(Orchestrator::new(provider, personas, "m"));
        SessionHandler::new(orchestrator, store).with_default_personas(3)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[test]
    fn test_state_transitions() {
        use SubmissionState::*;
        assert!(Idle.can_advance_to(Validating));
        assert!(Validating.can_advance_to(Failed));
        assert!(!Validating.can_advance_to(Completed));
        assert!(!Completed.can_advance_to(Failed));
        assert!(Completed.is_terminal() && Failed.is_terminal());
        assert!(!Running.is_terminal());
    }

    #[tokio::test]
    async fn test_empty_question_never_calls_provider() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let store = Arc::new(MemoryStore::default());
        let handler = handler(provider.clone(), store.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        for question in [None, Some(String::new())] {
            let outcome = handler.submit(SubmitSurvey { question, num_personas: None }, &tx).await;
            assert!(matches!(outcome, SubmissionOutcome::Failed(SurveyError::Validation(_))));
        }

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| *e == OutboundEvent::error("Question is required")));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert!(store.saved.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_question_is_submitted_verbatim() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let handler = handler(provider.clone(), Arc::new(MemoryStore::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = handler.submit(SubmitSurvey::new("   ", 1), &tx).await;

        let SubmissionOutcome::Completed(batch) = outcome else {
            panic!("whitespace question should run");
        };
        assert_eq!(batch.records()[0].question, "   ");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        let names: Vec<_> = drain(&mut rx).iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["processing_started", "survey_completed"]);
    }

    #[tokio::test]
    async fn test_default_persona_count_applies() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let store = Arc::new(MemoryStore::default());
        let handler = handler(provider.clone(), store.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = handler.submit(SubmitSurvey { question: Some("q".into()), num_personas: None }, &tx).await;

        assert_eq!(outcome.state(), SubmissionState::Completed);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 6);

        let events = drain(&mut rx);
        assert_eq!(events[0], OutboundEvent::processing_started());
        match &events[1] {
            OutboundEvent::SurveyCompleted { responses, .. } => assert_eq!(responses.len(), 3),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(store.saved.lock().await[0].len(), 3);
        assert_eq!(handler.saved_results().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_zero_personas_rejected_before_start() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let handler = handler(provider, Arc::new(MemoryStore::default()));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = handler.submit(SubmitSurvey::new("q", 0), &tx).await;
        assert_eq!(outcome.state(), SubmissionState::Failed);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name(), "survey_error");
    }

    #[tokio::test]
    async fn test_persistence_failure_is_not_reported() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let store = Arc::new(MemoryStore { fail: true, ..Default::default() });
        let handler = handler(provider, store);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let outcome = handler.submit(SubmitSurvey::new("q", 2), &tx).await;
        assert_eq!(outcome.state(), SubmissionState::Completed);

        let names: Vec<_> = drain(&mut rx).iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["processing_started", "survey_completed"]);
    }

    #[tokio::test]
    async fn test_payload_options_are_applied() {
        let provider = Arc::new(CountingProvider { calls: AtomicUsize::new(0) });
        let handler = handler(provider, Arc::new(MemoryStore::default()))
            .with_payload_options(PayloadOptions { include_question: true, include_source_persona: false });
        let (tx, mut rx) = mpsc::unbounded_channel();

        handler.submit(SubmitSurvey::new("Tea or coffee?", 1), &tx).await;

        let events = drain(&mut rx);
        let OutboundEvent::SurveyCompleted { responses, .. } = &events[1] else {
            panic!("expected completion, got {:?}", events[1]);
        };
        assert_eq!(responses[0].question.as_deref(), Some("Tea or coffee?"));
        assert_eq!(responses[0].source_persona, None);
    }
}
