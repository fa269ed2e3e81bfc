//! Session Events
//!
//! Every WebSocket frame is a JSON envelope `{"event": <name>, "data": {...}}`.

use async_trait::async_trait;
use serde::{de, Deserialize, Deserializer, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::orchestrator::ResponsePayload;

/// Caller -> server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum InboundEvent {
    SubmitSurvey(SubmitSurvey),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitSurvey {
    #[serde(default)]
    pub question: Option<String>,
    /// Accepts a JSON integer, an integral float such as `5.0`, or a numeric string.
    #[serde(default, deserialize_with = "persona_count", skip_serializing_if = "Option::is_none")]
    pub num_personas: Option<usize>,
}

impl SubmitSurvey {
    pub fn new(question: impl Into<String>, num_personas: usize) -> Self {
        Self { question: Some(question.into()), num_personas: Some(num_personas) }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountRepr {
    Number(u64),
    Float(f64),
    Text(String),
}

fn persona_count<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<CountRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(CountRepr::Number(n)) => usize::try_from(n)
            .map(Some)
            .map_err(|_| de::Error::custom(format!("num_personas out of range: {}", n))),
        Some(CountRepr::Float(f)) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= usize::MAX as f64 => {
            Ok(Some(f as usize))
        }
        Some(CountRepr::Float(f)) => Err(de::Error::custom(format!("num_personas must be a whole number: {}", f))),
        Some(CountRepr::Text(s)) => s.trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid num_personas: {:?}", s))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Server -> caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundEvent {
    ProcessingStarted { message: String },
    SurveyCompleted { status: Status, responses: Vec<ResponsePayload> },
    SurveyError { status: Status, message: String },
}

impl OutboundEvent {
    pub fn processing_started() -> Self {
        Self::ProcessingStarted { message: "Processing your request...".to_string() }
    }

    pub fn completed(responses: Vec<ResponsePayload>) -> Self {
        Self::SurveyCompleted { status: Status::Success, responses }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::SurveyError { status: Status::Error, message: message.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ProcessingStarted { .. } => "processing_started",
            Self::SurveyCompleted { .. } => "survey_completed",
            Self::SurveyError { .. } => "survey_error",
        }
    }

    /// True for the events that end a submission.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::ProcessingStarted { .. })
    }
}

/// Delivery target for one submission's events. Delivery is best effort.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: OutboundEvent);
}

#[async_trait]
impl EventSink for mpsc::UnboundedSender<OutboundEvent> {
    async fn emit(&self, event: OutboundEvent) {
        let name = event.name();
        if self.send(event).is_err() {
            debug!("Session closed, dropping {} event", name);
        }
    }
}
