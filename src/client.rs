//! Survey Client
//!
//! Connects to a running server, submits one survey and waits for the
//! terminal event.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info};

use crate::events::{InboundEvent, OutboundEvent, SubmitSurvey};
use crate::orchestrator::ResponsePayload;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub enum ClientOutcome {
    Completed(Vec<ResponsePayload>),
    Failed(String),
    /// No terminal event arrived in time. The server-side run is not cancelled.
    TimedOut,
}

pub struct SurveyClient {
    url: String,
    timeout: Duration,
}

impl SurveyClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run_survey(&self, request: SubmitSurvey) -> Result<ClientOutcome> {
        let (stream, _) = connect_async(self.url.as_str()).await
            .with_context(|| format!("Failed to connect to {}", self.url))?;
        info!("Connected to {}", self.url);
        let (mut write, mut read) = stream.split();

        let payload = serde_json::to_string(&InboundEvent::SubmitSurvey(request))?;
        write.send(Message::Text(payload)).await.context("Failed to submit survey")?;

        let deadline = Instant::now() + self.timeout;
        let outcome = loop {
            let next = match tokio::time::timeout_at(deadline, read.next()).await {
                Ok(next) => next,
                Err(_) => break ClientOutcome::TimedOut,
            };

            let msg = match next {
                Some(msg) => msg.context("WebSocket error")?,
                None => anyhow::bail!("Server closed the connection before the survey finished"),
            };

            let Message::Text(text) = msg else { continue };
            let event: OutboundEvent = serde_json::from_str(&text)
                .with_context(|| format!("Unexpected server event: {}", text))?;

            match event {
                OutboundEvent::ProcessingStarted { message } => info!("{}", message),
                OutboundEvent::SurveyCompleted { responses, .. } => break ClientOutcome::Completed(responses),
                OutboundEvent::SurveyError { message, .. } => break ClientOutcome::Failed(message),
            }
        };

        if let Err(e) = write.close().await {
            debug!("Close handshake failed: {}", e);
        }
        Ok(outcome)
    }
}
