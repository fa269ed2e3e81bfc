//! Drives the real server over a WebSocket with the bundled client.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use persona_survey::agent::{LLMProvider, ProviderError};
use persona_survey::client::{ClientOutcome, SurveyClient};
use persona_survey::events::{OutboundEvent, SubmitSurvey};
use persona_survey::orchestrator::{JsonFileStore, Orchestrator, SessionHandler};
use persona_survey::persona::StaticPersonaSource;
use persona_survey::server::{serve, AppState};

struct MockProvider;

#[async_trait]
impl LLMProvider for MockProvider {
    async fn generate(&self, _model: &str, prompt: String, system: Option<String>) -> Result<String, ProviderError> {
        if system.is_some() {
            Ok(format!("ENRICHED:{}", prompt.trim_start_matches("Persona description: ")))
        } else {
            Ok("NO".to_string())
        }
    }
}

async fn start_server(dir: &tempfile::TempDir) -> String {
    let personas = Arc::new(StaticPersonaSource::new(["A baker", "A pilot", "A poet", "A nurse"]));
    let orchestrator = Arc::new(Orchestrator::new(Arc::new(MockProvider), personas, "m"));
    let store = Arc::new(JsonFileStore::new(dir.path().join("survey_results.json")));
    let state = AppState::new(SessionHandler::new(orchestrator, store));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, state));
    format!("ws://{}/ws", addr)
}

#[tokio::test]
async fn test_client_receives_completed_survey() {
    let dir = tempfile::tempdir().unwrap();
    let url = start_server(&dir).await;

    let outcome = SurveyClient::new(url)
        .with_timeout(Duration::from_secs(10))
        .run_survey(SubmitSurvey::new("Is a hotdog a sandwich?", 3))
        .await
        .unwrap();

    let responses = match outcome {
        ClientOutcome::Completed(responses) => responses,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(responses.len(), 3);
    assert!(responses.iter().all(|r| r.response == "NO" && r.persona.starts_with("ENRICHED:A ")));
    assert!(dir.path().join("survey_results.json").exists());
}

#[tokio::test]
async fn test_client_receives_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let url = start_server(&dir).await;

    let outcome = SurveyClient::new(url)
        .with_timeout(Duration::from_secs(10))
        .run_survey(SubmitSurvey::new("", 3))
        .await
        .unwrap();

    assert_eq!(outcome, ClientOutcome::Failed("Question is required".to_string()));
    assert!(!dir.path().join("survey_results.json").exists());
}

#[tokio::test]
async fn test_malformed_frame_yields_error_event() {
    let dir = tempfile::tempdir().unwrap();
    let url = start_server(&dir).await;

    let (mut stream, _) = connect_async(url.as_str()).await.unwrap();
    stream.send(Message::Text("{\"event\": \"nonsense\"}".to_string())).await.unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {:?}", other),
            }
        }
    })
    .await
    .unwrap();

    let event: OutboundEvent = serde_json::from_str(&reply).unwrap();
    assert_eq!(event.name(), "survey_error");
}

#[tokio::test]
async fn test_string_persona_count_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let url = start_server(&dir).await;

    let (mut stream, _) = connect_async(url.as_str()).await.unwrap();
    let frame = serde_json::json!({
        "event": "submit_survey",
        "data": { "question": "Tabs or spaces?", "num_personas": "2" }
    });
    stream.send(Message::Text(frame.to_string())).await.unwrap();

    let mut names = Vec::new();
    let completed = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let Some(Ok(Message::Text(text))) = stream.next().await else { continue };
            let event: OutboundEvent = serde_json::from_str(&text).unwrap();
            names.push(event.name());
            if event.is_terminal() {
                break event;
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(names, vec!["processing_started", "survey_completed"]);
    let OutboundEvent::SurveyCompleted { responses, .. } = completed else { unreachable!() };
    assert_eq!(responses.len(), 2);
}
