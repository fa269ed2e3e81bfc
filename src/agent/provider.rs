use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;

/// Failure of a single completion call.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion backend error: {0}")]
    Backend(String),
    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
    #[error("completion was empty")]
    EmptyCompletion,
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String, ProviderError>;
}

pub struct OllamaProvider {
    client: ollama_rs::Ollama,
    temperature: f32,
}

impl OllamaProvider {
    pub fn new(client: ollama_rs::Ollama) -> Self {
        Self { client, temperature: 1.0 }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String, ProviderError> {
        use ollama_rs::generation::chat::{request::ChatMessageRequest, ChatMessage};
        use ollama_rs::models::ModelOptions;

        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(ChatMessage::system(sys));
        }
        messages.push(ChatMessage::user(prompt));

        let request = ChatMessageRequest::new(model.to_string(), messages)
            .options(ModelOptions::default().temperature(self.temperature));

        let res = self.client.send_chat_messages(request).await
            .map_err(|e| ProviderError::Backend(e.to_string()))?;

        Ok(res.message.content)
    }
}

pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
}

impl OpenAICompatibleProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            temperature: 1.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String, ProviderError> {
        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(json!({ "role": "system", "content": sys }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let body = json!({
            "model": model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let mut request = self.client.post(self.endpoint()).json(&body);

        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await?;
        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(ProviderError::Backend(format!("{}: {}", status, detail)));
        }

        let json: serde_json::Value = res.json().await?;
        extract_content(&json)
    }
}

fn extract_content(json: &serde_json::Value) -> Result<String, ProviderError> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ProviderError::MalformedResponse("missing choices[0].message.content".to_string()))
}
