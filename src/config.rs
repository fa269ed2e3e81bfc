//! Runtime configuration
//!
//! Read from the process environment after `.env` has been loaded.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::agent::{LLMProvider, OllamaProvider, OpenAICompatibleProvider};
use crate::orchestrator::{PayloadOptions, DEFAULT_PERSONA_COUNT};
use crate::persona::{hub, FilePersonaSource, HubPersonaSource, PersonaSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Ollama,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            other => bail!("unknown provider '{}' (expected 'openai' or 'ollama')", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SurveyConfig {
    pub bind_addr: String,
    pub results_path: PathBuf,
    pub provider: ProviderKind,
    pub model: String,
    pub temperature: f32,
    pub openai_base_url: String,
    pub openai_api_key: Option<String>,
    pub ollama_host: String,
    pub ollama_port: u16,
    /// Local JSON Lines persona file; the PersonaHub dataset is used when unset.
    pub persona_file: Option<PathBuf>,
    pub persona_dataset: String,
    pub persona_subset: String,
    pub persona_rows_api: String,
    pub default_personas: usize,
    /// Unbounded when `None`.
    pub max_concurrency: Option<usize>,
    pub payload: PayloadOptions,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            results_path: PathBuf::from("survey_results.json"),
            provider: ProviderKind::OpenAI,
            model: "gpt-4o-mini".to_string(),
            temperature: 1.0,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: None,
            ollama_host: "http://localhost".to_string(),
            ollama_port: 11434,
            persona_file: None,
            persona_dataset: hub::DEFAULT_DATASET.to_string(),
            persona_subset: hub::DEFAULT_SUBSET.to_string(),
            persona_rows_api: hub::DEFAULT_ROWS_API.to_string(),
            default_personas: DEFAULT_PERSONA_COUNT,
            max_concurrency: None,
            payload: PayloadOptions::default(),
        }
    }
}

impl SurveyConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            bind_addr: get("SURVEY_BIND_ADDR").unwrap_or(defaults.bind_addr),
            results_path: get("SURVEY_RESULTS_PATH").map(PathBuf::from).unwrap_or(defaults.results_path),
            provider: parse_or(get("SURVEY_PROVIDER"), "SURVEY_PROVIDER", defaults.provider)?,
            model: get("SURVEY_MODEL").unwrap_or(defaults.model),
            temperature: parse_or(get("SURVEY_TEMPERATURE"), "SURVEY_TEMPERATURE", defaults.temperature)?,
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_api_key: get("OPENAI_API_KEY"),
            ollama_host: get("OLLAMA_HOST").unwrap_or(defaults.ollama_host),
            ollama_port: parse_or(get("OLLAMA_PORT"), "OLLAMA_PORT", defaults.ollama_port)?,
            persona_file: get("SURVEY_PERSONA_FILE").map(PathBuf::from),
            persona_dataset: get("SURVEY_PERSONA_DATASET").unwrap_or(defaults.persona_dataset),
            persona_subset: get("SURVEY_PERSONA_SUBSET").unwrap_or(defaults.persona_subset),
            persona_rows_api: get("SURVEY_PERSONA_ROWS_API").unwrap_or(defaults.persona_rows_api),
            default_personas: parse_or(get("SURVEY_DEFAULT_PERSONAS"), "SURVEY_DEFAULT_PERSONAS", defaults.default_personas)?,
            max_concurrency: get("SURVEY_MAX_CONCURRENCY")
                .map(|v| match v.trim().parse::<usize>() {
                    Ok(0) => bail!("SURVEY_MAX_CONCURRENCY must be a positive integer, got 0"),
                    parsed => parsed.context("SURVEY_MAX_CONCURRENCY must be a positive integer"),
                })
                .transpose()?,
            payload: PayloadOptions {
                include_question: parse_flag(get("SURVEY_INCLUDE_QUESTION"), "SURVEY_INCLUDE_QUESTION")?,
                include_source_persona: parse_flag(get("SURVEY_INCLUDE_SOURCE_PERSONA"), "SURVEY_INCLUDE_SOURCE_PERSONA")?,
            },
        })
    }

    pub fn build_provider(&self) -> Arc<dyn LLMProvider> {
        match self.provider {
            ProviderKind::OpenAI => Arc::new(
                OpenAICompatibleProvider::new(self.openai_base_url.clone(), self.openai_api_key.clone())
                    .with_temperature(self.temperature),
            ),
            ProviderKind::Ollama => Arc::new(
                OllamaProvider::new(ollama_rs::Ollama::new(self.ollama_host.clone(), self.ollama_port))
                    .with_temperature(self.temperature),
            ),
        }
    }

    pub fn build_persona_source(&self) -> Arc<dyn PersonaSource> {
        match &self.persona_file {
            Some(path) => Arc::new(FilePersonaSource::new(path.clone())),
            None => Arc::new(
                HubPersonaSource::new(self.persona_dataset.clone(), self.persona_subset.clone())
                    .with_rows_api(self.persona_rows_api.clone()),
            ),
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse::<T>().map_err(|e| anyhow::anyhow!("invalid {}='{}': {}", key, v, e)),
    }
}

fn parse_flag(value: Option<String>, key: &str) -> Result<bool> {
    match value.as_deref().map(|v| v.trim().to_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => bail!("invalid {}='{}': expected a boolean", key, v),
        },
    }
}
