use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{persona_from_value, sample, PersonaSource, PersonaSourceError};

pub const DEFAULT_ROWS_API: &str = "https://datasets-server.huggingface.co/rows";
pub const DEFAULT_DATASET: &str = "proj-persona/PersonaHub";
pub const DEFAULT_SUBSET: &str = "instruction";

/// The rows endpoint caps `length` at 100.
const MAX_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct RowsPage {
    rows: Vec<RowEntry>,
    num_rows_total: usize,
}

#[derive(Debug, Deserialize)]
struct RowEntry {
    row: serde_json::Value,
}

/// Personas sampled from a Hugging Face dataset through the datasets-server
/// rows API.
///
/// A random contiguous window of the split is fetched and then shuffled, so
/// a single call never returns the same row twice.
pub struct HubPersonaSource {
    client: Client,
    rows_api: String,
    dataset: String,
    subset: String,
    split: String,
}

impl HubPersonaSource {
    pub fn new(dataset: impl Into<String>, subset: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            rows_api: DEFAULT_ROWS_API.to_string(),
            dataset: dataset.into(),
            subset: subset.into(),
            split: "train".to_string(),
        }
    }

    pub fn with_rows_api(mut self, url: impl Into<String>) -> Self {
        self.rows_api = url.into();
        self
    }

    async fn fetch_page(&self, offset: usize, length: usize) -> Result<RowsPage, PersonaSourceError> {
        debug!("Fetching {} rows of {} at offset {}", length, self.dataset, offset);
        let res = self.client
            .get(&self.rows_api)
            .query(&[
                ("dataset", self.dataset.as_str()),
                ("config", self.subset.as_str()),
                ("split", self.split.as_str()),
            ])
            .query(&[("offset", offset), ("length", length)])
            .send()
            .await?
            .error_for_status()?;

        let body = res.text().await?;
        parse_page(&body)
    }
}

fn parse_page(body: &str) -> Result<RowsPage, PersonaSourceError> {
    serde_json::from_str(body).map_err(|e| PersonaSourceError::Payload(e.to_string()))
}

#[async_trait]
impl PersonaSource for HubPersonaSource {
    async fn load(&self, count: usize) -> Result<Vec<String>, PersonaSourceError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let head = self.fetch_page(0, 1).await?;
        let total = head.num_rows_total;
        let window = count.min(total);
        if window == 0 {
            return Ok(Vec::new());
        }

        let start = rand::thread_rng().gen_range(0..=total - window);
        let mut personas = Vec::with_capacity(window);
        let mut offset = start;

        while personas.len() < window {
            let length = (window - personas.len()).min(MAX_PAGE);
            let page = self.fetch_page(offset, length).await?;
            if page.rows.is_empty() {
                break;
            }
            offset += page.rows.len();
            personas.extend(page.rows.iter().map(|entry| persona_from_value(&entry.row)));
        }

        info!("Sampled {} personas from {} (rows {}..{})", personas.len(), self.dataset, start, offset);
        Ok(sample(personas, count))
    }
}
