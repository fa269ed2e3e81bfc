//! Simulation records and the outbound payload view of them.

use serde::{Deserialize, Serialize};

/// One persona's answer to one question.
///
/// `source_persona` is the raw description the enrichment started from. It
/// is kept in memory only; the persisted artifact carries the enriched
/// persona, the question and the response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub persona: String,
    pub question: String,
    pub response: String,
    #[serde(skip)]
    pub source_persona: String,
}

/// Records from one orchestration run, grouped by question in input order.
/// Within a question the order is task completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationBatch {
    records: Vec<ResponseRecord>,
}

impl SimulationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn extend(&mut self, records: Vec<ResponseRecord>) {
        self.records.extend(records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ResponseRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResponseRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<ResponseRecord> {
        self.records
    }

    /// Formats the batch for the `survey_completed` event.
    pub fn payload(&self, options: PayloadOptions) -> Vec<ResponsePayload> {
        self.records.iter().map(|r| ResponsePayload::from_record(r, options)).collect()
    }
}

impl From<Vec<ResponseRecord>> for SimulationBatch {
    fn from(records: Vec<ResponseRecord>) -> Self {
        Self { records }
    }
}

impl<'a> IntoIterator for &'a SimulationBatch {
    type Item = &'a ResponseRecord;
    type IntoIter = std::slice::Iter<'a, ResponseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Which optional fields the outbound payload carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PayloadOptions {
    pub include_question: bool,
    pub include_source_persona: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub persona: String,
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_persona: Option<String>,
}

impl ResponsePayload {
    pub fn from_record(record: &ResponseRecord, options: PayloadOptions) -> Self {
        Self {
            persona: record.persona.clone(),
            response: record.response.clone(),
            question: options.include_question.then(|| record.question.clone()),
            source_persona: options.include_source_persona.then(|| record.source_persona.clone()),
        }
    }
}
