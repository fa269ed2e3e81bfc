//! Agent Module
//!
//! The completion backends and the two per-persona steps built on them:
//! enrichment of the raw persona, then the in-character survey answer.

mod provider;
mod enrichment;
mod respondent;

pub use provider::{LLMProvider, OllamaProvider, OpenAICompatibleProvider, ProviderError};
pub use enrichment::{Enricher, ENRICHMENT_SYSTEM_PROMPT};
pub use respondent::Respondent;

pub fn truncate(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ");
    if s.len() <= max_len {
        s
    } else {
        let target_len = max_len.saturating_sub(3);
        let mut end = target_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
