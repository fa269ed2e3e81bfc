//! Per-question overview of a finished batch, printed by the batch CLI.

use std::fmt;

use crate::agent::truncate;
use crate::orchestrator::SimulationBatch;

const SAMPLE_COUNT: usize = 2;
const SAMPLE_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSummary {
    pub question: String,
    pub responses: usize,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    /// In order of first appearance.
    pub questions: Vec<QuestionSummary>,
}

impl BatchSummary {
    pub fn from_batch(batch: &SimulationBatch) -> Self {
        let mut questions: Vec<QuestionSummary> = Vec::new();

        for record in batch {
            let idx = match questions.iter().position(|q| q.question == record.question) {
                Some(idx) => idx,
                None => {
                    questions.push(QuestionSummary {
                        question: record.question.clone(),
                        responses: 0,
                        samples: Vec::new(),
                    });
                    questions.len() - 1
                }
            };

            let entry = &mut questions[idx];
            entry.responses += 1;
            if entry.samples.len() < SAMPLE_COUNT {
                entry.samples.push(truncate(&record.response, SAMPLE_CHARS));
            }
        }

        Self { total: batch.len(), questions }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Survey Response Analysis ===")?;
        writeln!(f, "Total responses: {}", self.total)?;
        for q in &self.questions {
            writeln!(f)?;
            writeln!(f, "Question: {}", q.question)?;
            writeln!(f, "Number of responses: {}", q.responses)?;
            writeln!(f, "Sample responses (first {}):", SAMPLE_COUNT)?;
            for sample in &q.samples {
                writeln!(f, "- {}", sample)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::ResponseRecord;

    fn record(question: &str, response: &str) -> ResponseRecord {
        ResponseRecord {
            persona: "p".into(),
            question: question.into(),
            response: response.into(),
            source_persona: String::new(),
        }
    }

    #[test]
    fn test_groups_by_question_in_order() {
        let long = "x".repeat(400);
        let batch = SimulationBatch::from(vec![
            record("weekend?", "hiking"),
            record("weekend?", &long),
            record("pets?", "cats"),
            record("weekend?", "reading"),
        ]);

        let summary = BatchSummary::from_batch(&batch);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.questions.len(), 2);
        assert_eq!(summary.questions[0].question, "weekend?");
        assert_eq!(summary.questions[0].responses, 3);
        assert_eq!(summary.questions[0].samples.len(), 2);
        assert_eq!(summary.questions[0].samples[1].len(), 150);
        assert_eq!(summary.questions[1].samples, vec!["cats".to_string()]);

        let text = summary.to_string();
        assert!(text.contains("Total responses: 4"));
        assert!(text.contains("Question: pets?"));
    }

    #[test]
    fn test_empty_batch() {
        let summary = BatchSummary::from_batch(&SimulationBatch::new());
        assert_eq!(summary, BatchSummary::default());
    }
}
