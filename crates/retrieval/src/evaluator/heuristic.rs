//! Deterministic evaluator based on similarity and keyword coverage.

use super::ResultEvaluator;
use crate::strategy::{extract_keywords, tokenize};
use crate::types::{Evaluation, QueryContext, SearchResult};
use async_trait::async_trait;
use scout_core::AppResult;
use std::collections::HashSet;

const RELEVANCE_WEIGHT: f32 = 0.6;
const COVERAGE_WEIGHT: f32 = 0.4;
const RELEVANCE_SAMPLE: usize = 3;
const MIN_COVERAGE: f32 = 0.5;

/// Scores results without any model.
///
/// Confidence is `0.6 * relevance + 0.4 * coverage`: relevance is the mean
/// of the best three similarities, coverage the share of query keywords that
/// appear as whole words in some result. Uncovered keywords are the gaps.
#[derive(Debug, Default, Clone)]
pub struct HeuristicEvaluator;

impl HeuristicEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, query: &str, results: &[SearchResult], threshold: f32) -> Evaluation {
        if results.is_empty() {
            return Evaluation::no_results();
        }

        let mut similarities: Vec<f32> = results
            .iter()
            .map(|r| r.similarity.clamp(0.0, 1.0))
            .collect();
        similarities.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let top = &similarities[..similarities.len().min(RELEVANCE_SAMPLE)];
        let relevance = top.iter().sum::<f32>() / top.len() as f32;

        let words: HashSet<String> = results
            .iter()
            .flat_map(|r| tokenize(&r.chunk.text))
            .collect();
        let keywords = extract_keywords(query);
        let missing: Vec<&String> = keywords.iter().filter(|kw| !words.contains(*kw)).collect();

        // Nothing to look for counts as fully covered
        let coverage = if keywords.is_empty() {
            1.0
        } else {
            (keywords.len() - missing.len()) as f32 / keywords.len() as f32
        };

        let confidence =
            (RELEVANCE_WEIGHT * relevance + COVERAGE_WEIGHT * coverage).clamp(0.0, 1.0);

        Evaluation {
            confidence,
            is_complete: confidence >= threshold && coverage >= MIN_COVERAGE,
            gaps: missing
                .into_iter()
                .map(|kw| format!("Missing information about '{}'", kw))
                .collect(),
        }
    }
}

#[async_trait]
impl ResultEvaluator for HeuristicEvaluator {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn evaluate(
        &self,
        query: &str,
        results: &[SearchResult],
        confidence_threshold: f32,
        _context: Option<&QueryContext>,
    ) -> AppResult<Evaluation> {
        Ok(self.assess(query, results, confidence_threshold))
    }
}
