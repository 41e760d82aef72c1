//! Rule-based query planner.
//!
//! Complexity is classified by counting which pattern families match the
//! lowercased query. Non-simple queries are decomposed by the first matching
//! rule: comparison, causal, explanatory, conjunctive, else a single echo.

use super::{single_query_plan, QueryPlanner};
use crate::strategy::tokenize;
use crate::types::{
    Complexity, FollowUpQuery, PlanStrategy, QueryContext, QueryPlan, SearchResult, SubQuery,
    DEFAULT_TOP_K,
};
use async_trait::async_trait;
use regex::Regex;
use scout_core::AppResult;
use std::collections::HashSet;
use std::sync::LazyLock;

const COMPARISON_TOP_K: usize = 8;
const MAX_TOPIC_CHARS: usize = 50;
const MAX_CONJUNCTS: usize = 3;

static COMPARISON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(compare|comparison|comparing|difference|differences|versus|vs|contrast)\b")
        .unwrap()
});

static CAUSAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(before|after|then|because|therefore|consequently|impact|impacts|effect|effects|result|results|consequence|consequences)\b").unwrap()
});

static MULTI_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(why|how)\b.*\b(and|also)\b").unwrap());

static MULTI_QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?.*\?").unwrap());

static CONJUNCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(and|or|also|additionally|furthermore)\b").unwrap());

static WH_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(what|when|where|which|who|why|how)\b").unwrap());

static TEMPORAL_CAUSAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(before|after|impact|impacts|effect|effects|result|results|consequence|consequences)\b").unwrap()
});

static EFFECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(impact|impacts|effect|effects|result|results|consequence|consequences)\b")
        .unwrap()
});

static BACKGROUND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(before|after|cause|causes|caused|because)\b").unwrap());

static EXPLANATORY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(how|why|explain|explains|explained)\b").unwrap());

static CONJUNCT_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:and|also|additionally)\b").unwrap());

static DIFFERENCE_BETWEEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)difference\s+between\s+(.+?)\s+and\s+(.+)").unwrap());

static COMPARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)compare\s+(.+?)\s+(?:and|with|to)\s+(.+)").unwrap());

static VERSUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(.+?)\s+(?:vs\.?|versus)\s+(.+)").unwrap());

static QUESTION_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(what|when|where|which|who|why|how|explain|describe|is|are|was|were|does|do|did|can|could|would|should|the|a|an)\b").unwrap()
});

static PUNCTUATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'([^']+)'").unwrap());

static PHRASE_STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "the", "this", "that", "these", "those", "is", "are", "was", "were", "be",
        "been", "being", "do", "does", "did", "have", "has", "had", "can", "could", "should",
        "would", "will", "may", "might", "must", "of", "in", "on", "at", "to", "for", "from",
        "with", "by", "about", "into", "between", "over", "under", "and", "or", "but", "also",
        "additionally", "furthermore", "then", "because", "therefore", "consequently", "what",
        "when", "where", "which", "who", "whom", "why", "how", "explain", "describe", "tell",
        "me", "i", "we", "you", "it", "its", "they", "their", "there", "vs", "versus",
        "compare", "comparison", "difference", "differences", "contrast", "before", "after",
        "impact", "impacts", "effect", "effects", "result", "results", "consequence",
        "consequences", "cause", "causes", "caused", "happen", "happens", "happened",
    ]
    .into_iter()
    .collect()
});

/// Classify a query as simple, moderate or complex.
///
/// Counts matching pattern families: two or more complex families make it
/// complex; one complex or two moderate families make it moderate.
pub fn analyze_complexity(query: &str) -> Complexity {
    let lower = query.to_lowercase();

    let complex_matches = [
        &*COMPARISON_RE,
        &*CAUSAL_RE,
        &*MULTI_PART_RE,
        &*MULTI_QUESTION_RE,
    ]
    .iter()
    .filter(|re| re.is_match(&lower))
    .count();

    let moderate_matches = [&*CONJUNCTION_RE, &*WH_WORD_RE]
        .iter()
        .filter(|re| re.is_match(&lower))
        .count();

    if complex_matches >= 2 {
        Complexity::Complex
    } else if complex_matches >= 1 || moderate_matches >= 2 {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}

/// The two entities of a comparison query, or an empty list.
///
/// Recognizes `difference between X and Y`, `compare X and/with/to Y` and
/// `X vs Y` / `X versus Y`.
pub fn extract_comparison_entities(query: &str) -> Vec<String> {
    let text = query.trim();

    for re in [&*DIFFERENCE_BETWEEN_RE, &*COMPARE_RE, &*VERSUS_RE] {
        if let Some(caps) = re.captures(text) {
            let first = clean_entity(caps.get(1).map_or("", |m| m.as_str()));
            let second = clean_entity(caps.get(2).map_or("", |m| m.as_str()));
            if !first.is_empty() && !second.is_empty() {
                return vec![first, second];
            }
        }
    }

    Vec::new()
}

fn clean_entity(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['?', '.', '!'])
        .trim()
        .to_string()
}

/// Runs of content words, in order, without duplicates.
///
/// Stop words, question words and the planner's own marker words break
/// phrases, as does punctuation.
pub fn extract_key_phrases(query: &str) -> Vec<String> {
    let mut phrases: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    let mut current: Vec<&str> = Vec::new();

    let mut flush = |current: &mut Vec<&str>, phrases: &mut Vec<String>| {
        if !current.is_empty() {
            let phrase = current.join(" ");
            if seen.insert(phrase.to_lowercase()) {
                phrases.push(phrase);
            }
            current.clear();
        }
    };

    for segment in query.split([',', ';', ':', '.', '?', '!', '(', ')', '"']) {
        for raw in segment.split_whitespace() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            if word.is_empty() || PHRASE_STOP_WORDS.contains(word.to_lowercase().as_str()) {
                flush(&mut current, &mut phrases);
            } else {
                current.push(word);
            }
        }
        flush(&mut current, &mut phrases);
    }

    phrases
}

/// The query with question words and punctuation removed, at most fifty
/// characters.
pub fn extract_main_topic(query: &str) -> String {
    let stripped = QUESTION_WORDS_RE.replace_all(query, " ");
    let stripped = PUNCTUATION_RE.replace_all(&stripped, " ");
    let collapsed = WHITESPACE_RE.replace_all(stripped.trim(), " ");

    let topic = if collapsed.is_empty() {
        query.trim()
    } else {
        collapsed.as_ref()
    };

    topic
        .chars()
        .take(MAX_TOPIC_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Deterministic planner driven by regular expressions.
#[derive(Debug, Default, Clone)]
pub struct HeuristicPlanner;

impl HeuristicPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Build a plan for `query` without any I/O.
    pub fn plan(&self, query: &str) -> QueryPlan {
        let complexity = analyze_complexity(query);
        if complexity == Complexity::Simple {
            return single_query_plan(query, PlanStrategy::Direct);
        }

        let lower = query.to_lowercase();
        let (strategy, sub_queries) = self
            .comparison(query, &lower)
            .or_else(|| self.causal(query, &lower))
            .or_else(|| self.explanatory(query, &lower))
            .or_else(|| self.conjunctive(query, &lower))
            .unwrap_or_else(|| {
                (
                    PlanStrategy::Direct,
                    vec![SubQuery::new(
                        query,
                        "No decomposition rule applies; searching the query as written",
                        DEFAULT_TOP_K,
                    )],
                )
            });

        QueryPlan {
            original_query: query.to_string(),
            sub_queries,
            strategy,
            complexity,
        }
    }

    fn comparison(&self, query: &str, lower: &str) -> Option<(PlanStrategy, Vec<SubQuery>)> {
        if !COMPARISON_RE.is_match(lower) {
            return None;
        }

        let entities = extract_comparison_entities(query);
        let [first, second] = entities.as_slice() else {
            return None;
        };

        Some((
            PlanStrategy::Comparison,
            vec![
                SubQuery::new(
                    format!("Information about {}", first),
                    format!("Gather facts about '{}' before comparing", first),
                    DEFAULT_TOP_K,
                ),
                SubQuery::new(
                    format!("Information about {}", second),
                    format!("Gather facts about '{}' before comparing", second),
                    DEFAULT_TOP_K,
                )
                .with_dependencies(vec![0]),
                SubQuery::new(
                    format!("{} vs {} comparison", first, second),
                    "Find passages contrasting both directly",
                    COMPARISON_TOP_K,
                )
                .with_dependencies(vec![0, 1]),
            ],
        ))
    }

    fn causal(&self, query: &str, lower: &str) -> Option<(PlanStrategy, Vec<SubQuery>)> {
        if !TEMPORAL_CAUSAL_RE.is_match(lower) {
            return None;
        }

        let primary = extract_key_phrases(query)
            .into_iter()
            .next()
            .unwrap_or_else(|| extract_main_topic(query));
        if primary.is_empty() {
            return None;
        }

        let mut sub_queries = vec![SubQuery::new(
            primary.clone(),
            "Establish the primary subject",
            DEFAULT_TOP_K,
        )];

        if EFFECT_RE.is_match(lower) {
            sub_queries.push(
                SubQuery::new(
                    format!("Effects and consequences of {}", primary),
                    "The query asks about outcomes",
                    DEFAULT_TOP_K,
                )
                .with_dependencies(vec![0]),
            );
        }

        if BACKGROUND_RE.is_match(lower) {
            sub_queries.push(
                SubQuery::new(
                    format!("Background and causes of {}", primary),
                    "The query asks about what led up to it",
                    DEFAULT_TOP_K,
                )
                .with_dependencies(vec![0]),
            );
        }

        Some((PlanStrategy::Causal, sub_queries))
    }

    fn explanatory(&self, query: &str, lower: &str) -> Option<(PlanStrategy, Vec<SubQuery>)> {
        if !EXPLANATORY_RE.is_match(lower) {
            return None;
        }

        let topic = extract_main_topic(query);
        if topic.is_empty() {
            return None;
        }

        Some((
            PlanStrategy::Explanatory,
            vec![
                SubQuery::new(
                    format!("{} definition overview", topic),
                    "Start from what it is",
                    DEFAULT_TOP_K,
                ),
                SubQuery::new(
                    format!("{} examples use cases", topic),
                    "Concrete usage illustrates the explanation",
                    DEFAULT_TOP_K,
                )
                .with_dependencies(vec![0]),
            ],
        ))
    }

    fn conjunctive(&self, query: &str, lower: &str) -> Option<(PlanStrategy, Vec<SubQuery>)> {
        if !CONJUNCT_SPLIT_RE.is_match(lower) {
            return None;
        }

        let sub_queries: Vec<SubQuery> = CONJUNCT_SPLIT_RE
            .split(query)
            .map(|part| part.trim().trim_matches([',', '?', '.', '!', ';']).trim())
            .filter(|part| part.chars().count() > 3)
            .take(MAX_CONJUNCTS)
            .map(|part| SubQuery::new(part, "One part of a multi-part query", DEFAULT_TOP_K))
            .collect();

        if sub_queries.is_empty() {
            return None;
        }

        Some((PlanStrategy::Conjunctive, sub_queries))
    }

    /// Follow-up for the first gap the existing results do not already cover.
    pub fn follow_up(
        &self,
        original_query: &str,
        existing_results: &[SearchResult],
        gaps: &[String],
    ) -> Option<FollowUpQuery> {
        let key_phrase = extract_key_phrases(original_query).into_iter().next()?;

        let covered: Vec<Vec<String>> = existing_results
            .iter()
            .map(|r| tokenize(&r.chunk.text))
            .collect();

        let (gap, term) = gaps.iter().find_map(|gap| {
            let term = QUOTED_RE
                .captures(gap)
                .and_then(|caps| caps.get(1))
                .map_or(gap.as_str(), |m| m.as_str())
                .trim()
                .to_string();
            let words = tokenize(&term);
            let resolved =
                !words.is_empty() && covered.iter().any(|text| contains_words(text, &words));
            (!resolved).then_some((gap, term))
        })?;

        let term_words = tokenize(&term);
        let query = if term_words.is_empty()
            || contains_words(&tokenize(&key_phrase), &term_words)
        {
            key_phrase
        } else {
            format!("{} {}", key_phrase, term)
        };

        Some(FollowUpQuery {
            query,
            reasoning: format!("Refining to address gap: {}", gap),
        })
    }
}

/// Whether `words` occur as a contiguous run of whole words in `text`.
fn contains_words(text: &[String], words: &[String]) -> bool {
    !words.is_empty() && text.windows(words.len()).any(|window| window == words)
}

#[async_trait]
impl QueryPlanner for HeuristicPlanner {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn create_plan(
        &self,
        query: &str,
        _context: Option<&QueryContext>,
    ) -> AppResult<QueryPlan> {
        Ok(self.plan(query))
    }

    async fn generate_follow_up_query(
        &self,
        original_query: &str,
        existing_results: &[SearchResult],
        gaps: &[String],
    ) -> AppResult<Option<FollowUpQuery>> {
        Ok(self.follow_up(original_query, existing_results, gaps))
    }
}
