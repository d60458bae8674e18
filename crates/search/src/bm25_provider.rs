use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use toolmux_protocol::{AvailableTool, Bm25Params, ToolDef};

use crate::error::{Result, SearchError};
use crate::provider::{
    neutral_results, sort_and_truncate, SearchProvider, SearchQuery, ToolMatch,
    EMPTY_QUERY_REASON,
};

/// Okapi BM25 over the aggregated tool pool.
///
/// The index is rebuilt for every query: pools are small (thousands of
/// tools, not documents) and rebuilding keeps the provider stateless, so it
/// never holds a reference to a stale pool.
pub struct Bm25Provider {
    params: Bm25Params,
}

struct Document<'a> {
    entry: &'a AvailableTool,
    term_freq: HashMap<String, usize>,
    len: usize,
}

impl Bm25Provider {
    pub fn from_config(config: Option<&Value>) -> Result<Self> {
        let params = match config {
            Some(value) => serde_json::from_value::<Bm25Params>(value.clone())
                .map_err(|err| SearchError::InvalidConfig(err.to_string()))?,
            None => Bm25Params::default(),
        };
        Ok(Self { params })
    }

    fn document_text(&self, tool: &ToolDef) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.params.fields.len());
        for field in &self.params.fields {
            match field.as_str() {
                "name" => parts.push(tool.name.as_str()),
                "description" => {
                    if let Some(description) = tool.description.as_deref() {
                        parts.push(description);
                    }
                }
                _ => {}
            }
        }
        parts.join(" ")
    }

    fn index<'a>(&self, available: &'a [AvailableTool]) -> Vec<Document<'a>> {
        available
            .iter()
            .map(|entry| {
                let tokens = tokenize(&self.document_text(&entry.tool));
                let mut term_freq = HashMap::new();
                for token in &tokens {
                    *term_freq.entry(token.clone()).or_insert(0usize) += 1;
                }
                Document {
                    entry,
                    len: tokens.len(),
                    term_freq,
                }
            })
            .collect()
    }
}

/// Lowercase, split on runs of non-alphanumeric characters, drop empties.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect()
}

fn idf(doc_count: usize, doc_freq: usize) -> f64 {
    let n = doc_count as f64;
    let df = doc_freq as f64;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

fn match_reason(matched: &[String]) -> String {
    if matched.len() <= 3 {
        let quoted: Vec<String> = matched.iter().map(|term| format!("\"{term}\"")).collect();
        format!("Matched {}", quoted.join(", "))
    } else {
        format!("Matched {} terms", matched.len())
    }
}

#[async_trait]
impl SearchProvider for Bm25Provider {
    fn name(&self) -> &'static str {
        "bm25"
    }

    async fn initialize(&mut self) -> Result<()> {
        self.params.validate().map_err(SearchError::InvalidConfig)
    }

    async fn search(
        &self,
        query: &SearchQuery,
        available: &[AvailableTool],
    ) -> Result<Vec<ToolMatch>> {
        let limit = query.limit();
        let trimmed = query.query.trim();
        if trimmed.is_empty() {
            return Ok(neutral_results(available, limit, EMPTY_QUERY_REASON));
        }

        let query_tokens = tokenize(trimmed);
        if query_tokens.is_empty() {
            // Nothing alphanumeric to match against.
            return Ok(Vec::new());
        }

        let documents = self.index(available);
        let doc_count = documents.len();
        let total_len: usize = documents.iter().map(|doc| doc.len).sum();
        if doc_count == 0 || total_len == 0 {
            return Ok(Vec::new());
        }
        let avgdl = total_len as f64 / doc_count as f64;

        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for doc in &documents {
            for term in doc.term_freq.keys() {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let k1 = self.params.k1;
        let b = self.params.b;
        // Scores are normalized into [0, 1] by the theoretical per-term
        // ceiling: |Q| terms each bounded by ln(N+1) * (k1+1).
        let norm = query_tokens.len() as f64 * ((doc_count + 1) as f64).ln() * (k1 + 1.0);

        let mut matches = Vec::new();
        for doc in &documents {
            let mut raw = 0.0f64;
            let mut matched_terms: Vec<String> = Vec::new();
            for term in &query_tokens {
                let Some(&tf) = doc.term_freq.get(term) else {
                    continue;
                };
                if tf == 0 {
                    continue;
                }
                let tf = tf as f64;
                let df = doc_freq.get(term.as_str()).copied().unwrap_or(0);
                let denom = tf + k1 * (1.0 - b + b * doc.len as f64 / avgdl);
                raw += idf(doc_count, df) * (tf * (k1 + 1.0)) / denom;
                if !matched_terms.contains(term) {
                    matched_terms.push(term.clone());
                }
            }

            if norm <= 0.0 {
                continue;
            }
            let score = (raw / norm).clamp(0.0, 1.0);
            if score <= 0.0 {
                continue;
            }
            matches.push(ToolMatch {
                tool: doc.entry.tool.clone(),
                server_uuid: doc.entry.server_uuid,
                score: score as f32,
                match_reason: match_reason(&matched_terms),
            });
        }

        log::debug!("bm25 search '{trimmed}': {} matches", matches.len());
        Ok(sort_and_truncate(matches, limit))
    }

    async fn dispose(&self) -> Result<()> {
        Ok(())
    }
}
