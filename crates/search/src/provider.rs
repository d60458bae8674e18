use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use toolmux_protocol::{AvailableTool, ToolDef};

use crate::error::Result;

/// Results returned when the caller does not cap them explicitly.
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Score and reason attached to tools that matched no query at all
/// (empty query, or search disabled).
pub(crate) const NEUTRAL_SCORE: f32 = 0.5;
pub(crate) const EMPTY_QUERY_REASON: &str = "No search query provided";

/// One `search_tools` invocation as seen by a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_uuid: Option<Uuid>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
            namespace_uuid: None,
            endpoint_uuid: None,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn limit(&self) -> usize {
        self.max_results.unwrap_or(DEFAULT_MAX_RESULTS)
    }
}

/// One ranked hit: the matched tool, its origin server, a score in `[0, 1]`,
/// and a human-readable reason for the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMatch {
    pub tool: ToolDef,
    pub server_uuid: Uuid,
    pub score: f32,
    pub match_reason: String,
}

/// Capability set every search method implements.
///
/// `initialize` is idempotent for the same configuration. `search` receives
/// the pool by reference and must not retain it between calls; each call
/// ranks against exactly the tools it is handed.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Stable identifier of the method (`"regex"`, `"bm25"`).
    fn name(&self) -> &'static str;

    async fn initialize(&mut self) -> Result<()>;

    async fn search(
        &self,
        query: &SearchQuery,
        available: &[AvailableTool],
    ) -> Result<Vec<ToolMatch>>;

    async fn dispose(&self) -> Result<()>;
}

/// Empty-query policy shared by REGEX and BM25, and the NONE fast path:
/// the first `limit` tools, neutrally scored.
pub(crate) fn neutral_results(
    available: &[AvailableTool],
    limit: usize,
    reason: &str,
) -> Vec<ToolMatch> {
    available
        .iter()
        .take(limit)
        .map(|entry| ToolMatch {
            tool: entry.tool.clone(),
            server_uuid: entry.server_uuid,
            score: NEUTRAL_SCORE,
            match_reason: reason.to_string(),
        })
        .collect()
}

/// Stable descending sort, then cap. Stability keeps equal-score tools in
/// pool order, which makes ranking deterministic.
pub(crate) fn sort_and_truncate(mut matches: Vec<ToolMatch>, limit: usize) -> Vec<ToolMatch> {
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches.truncate(limit);
    matches
}
