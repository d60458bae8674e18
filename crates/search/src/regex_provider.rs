use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::Value;

use async_trait::async_trait;
use toolmux_protocol::{AvailableTool, ToolDef};

use crate::error::Result;
use crate::provider::{
    neutral_results, sort_and_truncate, SearchProvider, SearchQuery, ToolMatch,
    EMPTY_QUERY_REASON,
};

const NAME_WEIGHT: f64 = 0.6;
const DESCRIPTION_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RegexParams {
    /// Explicit pattern; when absent (or invalid) the query is matched as a
    /// literal substring.
    pattern: Option<String>,
    case_sensitive: bool,
    fields: Option<Vec<String>>,
}

/// Substring/pattern matcher over tool names and descriptions.
///
/// Scoring favors earlier and longer matches: per matched field the score
/// accumulates the field weight, a position bonus of
/// `max(0.05, 0.20 - 0.003 * index)` and a length bonus of
/// `min(0.20, 0.02 * length)`, clamped to `[0, 1]` at the end.
pub struct RegexProvider {
    params: RegexParams,
    /// Compiled configured pattern; stays `None` when no pattern is
    /// configured or it failed to compile (fallback to literal query).
    configured: Option<Regex>,
}

impl RegexProvider {
    pub fn from_config(config: Option<&Value>) -> Self {
        let params = match config {
            Some(value) => match serde_json::from_value::<RegexParams>(value.clone()) {
                Ok(params) => params,
                Err(err) => {
                    log::warn!("Ignoring malformed regex provider config: {err}");
                    RegexParams::default()
                }
            },
            None => RegexParams::default(),
        };
        Self {
            params,
            configured: None,
        }
    }

    fn fields(&self) -> Vec<&str> {
        match &self.params.fields {
            Some(fields) => fields.iter().map(String::as_str).collect(),
            None => vec!["name", "description"],
        }
    }

    fn matcher_for(&self, query: &str) -> Option<Regex> {
        if let Some(configured) = &self.configured {
            return Some(configured.clone());
        }
        // Literal substring: every regex metacharacter in the query escaped.
        RegexBuilder::new(&regex::escape(query))
            .case_insensitive(!self.params.case_sensitive)
            .build()
            .ok()
    }

    fn score_tool(&self, matcher: &Regex, fields: &[&str], tool: &ToolDef) -> Option<(f32, String)> {
        let mut score = 0.0f64;
        let mut matched_fields: Vec<&str> = Vec::new();

        for field in fields {
            let (weight, text) = match *field {
                "name" => (NAME_WEIGHT, Some(tool.name.as_str())),
                "description" => (DESCRIPTION_WEIGHT, tool.description.as_deref()),
                _ => continue,
            };
            let Some(text) = text else {
                continue;
            };
            // At most one match per field counts.
            if let Some(found) = matcher.find(text) {
                let position_bonus = (0.20 - 0.003 * found.start() as f64).max(0.05);
                let length_bonus = (0.02 * found.as_str().len() as f64).min(0.20);
                score += weight + position_bonus + length_bonus;
                matched_fields.push(*field);
            }
        }

        if matched_fields.is_empty() {
            return None;
        }

        let reason = format!("Matched in {}", matched_fields.join(", "));
        Some((score.clamp(0.0, 1.0) as f32, reason))
    }
}

#[async_trait]
impl SearchProvider for RegexProvider {
    fn name(&self) -> &'static str {
        "regex"
    }

    async fn initialize(&mut self) -> Result<()> {
        self.configured = None;
        if let Some(pattern) = &self.params.pattern {
            let compiled = RegexBuilder::new(pattern)
                .case_insensitive(!self.params.case_sensitive)
                .build();
            match compiled {
                Ok(regex) => self.configured = Some(regex),
                // A broken configured pattern degrades to literal-query
                // matching instead of failing every search.
                Err(err) => log::warn!("Configured pattern does not compile: {err}"),
            }
        }
        Ok(())
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

        let Some(matcher) = self.matcher_for(trimmed) else {
            return Ok(Vec::new());
        };
        let fields = self.fields();

        let matches: Vec<ToolMatch> = available
            .iter()
            .filter_map(|entry| {
                self.score_tool(&matcher, &fields, &entry.tool)
                    .map(|(score, match_reason)| ToolMatch {
                        tool: entry.tool.clone(),
                        server_uuid: entry.server_uuid,
                        score,
                        match_reason,
                    })
            })
            .collect();

        log::debug!("regex search '{trimmed}': {} matches", matches.len());
        Ok(sort_and_truncate(matches, limit))
    }

    async fn dispose(&self) -> Result<()> {
        Ok(())
    }
}
