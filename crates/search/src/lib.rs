//! Ranked retrieval over an aggregated tool pool.
//!
//! Providers implement one search method each (REGEX, BM25); the registry
//! maps methods to factories and the service caches initialized providers
//! keyed by `(method, provider config)`. `NONE` is a non-provider sentinel
//! handled entirely in the service layer.

mod bm25_provider;
mod error;
mod provider;
mod registry;
mod regex_provider;
mod service;

pub use bm25_provider::Bm25Provider;
pub use error::{Result, SearchError};
pub use provider::{SearchProvider, SearchQuery, ToolMatch, DEFAULT_MAX_RESULTS};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use regex_provider::RegexProvider;
pub use service::SearchService;
