//! # toolmux store
//!
//! Configuration persistence contract and the per-endpoint resolved-config
//! cache.
//!
//! ## Read path
//!
//! ```text
//! getResolvedConfig(namespace, endpoint)
//!     │
//!     ├──> cache hit ────────────> ResolvedConfig (value copy)
//!     │
//!     └──> single-flight fetch
//!            ├─> find_namespace / find_endpoint
//!            ├─> find_tool_defer_loading_overrides
//!            ├─> find_tool_search_config
//!            └─> resolve() ──> cached per endpoint uuid
//! ```
//!
//! Writes go through [`ConfigService`], which invalidates every endpoint the
//! write can affect. A failed fetch resolves to the fail-safe config and is
//! never cached, so recovery needs no manual intervention.

mod contract;
mod error;
mod memory;
mod resolver;
mod service;

pub use contract::{ConfigStore, EndpointUpdate, NamespaceUpdate, ServerRecord, ToolRecord};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use resolver::ConfigResolver;
pub use service::ConfigService;
