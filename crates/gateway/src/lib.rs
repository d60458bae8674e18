//! # toolmux gateway
//!
//! The endpoint-facing half of the discovery core: the built-in
//! `search_tools` and `execute_tool` virtual tools, the advertise-list
//! middleware that injects, flags, and filters tools per endpoint, and the
//! tool-search configuration CRUD surface.
//!
//! ## Advertise path
//!
//! ```text
//! upstream tools
//!     │
//!     ├──> inject search_tools   (defer loading on, method != NONE)
//!     ├──> apply defer_loading   (per-tool override, else endpoint default)
//!     └──> visibility filter     (ALL passes, SEARCH_ONLY keeps built-ins)
//! ```
//!
//! Middleware failures never fail the advertise call; the upstream list is
//! returned unchanged and the error logged.

mod builtin;
mod config_api;
mod error;
mod execute_tool;
mod gateway;
mod middleware;
mod proxy;
mod search_tools;
mod validation;

pub use builtin::{
    execute_tool_definition, is_builtin_tool, search_tools_definition, EXECUTE_TOOL_NAME,
    SEARCH_TOOLS_NAME,
};
pub use config_api::{
    AccessPolicy, OwnerPolicy, ToolSearchConfigApi, UpdateToolDeferLoadingRequest,
    UpsertToolSearchConfigRequest,
};
pub use error::{GatewayError, Result};
pub use execute_tool::run_execute_tool;
pub use gateway::{EndpointContext, Gateway};
pub use middleware::advertise_tools;
pub use proxy::ToolProxy;
pub use search_tools::run_search_tools;
pub use validation::{format_validation_failure, validate_tool_arguments, SchemaViolation};
