use thiserror::Error;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },

    #[error(transparent)]
    Search(#[from] toolmux_search::SearchError),

    #[error(transparent)]
    Store(#[from] toolmux_store::StoreError),

    #[error("Upstream dispatch failed: {0}")]
    Dispatch(String),
}
