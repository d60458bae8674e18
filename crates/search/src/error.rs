use thiserror::Error;
use toolmux_protocol::SearchMethod;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search method {0} is not supported")]
    UnsupportedMethod(SearchMethod),

    #[error("Search method NONE does not use a provider")]
    NoneProvider,

    #[error("Invalid provider config: {0}")]
    InvalidConfig(String),

    #[error("Provider '{provider}' failure: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },
}
