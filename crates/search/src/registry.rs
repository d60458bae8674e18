use std::collections::HashMap;

use serde_json::Value;
use toolmux_protocol::SearchMethod;

use crate::bm25_provider::Bm25Provider;
use crate::error::{Result, SearchError};
use crate::provider::SearchProvider;
use crate::regex_provider::RegexProvider;

pub type ProviderFactory = fn(Option<&Value>) -> Result<Box<dyn SearchProvider>>;

fn regex_factory(config: Option<&Value>) -> Result<Box<dyn SearchProvider>> {
    Ok(Box::new(RegexProvider::from_config(config)))
}

fn bm25_factory(config: Option<&Value>) -> Result<Box<dyn SearchProvider>> {
    Ok(Box::new(Bm25Provider::from_config(config)?))
}

/// Maps search methods to provider factories.
///
/// `NONE` is always supported but has no factory: the service answers NONE
/// queries itself. `EMBEDDINGS` stays unregistered until a provider exists,
/// so the registry reports it unsupported.
pub struct ProviderRegistry {
    factories: HashMap<SearchMethod, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::new();
        registry.register(SearchMethod::Regex, regex_factory);
        registry.register(SearchMethod::Bm25, bm25_factory);
        registry
    }

    pub fn register(&mut self, method: SearchMethod, factory: ProviderFactory) {
        self.factories.insert(method, factory);
    }

    pub fn is_supported(&self, method: SearchMethod) -> bool {
        method == SearchMethod::None || self.factories.contains_key(&method)
    }

    /// Instantiate an uninitialized provider for `method`.
    pub fn create(
        &self,
        method: SearchMethod,
        config: Option<&Value>,
    ) -> Result<Box<dyn SearchProvider>> {
        if method == SearchMethod::None {
            return Err(SearchError::NoneProvider);
        }
        let factory = self
            .factories
            .get(&method)
            .ok_or(SearchError::UnsupportedMethod(method))?;
        factory(config)
    }

    /// Supported methods in declaration order.
    pub fn list(&self) -> Vec<SearchMethod> {
        [
            SearchMethod::None,
            SearchMethod::Regex,
            SearchMethod::Bm25,
            SearchMethod::Embeddings,
        ]
        .into_iter()
        .filter(|method| self.is_supported(*method))
        .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_builtin_providers()
    }
}
