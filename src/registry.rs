//! Named grammar and processor implementations, selected by config key.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CacheDbError;
use crate::grammar::{CacheGrammar, CacheSchemaGrammar, Grammar, SchemaGrammar};
use crate::processor::{CacheProcessor, Processor};

/// Key of the built-in Caché implementations.
pub const DEFAULT_STRATEGY: &str = "cache";

/// The grammar, schema grammar and processor a connection works with.
#[derive(Debug, Clone)]
pub struct Strategies {
    pub grammar: Arc<dyn Grammar>,
    pub schema_grammar: Arc<dyn SchemaGrammar>,
    pub processor: Arc<dyn Processor>,
}

impl Default for Strategies {
    fn default() -> Self {
        Self {
            grammar: Arc::new(CacheGrammar::new()),
            schema_grammar: Arc::new(CacheSchemaGrammar::new()),
            processor: Arc::new(CacheProcessor::new()),
        }
    }
}

/// Lookup table from config keys to strategy implementations.
///
/// Starts out with the Caché implementations registered under `cache`.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    grammars: HashMap<String, Arc<dyn Grammar>>,
    schema_grammars: HashMap<String, Arc<dyn SchemaGrammar>>,
    processors: HashMap<String, Arc<dyn Processor>>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let builtin = Strategies::default();
        let mut registry = Self {
            grammars: HashMap::new(),
            schema_grammars: HashMap::new(),
            processors: HashMap::new(),
        };
        registry
            .grammars
            .insert(DEFAULT_STRATEGY.to_string(), builtin.grammar);
        registry
            .schema_grammars
            .insert(DEFAULT_STRATEGY.to_string(), builtin.schema_grammar);
        registry
            .processors
            .insert(DEFAULT_STRATEGY.to_string(), builtin.processor);
        registry
    }
}

fn lookup<T: ?Sized>(
    table: &HashMap<String, Arc<T>>,
    kind: &str,
    key: &str,
) -> Result<Arc<T>, CacheDbError> {
    table
        .get(key)
        .cloned()
        .ok_or_else(|| CacheDbError::ConfigError(format!("unknown {kind} strategy: {key}")))
}

impl StrategyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_grammar(&mut self, key: impl Into<String>, grammar: Arc<dyn Grammar>) {
        self.grammars.insert(key.into(), grammar);
    }

    pub fn register_schema_grammar(
        &mut self,
        key: impl Into<String>,
        grammar: Arc<dyn SchemaGrammar>,
    ) {
        self.schema_grammars.insert(key.into(), grammar);
    }

    pub fn register_processor(&mut self, key: impl Into<String>, processor: Arc<dyn Processor>) {
        self.processors.insert(key.into(), processor);
    }

    /// Resolve one implementation per concern.
    ///
    /// # Errors
    /// Returns `CacheDbError::ConfigError` naming the first unknown key.
    pub fn resolve(
        &self,
        grammar: &str,
        schema_grammar: &str,
        processor: &str,
    ) -> Result<Strategies, CacheDbError> {
        Ok(Strategies {
            grammar: lookup(&self.grammars, "grammar", grammar)?,
            schema_grammar: lookup(&self.schema_grammars, "schema grammar", schema_grammar)?,
            processor: lookup(&self.processors, "processor", processor)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::grammar::{DialectContext, Limit};

    #[test]
    fn builtin_key_resolves() {
        let registry = StrategyRegistry::new();
        let strategies = registry
            .resolve(DEFAULT_STRATEGY, DEFAULT_STRATEGY, DEFAULT_STRATEGY)
            .unwrap();
        let ctx = DialectContext {
            limit: Some(Limit::Rows(2)),
            ..DialectContext::table("t")
        };
        assert_eq!(strategies.grammar.compile_select(&ctx), "select top 2 * from t");
    }

    #[test]
    fn unknown_key_is_a_config_error() {
        let registry = StrategyRegistry::new();
        let err = registry.resolve("cache", "oracle", "cache").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn registered_keys_are_used() {
        let mut registry = StrategyRegistry::new();
        registry.register_grammar("legacy", Arc::new(CacheGrammar::new()));
        assert!(registry.resolve("legacy", "cache", "cache").is_ok());
    }
}
