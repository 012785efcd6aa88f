//! Query and aggregation DSL compiler for procurement search
//!
//! Turns application-level search options (filter clauses, aggregation
//! specs, sort) into request bodies for a nested-document search engine,
//! and flattens the engine's aggregation answers back into plain
//! summaries.
//!
//! # Components
//!
//! - [`query::NestedResolver`] - maps a field path to its nested scope
//! - [`query::FilterCompiler`] - filter clauses to engine filter fragments
//! - [`query::AggregationBuilder`] - aggregation specs to a request tree
//! - [`query::SearchBodyBuilder`] - complete search bodies, with an
//!   optional country restriction
//! - [`tree::inject_nested_filter`] / [`tree::inject_into_aggregations`] -
//!   push a filter below nested scopes
//! - [`registry::Registry`] - the named aggregation catalog and parsers
//! - [`tree::compact_aggregations`] - strip synthetic wrapper layers
//!
//! Conditions such as unknown aggregation ids or non-numeric comparison
//! values go through [`Diagnostics`]: strict mode returns them as errors,
//! lenient mode logs them and carries on with a degraded result.

pub mod config;
pub mod error;
pub mod query;
pub mod registry;
pub mod tree;

pub use config::DslConfig;
pub use error::{Diagnostics, DslError, ErrorMode};
pub use query::{
    AggregationKind, AggregationSpec, CompareMode, FilterClause, FilterKind, SearchOptions,
    SortOption,
};
pub use registry::{AggregationSet, ClassificationNames, NoNames, Registry, Summary};

use query::{AggregationBuilder, FilterCompiler, NestedResolver, SearchBodyBuilder};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Result type for DSL operations
pub type Result<T> = std::result::Result<T, DslError>;

/// Entry point bundling configuration and the nested-path resolver
#[derive(Debug, Clone)]
pub struct SearchDsl {
    config: DslConfig,
    resolver: NestedResolver,
}

impl Default for SearchDsl {
    fn default() -> Self {
        Self::new(DslConfig::default())
    }
}

impl SearchDsl {
    pub fn new(config: DslConfig) -> Self {
        let resolver = NestedResolver::new(config.query.nested_scopes.clone());
        Self { config, resolver }
    }

    pub fn config(&self) -> &DslConfig {
        &self.config
    }

    pub fn resolver(&self) -> &NestedResolver {
        &self.resolver
    }

    /// Fresh reporting channel in the configured mode
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new(self.config.errors.mode)
    }

    pub fn compile_filter(
        &self,
        clause: &FilterClause,
        diag: &mut Diagnostics,
    ) -> Result<Option<Value>> {
        FilterCompiler::new(&self.resolver).compile(clause, diag)
    }

    pub fn build_aggregations(&self, specs: &[AggregationSpec]) -> Map<String, Value> {
        AggregationBuilder::new(&self.resolver, self.config.query.default_bucket_size)
            .build(specs)
    }

    pub fn search_body(&self, options: &SearchOptions, diag: &mut Diagnostics) -> Result<Value> {
        SearchBodyBuilder::new(&self.resolver, &self.config.query).assemble(options, diag)
    }

    pub fn country_search_body(
        &self,
        options: &SearchOptions,
        country: Option<&str>,
        diag: &mut Diagnostics,
    ) -> Result<Value> {
        SearchBodyBuilder::new(&self.resolver, &self.config.query)
            .assemble_for_country(options, country, diag)
    }

    /// Select named aggregations from the built-in registry
    pub fn named_aggregations<S: AsRef<str>>(
        &self,
        ids: &[S],
        diag: &mut Diagnostics,
    ) -> Result<AggregationSet<'static>> {
        Registry::global().select(ids, diag)
    }

    /// Parse an engine answer with the parsers of `set`
    pub fn parse_answer(
        &self,
        set: &AggregationSet<'_>,
        answer: &Value,
        names: &dyn ClassificationNames,
        tender_count: u64,
        diag: &mut Diagnostics,
    ) -> Result<BTreeMap<String, Summary>> {
        set.parse(answer, names, tender_count, &self.config.registry, diag)
    }

    /// Restrict an assembled body to one country, see
    /// [`SearchBodyBuilder::restrict_to_country`]
    pub fn restrict_to_country(
        &self,
        body: &mut Value,
        country: &str,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        SearchBodyBuilder::new(&self.resolver, &self.config.query)
            .restrict_to_country(body, country, diag)
    }

    pub fn inject_nested_filter(&self, tree: &mut Value, scope: &str, filter: &Value) -> usize {
        tree::inject_nested_filter(tree, scope, filter)
    }

    pub fn inject_into_aggregations(
        &self,
        aggregations: &mut Map<String, Value>,
        scope: &str,
        filter: &Value,
    ) -> usize {
        tree::inject_into_aggregations(aggregations, scope, filter)
    }

    pub fn compact(&self, answer: &mut Value) {
        tree::compact_aggregations(answer)
    }
}
