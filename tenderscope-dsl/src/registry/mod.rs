//! Named aggregation registry
//!
//! A fixed catalog of aggregation request templates, each paired with a
//! parser that turns the engine's answer for that template into a
//! [`Summary`]. Templates are never handed out by reference; every
//! request is a fresh copy, so callers may rewrite it freely.

mod catalog;
pub mod names;
pub mod parsers;
pub mod summary;

pub use names::{ClassificationNames, NoNames};
pub use parsers::answer_root;
pub use summary::{LotBidTotals, NamedCount, Summary, TopEntry, TopList};

use crate::config::RegistryConfig;
use crate::error::{Diagnostics, DslError};
use crate::Result;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

/// Parser for one named aggregation's answer
pub type ParseFn = fn(&Value, &ParseContext<'_>) -> Result<Summary>;

/// Inputs shared by every parser run
pub struct ParseContext<'a> {
    pub id: &'a str,
    pub names: &'a dyn ClassificationNames,
    pub language: &'a str,
    pub tender_count: u64,
    pub years: RangeInclusive<i32>,
}

/// One catalog entry
pub struct NamedAggregation {
    id: &'static str,
    request: Value,
    parse: ParseFn,
}

impl NamedAggregation {
    pub fn new(id: &'static str, request: Value, parse: ParseFn) -> Self {
        Self { id, request, parse }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    /// Deep copy of the request template
    pub fn request(&self) -> Value {
        self.request.clone()
    }

    pub fn parse(&self, answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
        (self.parse)(answer, ctx)
    }
}

impl std::fmt::Debug for NamedAggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedAggregation")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::builtin);

#[derive(Debug)]
pub struct Registry {
    entries: Vec<NamedAggregation>,
}

impl Registry {
    pub fn builtin() -> Self {
        Self {
            entries: catalog::builtin(),
        }
    }

    /// Process-wide built-in registry
    pub fn global() -> &'static Registry {
        &REGISTRY
    }

    pub fn get(&self, id: &str) -> Option<&NamedAggregation> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.id)
    }

    /// Select entries by id, in request order.
    ///
    /// Unknown ids are reported and skipped; repeated ids are selected once.
    pub fn select<S: AsRef<str>>(
        &self,
        ids: &[S],
        diag: &mut Diagnostics,
    ) -> Result<AggregationSet<'_>> {
        let mut selected: Vec<&NamedAggregation> = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            match self.get(id) {
                Some(entry) if selected.iter().any(|s| s.id == entry.id) => {}
                Some(entry) => selected.push(entry),
                None => diag.raise(DslError::UnknownAggregationId(id.to_string()))?,
            }
        }
        tracing::debug!(
            ids = ?selected.iter().map(|e| e.id).collect::<Vec<_>>(),
            "selected named aggregations"
        );
        Ok(AggregationSet { entries: selected })
    }
}

/// Selected named aggregations: a combined request plus the matching parsers
#[derive(Debug)]
pub struct AggregationSet<'r> {
    entries: Vec<&'r NamedAggregation>,
}

impl AggregationSet<'_> {
    pub fn ids(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Combined aggregation map, keyed by id
    pub fn request(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|e| (e.id.to_string(), e.request()))
            .collect()
    }

    pub fn into_request(self) -> Value {
        Value::Object(self.request())
    }

    /// Run every selected parser over `answer`.
    ///
    /// A parser that cannot read its part of the answer is reported; in
    /// lenient mode its id is left out of the result.
    pub fn parse(
        &self,
        answer: &Value,
        names: &dyn ClassificationNames,
        tender_count: u64,
        config: &RegistryConfig,
        diag: &mut Diagnostics,
    ) -> Result<BTreeMap<String, Summary>> {
        let mut results = BTreeMap::new();
        for entry in &self.entries {
            let ctx = ParseContext {
                id: entry.id,
                names,
                language: &config.language,
                tender_count,
                years: config.valid_years(),
            };
            match entry.parse(answer, &ctx) {
                Ok(summary) => {
                    results.insert(entry.id.to_string(), summary);
                }
                Err(err) => diag.raise(err)?,
            }
        }
        Ok(results)
    }
}
