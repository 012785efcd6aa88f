//! Search body assembly
//!
//! Combines the filter compiler, the aggregation builder and the sort
//! option into one engine request body:
//!
//! ```json
//! {
//!   "query": {"filtered": {"query": {"match_all": {}}, "filter": ...}},
//!   "sort": {"modified": {"order": "desc"}},
//!   "aggregations": {...}
//! }
//! ```

use crate::config::QueryConfig;
use crate::error::{Diagnostics, DslError};
use crate::query::aggregations::AggregationBuilder;
use crate::query::filter::{field_query, FilterCompiler};
use crate::query::nested::NestedResolver;
use crate::query::types::{FilterKind, SearchOptions};
use crate::Result;
use serde_json::{json, Map, Value};

/// Assembles complete search request bodies
pub struct SearchBodyBuilder<'a> {
    resolver: &'a NestedResolver,
    config: &'a QueryConfig,
}

impl<'a> SearchBodyBuilder<'a> {
    pub fn new(resolver: &'a NestedResolver, config: &'a QueryConfig) -> Self {
        Self { resolver, config }
    }

    pub fn assemble(&self, options: &SearchOptions, diag: &mut Diagnostics) -> Result<Value> {
        let mut sort = sort_on(&self.config.default_sort_field, false, None);
        if let Some(field) = options
            .sort
            .as_ref()
            .and_then(|s| s.field.as_deref())
            .filter(|f| !f.is_empty())
        {
            let ascend = options.sort.as_ref().is_some_and(|s| s.ascend);
            sort = sort_on(field, ascend, self.resolver.resolve(field));
        }

        let mut body = Map::new();

        if let Some(specs) = options.aggregations.as_deref().filter(|s| !s.is_empty()) {
            let builder = AggregationBuilder::new(self.resolver, self.config.default_bucket_size);
            body.insert("aggregations".to_string(), Value::Object(builder.build(specs)));
        }

        let compiler = FilterCompiler::new(self.resolver);
        let mut filters = Vec::new();
        for clause in &options.filters {
            if clause.kind == FilterKind::Date {
                sort = sort_on(&clause.field, false, None);
                continue;
            }
            if let Some(fragment) = compiler.compile(clause, diag)? {
                filters.push(fragment);
            }
        }

        let query = match filters.len() {
            0 => match_all(),
            1 => filtered(filters.remove(0)),
            _ => filtered(json!({"bool": {"must": filters}})),
        };

        body.insert("query".to_string(), query);
        body.insert("sort".to_string(), sort);
        Ok(Value::Object(body))
    }

    /// Like [`assemble`](Self::assemble), restricted to one country
    pub fn assemble_for_country(
        &self,
        options: &SearchOptions,
        country: Option<&str>,
        diag: &mut Diagnostics,
    ) -> Result<Value> {
        let mut body = self.assemble(options, diag)?;
        if let Some(country) = country.filter(|c| !c.is_empty()) {
            self.restrict_to_country(&mut body, country, diag)?;
        }
        Ok(body)
    }

    /// Replace the `match_all` of `body`'s query with a country term.
    ///
    /// Either a top-level `match_all` or the `match_all` inside a `filtered`
    /// query is replaced. Any other query shape is reported and the body is
    /// left as it was.
    pub fn restrict_to_country(
        &self,
        body: &mut Value,
        country: &str,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let term = field_query("term", &self.config.country_field, json!(country));

        let Some(query) = body.get_mut("query") else {
            diag.raise(DslError::InconsistentQueryShape(
                "body has no query".to_string(),
            ))?;
            return Ok(());
        };
        if query.get("match_all").is_some() {
            *query = term;
        } else if let Some(inner) = query
            .pointer_mut("/filtered/query")
            .filter(|q| q.get("match_all").is_some())
        {
            *inner = term;
        } else {
            diag.raise(DslError::InconsistentQueryShape(query.to_string()))?;
        }
        Ok(())
    }
}

fn sort_on(field: &str, ascend: bool, nested_path: Option<&str>) -> Value {
    let mut order = Map::new();
    order.insert(
        "order".to_string(),
        json!(if ascend { "asc" } else { "desc" }),
    );
    if let Some(path) = nested_path {
        order.insert("nested_path".to_string(), json!(path));
    }
    let mut sort = Map::new();
    sort.insert(field.to_string(), Value::Object(order));
    Value::Object(sort)
}

fn match_all() -> Value {
    json!({"match_all": {}})
}

fn filtered(filter: Value) -> Value {
    json!({"filtered": {"query": match_all(), "filter": filter}})
}
