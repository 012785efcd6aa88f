//! Filter clause compiler
//!
//! Turns one declarative [`FilterClause`] into an engine query fragment and
//! wraps it into its nested scope when the clause field lives in one.

use crate::error::{Diagnostics, DslError};
use crate::query::nested::NestedResolver;
use crate::query::types::{CompareMode, FilterClause, FilterKind};
use crate::Result;
use chrono::{TimeZone, Utc};
use serde_json::{json, Map, Value};

/// Compiles filter clauses into engine query fragments
pub struct FilterCompiler<'a> {
    resolver: &'a NestedResolver,
}

impl<'a> FilterCompiler<'a> {
    pub fn new(resolver: &'a NestedResolver) -> Self {
        Self { resolver }
    }

    /// Compile a clause together with its `and` children.
    ///
    /// Returns `Ok(None)` when nothing is left to filter on: empty value
    /// lists, `date` clauses, and conditions reported in lenient mode.
    pub fn compile(
        &self,
        clause: &FilterClause,
        diag: &mut Diagnostics,
    ) -> Result<Option<Value>> {
        let mut parts = Vec::with_capacity(1 + clause.and.len());
        if let Some(fragment) = self.compile_clause(clause, diag)? {
            parts.push(fragment);
        }
        for child in &clause.and {
            if let Some(fragment) = self.compile_clause(child, diag)? {
                parts.push(fragment);
            }
        }

        if parts.is_empty() {
            return Ok(None);
        }

        let compiled = match self.resolver.resolve(&clause.field) {
            Some(scope) => json!({
                "nested": {
                    "path": scope,
                    "query": {"bool": {"must": parts}}
                }
            }),
            None if parts.len() == 1 => parts.remove(0),
            None => json!({"bool": {"must": parts}}),
        };

        tracing::debug!(field = %clause.field, "compiled filter: {}", compiled);
        Ok(Some(compiled))
    }

    /// Compile a single clause, ignoring its `and` list and nested scope
    pub fn compile_clause(
        &self,
        clause: &FilterClause,
        diag: &mut Diagnostics,
    ) -> Result<Option<Value>> {
        let field = clause.field.as_str();
        let fragment = match &clause.kind {
            FilterKind::Select => Some(field_query(
                "terms",
                field,
                Value::Array(clause.value.clone()),
            )),
            FilterKind::Term => any_of("term", field, &clause.value),
            FilterKind::Match => any_of("match", field, &clause.value),
            FilterKind::Text => {
                if clause.value.is_empty() {
                    None
                } else {
                    let phrases = clause
                        .value
                        .iter()
                        .map(|v| field_query("match_phrase_prefix", field, v.clone()))
                        .collect();
                    Some(json!({"or": Value::Array(phrases)}))
                }
            }
            FilterKind::Value => self.compile_comparison(clause, diag)?,
            FilterKind::Range => self.compile_year_range(clause, diag)?,
            FilterKind::Date => {
                tracing::debug!(field, "date clause is a sort key, no filter emitted");
                None
            }
            FilterKind::Unsupported(kind) => {
                diag.raise(DslError::UnsupportedFilterKind(kind.clone()))?;
                None
            }
        };
        Ok(fragment)
    }

    fn compile_comparison(
        &self,
        clause: &FilterClause,
        diag: &mut Diagnostics,
    ) -> Result<Option<Value>> {
        let field = clause.field.as_str();
        let Some(number) = clause.value.first().and_then(parse_number) else {
            diag.raise(DslError::InvalidNumericValue {
                field: field.to_string(),
                value: describe(clause.value.first()),
            })?;
            return Ok(None);
        };
        let number = number_value(number);

        let fragment = match &clause.mode {
            Some(CompareMode::Equal) => field_query("term", field, number),
            Some(CompareMode::Less) => field_query("range", field, json!({"lt": number})),
            Some(CompareMode::Greater) => field_query("range", field, json!({"gt": number})),
            Some(CompareMode::Other(mode)) => {
                diag.raise(DslError::UnsupportedCompareMode {
                    field: field.to_string(),
                    mode: mode.clone(),
                })?;
                return Ok(None);
            }
            None => {
                diag.raise(DslError::UnsupportedCompareMode {
                    field: field.to_string(),
                    mode: "<missing>".to_string(),
                })?;
                return Ok(None);
            }
        };
        Ok(Some(fragment))
    }

    /// `[Jan 1 of from, Jan 1 of to)` as epoch milliseconds, UTC
    fn compile_year_range(
        &self,
        clause: &FilterClause,
        diag: &mut Diagnostics,
    ) -> Result<Option<Value>> {
        let field = clause.field.as_str();
        let bounds = match clause.value.as_slice() {
            [from, to, ..] => year_start_millis(from).zip(year_start_millis(to)),
            _ => None,
        };
        let Some((gte, lt)) = bounds else {
            diag.raise(DslError::InvalidNumericValue {
                field: field.to_string(),
                value: Value::Array(clause.value.clone()).to_string(),
            })?;
            return Ok(None);
        };
        Ok(Some(field_query(
            "range",
            field,
            json!({"gte": gte, "lt": lt}),
        )))
    }
}

/// `{kind: {field: body}}`
pub(crate) fn field_query(kind: &str, field: &str, body: Value) -> Value {
    let mut inner = Map::new();
    inner.insert(field.to_string(), body);
    let mut outer = Map::new();
    outer.insert(kind.to_string(), Value::Object(inner));
    Value::Object(outer)
}

/// One fragment per value, or-ed together when there is more than one
fn any_of(kind: &str, field: &str, values: &[Value]) -> Option<Value> {
    match values {
        [] => None,
        [single] => Some(field_query(kind, field, single.clone())),
        many => {
            let fragments = many
                .iter()
                .map(|v| field_query(kind, field, v.clone()))
                .collect();
            Some(json!({"or": Value::Array(fragments)}))
        }
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => leading_number(s)?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Longest numeric prefix of `s` after leading whitespace: `"100 EUR"` is 100
fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    s.char_indices()
        .map(|(at, c)| at + c.len_utf8())
        .rev()
        .find_map(|end| s[..end].parse::<f64>().ok())
}

/// Integral numbers are emitted as JSON integers
fn number_value(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() < MAX_SAFE {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn year_start_millis(value: &Value) -> Option<i64> {
    let year = match value {
        Value::Number(n) => i32::try_from(n.as_i64()?).ok()?,
        Value::String(s) => s.trim().parse::<i32>().ok()?,
        _ => return None,
    };
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .map(|dt| dt.timestamp_millis())
}

fn describe(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => "<missing>".to_string(),
    }
}
