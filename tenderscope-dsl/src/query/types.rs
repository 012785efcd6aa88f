//! Application-level search option types
//!
//! These types describe a search the way the application asks for it:
//! declarative filter clauses, an optional sort, and aggregation specs.
//! They are compiled into engine Query DSL by the sibling modules.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Root search options
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchOptions {
    #[serde(default)]
    pub sort: Option<SortOption>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterClause>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Vec<AggregationSpec>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SortOption {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub ascend: bool,
}

/// One declarative filter clause.
///
/// `and` holds conjunction children. They are compiled as plain clauses:
/// their own `and` lists and nested scopes are not consulted, only the
/// parent clause decides the nested wrapping of the combined fragment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterClause {
    #[serde(rename = "type")]
    pub kind: FilterKind,

    pub field: String,

    #[serde(default, deserialize_with = "one_or_many")]
    pub value: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<CompareMode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<FilterClause>,
}

impl FilterClause {
    pub fn new(kind: FilterKind, field: impl Into<String>, value: Vec<Value>) -> Self {
        Self {
            kind,
            field: field.into(),
            value,
            mode: None,
            and: Vec::new(),
        }
    }

    pub fn term(field: impl Into<String>, value: Vec<Value>) -> Self {
        Self::new(FilterKind::Term, field, value)
    }

    pub fn select(field: impl Into<String>, value: Vec<Value>) -> Self {
        Self::new(FilterKind::Select, field, value)
    }

    pub fn compare(field: impl Into<String>, mode: CompareMode, value: Value) -> Self {
        Self::new(FilterKind::Value, field, vec![value]).with_mode(mode)
    }

    pub fn years(field: impl Into<String>, from: i32, to: i32) -> Self {
        Self::new(FilterKind::Range, field, vec![from.into(), to.into()])
    }

    pub fn with_mode(mut self, mode: CompareMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_and(mut self, clause: FilterClause) -> Self {
        self.and.push(clause);
        self
    }
}

/// Filter clause kind. Unknown names are kept so they can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum FilterKind {
    /// Field equals any value of a set
    Select,
    /// Exact term, one or more values
    Term,
    /// Analyzed match, one or more values
    Match,
    /// Prefix phrase match per value
    Text,
    /// Numeric comparison, see [`CompareMode`]
    Value,
    /// Calendar year pair
    Range,
    /// Sort key, not a filter
    Date,
    Unsupported(String),
}

impl From<String> for FilterKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "select" => Self::Select,
            "term" => Self::Term,
            "match" => Self::Match,
            "text" => Self::Text,
            "value" => Self::Value,
            "range" => Self::Range,
            "date" => Self::Date,
            _ => Self::Unsupported(s),
        }
    }
}

impl From<FilterKind> for String {
    fn from(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Select => "select".to_string(),
            FilterKind::Term => "term".to_string(),
            FilterKind::Match => "match".to_string(),
            FilterKind::Text => "text".to_string(),
            FilterKind::Value => "value".to_string(),
            FilterKind::Range => "range".to_string(),
            FilterKind::Date => "date".to_string(),
            FilterKind::Unsupported(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum CompareMode {
    Equal,
    Less,
    Greater,
    Other(String),
}

impl From<String> for CompareMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "=" => Self::Equal,
            "<" => Self::Less,
            ">" => Self::Greater,
            _ => Self::Other(s),
        }
    }
}

impl From<CompareMode> for String {
    fn from(mode: CompareMode) -> Self {
        match mode {
            CompareMode::Equal => "=".to_string(),
            CompareMode::Less => "<".to_string(),
            CompareMode::Greater => ">".to_string(),
            CompareMode::Other(s) => s,
        }
    }
}

/// One node of an aggregation request tree
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AggregationSpec {
    #[serde(default)]
    pub field: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: AggregationKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregations: Vec<AggregationSpec>,
}

impl AggregationSpec {
    pub fn new(field: impl Into<String>, kind: AggregationKind) -> Self {
        Self {
            field: Some(field.into()),
            kind,
            size: None,
            aggregations: Vec::new(),
        }
    }

    pub fn terms(field: impl Into<String>) -> Self {
        Self::new(field, AggregationKind::Terms)
    }

    pub fn sum(field: impl Into<String>) -> Self {
        Self::new(field, AggregationKind::Sum)
    }

    pub fn top(field: impl Into<String>) -> Self {
        Self::new(field, AggregationKind::Top)
    }

    pub fn histogram(field: impl Into<String>) -> Self {
        Self::new(field, AggregationKind::Histogram)
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_child(mut self, child: AggregationSpec) -> Self {
        self.aggregations.push(child);
        self
    }
}

/// Aggregation kind. Any name other than the four special kinds is a
/// plain terms bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum AggregationKind {
    #[default]
    Terms,
    Sum,
    Top,
    Histogram,
    /// Value is used elsewhere, no aggregation is emitted
    Value,
}

impl From<String> for AggregationKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "sum" => Self::Sum,
            "top" => Self::Top,
            "histogram" => Self::Histogram,
            "value" => Self::Value,
            _ => Self::Terms,
        }
    }
}

impl From<AggregationKind> for String {
    fn from(kind: AggregationKind) -> Self {
        match kind {
            AggregationKind::Terms => "terms",
            AggregationKind::Sum => "sum",
            AggregationKind::Top => "top",
            AggregationKind::Histogram => "histogram",
            AggregationKind::Value => "value",
        }
        .to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Value>),
    One(Value),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(values) => values,
        OneOrMany::One(Value::Null) => Vec::new(),
        OneOrMany::One(value) => vec![value],
    })
}
