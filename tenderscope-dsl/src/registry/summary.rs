//! Parsed aggregation summaries and the engine answer shapes they come from

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Flat, application-facing result of one named aggregation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Summary {
    /// Top ten entities by document count
    Top(TopList),
    /// Lot, bid and tender counters
    Totals(LotBidTotals),
    /// Classification code → display name and count
    Named(BTreeMap<String, NamedCount>),
    /// Bucket key → summed amount
    Amounts(BTreeMap<String, f64>),
    /// Bucket key → document count
    Counts(BTreeMap<String, u64>),
    /// Year → document count
    Yearly(BTreeMap<i32, u64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopList {
    pub count: u64,
    pub top10: Vec<TopEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEntry {
    pub value: u64,
    /// `_source` of the first matching document
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCount {
    pub name: Option<String>,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotBidTotals {
    pub bids: u64,
    pub bids_awarded: u64,
    pub lots: u64,
    pub tenders: u64,
}

/// Bucketed aggregation answer
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AnswerBuckets {
    pub buckets: Vec<AnswerBucket>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AnswerBucket {
    pub key: Value,
    #[serde(default)]
    pub key_as_string: Option<String>,
    pub doc_count: u64,
    #[serde(flatten)]
    pub sub_aggs: Map<String, Value>,
}

impl AnswerBucket {
    /// Bucket key as text; numeric keys use their JSON rendering
    pub fn key_string(&self) -> String {
        match &self.key {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}
