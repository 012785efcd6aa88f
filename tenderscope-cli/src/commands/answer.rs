use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tenderscope_dsl::{ClassificationNames, NoNames, SearchDsl};

use super::{print_json, read_json, report};

/// Parse an aggregations answer with the selected named aggregation parsers
pub fn run_parse(
    dsl: &SearchDsl,
    answer: &Path,
    tenders: u64,
    cpv_names: Option<&Path>,
    ids: &[String],
) -> Result<()> {
    let answer: Value = read_json(answer)?;
    let table = cpv_names
        .map(read_json::<HashMap<String, String>>)
        .transpose()?;
    let names: &dyn ClassificationNames = match &table {
        Some(table) => table,
        None => &NoNames,
    };

    let mut diag = dsl.diagnostics();
    let set = dsl.named_aggregations(ids, &mut diag)?;
    let parsed = dsl.parse_answer(&set, &answer, names, tenders, &mut diag)?;
    tracing::debug!("Parsed {} of {} aggregation(s)", parsed.len(), ids.len());
    report(&diag);
    print_json(&parsed)
}

pub fn run_compact(dsl: &SearchDsl, answer: &Path) -> Result<()> {
    let mut answer: Value = read_json(answer)?;
    dsl.compact(&mut answer);
    print_json(&answer)
}

/// Inject a filter into a search body, or into a bare aggregation map
/// when `aggregations` is set
pub fn run_inject(
    dsl: &SearchDsl,
    tree: &Path,
    scope: &str,
    filter: &Path,
    aggregations: bool,
) -> Result<()> {
    let filter: Value = read_json(filter)?;
    let (tree, wrapped) = if aggregations {
        let mut map: Map<String, Value> = read_json(tree)?;
        let wrapped = dsl.inject_into_aggregations(&mut map, scope, &filter);
        (Value::Object(map), wrapped)
    } else {
        let mut tree: Value = read_json(tree)?;
        let wrapped = dsl.inject_nested_filter(&mut tree, scope, &filter);
        (tree, wrapped)
    };
    if wrapped == 0 {
        tracing::warn!("No aggregation nested at '{}' found", scope);
    } else {
        tracing::info!("Wrapped {} aggregation(s) nested at '{}'", wrapped, scope);
    }
    print_json(&tree)
}
