use anyhow::Result;
use std::path::Path;
use tenderscope_dsl::{FilterClause, SearchDsl, SearchOptions};

use super::{print_json, read_json, report};

/// Assemble and print a search body
pub fn run_body(dsl: &SearchDsl, options: &Path, country: Option<&str>) -> Result<()> {
    let options: SearchOptions = read_json(options)?;
    let mut diag = dsl.diagnostics();
    let body = match country {
        Some(_) => dsl.country_search_body(&options, country, &mut diag)?,
        None => dsl.search_body(&options, &mut diag)?,
    };
    report(&diag);
    print_json(&body)
}

/// Compile one filter clause; prints `null` when nothing is left to filter on
pub fn run_filter(dsl: &SearchDsl, filter: &Path) -> Result<()> {
    let clause: FilterClause = read_json(filter)?;
    let mut diag = dsl.diagnostics();
    let fragment = dsl.compile_filter(&clause, &mut diag)?;
    report(&diag);
    print_json(&fragment)
}

pub fn run_aggregations(dsl: &SearchDsl, ids: &[String]) -> Result<()> {
    let mut diag = dsl.diagnostics();
    let set = dsl.named_aggregations(ids, &mut diag)?;
    tracing::info!("Selected {} named aggregation(s)", set.ids().len());
    report(&diag);
    print_json(&set.into_request())
}
