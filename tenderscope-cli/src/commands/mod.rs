pub mod answer;
pub mod build;

pub use answer::{run_compact, run_inject, run_parse};
pub use build::{run_aggregations, run_body, run_filter};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use tenderscope_dsl::Diagnostics;

/// Read JSON from a file, or from stdin when the path is `-`
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?
    };
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {:?}", path))
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Summarize what lenient mode let through
pub(crate) fn report(diag: &Diagnostics) {
    if !diag.is_clean() {
        tracing::warn!("{} condition(s) reported, output is degraded", diag.issues().len());
    }
}
