//! Classification code display names

use std::collections::HashMap;

/// Looks up the display name of a CPV classification code
pub trait ClassificationNames {
    fn name(&self, code: &str, language: &str) -> Option<String>;
}

/// Name table for a single language, keyed by code
impl ClassificationNames for HashMap<String, String> {
    fn name(&self, code: &str, _language: &str) -> Option<String> {
        self.get(code).cloned()
    }
}

/// Lookup that knows no names
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

impl ClassificationNames for NoNames {
    fn name(&self, _code: &str, _language: &str) -> Option<String> {
        None
    }
}
