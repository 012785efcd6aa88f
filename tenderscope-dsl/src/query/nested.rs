//! Nested scope resolution for field paths

use crate::config::default_nested_scopes;

/// Resolves which nested document scope a field path lives in.
///
/// Scopes are checked in order and the first one that is a path prefix of
/// the field wins, so the list must hold deeper scopes before their parents
/// (`lots.bids` before `lots`).
#[derive(Debug, Clone)]
pub struct NestedResolver {
    scopes: Vec<String>,
}

impl Default for NestedResolver {
    fn default() -> Self {
        Self::new(default_nested_scopes())
    }
}

impl NestedResolver {
    pub fn new(scopes: Vec<String>) -> Self {
        Self { scopes }
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Nested scope of `field`, or `None` for root-level fields.
    ///
    /// Matching is segment aligned: `lots.title` is in `lots`, while
    /// `lotsCount` and `lots` itself are not.
    pub fn resolve(&self, field: &str) -> Option<&str> {
        self.scopes
            .iter()
            .find(|scope| {
                field
                    .strip_prefix(scope.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
            })
            .map(String::as_str)
    }
}
