//! Search option types and their compilers

pub mod aggregations;
pub mod body;
pub mod filter;
pub mod nested;
pub mod presets;
pub mod types;

pub use aggregations::{aggregation_key, AggregationBuilder};
pub use body::SearchBodyBuilder;
pub use filter::FilterCompiler;
pub use nested::NestedResolver;
pub use types::*;
