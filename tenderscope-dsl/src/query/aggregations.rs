//! Aggregation tree builder
//!
//! Compiles [`AggregationSpec`] trees into the engine aggregation map,
//! wrapping fields of nested scopes in a `nested` aggregation.

use crate::query::nested::NestedResolver;
use crate::query::types::{AggregationKind, AggregationSpec};
use serde_json::{json, Map, Value};

/// Suffix of the terms bucket placed inside a nested scope wrapper.
/// The result compactor splices keys carrying it into their parent.
pub const NESTED_SUFFIX: &str = "_nested";

/// Builds engine aggregation maps from aggregation specs
pub struct AggregationBuilder<'a> {
    resolver: &'a NestedResolver,
    default_size: u32,
}

impl<'a> AggregationBuilder<'a> {
    pub fn new(resolver: &'a NestedResolver, default_size: u32) -> Self {
        Self {
            resolver,
            default_size,
        }
    }

    /// Build one aggregation map holding every top-level spec
    pub fn build(&self, specs: &[AggregationSpec]) -> Map<String, Value> {
        let mut node = Map::new();
        for spec in specs {
            self.resolve_into(spec, &mut node);
        }
        node
    }

    fn resolve_into(&self, spec: &AggregationSpec, node: &mut Map<String, Value>) {
        let Some(field) = spec.field.as_deref() else {
            return;
        };
        let key = aggregation_key(field);
        let size = spec.size.unwrap_or(self.default_size);

        if let Some(scope) = self.resolver.resolve(field) {
            // nested terms are leaves, child specs are not attached here
            let mut inner = Map::new();
            inner.insert(
                format!("{key}{NESTED_SUFFIX}"),
                json!({"terms": {"field": field, "size": size}}),
            );
            node.insert(
                key,
                json!({
                    "nested": {"path": scope},
                    "aggregations": inner
                }),
            );
            return;
        }

        match spec.kind {
            AggregationKind::Sum => {
                node.insert(format!("{key}_sum"), json!({"sum": {"field": field}}));
            }
            AggregationKind::Top => {
                node.insert(
                    format!("{key}_hits"),
                    json!({"top_hits": {"size": 1, "_source": {"include": [field]}}}),
                );
            }
            AggregationKind::Histogram => {
                node.insert(
                    format!("{key}_over_time"),
                    json!({"date_histogram": {"field": field, "interval": "year"}}),
                );
            }
            AggregationKind::Value => {}
            AggregationKind::Terms => {
                let mut bucket = Map::new();
                bucket.insert(
                    "terms".to_string(),
                    json!({"field": field, "size": size}),
                );
                if !spec.aggregations.is_empty() {
                    let mut children = Map::new();
                    for child in &spec.aggregations {
                        self.resolve_into(child, &mut children);
                    }
                    bucket.insert("aggregations".to_string(), Value::Object(children));
                }
                node.insert(key, Value::Object(bucket));
            }
        }
    }
}

/// Aggregation name of a field path: `lots.bids.price` → `lots_bids_price`
pub fn aggregation_key(field: &str) -> String {
    field.replace('.', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(specs: &[AggregationSpec]) -> Value {
        let resolver = NestedResolver::default();
        Value::Object(AggregationBuilder::new(&resolver, 5).build(specs))
    }

    #[test]
    fn test_terms_default_size() {
        let out = build(&[AggregationSpec::terms("country")]);
        assert_eq!(
            out,
            json!({"country": {"terms": {"field": "country", "size": 5}}})
        );
    }

    #[test]
    fn test_terms_custom_size() {
        let out = build(&[AggregationSpec::terms("indicators.type").with_size(20)]);
        assert_eq!(
            out,
            json!({"indicators_type": {"terms": {"field": "indicators.type", "size": 20}}})
        );
    }

    #[test]
    fn test_nested_field_wrapped_once() {
        let out = build(&[AggregationSpec::terms("buyers.address.city")]);
        assert_eq!(
            out,
            json!({"buyers_address_city": {
                "nested": {"path": "buyers"},
                "aggregations": {
                    "buyers_address_city_nested": {
                        "terms": {"field": "buyers.address.city", "size": 5}
                    }
                }
            }})
        );
    }

    #[test]
    fn test_nested_field_drops_children_and_kind() {
        let spec = AggregationSpec::sum("lots.bids.price.netAmount")
            .with_child(AggregationSpec::terms("country"));
        let out = build(&[spec]);
        let agg = &out["lots_bids_price_netAmount"];
        assert_eq!(agg["nested"]["path"], "lots.bids");
        let inner = agg["aggregations"].as_object().unwrap();
        assert_eq!(inner.len(), 1);
        assert!(inner["lots_bids_price_netAmount_nested"]["terms"].is_object());
    }

    #[test]
    fn test_sum_top_histogram_leaves() {
        let out = build(&[
            AggregationSpec::sum("finalPrice.netAmount"),
            AggregationSpec::top("title"),
            AggregationSpec::histogram("modified"),
        ]);
        assert_eq!(
            out,
            json!({
                "finalPrice_netAmount_sum": {"sum": {"field": "finalPrice.netAmount"}},
                "title_hits": {"top_hits": {"size": 1, "_source": {"include": ["title"]}}},
                "modified_over_time": {"date_histogram": {"field": "modified", "interval": "year"}}
            })
        );
    }

    #[test]
    fn test_value_kind_emits_nothing() {
        let out = build(&[AggregationSpec::new("title", AggregationKind::Value)]);
        assert_eq!(out, json!({}));
    }

    #[test]
    fn test_spec_without_field_is_skipped() {
        let out = build(&[AggregationSpec::default(), AggregationSpec::terms("country")]);
        assert_eq!(out.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_terms_children_are_recursive() {
        let spec = AggregationSpec::terms("country").with_child(
            AggregationSpec::terms("finalPrice.currency")
                .with_child(AggregationSpec::sum("finalPrice.netAmount")),
        );
        let out = build(&[spec]);
        assert_eq!(
            out,
            json!({"country": {
                "terms": {"field": "country", "size": 5},
                "aggregations": {
                    "finalPrice_currency": {
                        "terms": {"field": "finalPrice.currency", "size": 5},
                        "aggregations": {
                            "finalPrice_netAmount_sum": {"sum": {"field": "finalPrice.netAmount"}}
                        }
                    }
                }
            }})
        );
    }

    #[test]
    fn test_terms_child_in_nested_scope() {
        let spec = AggregationSpec::terms("country").with_child(AggregationSpec::terms("cpvs.code"));
        let out = build(&[spec]);
        let child = &out["country"]["aggregations"]["cpvs_code"];
        assert_eq!(child["nested"]["path"], "cpvs");
        assert!(child["aggregations"]["cpvs_code_nested"].is_object());
    }

    #[test]
    fn test_aggregation_key() {
        assert_eq!(aggregation_key("lots.bids.price"), "lots_bids_price");
        assert_eq!(aggregation_key("country"), "country");
    }
}
