//! Generic rewrites over engine JSON trees
//!
//! Both the nested-filter injector and the result compactor run on the
//! same walker: it visits every object reachable through object fields and
//! array elements, calling [`Visitor::enter`] before and [`Visitor::leave`]
//! after the children of each object.

use crate::query::aggregations::NESTED_SUFFIX;
use serde_json::{Map, Value};

/// Hooks called by [`walk`]
pub trait Visitor {
    /// Pre-order hook, may rewrite the object before its fields are walked
    fn enter(&mut self, _node: &mut Map<String, Value>) {}

    /// Whether the walk descends into the field `key`
    fn descend(&self, _key: &str) -> bool {
        true
    }

    /// Post-order hook, runs once every field has been walked
    fn leave(&mut self, _node: &mut Map<String, Value>) {}
}

/// Depth-first walk of `value`. Scalars and nulls are no-ops.
pub fn walk<V: Visitor + ?Sized>(value: &mut Value, visitor: &mut V) {
    match value {
        Value::Object(node) => {
            visitor.enter(node);
            let keys: Vec<String> = node.keys().cloned().collect();
            for key in keys {
                if !visitor.descend(&key) {
                    continue;
                }
                if let Some(child) = node.get_mut(&key) {
                    walk(child, visitor);
                }
            }
            visitor.leave(node);
        }
        Value::Array(items) => {
            for item in items {
                walk(item, visitor);
            }
        }
        _ => {}
    }
}

// ============================================================================
// Nested-filter injection
// ============================================================================

/// Wraps the children of every aggregation nested at one scope into a filter
struct NestedFilterInjector<'a> {
    scope: &'a str,
    filter: &'a Value,
    wrapped: usize,
}

impl NestedFilterInjector<'_> {
    /// Wrap every entry of an aggregation map that is nested at the scope
    fn wrap_scoped(&mut self, aggregations: &mut Map<String, Value>) {
        for (key, agg) in aggregations.iter_mut() {
            let Value::Object(agg) = agg else {
                continue;
            };
            let at_scope = agg
                .get("nested")
                .and_then(|n| n.get("path"))
                .and_then(Value::as_str)
                == Some(self.scope);
            if !at_scope {
                continue;
            }

            let mut filter_node = Map::new();
            filter_node.insert("filter".to_string(), self.filter.clone());
            if let Some(children) = agg.remove("aggregations") {
                filter_node.insert("aggregations".to_string(), children);
            }
            let mut replacement = Map::new();
            replacement.insert(format!("{key}_filter"), Value::Object(filter_node));
            agg.insert("aggregations".to_string(), Value::Object(replacement));
            self.wrapped += 1;
        }
    }
}

impl Visitor for NestedFilterInjector<'_> {
    fn enter(&mut self, node: &mut Map<String, Value>) {
        if let Some(Value::Object(aggregations)) = node.get_mut("aggregations") {
            self.wrap_scoped(aggregations);
        }
    }
}

/// Inject `filter` below every aggregation nested at `scope`.
///
/// The children of a matching aggregation `key` move under a single
/// `key_filter` filter aggregation. `aggregations` maps are found at any
/// depth, under any field, so `tree` is typically a search body. Not
/// idempotent: a second call wraps again.
///
/// Returns the number of aggregations that were wrapped.
pub fn inject_nested_filter(tree: &mut Value, scope: &str, filter: &Value) -> usize {
    let mut injector = NestedFilterInjector {
        scope,
        filter,
        wrapped: 0,
    };
    walk(tree, &mut injector);
    tracing::debug!(scope, wrapped = injector.wrapped, "injected nested filter");
    injector.wrapped
}

/// Like [`inject_nested_filter`], for a bare aggregation map such as the
/// aggregation builder's output or a registry selection's request.
///
/// Every entry of `aggregations` is an aggregation, whatever its name.
pub fn inject_into_aggregations(
    aggregations: &mut Map<String, Value>,
    scope: &str,
    filter: &Value,
) -> usize {
    let mut injector = NestedFilterInjector {
        scope,
        filter,
        wrapped: 0,
    };
    injector.wrap_scoped(aggregations);
    for agg in aggregations.values_mut() {
        walk(agg, &mut injector);
    }
    tracing::debug!(scope, wrapped = injector.wrapped, "injected nested filter");
    injector.wrapped
}

// ============================================================================
// Result compaction
// ============================================================================

/// Whether `key` names a synthetic wrapper layer, e.g. `authorities_nested`
/// or `lotsbids_nested_filter`
pub fn is_synthetic_key(key: &str) -> bool {
    key.find(NESTED_SUFFIX).is_some_and(|at| at > 0)
}

struct Compactor;

impl Visitor for Compactor {
    fn descend(&self, key: &str) -> bool {
        key != "buckets"
    }

    fn leave(&mut self, node: &mut Map<String, Value>) {
        let synthetic: Vec<String> = node
            .iter()
            .filter(|(key, value)| is_synthetic_key(key) && value.is_object())
            .map(|(key, _)| key.clone())
            .collect();
        for key in synthetic {
            if let Some(Value::Object(inner)) = node.remove(&key) {
                node.extend(inner);
            }
        }
    }
}

/// Splice synthetic wrapper layers into their parents, in place.
///
/// Bucket lists are left untouched.
pub fn compact_aggregations(tree: &mut Value) {
    walk(tree, &mut Compactor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn winning_filter() -> Value {
        json!({"term": {"lots.bids.isWinning": true}})
    }

    // ===================================================================
    // inject_nested_filter
    // ===================================================================

    #[test]
    fn test_inject_wraps_children_of_matching_scope() {
        let mut tree = json!({
            "aggregations": {
                "bids": {
                    "nested": {"path": "lots.bids"},
                    "aggregations": {
                        "prices": {"sum": {"field": "lots.bids.price.netAmount"}},
                        "count": {"value_count": {"field": "lots.bids.id"}}
                    }
                },
                "countries": {"terms": {"field": "country"}}
            }
        });
        let before: Vec<String> = tree["aggregations"]["bids"]["aggregations"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();

        let wrapped = inject_nested_filter(&mut tree, "lots.bids", &winning_filter());

        assert_eq!(wrapped, 1);
        let children = tree["aggregations"]["bids"]["aggregations"].as_object().unwrap();
        assert_eq!(children.keys().collect::<Vec<_>>(), vec!["bids_filter"]);
        let filter_node = &children["bids_filter"];
        assert_eq!(filter_node["filter"], winning_filter());
        let moved: Vec<String> = filter_node["aggregations"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(moved, before);
        assert_eq!(
            tree["aggregations"]["countries"],
            json!({"terms": {"field": "country"}})
        );
    }

    #[test]
    fn test_inject_finds_deep_scopes_under_any_field() {
        let mut tree = json!({
            "request": {
                "aggregations": {
                    "outer": {
                        "terms": {"field": "country"},
                        "aggregations": {
                            "bidders": {
                                "nested": {"path": "lots.bids.bidders"},
                                "aggregations": {"ids": {"terms": {"field": "lots.bids.bidders.groupId"}}}
                            }
                        }
                    }
                }
            }
        });
        let wrapped = inject_nested_filter(&mut tree, "lots.bids.bidders", &winning_filter());
        assert_eq!(wrapped, 1);
        let bidders = &tree["request"]["aggregations"]["outer"]["aggregations"]["bidders"];
        assert!(bidders["aggregations"]["bidders_filter"]["aggregations"]["ids"].is_object());
    }

    #[test]
    fn test_inject_scope_without_children() {
        let mut tree = json!({
            "aggregations": {"bidders": {"nested": {"path": "lots.bids.bidders"}}}
        });
        inject_nested_filter(&mut tree, "lots.bids.bidders", &winning_filter());
        let node = &tree["aggregations"]["bidders"]["aggregations"]["bidders_filter"];
        assert_eq!(node["filter"], winning_filter());
        assert!(node.get("aggregations").is_none());
    }

    #[test]
    fn test_inject_other_scope_is_untouched() {
        let mut tree = json!({
            "aggregations": {
                "buyers": {
                    "nested": {"path": "buyers"},
                    "aggregations": {"ids": {"terms": {"field": "buyers.groupId"}}}
                }
            }
        });
        let original = tree.clone();
        assert_eq!(inject_nested_filter(&mut tree, "lots", &winning_filter()), 0);
        assert_eq!(tree, original);
    }

    #[test]
    fn test_inject_bare_aggregation_map() {
        let mut aggs = json!({
            "lots": {"nested": {"path": "lots"}, "aggregations": {"n": {"value_count": {"field": "lots.id"}}}},
            "country": {"terms": {"field": "country"}}
        });
        let map = aggs.as_object_mut().unwrap();
        assert_eq!(inject_into_aggregations(map, "lots", &winning_filter()), 1);
        assert!(aggs["lots"]["aggregations"]["lots_filter"]["aggregations"]["n"].is_object());
        assert_eq!(aggs["country"], json!({"terms": {"field": "country"}}));
    }

    #[test]
    fn test_inject_bare_map_with_body_like_names() {
        let mut aggs = json!({
            "query": {"terms": {"field": "query", "size": 5}},
            "aggregations": {"terms": {"field": "aggregations", "size": 5}},
            "lots_title": {
                "nested": {"path": "lots"},
                "aggregations": {"lots_title_nested": {"terms": {"field": "lots.title", "size": 5}}}
            }
        });
        let map = aggs.as_object_mut().unwrap();
        assert_eq!(inject_into_aggregations(map, "lots", &winning_filter()), 1);
        let children = aggs["lots_title"]["aggregations"].as_object().unwrap();
        assert_eq!(children.keys().collect::<Vec<_>>(), vec!["lots_title_filter"]);
        assert_eq!(aggs["query"], json!({"terms": {"field": "query", "size": 5}}));
    }

    #[test]
    fn test_inject_body_ignores_root_entries() {
        let mut body = json!({
            "query": {"nested": {"path": "lots", "query": {"match_all": {}}}},
            "aggregations": {
                "lots": {"nested": {"path": "lots"}, "aggregations": {"n": {"value_count": {"field": "lots.id"}}}}
            }
        });
        assert_eq!(inject_nested_filter(&mut body, "lots", &winning_filter()), 1);
        assert_eq!(body["query"], json!({"nested": {"path": "lots", "query": {"match_all": {}}}}));
    }

    #[test]
    fn test_inject_twice_double_wraps() {
        let mut tree = json!({
            "aggregations": {
                "lots": {"nested": {"path": "lots"}, "aggregations": {"n": {"value_count": {"field": "lots.id"}}}}
            }
        });
        inject_nested_filter(&mut tree, "lots", &winning_filter());
        inject_nested_filter(&mut tree, "lots", &winning_filter());
        let lots = &tree["aggregations"]["lots"]["aggregations"];
        assert_eq!(lots.as_object().unwrap().len(), 1);
        let outer = &lots["lots_filter"];
        assert!(outer["aggregations"]["lots_filter"]["aggregations"]["n"].is_object());
    }

    // ===================================================================
    // compact_aggregations
    // ===================================================================

    #[test]
    fn test_compact_splices_wrapper_keys() {
        let mut tree = json!({
            "buyers_name": {
                "doc_count": 12,
                "buyers_name_nested": {
                    "buckets": [{"key": "a", "doc_count": 3}],
                    "doc_count": 5
                }
            }
        });
        compact_aggregations(&mut tree);
        assert_eq!(
            tree,
            json!({
                "buyers_name": {
                    "buckets": [{"key": "a", "doc_count": 3}],
                    "doc_count": 5
                }
            })
        );
    }

    #[test]
    fn test_compact_is_post_order() {
        let mut tree = json!({
            "lotsbids": {
                "doc_count": 9,
                "lotsbids_nested_filter": {
                    "doc_count": 4,
                    "lotsbids_nested": {"doc_count": 2}
                }
            }
        });
        compact_aggregations(&mut tree);
        assert_eq!(tree, json!({"lotsbids": {"doc_count": 2}}));
    }

    #[test]
    fn test_compact_leaves_buckets_alone() {
        let mut tree = json!({
            "country": {
                "buckets": [
                    {"key": "CZ", "doc_count": 1, "cpvs_nested": {"doc_count": 1}}
                ]
            }
        });
        let original = tree.clone();
        compact_aggregations(&mut tree);
        assert_eq!(tree, original);
    }

    #[test]
    fn test_compact_leading_marker_is_not_synthetic() {
        assert!(!is_synthetic_key("_nested"));
        assert!(is_synthetic_key("a_nested"));
        assert!(is_synthetic_key("companies_nested_filter"));
        assert!(!is_synthetic_key("nested"));
    }

    #[test]
    fn test_compact_null_and_scalars() {
        let mut tree = Value::Null;
        compact_aggregations(&mut tree);
        assert_eq!(tree, Value::Null);

        let mut tree = json!({"x_nested": null, "y": 1});
        compact_aggregations(&mut tree);
        assert_eq!(tree, json!({"x_nested": null, "y": 1}));
    }

    #[test]
    fn test_compact_inside_arrays() {
        let mut tree = json!([{"a": {"a_nested": {"doc_count": 1}}}]);
        compact_aggregations(&mut tree);
        assert_eq!(tree, json!([{"a": {"doc_count": 1}}]));
    }
}
