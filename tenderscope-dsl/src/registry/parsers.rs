//! Answer parsers for the built-in named aggregations

use crate::error::DslError;
use crate::registry::summary::{
    AnswerBucket, AnswerBuckets, LotBidTotals, NamedCount, Summary, TopEntry, TopList,
};
use crate::registry::ParseContext;
use crate::Result;
use serde_json::Value;
use std::collections::BTreeMap;

/// Root of a named aggregation's answer, looking through the
/// `<id>_filter` layer added by nested-filter injection
pub fn answer_root<'v>(answer: &'v Value, id: &str) -> Option<&'v Value> {
    let node = answer.get(id)?;
    Some(node.get(format!("{id}_filter")).unwrap_or(node))
}

fn root<'v>(answer: &'v Value, ctx: &ParseContext<'_>) -> Result<&'v Value> {
    answer_root(answer, ctx.id).ok_or_else(|| malformed(ctx, ctx.id))
}

fn malformed(ctx: &ParseContext<'_>, path: &str) -> DslError {
    DslError::MalformedAnswer {
        id: ctx.id.to_string(),
        path: path.to_string(),
    }
}

fn descend<'v>(node: &'v Value, path: &[&str], ctx: &ParseContext<'_>) -> Result<&'v Value> {
    path.iter().try_fold(node, |current, key| {
        current.get(*key).ok_or_else(|| malformed(ctx, &path.join(".")))
    })
}

fn buckets(node: &Value, path: &[&str], ctx: &ParseContext<'_>) -> Result<Vec<AnswerBucket>> {
    let target = descend(node, path, ctx)?;
    serde_json::from_value::<AnswerBuckets>(target.clone())
        .map(|b| b.buckets)
        .map_err(|_| malformed(ctx, &format!("{}.buckets", path.join("."))))
}

fn doc_count(node: &Value, path: &[&str], ctx: &ParseContext<'_>) -> Result<u64> {
    descend(node, path, ctx)?
        .get("doc_count")
        .and_then(Value::as_u64)
        .ok_or_else(|| malformed(ctx, &format!("{}.doc_count", path.join("."))))
}

// ============================================================================
// Top lists
// ============================================================================

fn top_list(answer: &Value, path: &[&str], ctx: &ParseContext<'_>) -> Result<Summary> {
    let count = doc_count(answer, &[ctx.id], ctx)?;
    let root = root(answer, ctx)?;
    let top10 = buckets(root, path, ctx)?
        .into_iter()
        .map(|bucket| -> Result<TopEntry> {
            let body = bucket
                .sub_aggs
                .get("hits")
                .and_then(|h| h.pointer("/hits/hits/0/_source"))
                .cloned()
                .ok_or_else(|| malformed(ctx, "hits.hits.hits[0]._source"))?;
            Ok(TopEntry {
                value: bucket.doc_count,
                body,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Summary::Top(TopList { count, top10 }))
}

pub(crate) fn top_authorities(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    top_list(answer, &["authorities_nested"], ctx)
}

pub(crate) fn top_companies(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    top_list(answer, &["companies_nested"], ctx)
}

pub(crate) fn top_winning_companies(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    top_list(
        answer,
        &[
            "top_winning_companies_nested_filter",
            "companies",
            "companies_nested",
        ],
        ctx,
    )
}

// ============================================================================
// Keyed counts and sums
// ============================================================================

pub(crate) fn sums_final_price(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    let root = root(answer, ctx)?;
    let mut sums = BTreeMap::new();
    for bucket in buckets(root, &[], ctx)? {
        let value = bucket
            .sub_aggs
            .get("sum_price")
            .and_then(|s| s.get("value"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        sums.insert(bucket.key_string(), value);
    }
    Ok(Summary::Amounts(sums))
}

fn counts_by_key(
    answer: &Value,
    ctx: &ParseContext<'_>,
    key: impl Fn(&AnswerBucket) -> String,
) -> Result<Summary> {
    let root = root(answer, ctx)?;
    let counts = buckets(root, &[], ctx)?
        .iter()
        .map(|bucket| (key(bucket), bucket.doc_count))
        .collect();
    Ok(Summary::Counts(counts))
}

pub(crate) fn countries(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    counts_by_key(answer, ctx, |b| b.key_string().to_lowercase())
}

pub(crate) fn indicators(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    counts_by_key(answer, ctx, AnswerBucket::key_string)
}

fn named_cpvs(answer: &Value, path: &[&str], ctx: &ParseContext<'_>) -> Result<Summary> {
    let root = root(answer, ctx)?;
    let named = buckets(root, path, ctx)?
        .into_iter()
        .map(|bucket| {
            let code = bucket.key_string();
            let entry = NamedCount {
                name: ctx.names.name(&code, ctx.language),
                value: bucket.doc_count,
            };
            (code, entry)
        })
        .collect();
    Ok(Summary::Named(named))
}

pub(crate) fn main_cpv_divisions(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    named_cpvs(answer, &["cpvs_filter", "divisionscpvs"], ctx)
}

pub(crate) fn main_cpvs_full(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    named_cpvs(answer, &["cpvs_filter", "cpvs_full"], ctx)
}

// ============================================================================
// Region codes
// ============================================================================

/// Region counts keyed by the code before the first `-`.
///
/// Buckets are visited in key order and a later bucket overwrites an
/// earlier one with the same truncated code; counts are not summed.
fn region_counts(answer: &Value, path: &[&str], ctx: &ParseContext<'_>) -> Result<Summary> {
    let root = root(answer, ctx)?;
    let mut buckets = buckets(root, path, ctx)?;
    buckets.sort_by_key(AnswerBucket::key_string);

    let mut regions = BTreeMap::new();
    for bucket in buckets {
        let key = bucket.key_string();
        let region = key.split('-').next().unwrap_or_default().trim().to_string();
        regions.insert(region, bucket.doc_count);
    }
    Ok(Summary::Counts(regions))
}

pub(crate) fn company_nuts(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    region_counts(answer, &["company_nuts_nested"], ctx)
}

pub(crate) fn authority_nuts(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    region_counts(answer, &["authority_nuts_nested"], ctx)
}

// ============================================================================
// Award dates and totals
// ============================================================================

pub(crate) fn award_decision_years(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    let root = root(answer, ctx)?;
    let mut years = BTreeMap::new();
    for bucket in buckets(root, &["dates_nested"], ctx)? {
        let year = bucket
            .key_as_string
            .as_deref()
            .and_then(|s| s.get(..4))
            .and_then(|s| s.parse::<i32>().ok());
        match year {
            Some(year) if ctx.years.contains(&year) => {
                years.insert(year, bucket.doc_count);
            }
            _ => tracing::debug!(id = ctx.id, key = %bucket.key_string(), "skipping histogram bucket"),
        }
    }
    Ok(Summary::Yearly(years))
}

pub(crate) fn lot_bid_totals(answer: &Value, ctx: &ParseContext<'_>) -> Result<Summary> {
    let root = root(answer, ctx)?;
    Ok(Summary::Totals(LotBidTotals {
        bids: doc_count(root, &["lotsbids"], ctx)?,
        bids_awarded: doc_count(
            root,
            &["lotsbids", "lotsbids_nested_filter", "lotsbids_nested"],
            ctx,
        )?,
        lots: doc_count(root, &[], ctx)?,
        tenders: ctx.tender_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::names::NoNames;
    use serde_json::json;
    use std::collections::HashMap;

    fn ctx<'a>(id: &'a str, names: &'a dyn crate::registry::ClassificationNames) -> ParseContext<'a> {
        ParseContext {
            id,
            names,
            language: "EN",
            tender_count: 42,
            years: 2006..=2020,
        }
    }

    #[test]
    fn test_answer_root_prefers_filter_layer() {
        let answer = json!({"a": {"doc_count": 1, "a_filter": {"doc_count": 2}}});
        assert_eq!(answer_root(&answer, "a").unwrap()["doc_count"], 2);
        let answer = json!({"a": {"doc_count": 1}});
        assert_eq!(answer_root(&answer, "a").unwrap()["doc_count"], 1);
        assert!(answer_root(&answer, "b").is_none());
    }

    #[test]
    fn test_region_codes_overwrite_in_key_order() {
        let answer = json!({"terms_company_nuts": {
            "doc_count": 10,
            "company_nuts_nested": {"buckets": [
                {"key": "PL-51", "doc_count": 3},
                {"key": "PL-22", "doc_count": 7}
            ]}
        }});
        let out = company_nuts(&answer, &ctx("terms_company_nuts", &NoNames)).unwrap();
        let mut expected = BTreeMap::new();
        expected.insert("PL".to_string(), 3);
        assert_eq!(out, Summary::Counts(expected));
    }

    #[test]
    fn test_region_codes_without_separator() {
        let answer = json!({"terms_authority_nuts": {
            "authority_nuts_nested": {"buckets": [
                {"key": "CZ010", "doc_count": 2},
                {"key": " SK0 - x", "doc_count": 1}
            ]}
        }});
        let out = authority_nuts(&answer, &ctx("terms_authority_nuts", &NoNames)).unwrap();
        let Summary::Counts(counts) = out else {
            panic!("Expected Counts");
        };
        assert_eq!(counts["CZ010"], 2);
        assert_eq!(counts["SK0"], 1);
    }

    #[test]
    fn test_top_list() {
        let answer = json!({"top_authorities": {
            "doc_count": 30,
            "authorities_nested": {"buckets": [
                {"key": "g1", "doc_count": 9, "hits": {"hits": {"hits": [{"_source": {"name": "City"}}]}}}
            ]}
        }});
        let out = top_authorities(&answer, &ctx("top_authorities", &NoNames)).unwrap();
        assert_eq!(
            out,
            Summary::Top(TopList {
                count: 30,
                top10: vec![TopEntry {
                    value: 9,
                    body: json!({"name": "City"})
                }]
            })
        );
    }

    #[test]
    fn test_top_list_missing_hits_is_malformed() {
        let answer = json!({"top_companies": {
            "doc_count": 1,
            "companies_nested": {"buckets": [{"key": "g1", "doc_count": 1}]}
        }});
        let err = top_companies(&answer, &ctx("top_companies", &NoNames)).unwrap_err();
        assert_eq!(err.kind(), "malformed_answer");
    }

    #[test]
    fn test_sums_and_countries() {
        let answer = json!({
            "sums_finalPrice": {"buckets": [
                {"key": "EUR", "doc_count": 2, "sum_price": {"value": 1500.5}}
            ]},
            "terms_countries": {"buckets": [{"key": "CZ", "doc_count": 11}]}
        });
        let Summary::Amounts(sums) =
            sums_final_price(&answer, &ctx("sums_finalPrice", &NoNames)).unwrap()
        else {
            panic!("Expected Amounts");
        };
        assert_eq!(sums["EUR"], 1500.5);

        let Summary::Counts(by_country) =
            countries(&answer, &ctx("terms_countries", &NoNames)).unwrap()
        else {
            panic!("Expected Counts");
        };
        assert_eq!(by_country["cz"], 11);
    }

    #[test]
    fn test_named_cpvs() {
        let mut names = HashMap::new();
        names.insert("45".to_string(), "Construction work".to_string());
        let answer = json!({"terms_main_cpv_divisions": {
            "cpvs_filter": {"divisionscpvs": {"buckets": [
                {"key": "45", "doc_count": 4},
                {"key": "33", "doc_count": 1}
            ]}}
        }});
        let Summary::Named(named) =
            main_cpv_divisions(&answer, &ctx("terms_main_cpv_divisions", &names)).unwrap()
        else {
            panic!("Expected Named");
        };
        assert_eq!(named["45"].name.as_deref(), Some("Construction work"));
        assert_eq!(named["45"].value, 4);
        assert_eq!(named["33"].name, None);
    }

    #[test]
    fn test_award_years_filtered_by_range() {
        let answer = json!({"histogram_lots_awardDecisionDate": {
            "dates_nested": {"buckets": [
                {"key": 0, "key_as_string": "1970-01-01T00:00:00.000Z", "doc_count": 5},
                {"key": 1, "key_as_string": "2012-01-01T00:00:00.000Z", "doc_count": 8},
                {"key": 2, "key_as_string": "20", "doc_count": 1}
            ]}
        }});
        let Summary::Yearly(years) = award_decision_years(
            &answer,
            &ctx("histogram_lots_awardDecisionDate", &NoNames),
        )
        .unwrap() else {
            panic!("Expected Yearly");
        };
        assert_eq!(years.len(), 1);
        assert_eq!(years[&2012], 8);
    }

    #[test]
    fn test_lot_bid_totals() {
        let answer = json!({"count_lots_bids": {
            "doc_count": 12,
            "top_reverse_nested": {"doc_count": 4},
            "lotsbids": {
                "doc_count": 30,
                "lotsbids_nested_filter": {"doc_count": 10, "lotsbids_nested": {"doc_count": 11}}
            }
        }});
        let out = lot_bid_totals(&answer, &ctx("count_lots_bids", &NoNames)).unwrap();
        assert_eq!(
            out,
            Summary::Totals(LotBidTotals {
                bids: 30,
                bids_awarded: 11,
                lots: 12,
                tenders: 42
            })
        );
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let err = indicators(&json!({}), &ctx("terms_indicators", &NoNames)).unwrap_err();
        assert!(matches!(err, DslError::MalformedAnswer { path, .. } if path == "terms_indicators"));
    }
}
