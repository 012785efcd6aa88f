//! Ready-made queries used by dashboards and entity pages

use crate::query::filter::field_query;
use serde_json::{json, Value};

pub fn match_all() -> Value {
    json!({"match_all": {}})
}

/// Tenders with any of the given buyer groups
pub fn by_buyers(buyer_ids: &[String]) -> Value {
    json!({
        "nested": {
            "path": "buyers",
            "query": {"terms": {"buyers.groupId": buyer_ids}}
        }
    })
}

/// Tenders with a bid by any of the given bidder groups
pub fn by_bidders(bidder_ids: &[String]) -> Value {
    json!({
        "nested": {
            "path": "lots.bids",
            "query": {
                "nested": {
                    "path": "lots.bids.bidders",
                    "query": {"terms": {"lots.bids.bidders.groupId": bidder_ids}}
                }
            }
        }
    })
}

/// Tenders whose main CPV falls into a division (first two digits)
pub fn by_main_cpv_division(division: &str) -> Value {
    main_cpv("cpvs.code.divisions", division)
}

/// Tenders whose main CPV is exactly `code`
pub fn by_main_cpv_full(code: &str) -> Value {
    main_cpv("cpvs.code", code)
}

fn main_cpv(field: &str, code: &str) -> Value {
    json!({
        "nested": {
            "path": "cpvs",
            "query": {
                "bool": {
                    "must": [
                        field_query("term", field, json!(code)),
                        {"term": {"cpvs.isMain": true}}
                    ]
                }
            }
        }
    })
}

/// Restrict `query` to one country; no country leaves it as is
pub fn add_country_filter(query: Value, country_field: &str, country: Option<&str>) -> Value {
    match country.filter(|c| !c.is_empty()) {
        None => query,
        Some(country) => json!({
            "bool": {
                "must": [query, field_query("term", country_field, json!(country))]
            }
        }),
    }
}
