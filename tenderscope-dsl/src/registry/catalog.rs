//! Built-in named aggregations

use crate::registry::parsers;
use crate::registry::NamedAggregation;
use serde_json::{json, Value};

fn top_hit() -> Value {
    json!({"hits": {"top_hits": {"size": 1}}})
}

fn main_cpv_filter() -> Value {
    json!({"query": {"bool": {"must": [{"term": {"cpvs.isMain": true}}]}}})
}

fn award_dates() -> Value {
    json!({"dates_nested": {"date_histogram": {"field": "lots.awardDecisionDate", "interval": "year"}}})
}

pub(crate) fn builtin() -> Vec<NamedAggregation> {
    vec![
        NamedAggregation::new(
            "top_authorities",
            json!({
                "nested": {"path": "buyers"},
                "aggregations": {
                    "authorities_nested": {
                        "terms": {"field": "buyers.groupId", "size": 10},
                        "aggregations": top_hit()
                    }
                }
            }),
            parsers::top_authorities,
        ),
        NamedAggregation::new(
            "top_companies",
            json!({
                "nested": {"path": "lots.bids.bidders"},
                "aggregations": {
                    "companies_nested": {
                        "terms": {"field": "lots.bids.bidders.groupId", "size": 10},
                        "aggregations": top_hit()
                    }
                }
            }),
            parsers::top_companies,
        ),
        NamedAggregation::new(
            "top_winning_companies",
            json!({
                "nested": {"path": "lots.bids"},
                "aggregations": {
                    "top_winning_companies_nested_filter": {
                        "filter": {"query": {"bool": {"must": [{"term": {"lots.bids.isWinning": true}}]}}},
                        "aggregations": {
                            "companies": {
                                "nested": {"path": "lots.bids.bidders"},
                                "aggregations": {
                                    "companies_nested": {
                                        "terms": {"field": "lots.bids.bidders.groupId", "size": 10},
                                        "aggregations": top_hit()
                                    }
                                }
                            }
                        }
                    }
                }
            }),
            parsers::top_winning_companies,
        ),
        NamedAggregation::new(
            "sums_finalPrice",
            json!({
                "terms": {"field": "finalPrice.currency"},
                "aggregations": {"sum_price": {"sum": {"field": "finalPrice.netAmount"}}}
            }),
            parsers::sums_final_price,
        ),
        NamedAggregation::new(
            "terms_main_cpv_divisions",
            json!({
                "nested": {"path": "cpvs"},
                "aggregations": {
                    "cpvs_filter": {
                        "filter": main_cpv_filter(),
                        "aggregations": {
                            "divisionscpvs": {"terms": {"field": "cpvs.code.divisions", "size": 10000}}
                        }
                    }
                }
            }),
            parsers::main_cpv_divisions,
        ),
        NamedAggregation::new(
            "terms_countries",
            json!({"terms": {"field": "country", "size": 10000}}),
            parsers::countries,
        ),
        NamedAggregation::new(
            "terms_main_cpvs_full",
            json!({
                "nested": {"path": "cpvs"},
                "aggregations": {
                    "cpvs_filter": {
                        "filter": main_cpv_filter(),
                        "aggregations": {
                            "cpvs_full": {"terms": {"field": "cpvs.code", "size": 10000}}
                        }
                    }
                }
            }),
            parsers::main_cpvs_full,
        ),
        NamedAggregation::new(
            "terms_indicators",
            json!({"terms": {"field": "indicators.type"}}),
            parsers::indicators,
        ),
        NamedAggregation::new(
            "terms_company_nuts",
            json!({
                "nested": {"path": "lots.bids.bidders"},
                "aggregations": {
                    "company_nuts_nested": {
                        "terms": {"field": "lots.bids.bidders.address.nuts", "size": 3_000_000}
                    }
                }
            }),
            parsers::company_nuts,
        ),
        NamedAggregation::new(
            "terms_authority_nuts",
            json!({
                "nested": {"path": "buyers"},
                "aggregations": {
                    "authority_nuts_nested": {
                        "terms": {"field": "buyers.address.nuts", "size": 3_000_000}
                    }
                }
            }),
            parsers::authority_nuts,
        ),
        NamedAggregation::new(
            "histogram_lots_awardDecisionDate",
            json!({
                "nested": {"path": "lots"},
                "aggregations": award_dates()
            }),
            parsers::award_decision_years,
        ),
        NamedAggregation::new(
            "histogram_lots_awardDecisionDate_reverseNested",
            json!({
                "reverse_nested": {"path": "lots"},
                "aggregations": award_dates()
            }),
            parsers::award_decision_years,
        ),
        NamedAggregation::new(
            "count_lots_bids",
            json!({
                "nested": {"path": "lots"},
                "aggregations": {
                    "top_reverse_nested": {"reverse_nested": {}},
                    "lotsbids": {
                        "nested": {"path": "lots.bids"},
                        "aggregations": {
                            "lotsbids_nested_filter": {
                                "filter": {"term": {"lots.bids.isWinning": true}},
                                "aggregations": {
                                    "lotsbids_nested": {"nested": {"path": "lots.bids.bidders"}}
                                }
                            }
                        }
                    }
                }
            }),
            parsers::lot_bid_totals,
        ),
    ]
}
