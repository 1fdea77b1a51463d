//! Engine DSL construction for the search, facet, and suggest queries.
//!
//! All bodies are built as `serde_json::Value` trees and handed to the
//! engine adapter untouched. The search and facet shapes share one filter
//! builder so a filter behaves identically in both pipelines.

use serde_json::{json, Value};

use crate::cursor;
use crate::query::{FacetQuery, SearchQuery};

// ---------------------------------------------------------------------------
// Ranking configuration
// ---------------------------------------------------------------------------

/// Function-score parameters for the best-seller boost.
///
/// The base relevance score is multiplied by `modifier(sales30d * factor)`,
/// with documents missing the field treated as `missing`. The default
/// `log1p` keeps the boost monotonic but dampened, so best-sellers rise
/// among comparably-relevant hits without burying much better text matches.
#[derive(Debug, Clone)]
pub struct SalesBoost {
    pub factor: f64,
    pub modifier: String,
}

impl Default for SalesBoost {
    fn default() -> Self {
        Self {
            factor: 1.2,
            modifier: "log1p".into(),
        }
    }
}

/// Fields searched by the text clause, with per-field boosts.
const TEXT_FIELDS: [&str; 6] = [
    "productName^3",
    "productDescription",
    "brand^2",
    "categoryName",
    "sku",
    "attributes.*",
];

/// Fixed buckets for the `priceFrom` range facet, as `(from, to, label)`.
pub const PRICE_BUCKETS: [(Option<f64>, Option<f64>, &str); 5] = [
    (None, Some(25.0), "Under 25"),
    (Some(25.0), Some(50.0), "25 to 50"),
    (Some(50.0), Some(100.0), "50 to 100"),
    (Some(100.0), Some(200.0), "100 to 200"),
    (Some(200.0), None, "200 and up"),
];

/// Bucket size for terms facets.
const TERMS_FACET_SIZE: u32 = 50;

// ---------------------------------------------------------------------------
// Search body
// ---------------------------------------------------------------------------

/// Build the full search request body: scored text match, filters,
/// function-score boost, total sort order, and `search_after` continuation.
pub fn search_body(query: &SearchQuery, boost: &SalesBoost) -> Value {
    let mut body = json!({
        "query": {
            "function_score": {
                "query": bool_query(
                    &query.text,
                    query.category_id.as_deref(),
                    query.brand.as_deref(),
                    query.price_min,
                    query.price_max,
                    &query.attribute_filters,
                ),
                "functions": [{
                    "field_value_factor": {
                        "field": "sales30d",
                        "modifier": boost.modifier,
                        "factor": boost.factor,
                        "missing": 1,
                    }
                }],
                "score_mode": "multiply",
                "boost_mode": "multiply",
            }
        },
        "size": query.limit,
        // The productId tiebreak makes the order strictly total, which is
        // what keeps search_after deterministic across score ties.
        "sort": [
            { "_score": { "order": "desc" } },
            { "productId": { "order": "asc" } },
        ],
        "track_total_hits": true,
    });

    // A malformed cursor decodes to None and pagination restarts.
    if let Some(sort_values) = query.cursor.as_deref().and_then(cursor::decode) {
        body["search_after"] = Value::Array(sort_values);
    }

    body
}

// ---------------------------------------------------------------------------
// Facet body
// ---------------------------------------------------------------------------

/// Build the aggregation-only request body for a facet query: same text and
/// filters as the search shape, `size: 0`, one aggregation per facet key.
pub fn facet_body(query: &FacetQuery) -> Value {
    let mut aggs = serde_json::Map::new();
    for key in &query.facet_keys {
        aggs.insert(key.clone(), facet_aggregation(key));
    }

    json!({
        "query": bool_query(
            &query.text,
            query.category_id.as_deref(),
            query.brand.as_deref(),
            query.price_min,
            query.price_max,
            &query.attribute_filters,
        ),
        "size": 0,
        "aggs": aggs,
        "track_total_hits": true,
    })
}

fn facet_aggregation(key: &str) -> Value {
    if key == "priceFrom" {
        let ranges: Vec<Value> = PRICE_BUCKETS
            .iter()
            .map(|(from, to, _)| {
                let mut range = serde_json::Map::new();
                if let Some(from) = from {
                    range.insert("from".into(), json!(from));
                }
                if let Some(to) = to {
                    range.insert("to".into(), json!(to));
                }
                Value::Object(range)
            })
            .collect();
        return json!({ "range": { "field": "priceFrom", "ranges": ranges } });
    }

    json!({
        "terms": {
            "field": keyword_field(key),
            "size": TERMS_FACET_SIZE,
            "order": { "_count": "desc" },
        }
    })
}

// ---------------------------------------------------------------------------
// Suggest bodies
// ---------------------------------------------------------------------------

/// Name of the phrase suggester in the suggest request and response.
pub const PHRASE_SUGGESTER: &str = "product-phrase";

/// Phrase-suggester body: bigram model over `productName`, popular-mode
/// candidate generation, up to three corrections.
pub fn phrase_suggest_body(text: &str) -> Value {
    json!({
        "size": 0,
        "suggest": {
            "product-phrase": {
                "text": text,
                "phrase": {
                    "field": "productName",
                    "gram_size": 2,
                    "size": 3,
                    "direct_generator": [{
                        "field": "productName",
                        "suggest_mode": "popular",
                    }],
                }
            }
        }
    })
}

/// Aggregation-based suggest body: a fuzzy match over name, brand, and
/// category with top-3 brand and category buckets and no hits.
pub fn fuzzy_suggest_body(text: &str) -> Value {
    json!({
        "size": 0,
        "query": {
            "multi_match": {
                "query": text,
                "fields": ["productName", "brand", "categoryName"],
                "fuzziness": "AUTO",
            }
        },
        "aggs": {
            "brands": {
                "terms": { "field": keyword_field("brand"), "size": 3 }
            },
            "categories": {
                "terms": { "field": keyword_field("categoryName"), "size": 3 }
            },
        }
    })
}

// ---------------------------------------------------------------------------
// Shared clause builders
// ---------------------------------------------------------------------------

fn bool_query(
    text: &str,
    category_id: Option<&str>,
    brand: Option<&str>,
    price_min: Option<f64>,
    price_max: Option<f64>,
    attribute_filters: &std::collections::BTreeMap<String, Vec<String>>,
) -> Value {
    json!({
        "bool": {
            "must": [text_clause(text)],
            "filter": filter_clauses(category_id, brand, price_min, price_max, attribute_filters),
        }
    })
}

/// Best-fields multi-match with automatic fuzziness. The two-character
/// verbatim prefix keeps the fuzzy expansion cost bounded. A literal `*`
/// matches everything (used by facet UIs browsing without a query).
fn text_clause(text: &str) -> Value {
    if text == "*" {
        return json!({ "match_all": {} });
    }
    json!({
        "multi_match": {
            "query": text,
            "type": "best_fields",
            "fields": TEXT_FIELDS,
            "fuzziness": "AUTO",
            "prefix_length": 2,
        }
    })
}

/// Build the non-scoring filter clauses. Never contributes to `_score`.
fn filter_clauses(
    category_id: Option<&str>,
    brand: Option<&str>,
    price_min: Option<f64>,
    price_max: Option<f64>,
    attribute_filters: &std::collections::BTreeMap<String, Vec<String>>,
) -> Vec<Value> {
    let mut clauses = Vec::new();

    if let Some(category_id) = category_id {
        clauses.push(json!({ "term": { "categoryId": category_id } }));
    }
    if let Some(brand) = brand {
        clauses.push(json!({ "term": { "brand.keyword": brand } }));
    }
    if price_min.is_some() || price_max.is_some() {
        let mut bounds = serde_json::Map::new();
        if let Some(min) = price_min {
            bounds.insert("gte".into(), json!(min));
        }
        if let Some(max) = price_max {
            bounds.insert("lte".into(), json!(max));
        }
        clauses.push(json!({ "range": { "priceFrom": bounds } }));
    }
    for (key, values) in attribute_filters {
        let field = keyword_field(key);
        if values.len() == 1 {
            clauses.push(json!({ "term": { field: values[0] } }));
        } else {
            clauses.push(json!({ "terms": { field: values } }));
        }
    }

    clauses
}

/// Target the keyword sub-field for analyzed text fields. `categoryId` is
/// already an exact-match keyword in the mapping and is used as-is.
fn keyword_field(key: &str) -> String {
    if key == "categoryId" {
        key.to_string()
    } else {
        format!("{key}.keyword")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
