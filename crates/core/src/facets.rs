//! Transformation of raw engine aggregations into client-facing facets.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dsl::PRICE_BUCKETS;

// ---------------------------------------------------------------------------
// Facet types
// ---------------------------------------------------------------------------

/// One bucket of a terms facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    pub value: String,
    pub count: i64,
}

/// One bucket of a range facet, with its display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,
    pub count: i64,
    pub label: String,
}

/// A client-facing facet: terms buckets or labeled ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buckets: Option<Vec<FacetBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Vec<FacetRange>>,
}

// ---------------------------------------------------------------------------
// Transformation
// ---------------------------------------------------------------------------

/// Turn the engine's `aggregations` object into facets, in requested-key
/// order. Keys the engine did not answer for are skipped.
pub fn transform_aggregations(facet_keys: &[String], aggregations: &Value) -> Vec<Facet> {
    facet_keys
        .iter()
        .filter_map(|key| {
            let agg = aggregations.get(key)?;
            if key == "priceFrom" {
                Some(range_facet(key, agg))
            } else {
                Some(terms_facet(key, agg))
            }
        })
        .collect()
}

fn terms_facet(key: &str, agg: &Value) -> Facet {
    let buckets = agg["buckets"]
        .as_array()
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|bucket| {
                    let value = match &bucket["key"] {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let count = bucket["doc_count"].as_i64()?;
                    Some(FacetBucket { value, count })
                })
                .collect()
        })
        .unwrap_or_default();

    Facet {
        key: key.to_string(),
        name: display_name(key),
        kind: "terms".into(),
        buckets: Some(buckets),
        ranges: None,
    }
}

/// Pair the engine's range buckets with the fixed labels by position; the
/// request and the label table are built from the same constant.
fn range_facet(key: &str, agg: &Value) -> Facet {
    let ranges = agg["buckets"]
        .as_array()
        .map(|buckets| {
            buckets
                .iter()
                .enumerate()
                .filter_map(|(idx, bucket)| {
                    let (from, to, label) = PRICE_BUCKETS.get(idx)?;
                    Some(FacetRange {
                        from: *from,
                        to: *to,
                        count: bucket["doc_count"].as_i64().unwrap_or(0),
                        label: (*label).to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Facet {
        key: key.to_string(),
        name: display_name(key),
        kind: "range".into(),
        buckets: None,
        ranges: Some(ranges),
    }
}

/// Human label for a facet key. Attribute keys use their capitalized
/// suffix (`attributes.color` -> `Color`).
pub fn display_name(key: &str) -> String {
    match key {
        "brand" => "Brand".into(),
        "categoryId" | "categoryName" => "Category".into(),
        "priceFrom" => "Price".into(),
        other => {
            let bare = other.strip_prefix("attributes.").unwrap_or(other);
            let mut chars = bare.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => bare.to_string(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
