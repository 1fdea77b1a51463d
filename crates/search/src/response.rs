//! Parsing of raw engine responses into the structured page shape.

use serde_json::Value;
use vitrine_core::document::{EngineHit, EnginePage, VariantDocument};

/// Normalize `hits.total`, which the engine reports either as a bare
/// number (older wire compatibility) or as `{"value": n, "relation": ..}`.
pub fn normalize_total(raw: &Value) -> i64 {
    let total = &raw["hits"]["total"];
    if let Some(n) = total.as_i64() {
        return n;
    }
    total["value"].as_i64().unwrap_or(0)
}

/// Extract the hits of a raw response into [`EngineHit`]s.
///
/// A hit whose `_source` does not decode as a variant document is dropped
/// with a warning rather than failing the page; the index is external
/// input and one bad document must not take down the endpoint.
pub fn parse_page(raw: &Value) -> EnginePage {
    let hits = raw["hits"]["hits"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(parse_hit)
        .collect();

    EnginePage {
        total: normalize_total(raw),
        hits,
    }
}

fn parse_hit(hit: &Value) -> Option<EngineHit> {
    let source: VariantDocument = match serde_json::from_value(hit["_source"].clone()) {
        Ok(doc) => doc,
        Err(err) => {
            tracing::warn!(
                error = %err,
                doc_id = hit["_id"].as_str().unwrap_or("<unknown>"),
                "Dropping hit with undecodable _source"
            );
            return None;
        }
    };

    Some(EngineHit {
        score: hit["_score"].as_f64().unwrap_or(0.0),
        source,
        sort: hit["sort"].as_array().cloned().unwrap_or_default(),
    })
}
