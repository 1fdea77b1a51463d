//! Combination of the two suggestion strategies into one ranked list.
//!
//! The pipeline feeds in phrase-suggester corrections and the brand and
//! category buckets of the fuzzy aggregation query; this module owns the
//! pure merge: brand tokens are union-merged into the original query's
//! token set, categories pass through verbatim, and the combined list is
//! case-folded-deduplicated and truncated.

use serde::{Deserialize, Serialize};

/// Maximum number of suggestions returned to the client.
pub const MAX_SUGGESTIONS: usize = 5;

/// A single "did you mean" entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub term: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_count: Option<i64>,
}

impl Suggestion {
    pub fn new(term: impl Into<String>, estimated_count: Option<i64>) -> Self {
        Self {
            term: term.into(),
            estimated_count,
        }
    }
}

/// Merge both strategies, in strategy order: phrase corrections first, then
/// brand-derived queries, then categories. Duplicates (case-insensitive)
/// keep their first occurrence; output is capped at [`MAX_SUGGESTIONS`].
pub fn merge_suggestions(
    original_query: &str,
    phrase: Vec<Suggestion>,
    brands: Vec<Suggestion>,
    categories: Vec<Suggestion>,
) -> Vec<Suggestion> {
    let mut seen: Vec<String> = Vec::new();
    let mut merged: Vec<Suggestion> = Vec::new();

    let brand_queries = brands.into_iter().map(|b| Suggestion {
        term: merge_brand_tokens(original_query, &b.term),
        estimated_count: b.estimated_count,
    });

    for suggestion in phrase.into_iter().chain(brand_queries).chain(categories) {
        let folded = suggestion.term.to_lowercase();
        if folded.is_empty() || seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        merged.push(suggestion);
        if merged.len() == MAX_SUGGESTIONS {
            break;
        }
    }

    merged
}

/// Union-merge a brand's tokens into the query's token set, preserving query
/// token order and appending only the brand tokens not already present.
fn merge_brand_tokens(query: &str, brand: &str) -> String {
    let mut tokens: Vec<&str> = query.split_whitespace().collect();
    for brand_token in brand.split_whitespace() {
        let already = tokens
            .iter()
            .any(|t| t.eq_ignore_ascii_case(brand_token));
        if !already {
            tokens.push(brand_token);
        }
    }
    tokens.join(" ")
}

// ---------------------------------------------------------------------------
// Raw-response parsing
// ---------------------------------------------------------------------------

/// Pull the phrase-suggester options out of a raw engine response. The
/// suggester name must match the one the DSL builder used.
pub fn parse_phrase_options(raw: &serde_json::Value, suggester: &str) -> Vec<Suggestion> {
    raw["suggest"][suggester]
        .as_array()
        .into_iter()
        .flatten()
        .flat_map(|entry| entry["options"].as_array().into_iter().flatten())
        .filter_map(|option| {
            option["text"]
                .as_str()
                .map(|text| Suggestion::new(text, None))
        })
        .collect()
}

/// Pull one terms aggregation's buckets out of a raw engine response as
/// suggestions carrying the bucket doc counts.
pub fn parse_agg_buckets(raw: &serde_json::Value, agg: &str) -> Vec<Suggestion> {
    raw["aggregations"][agg]["buckets"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|bucket| {
            let term = bucket["key"].as_str()?;
            Some(Suggestion::new(term, bucket["doc_count"].as_i64()))
        })
        .collect()
}
