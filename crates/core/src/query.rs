//! Request normalization, validation, and cache-key construction.
//!
//! Raw HTTP parameters are turned into a *canonical query record* exactly
//! once, at the edge: text trimmed, known case-insensitive filter values
//! folded, attribute keys and multi-value sets sorted. Everything downstream
//! (the DSL builder, the cache key) consumes the canonical form, so two
//! permutations of the same request hash to the same cache entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Limits and allow-lists
// ---------------------------------------------------------------------------

/// Minimum length of the search text, after trimming.
pub const MIN_QUERY_LEN: usize = 1;

/// Maximum length of the search text, after trimming.
pub const MAX_QUERY_LEN: usize = 200;

/// Default page size when the client does not send `limit`.
pub const DEFAULT_LIMIT: usize = 20;

/// Maximum accepted page size. Larger values are rejected, not clamped.
pub const MAX_LIMIT: usize = 100;

/// Filter keys whose values are matched case-insensitively by the index
/// mapping; their values are lower-cased during normalization so the cache
/// key and the filter clause agree with the index.
pub const CASE_INSENSITIVE_FILTER_KEYS: &[&str] = &["brand"];

/// Facet keys clients may request directly. Any `attributes.*` key is also
/// allowed; everything else is dropped with a warning.
pub const FACET_KEY_ALLOW_LIST: &[&str] = &["brand", "categoryId", "categoryName", "priceFrom"];

/// Prefix admitting dynamic attribute facets (`attributes.color`, ...).
pub const ATTRIBUTE_FACET_PREFIX: &str = "attributes.";

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// A raw attribute-filter value as it arrives from the client: either a
/// single value or a set of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(String),
    Many(Vec<String>),
}

/// Unvalidated search parameters, as decoded from the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
    pub q: String,
    pub category_id: Option<String>,
    pub brand: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    /// Attribute filters keyed by field key (e.g. `attributes.color`).
    pub filters: BTreeMap<String, FilterValue>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

// ---------------------------------------------------------------------------
// Canonical query records
// ---------------------------------------------------------------------------

/// The canonical, validated search query.
///
/// Attribute filters are stored as sorted, de-duplicated value lists under
/// sorted keys; a single-valued filter is a one-element list. The original
/// single-vs-set distinction is recovered from the list length when the
/// engine DSL is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub category_id: Option<String>,
    pub brand: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub attribute_filters: BTreeMap<String, Vec<String>>,
    pub limit: usize,
    /// Opaque continuation token, passed through verbatim.
    pub cursor: Option<String>,
}

/// The canonical facet query: the same filters as [`SearchQuery`] plus the
/// sanitized facet-key list (in request order).
#[derive(Debug, Clone, PartialEq)]
pub struct FacetQuery {
    pub text: String,
    pub category_id: Option<String>,
    pub brand: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub attribute_filters: BTreeMap<String, Vec<String>>,
    pub facet_keys: Vec<String>,
}

impl SearchQuery {
    /// Validate and canonicalize raw input.
    ///
    /// Fails with [`CoreError::Validation`] before any external call when:
    /// - the trimmed text is empty or longer than [`MAX_QUERY_LEN`],
    /// - `limit` is outside `1..=100`,
    /// - a price bound is negative.
    ///
    /// An inverted price range (`min > max`) is accepted as given; the
    /// resulting engine clause simply matches nothing.
    pub fn normalize(input: SearchInput) -> Result<Self, CoreError> {
        let text = validate_text(&input.q)?;
        let limit = validate_limit(input.limit)?;
        validate_price_bound("priceRange.min", input.price_min)?;
        validate_price_bound("priceRange.max", input.price_max)?;

        Ok(Self {
            text,
            category_id: input.category_id.filter(|v| !v.is_empty()),
            brand: input
                .brand
                .filter(|v| !v.is_empty())
                .map(|v| v.to_lowercase()),
            price_min: input.price_min,
            price_max: input.price_max,
            attribute_filters: canonicalize_filters(input.filters),
            limit,
            cursor: input.cursor.filter(|c| !c.is_empty()),
        })
    }

    /// Cache key for this query: `search:<sorted k=json(v) joined by '|'>`.
    ///
    /// The cursor participates verbatim, so distinct pages cache
    /// independently.
    pub fn cache_key(&self) -> String {
        let mut parts = filter_key_parts(
            &self.text,
            self.category_id.as_deref(),
            self.brand.as_deref(),
            self.price_min,
            self.price_max,
            &self.attribute_filters,
        );
        parts.insert("limit".into(), serde_json::json!(self.limit));
        if let Some(cursor) = &self.cursor {
            parts.insert("cursor".into(), serde_json::json!(cursor));
        }
        join_key("search", &parts)
    }
}

impl FacetQuery {
    /// Validate and canonicalize raw input plus the requested facet keys.
    ///
    /// `facet_keys` must be non-empty before sanitization; keys outside the
    /// allow-list are dropped with a warning (soft failure), so the list may
    /// legitimately end up empty.
    pub fn normalize(input: SearchInput, facet_keys: Vec<String>) -> Result<Self, CoreError> {
        if facet_keys.is_empty() {
            return Err(CoreError::Validation(
                "facetKeys must contain at least one key".into(),
            ));
        }

        let base = SearchQuery::normalize(SearchInput {
            limit: None,
            cursor: None,
            ..input
        })?;

        Ok(Self {
            text: base.text,
            category_id: base.category_id,
            brand: base.brand,
            price_min: base.price_min,
            price_max: base.price_max,
            attribute_filters: base.attribute_filters,
            facet_keys: sanitize_facet_keys(facet_keys),
        })
    }

    /// Cache key for this facet query: `facets:<sorted k=json(v) ...>`.
    pub fn cache_key(&self) -> String {
        let mut parts = filter_key_parts(
            &self.text,
            self.category_id.as_deref(),
            self.brand.as_deref(),
            self.price_min,
            self.price_max,
            &self.attribute_filters,
        );
        parts.insert("facetKeys".into(), serde_json::json!(self.facet_keys));
        join_key("facets", &parts)
    }
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_text(q: &str) -> Result<String, CoreError> {
    let trimmed = q.trim();
    if trimmed.len() < MIN_QUERY_LEN {
        return Err(CoreError::Validation("q must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_QUERY_LEN {
        return Err(CoreError::Validation(format!(
            "q must be at most {MAX_QUERY_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_limit(limit: Option<i64>) -> Result<usize, CoreError> {
    match limit {
        None => Ok(DEFAULT_LIMIT),
        Some(n) if n >= 1 && n as usize <= MAX_LIMIT => Ok(n as usize),
        Some(n) => Err(CoreError::Validation(format!(
            "limit must be between 1 and {MAX_LIMIT}, got {n}"
        ))),
    }
}

fn validate_price_bound(name: &str, value: Option<f64>) -> Result<(), CoreError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(CoreError::Validation(format!(
            "{name} must be a non-negative number"
        ))),
        _ => Ok(()),
    }
}

/// Sort keys, sort and de-duplicate value sets, and fold values of known
/// case-insensitive keys.
fn canonicalize_filters(filters: BTreeMap<String, FilterValue>) -> BTreeMap<String, Vec<String>> {
    filters
        .into_iter()
        .filter_map(|(key, value)| {
            let fold = is_case_insensitive_key(&key);
            let mut values: Vec<String> = match value {
                FilterValue::One(v) => vec![v],
                FilterValue::Many(vs) => vs,
            };
            values.retain(|v| !v.is_empty());
            if fold {
                for v in &mut values {
                    *v = v.to_lowercase();
                }
            }
            values.sort();
            values.dedup();
            if values.is_empty() {
                None
            } else {
                Some((key, values))
            }
        })
        .collect()
}

fn is_case_insensitive_key(key: &str) -> bool {
    let bare = key.strip_prefix(ATTRIBUTE_FACET_PREFIX).unwrap_or(key);
    CASE_INSENSITIVE_FILTER_KEYS.contains(&bare)
}

/// Keep only allow-listed facet keys (plus `attributes.*`), preserving the
/// request order. Dropped keys are logged, never surfaced as errors.
pub fn sanitize_facet_keys(keys: Vec<String>) -> Vec<String> {
    let mut kept = Vec::with_capacity(keys.len());
    for key in keys {
        let valid = FACET_KEY_ALLOW_LIST.contains(&key.as_str())
            || (key.starts_with(ATTRIBUTE_FACET_PREFIX)
                && key.len() > ATTRIBUTE_FACET_PREFIX.len());
        if valid {
            if !kept.contains(&key) {
                kept.push(key);
            }
        } else {
            tracing::warn!(facet_key = %key, "Dropping facet key outside the allow-list");
        }
    }
    kept
}

// ---------------------------------------------------------------------------
// Cache-key assembly
// ---------------------------------------------------------------------------

/// Collect the filter fields shared by both query shapes into sorted
/// `key -> json(value)` parts.
fn filter_key_parts(
    text: &str,
    category_id: Option<&str>,
    brand: Option<&str>,
    price_min: Option<f64>,
    price_max: Option<f64>,
    attribute_filters: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, serde_json::Value> {
    let mut parts = BTreeMap::new();
    parts.insert("q".into(), serde_json::json!(text));
    if let Some(v) = category_id {
        parts.insert("categoryId".into(), serde_json::json!(v));
    }
    if let Some(v) = brand {
        parts.insert("brand".into(), serde_json::json!(v));
    }
    if let Some(v) = price_min {
        parts.insert("priceMin".into(), serde_json::json!(v));
    }
    if let Some(v) = price_max {
        parts.insert("priceMax".into(), serde_json::json!(v));
    }
    for (key, values) in attribute_filters {
        parts.insert(format!("filter.{key}"), serde_json::json!(values));
    }
    parts
}

fn join_key(prefix: &str, parts: &BTreeMap<String, serde_json::Value>) -> String {
    let joined = parts
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("|");
    format!("{prefix}:{joined}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
