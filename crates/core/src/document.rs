//! The denormalized variant document and the engine hit shapes built from it.
//!
//! Each searchable unit in the engine index is one sellable variant,
//! denormalized so that filtering, faceting, and ranking never need a
//! relational join on the hot path. Field names match the index mapping
//! (camelCase), so these types deserialize straight out of `_source`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// Offer
// ---------------------------------------------------------------------------

/// A supplier's price and stock position for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub offer_id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    /// Supplier rating on the catalog's 0-5 scale.
    #[serde(default)]
    pub supplier_rating: f64,
    pub price: f64,
    pub stock: i64,
}

// ---------------------------------------------------------------------------
// Variant document
// ---------------------------------------------------------------------------

/// One indexed variant, as stored in the engine.
///
/// `priceFrom` is always non-negative: the ingestion path writes the lowest
/// offer price, or 0 when the variant has no offers at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantDocument {
    pub variant_id: String,
    pub product_id: String,
    pub sku: String,
    pub product_name: String,
    #[serde(default)]
    pub product_description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    /// Dynamic attribute map (e.g. `color`, `size`). Keys are not schema'd.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub price_from: f64,
    #[serde(default)]
    pub total_stock: i64,
    /// Units sold in the trailing 30 days; drives the ranking boost.
    #[serde(default, rename = "sales30d")]
    pub sales_30d: i64,
    #[serde(default)]
    pub offers: Vec<Offer>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Engine hits
// ---------------------------------------------------------------------------

/// A single scored hit from the engine, with the sort tuple the engine
/// attached to it (used for `search_after` continuation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineHit {
    pub score: f64,
    pub source: VariantDocument,
    /// Sort values for this hit, in sort-clause order. Empty when the
    /// engine did not return them (e.g. aggregation-only queries).
    #[serde(default)]
    pub sort: Vec<serde_json::Value>,
}

/// One page of hits plus the normalized total match count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnginePage {
    pub total: i64,
    pub hits: Vec<EngineHit>,
}

// ---------------------------------------------------------------------------
// Variant options (relational projection)
// ---------------------------------------------------------------------------

/// The relational store's projection of a variant, used to populate the
/// `variantOptions` list on a product card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantOption {
    pub variant_id: String,
    pub product_id: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl VariantOption {
    /// Build an option from an indexed document. Used when the relational
    /// lookup degraded and the grouper falls back to the hits themselves.
    pub fn from_document(doc: &VariantDocument) -> Self {
        Self {
            variant_id: doc.variant_id.clone(),
            product_id: doc.product_id.clone(),
            attributes: doc.attributes.clone(),
            image_url: doc.image_url.clone(),
        }
    }
}
