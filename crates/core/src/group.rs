//! Variant-to-product grouping, buy-box selection, and cursor emission.
//!
//! The engine returns variant-level hits in final rank order. This module
//! collapses them into one result per product, picks the variant that won
//! the match and the offer that wins the buy box, and derives the
//! continuation cursor from the last *raw hit* (continuation happens in
//! variant-sort space, not product space).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::cursor;
use crate::document::{EngineHit, EnginePage, Offer, VariantDocument, VariantOption};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// The variant that won the match within a product group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedVariant {
    pub variant_id: String,
    pub sku: String,
    #[serde(default)]
    pub attributes: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub price_from: f64,
    pub total_stock: i64,
}

impl MatchedVariant {
    fn from_document(doc: &VariantDocument) -> Self {
        Self {
            variant_id: doc.variant_id.clone(),
            sku: doc.sku.clone(),
            attributes: doc.attributes.clone(),
            image_url: doc.image_url.clone(),
            price_from: doc.price_from,
            total_stock: doc.total_stock,
        }
    }
}

/// The buy-box offer: lowest price with stock, falling back to lowest price
/// without stock, falling back to a placeholder when the variant carries no
/// offers at all. The placeholder (`offerId = ""`, `supplierName =
/// "Unknown"`, `price = priceFrom`, `stock = 0`) is an observable contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestOffer {
    pub offer_id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub supplier_rating: f64,
    pub price: f64,
    pub stock: i64,
}

impl BestOffer {
    fn from_offer(offer: &Offer) -> Self {
        Self {
            offer_id: offer.offer_id.clone(),
            supplier_id: offer.supplier_id.clone(),
            supplier_name: offer.supplier_name.clone(),
            supplier_rating: offer.supplier_rating,
            price: offer.price,
            stock: offer.stock,
        }
    }

    fn placeholder(price_from: f64) -> Self {
        Self {
            offer_id: String::new(),
            supplier_id: String::new(),
            supplier_name: "Unknown".into(),
            supplier_rating: 0.0,
            price: price_from,
            stock: 0,
        }
    }
}

/// One product-level search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResult {
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    pub score: f64,
    pub matched_variant: MatchedVariant,
    pub best_offer: BestOffer,
    pub variant_options: Vec<VariantOption>,
    /// Sum of offers across this product's variants *on this page*. An
    /// approximation: variants outside the page are not counted.
    pub offer_count: usize,
}

/// A grouped page: at most `limit` products plus the continuation cursor.
#[derive(Debug, Clone)]
pub struct GroupedPage {
    pub products: Vec<ProductResult>,
    pub next_cursor: Option<String>,
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

struct Group<'a> {
    first: &'a VariantDocument,
    max_score: f64,
    hits: Vec<&'a EngineHit>,
}

/// Group one engine page into product results.
///
/// * `page` - hits in engine rank order.
/// * `options` - enricher output (productId -> variant options); an empty
///   map is the degraded-catalog fallback and switches option extraction to
///   the hits themselves.
/// * `limit` - the requested page size; `next_cursor` is emitted only when
///   the engine filled the page exactly and the last hit carries sort
///   values.
pub fn group_hits(
    page: &EnginePage,
    options: &HashMap<String, Vec<VariantOption>>,
    limit: usize,
) -> GroupedPage {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Group<'_>> = HashMap::new();

    for hit in &page.hits {
        let product_id = &hit.source.product_id;
        match groups.get_mut(product_id) {
            Some(group) => {
                group.max_score = group.max_score.max(hit.score);
                group.hits.push(hit);
            }
            None => {
                order.push(product_id.clone());
                groups.insert(
                    product_id.clone(),
                    Group {
                        first: &hit.source,
                        max_score: hit.score,
                        hits: vec![hit],
                    },
                );
            }
        }
    }

    let mut products: Vec<ProductResult> = order
        .iter()
        .map(|product_id| {
            let group = &groups[product_id];
            build_result(product_id, group, options)
        })
        .collect();

    // The walk preserved engine order, but maxScore can differ from the
    // first-seen score; re-sort by score with the productId tiebreak.
    products.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    GroupedPage {
        products,
        next_cursor: next_cursor(page, limit),
    }
}

fn build_result(
    product_id: &str,
    group: &Group<'_>,
    options: &HashMap<String, Vec<VariantOption>>,
) -> ProductResult {
    let matched = select_matched_variant(&group.hits);
    let best_offer = select_buy_box(matched);
    let offer_count = group.hits.iter().map(|h| h.source.offers.len()).sum();

    let variant_options = match options.get(product_id) {
        Some(opts) if !opts.is_empty() => opts.clone(),
        // Catalog degraded (or unknown product): fall back to the variants
        // we actually saw in the hits.
        _ => group
            .hits
            .iter()
            .map(|h| VariantOption::from_document(&h.source))
            .collect(),
    };

    ProductResult {
        product_id: product_id.to_string(),
        name: group.first.product_name.clone(),
        description: group.first.product_description.clone(),
        brand: group.first.brand.clone(),
        category_id: group.first.category_id.clone(),
        category_name: group.first.category_name.clone(),
        score: group.max_score,
        matched_variant: MatchedVariant::from_document(matched),
        best_offer,
        variant_options,
        offer_count,
    }
}

/// Highest score wins; ties go to the cheaper variant.
fn select_matched_variant<'a>(hits: &[&'a EngineHit]) -> &'a VariantDocument {
    let mut best = hits[0];
    for hit in &hits[1..] {
        let better = hit.score > best.score
            || (hit.score == best.score && hit.source.price_from < best.source.price_from);
        if better {
            best = hit;
        }
    }
    &best.source
}

/// Lowest price among in-stock offers; else lowest price among all offers;
/// else the placeholder.
fn select_buy_box(variant: &VariantDocument) -> BestOffer {
    let cheapest = |offers: &mut dyn Iterator<Item = &Offer>| -> Option<BestOffer> {
        offers
            .min_by(|a, b| {
                a.price
                    .partial_cmp(&b.price)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(BestOffer::from_offer)
    };

    cheapest(&mut variant.offers.iter().filter(|o| o.stock > 0))
        .or_else(|| cheapest(&mut variant.offers.iter()))
        .unwrap_or_else(|| BestOffer::placeholder(variant.price_from))
}

/// Continuation only exists when the engine filled the page exactly and the
/// last hit carries sort values to resume from.
fn next_cursor(page: &EnginePage, limit: usize) -> Option<String> {
    if page.hits.len() != limit {
        return None;
    }
    let last = page.hits.last()?;
    if last.sort.is_empty() {
        return None;
    }
    Some(cursor::encode(&last.sort))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
