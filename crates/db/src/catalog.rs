//! Batched variant-options lookup against the relational catalog.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::FromRow;
use vitrine_core::document::VariantOption;

use crate::DbPool;

/// The relational reads the search pipeline needs.
///
/// The trait seam lets integration tests run against an in-process fake;
/// production uses [`PgCatalog`].
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch all variants of the given products, grouped by productId.
    ///
    /// One round-trip per page regardless of how many products it holds.
    async fn variant_options(
        &self,
        product_ids: &[String],
    ) -> Result<HashMap<String, Vec<VariantOption>>, sqlx::Error>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

#[derive(Debug, FromRow)]
struct VariantOptionRow {
    variant_id: String,
    product_id: String,
    attributes: Json<BTreeMap<String, String>>,
    image_url: Option<String>,
}

/// PostgreSQL-backed catalog source.
pub struct PgCatalog {
    pool: DbPool,
}

impl PgCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogSource for PgCatalog {
    async fn variant_options(
        &self,
        product_ids: &[String],
    ) -> Result<HashMap<String, Vec<VariantOption>>, sqlx::Error> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = "\
            SELECT id AS variant_id, product_id, \
                   COALESCE(attributes, '{}'::jsonb) AS attributes, image_url \
            FROM variants \
            WHERE product_id = ANY($1) \
            ORDER BY product_id, id";

        let rows = sqlx::query_as::<_, VariantOptionRow>(sql)
            .bind(product_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<String, Vec<VariantOption>> = HashMap::new();
        for row in rows {
            grouped
                .entry(row.product_id.clone())
                .or_default()
                .push(VariantOption {
                    variant_id: row.variant_id,
                    product_id: row.product_id,
                    attributes: row.attributes.0,
                    image_url: row.image_url,
                });
        }

        tracing::debug!(
            products = product_ids.len(),
            variants = grouped.values().map(Vec::len).sum::<usize>(),
            "Fetched variant options"
        );

        Ok(grouped)
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        crate::health_check(&self.pool).await
    }
}
