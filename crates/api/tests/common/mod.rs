// All functions in this module are shared test helpers. Not every test binary
// uses every helper, so we suppress dead_code warnings at the item level.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use vitrine_api::config::ServerConfig;
use vitrine_api::router::build_app_router;
use vitrine_api::state::{AppState, Breakers};
use vitrine_cache::MemoryStore;
use vitrine_core::document::{EnginePage, VariantOption};
use vitrine_core::metrics::Metrics;
use vitrine_db::CatalogSource;
use vitrine_search::response::parse_page;
use vitrine_search::{SearchBackend, SearchError};

// ---------------------------------------------------------------------------
// Fake engine
// ---------------------------------------------------------------------------

/// Scripted engine: responses are raw engine JSON popped in call order.
/// Captures every request body for DSL assertions.
#[derive(Default)]
pub struct FakeEngine {
    responses: Mutex<VecDeque<Value>>,
    bodies: Mutex<Vec<Value>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response for the next engine call.
    pub fn push_response(&self, raw: Value) {
        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(raw);
    }

    /// Make every subsequent call fail with a 500.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent request body, for asserting the built DSL.
    pub fn last_body(&self) -> Option<Value> {
        self.bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    pub fn nth_body(&self, n: usize) -> Option<Value> {
        self.bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(n)
            .cloned()
    }
}

#[async_trait]
impl SearchBackend for FakeEngine {
    async fn search(&self, body: &Value) -> Result<EnginePage, SearchError> {
        self.raw_search(body).await.map(|raw| parse_page(&raw))
    }

    async fn raw_search(&self, body: &Value) -> Result<Value, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(body.clone());

        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchError::Api {
                status: 500,
                body: "engine exploded".into(),
            });
        }

        Ok(self
            .responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| engine_response(0, vec![])))
    }

    async fn ping(&self) -> Result<(), SearchError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SearchError::Api {
                status: 500,
                body: "down".into(),
            })
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Fake catalog
// ---------------------------------------------------------------------------

/// In-process catalog with programmable variant options and a failure
/// switch (simulates the relational store going away).
#[derive(Default)]
pub struct FakeCatalog {
    options: Mutex<HashMap<String, Vec<VariantOption>>>,
    failing: AtomicBool,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product_id: &str, options: Vec<VariantOption>) {
        self.options
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(product_id.to_string(), options);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogSource for FakeCatalog {
    async fn variant_options(
        &self,
        product_ids: &[String],
    ) -> Result<HashMap<String, Vec<VariantOption>>, sqlx::Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let options = self.options.lock().unwrap_or_else(|e| e.into_inner());
        Ok(product_ids
            .iter()
            .filter_map(|id| options.get(id).map(|opts| (id.clone(), opts.clone())))
            .collect())
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        if self.failing.load(Ordering::SeqCst) {
            Err(sqlx::Error::PoolTimedOut)
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` with safe defaults and a throttle limit
/// high enough that only the throttle tests trip it.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_prefix: "api".to_string(),
        cors_origins: vec!["*".to_string()],
        database_url: "postgres://unused".to_string(),
        opensearch_node: "http://unused:9200".to_string(),
        opensearch_index: "variants".to_string(),
        redis_url: "redis://unused".to_string(),
        throttle_ttl: std::time::Duration::from_secs(60),
        throttle_limit: 10_000,
        cache_ttl_search: std::time::Duration::from_secs(300),
        cache_ttl_facets: std::time::Duration::from_secs(600),
        sales_boost: Default::default(),
        timeout_request: std::time::Duration::from_secs(10),
        timeout_opensearch: std::time::Duration::from_secs(2),
        timeout_database: std::time::Duration::from_secs(2),
        timeout_connect: std::time::Duration::from_secs(1),
        breaker: Default::default(),
    }
}

/// Everything a test needs: the router plus handles on the fakes.
pub struct TestContext {
    pub app: Router,
    pub engine: Arc<FakeEngine>,
    pub catalog: Arc<FakeCatalog>,
    pub cache: Arc<MemoryStore>,
}

pub fn build_test_app() -> TestContext {
    build_test_app_with(test_config())
}

/// Build the full application router over the fakes, using the exact
/// middleware stack production uses.
pub fn build_test_app_with(config: ServerConfig) -> TestContext {
    let engine = Arc::new(FakeEngine::new());
    let catalog = Arc::new(FakeCatalog::new());
    let cache = Arc::new(MemoryStore::new());

    let state = AppState {
        config: Arc::new(config.clone()),
        engine: engine.clone(),
        catalog: catalog.clone(),
        cache: cache.clone(),
        breakers: Arc::new(Breakers::new(&config.breaker)),
        metrics: Arc::new(Metrics::default()),
    };

    let app = build_app_router(state, &config);
    TestContext {
        app,
        engine,
        catalog,
        cache,
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// GET the given URI and return the response.
pub async fn get(app: Router, uri: &str) -> axum::response::Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// GET with extra headers.
pub async fn get_with_headers(
    app: Router,
    uri: &str,
    headers: &[(&str, &str)],
) -> axum::response::Response {
    let mut builder = Request::builder().uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
}

/// Collect the response body into a `serde_json::Value`.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the standard error envelope and return it.
pub async fn expect_error(
    response: axum::response::Response,
    status: StatusCode,
    code: &str,
) -> Value {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], code);
    assert!(json["meta"]["path"].is_string());
    json
}

/// Percent-encode a query-string value.
pub fn urlencode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Corpus builders (raw engine JSON)
// ---------------------------------------------------------------------------

/// Build one raw engine hit for a variant document.
pub fn raw_hit(
    product_id: &str,
    variant_id: &str,
    name: &str,
    score: f64,
    price_from: f64,
    offers: Value,
) -> Value {
    json!({
        "_id": variant_id,
        "_score": score,
        "_source": {
            "variantId": variant_id,
            "productId": product_id,
            "sku": format!("sku-{variant_id}"),
            "productName": name,
            "brand": "StyleBasics",
            "categoryId": "cat-tshirts",
            "categoryName": "T-Shirts",
            "attributes": { "color": "Red" },
            "priceFrom": price_from,
            "totalStock": 10,
            "sales30d": 5,
            "offers": offers,
        },
        "sort": [score, product_id],
    })
}

/// One offer object for a raw hit.
pub fn raw_offer(offer_id: &str, price: f64, stock: i64) -> Value {
    json!({
        "offerId": offer_id,
        "supplierId": format!("sup-{offer_id}"),
        "supplierName": format!("Supplier {offer_id}"),
        "supplierRating": 4.5,
        "price": price,
        "stock": stock,
    })
}

/// Wrap hits in a raw engine response envelope.
pub fn engine_response(total: i64, hits: Vec<Value>) -> Value {
    json!({
        "took": 3,
        "hits": {
            "total": { "value": total, "relation": "eq" },
            "hits": hits,
        }
    })
}

/// A raw phrase-suggester response with the given corrected texts.
pub fn phrase_suggest_response(options: &[&str]) -> Value {
    let options: Vec<Value> = options
        .iter()
        .map(|text| json!({ "text": text, "score": 0.8 }))
        .collect();
    json!({
        "took": 2,
        "hits": { "total": { "value": 0 }, "hits": [] },
        "suggest": {
            "product-phrase": [{ "text": "original", "options": options }]
        }
    })
}

/// A raw fuzzy-aggregation suggest response with brand/category buckets.
pub fn fuzzy_suggest_response(brands: &[(&str, i64)], categories: &[(&str, i64)]) -> Value {
    let bucket = |(key, count): &(&str, i64)| json!({ "key": key, "doc_count": count });
    json!({
        "took": 2,
        "hits": { "total": { "value": 0 }, "hits": [] },
        "aggregations": {
            "brands": { "buckets": brands.iter().map(bucket).collect::<Vec<_>>() },
            "categories": { "buckets": categories.iter().map(bucket).collect::<Vec<_>>() },
        }
    })
}
