//! Integration tests for GET /api/v1/search: validation, grouping,
//! pagination, caching, suggestions, and failure semantics.

mod common;

use std::collections::HashSet;
use std::time::Duration;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, engine_response, expect_error, fuzzy_suggest_response, get,
    get_with_headers, phrase_suggest_response, raw_hit, raw_offer, urlencode,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Basic search (single product, three variants)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn basic_search_groups_variants_into_one_product() {
    let ctx = build_test_app();
    let offers = |id: &str| json!([raw_offer(id, 19.99, 10)]);
    ctx.engine.push_response(engine_response(
        3,
        vec![
            raw_hit("p-tshirt", "v-red-s", "Classic Cotton T-Shirt", 3.2, 19.99, offers("a")),
            raw_hit("p-tshirt", "v-red-m", "Classic Cotton T-Shirt", 3.1, 19.99, offers("b")),
            raw_hit("p-tshirt", "v-red-l", "Classic Cotton T-Shirt", 3.0, 19.99, offers("c")),
        ],
    ));

    let response = get(ctx.app, "/api/v1/search?q=shirt&limit=20").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let product = &body["data"][0];
    assert_eq!(product["productId"], "p-tshirt");
    assert_eq!(product["name"], "Classic Cotton T-Shirt");
    assert_eq!(product["bestOffer"]["price"], 19.99);
    assert!(product["bestOffer"]["stock"].as_i64().unwrap() > 0);
    assert_eq!(product["offerCount"], 3);
    assert_eq!(product["matchedVariant"]["variantId"], "v-red-s");

    assert_eq!(body["meta"]["pagination"]["total"], 3);
    assert_eq!(body["meta"]["pagination"]["count"], 1);
    assert!(body["meta"]["pagination"].get("nextCursor").is_none());
    assert!(body["meta"]["correlationId"].is_string());
    assert!(body.get("suggestions").is_none());
}

// ---------------------------------------------------------------------------
// Validation failures (before any engine call)
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_query_is_rejected_without_engine_call() {
    let ctx = build_test_app();
    let response = get(ctx.app, "/api/v1/search?q=").await;
    expect_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
    assert_eq!(ctx.engine.calls(), 0);
}

#[tokio::test]
async fn overlong_query_is_rejected() {
    let ctx = build_test_app();
    let q = "a".repeat(201);
    let response = get(ctx.app, &format!("/api/v1/search?q={q}")).await;
    expect_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
}

#[tokio::test]
async fn limit_101_is_rejected_100_is_accepted() {
    let ctx = build_test_app();
    ctx.engine.push_response(engine_response(0, vec![]));
    ctx.engine.push_response(phrase_suggest_response(&[]));
    ctx.engine.push_response(fuzzy_suggest_response(&[], &[]));

    let ok = get(ctx.app.clone(), "/api/v1/search?q=shirt&limit=100").await;
    assert_eq!(ok.status(), StatusCode::OK);

    let rejected = get(ctx.app, "/api/v1/search?q=shirt&limit=101").await;
    expect_error(rejected, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
}

#[tokio::test]
async fn malformed_filters_json_is_rejected() {
    let ctx = build_test_app();
    let uri = format!("/api/v1/search?q=shirt&filters={}", urlencode("{not json"));
    let response = get(ctx.app, &uri).await;
    expect_error(response, StatusCode::BAD_REQUEST, "BAD_REQUEST").await;
    assert_eq!(ctx.engine.calls(), 0);
}

// ---------------------------------------------------------------------------
// Filter construction on the wire
// ---------------------------------------------------------------------------

#[tokio::test]
async fn filters_reach_the_engine_canonicalized() {
    let ctx = build_test_app();
    ctx.engine.push_response(engine_response(0, vec![]));
    ctx.engine.push_response(phrase_suggest_response(&[]));
    ctx.engine.push_response(fuzzy_suggest_response(&[], &[]));

    let filters = urlencode(r#"{"attributes.color":"Blue"}"#);
    let uri = format!(
        "/api/v1/search?q=shirt&brand=StyleBasics&categoryId=cat-7&filters={filters}"
    );
    let response = get(ctx.app, &uri).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = ctx.engine.nth_body(0).unwrap();
    let clauses = body["query"]["function_score"]["query"]["bool"]["filter"]
        .as_array()
        .unwrap()
        .clone();

    assert!(clauses
        .iter()
        .any(|c| c["term"]["categoryId"] == "cat-7"));
    // Brand values are folded to lower case during normalization.
    assert!(clauses
        .iter()
        .any(|c| c["term"]["brand.keyword"] == "stylebasics"));
    assert!(clauses
        .iter()
        .any(|c| c["term"]["attributes.color.keyword"] == "Blue"));
}

// ---------------------------------------------------------------------------
// Zero results and the suggestion pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zero_results_include_suggestions() {
    let ctx = build_test_app();
    ctx.engine.push_response(engine_response(0, vec![]));
    ctx.engine
        .push_response(phrase_suggest_response(&["blue shirt"]));
    ctx.engine
        .push_response(fuzzy_suggest_response(&[("StyleBasics", 12)], &[("T-Shirts", 30)]));

    let response = get(ctx.app, "/api/v1/search?q=blue+shrt").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["meta"]["pagination"]["total"], 0);

    let suggestions = body["suggestions"].as_array().unwrap();
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0]["term"], "blue shirt");
    // Brand tokens are union-merged into the query's token set.
    assert!(suggestions
        .iter()
        .any(|s| s["term"] == "blue shrt StyleBasics"));
    assert!(suggestions.iter().any(|s| s["term"] == "T-Shirts"));
}

#[tokio::test]
async fn empty_suggesters_omit_the_suggestions_field() {
    let ctx = build_test_app();
    // Only the main search response is scripted; the two suggest calls
    // fall through to the default empty response.
    ctx.engine.push_response(engine_response(0, vec![]));

    let response = get(ctx.app, "/api/v1/search?q=nothing").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body.get("suggestions").is_none());
}

// ---------------------------------------------------------------------------
// Cursor handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_cursor_restarts_pagination() {
    let ctx = build_test_app();
    ctx.engine.push_response(engine_response(
        1,
        vec![raw_hit("p1", "v1", "Sneaker", 2.0, 59.0, json!([]))],
    ));

    let response = get(ctx.app, "/api/v1/search?q=sneakers&cursor=!!garbage!!").await;
    assert_eq!(response.status(), StatusCode::OK);

    // Pagination restarted: no search_after reached the engine.
    let body = ctx.engine.nth_body(0).unwrap();
    assert!(body.get("search_after").is_none());
}

#[tokio::test]
async fn pagination_walks_25_products_in_three_pages() {
    let ctx = build_test_app();
    let page = |range: std::ops::Range<u32>| {
        engine_response(
            25,
            range
                .map(|i| {
                    raw_hit(
                        &format!("p{i:02}"),
                        &format!("v{i:02}"),
                        "Runner Sneaker",
                        30.0 - i as f64,
                        59.0,
                        json!([raw_offer(&format!("o{i:02}"), 59.0, 3)]),
                    )
                })
                .collect(),
        )
    };
    ctx.engine.push_response(page(1..11));
    ctx.engine.push_response(page(11..21));
    ctx.engine.push_response(page(21..26));

    let mut seen: HashSet<String> = HashSet::new();

    // Page 1.
    let body = body_json(get(ctx.app.clone(), "/api/v1/search?q=sneakers&limit=10").await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
    let cursor1 = body["meta"]["pagination"]["nextCursor"]
        .as_str()
        .expect("page 1 must carry a cursor")
        .to_string();
    collect_ids(&body, &mut seen);

    // Page 2: the cursor's sort tuple must reach the engine as search_after.
    let uri = format!("/api/v1/search?q=sneakers&limit=10&cursor={}", urlencode(&cursor1));
    let body = body_json(get(ctx.app.clone(), &uri).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
    let engine_body = ctx.engine.nth_body(1).unwrap();
    assert_eq!(engine_body["search_after"], json!([20.0, "p10"]));
    let cursor2 = body["meta"]["pagination"]["nextCursor"]
        .as_str()
        .expect("page 2 must carry a cursor")
        .to_string();
    collect_ids(&body, &mut seen);

    // Page 3: short page, no further cursor.
    let uri = format!("/api/v1/search?q=sneakers&limit=10&cursor={}", urlencode(&cursor2));
    let body = body_json(get(ctx.app, &uri).await).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert!(body["meta"]["pagination"].get("nextCursor").is_none());
    collect_ids(&body, &mut seen);

    assert_eq!(seen.len(), 25, "no duplicate productIds across the walk");
}

fn collect_ids(body: &serde_json::Value, seen: &mut HashSet<String>) {
    for product in body["data"].as_array().unwrap() {
        seen.insert(product["productId"].as_str().unwrap().to_string());
    }
}

// ---------------------------------------------------------------------------
// Catalog degradation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn catalog_outage_degrades_to_hit_variants() {
    let ctx = build_test_app();
    ctx.catalog.set_failing(true);
    ctx.engine.push_response(engine_response(
        2,
        vec![
            raw_hit("p1", "v1", "Shirt", 2.0, 19.99, json!([])),
            raw_hit("p1", "v2", "Shirt", 1.5, 21.99, json!([])),
        ],
    ));

    let response = get(ctx.app, "/api/v1/search?q=shirt").await;

    // The search still succeeds, with options taken from the hits.
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let options = body["data"][0]["variantOptions"].as_array().unwrap();
    assert_eq!(options.len(), 2);
}

// ---------------------------------------------------------------------------
// Response cache
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identical_requests_hit_the_cache() {
    let ctx = build_test_app();
    ctx.engine.push_response(engine_response(
        1,
        vec![raw_hit("p1", "v1", "Shirt", 2.0, 19.99, json!([raw_offer("a", 19.99, 5)]))],
    ));

    let first = body_json(
        get_with_headers(
            ctx.app.clone(),
            "/api/v1/search?q=shirt",
            &[("x-correlation-id", "first-req")],
        )
        .await,
    )
    .await;
    assert_eq!(ctx.engine.calls(), 1);

    // The cache write is detached from the request; give it a beat.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = body_json(
        get_with_headers(
            ctx.app,
            "/api/v1/search?q=shirt",
            &[("x-correlation-id", "second-req")],
        )
        .await,
    )
    .await;

    // Served from cache: no second engine call, identical data, fresh
    // correlation id, original took.
    assert_eq!(ctx.engine.calls(), 1);
    assert_eq!(second["data"], first["data"]);
    assert_eq!(second["meta"]["correlationId"], "second-req");
    assert_ne!(
        second["meta"]["correlationId"],
        first["meta"]["correlationId"]
    );
    assert_eq!(second["meta"]["took"], first["meta"]["took"]);
}

#[tokio::test]
async fn different_filters_cache_independently() {
    let ctx = build_test_app();
    ctx.engine.push_response(engine_response(0, vec![]));
    ctx.engine.push_response(engine_response(0, vec![]));

    get(ctx.app.clone(), "/api/v1/search?q=shirt&brand=nike").await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    get(ctx.app, "/api/v1/search?q=shirt&brand=puma").await;

    // Two distinct cache keys, two engine calls (plus suggest traffic).
    let search_calls = (0..ctx.engine.calls())
        .filter_map(|n| ctx.engine.nth_body(n))
        .filter(|b| b.get("suggest").is_none() && b.get("aggs").is_none())
        .count();
    assert_eq!(search_calls, 2);
}

// ---------------------------------------------------------------------------
// Engine failure semantics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn engine_error_surfaces_as_503() {
    let ctx = build_test_app();
    ctx.engine.set_failing(true);

    let response = get(ctx.app, "/api/v1/search?q=shirt").await;
    expect_error(response, StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE").await;
}

#[tokio::test]
async fn circuit_opens_after_repeated_failures_and_fails_fast() {
    let ctx = build_test_app();
    ctx.engine.set_failing(true);

    // Five failing calls trip the breaker (50% threshold, volume 5).
    for i in 0..5 {
        let response = get(ctx.app.clone(), &format!("/api/v1/search?q=shirt{i}")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
    assert_eq!(ctx.engine.calls(), 5);

    // The sixth request fails fast: same status, no engine call.
    let response = get(ctx.app, "/api/v1/search?q=shirt5").await;
    expect_error(response, StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE").await;
    assert_eq!(ctx.engine.calls(), 5);
}
