// tests/api_http.rs
//
// HTTP-level tests for the tool router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use authlayer::api::{router, AppState};
use authlayer::knowledge::{GuideLibrary, NOTHING_FOUND};
use authlayer::listing::{FixtureListings, Listing, Price};
use authlayer::vision::MockVision;

const BODY_LIMIT: usize = 1024 * 1024;

fn sample_listing() -> Listing {
    Listing {
        item_id: "389562275934".into(),
        title: "Maison Margiela Replica GAT White EU 42".into(),
        description: "Worn twice, comes with box".into(),
        condition: "Pre-owned".into(),
        price: Price {
            value: "180.00".into(),
            currency: "GBP".into(),
        },
        seller_username: "archive_uk".into(),
        feedback_score: 0,
        feedback_percentage: "100".into(),
        images: vec!["https://i.ebayimg.com/main.jpg".into()],
        item_url: "https://www.ebay.co.uk/itm/389562275934".into(),
        fetched_at: Utc::now(),
    }
}

fn test_router() -> Router {
    let mut kb = GuideLibrary::new(3);
    kb.add_document(
        "margiela_authentication.md",
        "Fake GATs have a puffy heel tab that is overstuffed.",
    );
    let state = AppState::new(
        Arc::new(FixtureListings::new().with(sample_listing())),
        Arc::new(MockVision::new("Heel tab is thin and flush; looks genuine and correct.")),
        Arc::new(kb),
    );
    router(state)
}

async fn post_json(app: Router, uri: &str, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v: Json = serde_json::from_slice(&bytes).expect("json body");
    (status, v)
}

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn confidence_tool_accepts_orchestrator_arguments() {
    let (status, v) = post_json(
        test_router(),
        "/tools/calculate_confidence_score",
        json!({
            "title_flags": "Margiela Replica GAT sneaker, rep quality stitching",
            "seller_feedback_score": 0,
            "seller_feedback_percentage": "100",
            "review_flags": "none",
            "image_analysis_summary": "none",
            "knowledge_base_matches": "none"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["score"], json!(85));
    assert_eq!(v["level"], json!("HIGH - likely authentic"));
    assert_eq!(v["reasons"].as_array().unwrap().len(), 2);
    assert_eq!(v["next_steps"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn confidence_tool_with_empty_object_is_clean() {
    let (status, v) = post_json(test_router(), "/tools/calculate_confidence_score", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["score"], json!(100));
    assert_eq!(v["reasons"], json!(["no red flags detected"]));
}

#[tokio::test]
async fn fetch_listing_returns_record() {
    let (status, v) = post_json(
        test_router(),
        "/tools/fetch_listing",
        json!({ "url": "https://www.ebay.co.uk/itm/389562275934?_skw=margiela" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["title"], json!("Maison Margiela Replica GAT White EU 42"));
    assert_eq!(v["seller_username"], json!("archive_uk"));
    assert!(v.get("error").is_none());
}

#[tokio::test]
async fn fetch_listing_failure_is_data() {
    let (status, v) = post_json(
        test_router(),
        "/tools/fetch_listing",
        json!({ "url": "https://www.ebay.co.uk/itm/111" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let err = v["error"].as_str().expect("error field");
    assert!(err.contains("not found"), "{err}");

    let (_, v) = post_json(
        test_router(),
        "/tools/fetch_listing",
        json!({ "url": "https://www.ebay.co.uk/sch/i.html" }),
    )
    .await;
    assert!(v["error"].as_str().unwrap().contains("item id"));
}

#[tokio::test]
async fn image_tool_returns_analysis_text() {
    let (status, v) = post_json(
        test_router(),
        "/tools/analyze_listing_images",
        json!({ "image_urls": ["https://i.ebayimg.com/main.jpg"], "brand": "Maison Margiela" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(v["analysis"].as_str().unwrap().contains("genuine"));
}

#[tokio::test]
async fn guide_search_tool() {
    let (_, hit) = post_json(
        test_router(),
        "/tools/search_authentication_guide",
        json!({ "query": "margiela GAT heel tab" }),
    )
    .await;
    assert!(hit["results"]
        .as_str()
        .unwrap()
        .contains("--- Source: margiela_authentication.md ---"));

    let (_, miss) = post_json(
        test_router(),
        "/tools/search_authentication_guide",
        json!({ "query": "rolex bezel" }),
    )
    .await;
    assert_eq!(miss["results"], json!(NOTHING_FOUND));
}
