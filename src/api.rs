//! HTTP tool surface. Each collaborator and the scorer is exposed as one
//! callable tool; failures are returned as data, never as 5xx.

use std::sync::Arc;

use axum::{extract::State, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::decision::ScoringResult;
use crate::engine;
use crate::evidence::EvidenceBundle;
use crate::knowledge::{GuideLibrary, KnowledgeBase};
use crate::listing::{EbayProvider, Listing, ListingProvider};
use crate::vision::{build_vision_client, DynVisionClient, VisionRequest};

#[derive(Clone)]
pub struct AppState {
    pub listings: Arc<dyn ListingProvider>,
    pub vision: DynVisionClient,
    pub knowledge: Arc<dyn KnowledgeBase>,
}

impl AppState {
    pub fn new(
        listings: Arc<dyn ListingProvider>,
        vision: DynVisionClient,
        knowledge: Arc<dyn KnowledgeBase>,
    ) -> Self {
        Self {
            listings,
            vision,
            knowledge,
        }
    }

    /// Real providers from config. A missing knowledge-base dir degrades to an
    /// empty library (every search returns the "nothing found" sentinel).
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let listings = Arc::new(EbayProvider::new(cfg.ebay.clone())?);
        let vision = build_vision_client(&cfg.vision);
        let knowledge = match GuideLibrary::from_dir(&cfg.knowledge.dir, cfg.knowledge.top_k) {
            Ok(lib) => lib,
            Err(e) => {
                warn!(error = ?e, "knowledge base unavailable, searches will return nothing");
                GuideLibrary::new(cfg.knowledge.top_k)
            }
        };
        info!(
            listings = listings.name(),
            vision = vision.provider_name(),
            "providers ready"
        );
        Ok(Self::new(listings, vision, Arc::new(knowledge)))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/tools/calculate_confidence_score",
            post(calculate_confidence_score),
        )
        .route("/tools/fetch_listing", post(fetch_listing))
        .route("/tools/analyze_listing_images", post(analyze_listing_images))
        .route(
            "/tools/search_authentication_guide",
            post(search_authentication_guide),
        )
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn calculate_confidence_score(Json(evidence): Json<EvidenceBundle>) -> Json<ScoringResult> {
    Json(engine::calculate_confidence_score(&evidence))
}

#[derive(Deserialize)]
struct FetchReq {
    url: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum FetchResp {
    Found(Box<Listing>),
    Failed { error: String },
}

async fn fetch_listing(State(state): State<AppState>, Json(body): Json<FetchReq>) -> Json<FetchResp> {
    match state.listings.fetch(&body.url).await {
        Ok(listing) => Json(FetchResp::Found(Box::new(listing))),
        Err(e) => {
            warn!(provider = state.listings.name(), error = %e, "listing fetch failed");
            Json(FetchResp::Failed {
                error: format!("couldn't fetch listing: {e}"),
            })
        }
    }
}

#[derive(Serialize)]
struct AnalysisResp {
    analysis: String,
}

async fn analyze_listing_images(
    State(state): State<AppState>,
    Json(req): Json<VisionRequest>,
) -> Json<AnalysisResp> {
    let analysis = state.vision.analyze(&req).await;
    Json(AnalysisResp { analysis })
}

#[derive(Deserialize)]
struct SearchReq {
    query: String,
}

#[derive(Serialize)]
struct SearchResp {
    results: String,
}

async fn search_authentication_guide(
    State(state): State<AppState>,
    Json(req): Json<SearchReq>,
) -> Json<SearchResp> {
    Json(SearchResp {
        results: state.knowledge.search(&req.query),
    })
}
