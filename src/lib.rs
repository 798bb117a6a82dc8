// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod config;
pub mod decision;
pub mod engine;
pub mod evidence;
pub mod knowledge;
pub mod listing;
pub mod logging;
pub mod metrics;
pub mod vision;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::decision::{ScoringResult, Tier};
pub use crate::engine::calculate_confidence_score;
pub use crate::evidence::{EvidenceBundle, Signal};

use crate::config::AppConfig;
use tracing::info;

/// Build the full router from config: tool routes plus `/metrics` when enabled.
pub fn app(cfg: &AppConfig) -> anyhow::Result<axum::Router> {
    let state = AppState::from_config(cfg)?;
    let mut router = api::router(state);
    if cfg.server.metrics {
        let m = crate::metrics::Metrics::init()?;
        router = router.merge(m.router());
        info!("metrics route enabled");
    }
    Ok(router)
}
