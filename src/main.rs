//! AuthLayer binary entrypoint.
//! Boots the Axum HTTP server with the listing, vision, knowledge-base and
//! scoring tools wired in.

use shuttle_axum::ShuttleAxum;
use tracing::info;

use authlayer::config::AppConfig;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    authlayer::logging::init_dev_tracing();

    let cfg = AppConfig::load_default()?;
    info!(
        vision_enabled = cfg.vision.enabled,
        kb_dir = %cfg.knowledge.dir.display(),
        marketplace = %cfg.ebay.marketplace_id,
        "config loaded"
    );

    let router = authlayer::app(&cfg)?;
    Ok(router.into())
}
