use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

impl Metrics {
    /// Install the Prometheus recorder (once per process) and describe our series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| PrometheusBuilder::new().install_recorder())?
            .clone();
        describe_all();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_all() {
    describe_counter!(
        "confidence_scores_total",
        "Confidence evaluations, labelled by tier."
    );
    describe_histogram!("confidence_score", "Distribution of final confidence scores.");
    describe_counter!("listing_fetch_total", "Listings fetched successfully.");
    describe_counter!(
        "listing_fetch_errors_total",
        "Listing fetch failures, labelled by kind."
    );
    describe_counter!(
        "vision_requests_total",
        "Vision provider calls, labelled by outcome."
    );
}
