use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::webhook::WebhookProcessor;

pub mod error;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<WebhookProcessor>,
    /// Bearer token the summarization job presents; without it the job
    /// callback route is not mounted.
    pub job_callback_secret: Option<String>,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(
    processor: Arc<WebhookProcessor>,
    job_callback_secret: Option<String>,
) -> Router {
    let app_state = Arc::new(AppState {
        processor,
        job_callback_secret,
    });

    let mut router = Router::new()
        .route("/api/health", get(health_check_handler))
        .merge(routes::webhook_routes::create_webhook_router());

    if app_state.job_callback_secret.is_some() {
        router = router.nest("/api/jobs", routes::job_routes::create_job_router());
    }

    router.layer(TraceLayer::new_for_http()).with_state(app_state)
}
