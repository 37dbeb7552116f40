use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{require_bearer, TokenRegistry};
use crate::handlers;
use crate::jobs::JobQueue;
use crate::reports::ReportService;

#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<ReportService>,
    pub queue: JobQueue,
    pub tokens: Arc<TokenRegistry>,
}

impl AppState {
    pub fn new(reports: ReportService, queue: JobQueue, tokens: TokenRegistry) -> Self {
        Self {
            reports: Arc::new(reports),
            queue,
            tokens: Arc::new(tokens),
        }
    }
}

pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/reports/dashboard", get(handlers::reports::dashboard))
        .route("/reports/patients", get(handlers::reports::patients))
        .route("/reports/revenue", get(handlers::reports::revenue))
        .route("/reports/labs", get(handlers::reports::labs))
        .route(
            "/reports/labs/:id/generate",
            post(handlers::jobs::generate_lab_report),
        )
        .route("/reports/encounters", get(handlers::reports::encounters))
        .route("/reports/prescriptions", get(handlers::reports::prescriptions))
        .route("/jobs/lab-reports/:id", get(handlers::jobs::lab_report_job))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
