use crate::logging::MAX_REQUEST_BODY_BYTES;
use crate::state::AppState;
use crate::{api, logging, openapi};
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ercole data-service API",
        description = "Hostdata ingestion for the Ercole inventory",
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Hosts", description = "Hostdata ingestion and host lifecycle")
    )
)]
struct ApiDoc;

pub fn build_http_app(state: AppState) -> Router {
    let (router, spec) = api::routes().split_for_parts();

    let mut merged_spec = ApiDoc::openapi();
    merged_spec.merge(spec);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .with_state(state)
        .merge(openapi::json_route(Arc::new(merged_spec)))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .layer(middleware::from_fn(logging::request_logging))
}
