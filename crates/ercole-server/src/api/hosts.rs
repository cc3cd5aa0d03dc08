use axum::body::Bytes;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ercole_common::types::HostData;
use ercole_engine::IngestError;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::api::{error_response, success_empty_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
struct InsertedHostData {
    /// Id the snapshot was stored under
    id: String,
}

/// Raises AGENT_ERROR for a rejected hostdata. Delivery failures only get
/// logged: the agent is told about the rejection either way.
async fn alert_rejected(state: &AppState, trace_id: &str, reason: &str, raw: &Value) {
    if let Err(e) = state.service.alert_invalid_host_data(reason, raw).await {
        tracing::error!(trace_id = %trace_id, error = %e, "Failed to alert about invalid hostdata");
    }
}

/// Ingests one hostdata sent by an agent.
///
/// 422 when the document is not valid hostdata, 500 when a store or
/// alert-service failure aborted the ingestion.
#[utoipa::path(
    post,
    path = "/hosts",
    tag = "Hosts",
    request_body(content = Object, description = "Hostdata sent by the agent", content_type = "application/json"),
    responses(
        (status = 200, description = "Hostdata stored", body = InsertedHostData),
        (status = 422, description = "Invalid hostdata", body = crate::api::ApiError),
        (status = 500, description = "Ingestion failed", body = crate::api::ApiError)
    )
)]
async fn insert_host_data(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    body: Bytes,
) -> Response {
    let raw: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                &trace_id.0,
                "invalid_json",
                &format!("Invalid JSON: {e}"),
            );
        }
    };

    let hostdata: HostData = match serde_json::from_value(raw.clone()) {
        Ok(h) => h,
        Err(e) => {
            let reason = format!("Invalid hostdata: {e}");
            alert_rejected(&state, &trace_id.0, &reason, &raw).await;
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                &trace_id.0,
                "invalid_hostdata",
                &reason,
            );
        }
    };

    let hostname = hostdata.hostname.clone();
    let _permit = state.host_gate.acquire(&hostname).await;

    match state.service.insert_host_data(hostdata).await {
        Ok(id) => success_response(StatusCode::OK, &trace_id.0, InsertedHostData { id }),
        Err(IngestError::Validation(reason)) => {
            tracing::warn!(trace_id = %trace_id.0, hostname = %hostname, reason = %reason, "Hostdata rejected");
            alert_rejected(&state, &trace_id.0, &reason, &raw).await;
            error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                &trace_id.0,
                "invalid_hostdata",
                &reason,
            )
        }
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, hostname = %hostname, error = %e, "Hostdata ingestion failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id.0,
                "internal_error",
                &e.to_string(),
            )
        }
    }
}

/// Hostnames with a current snapshot, DR clones excluded.
#[utoipa::path(
    get,
    path = "/hosts",
    tag = "Hosts",
    responses(
        (status = 200, description = "Current hostnames", body = Vec<String>),
        (status = 500, description = "Store failure", body = crate::api::ApiError)
    )
)]
async fn list_hosts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.store.get_current_hostnames().await {
        Ok(hostnames) => success_response(StatusCode::OK, &trace_id.0, hostnames),
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to list hosts");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id.0,
                "storage_error",
                "storage error",
            )
        }
    }
}

/// Archives the current snapshot of a host.
#[utoipa::path(
    delete,
    path = "/hosts/{hostname}",
    tag = "Hosts",
    params(("hostname" = String, Path, description = "Host to dismiss")),
    responses(
        (status = 200, description = "Host dismissed"),
        (status = 404, description = "No current snapshot for the host", body = crate::api::ApiError),
        (status = 500, description = "Store failure", body = crate::api::ApiError)
    )
)]
async fn dismiss_host(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(hostname): Path<String>,
) -> impl IntoResponse {
    let _permit = state.host_gate.acquire(&hostname).await;

    let result = async {
        let hostnames = state.store.get_hostnames().await?;
        if !hostnames.contains(&hostname) {
            return Ok(false);
        }
        state.store.dismiss_host(&hostname).await?;
        anyhow::Ok(true)
    }
    .await;

    match result {
        Ok(true) => {
            tracing::info!(trace_id = %trace_id.0, hostname = %hostname, "Host dismissed");
            success_empty_response(StatusCode::OK, &trace_id.0, "dismissed")
        }
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id.0,
            "not_found",
            &format!("host '{hostname}' not found"),
        ),
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, hostname = %hostname, error = %e, "Failed to dismiss host");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id.0,
                "storage_error",
                "storage error",
            )
        }
    }
}

pub fn host_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(insert_host_data, list_hosts))
        .routes(routes!(dismiss_host))
}
