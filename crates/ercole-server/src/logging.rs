use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::Rng;
use std::time::Instant;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Largest request body accepted. Hostdata of big hosts runs to several MiB.
pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Error bodies longer than this are cut in the log.
const MAX_ERROR_LOG_CHARS: usize = 200;

/// Trace id of the current request, stored in request extensions.
#[derive(Clone)]
pub struct TraceId(pub String);

impl TraceId {
    /// Reuses the id an agent sent in `X-Trace-Id` when it is a sane token,
    /// so that agent and data-service logs can be joined.
    fn from_headers(headers: &HeaderMap) -> Self {
        let forwarded = headers
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| {
                !v.is_empty()
                    && v.len() <= 64
                    && v.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            });
        match forwarded {
            Some(id) => TraceId(id.to_string()),
            None => TraceId(format!("{:016x}", rand::thread_rng().gen::<u64>())),
        }
    }
}

fn error_snippet(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    match text.char_indices().nth(MAX_ERROR_LOG_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.into_owned(),
    }
}

/// Logs one line per request and one per response, tagged with the trace
/// id, and echoes the id in `X-Trace-Id`.
///
/// POST bodies are buffered up to [`MAX_REQUEST_BODY_BYTES`] so that their
/// size can be logged; larger ones are answered with 413 here. Response
/// bodies are only read back for 4xx/5xx, where the error envelope is worth
/// logging.
pub async fn request_logging(mut req: Request, next: Next) -> Response {
    let trace_id = TraceId::from_headers(req.headers());
    req.extensions_mut().insert(trace_id.clone());
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let req = if method == Method::POST {
        let (parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, MAX_REQUEST_BODY_BYTES).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(trace_id = %trace_id.0, path = %path, error = %e, "Request body rejected");
                return with_trace_id(StatusCode::PAYLOAD_TOO_LARGE.into_response(), &trace_id);
            }
        };
        tracing::info!(trace_id = %trace_id.0, method = %method, path = %path, body_bytes = bytes.len(), "--> request");
        Request::from_parts(parts, Body::from(bytes))
    } else {
        tracing::info!(trace_id = %trace_id.0, method = %method, path = %path, "--> request");
        req
    };

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) {
        tracing::info!(trace_id = %trace_id.0, status = status.as_u16(), elapsed_ms, "<-- response");
        return with_trace_id(response, &trace_id);
    }

    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .unwrap_or_else(|_| Bytes::new());
    let body = error_snippet(&bytes);
    if status.is_server_error() {
        tracing::error!(trace_id = %trace_id.0, status = status.as_u16(), elapsed_ms, body = %body, "<-- response");
    } else {
        tracing::warn!(trace_id = %trace_id.0, status = status.as_u16(), elapsed_ms, body = %body, "<-- response");
    }
    with_trace_id(Response::from_parts(parts, Body::from(bytes)), &trace_id)
}

fn with_trace_id(mut response: Response, trace_id: &TraceId) -> Response {
    if let Ok(val) = HeaderValue::from_str(&trace_id.0) {
        response.headers_mut().insert(TRACE_ID_HEADER, val);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::post, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/echo", post(|body: Bytes| async move { body }))
            .route(
                "/fail",
                post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, "bad hostdata") }),
            )
            .layer(middleware::from_fn(request_logging))
    }

    #[test]
    fn error_snippet_cuts_on_char_boundaries() {
        let long = "é".repeat(MAX_ERROR_LOG_CHARS + 5);
        let snippet = error_snippet(long.as_bytes());
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), MAX_ERROR_LOG_CHARS + 3);
        assert_eq!(error_snippet(b"short"), "short");
    }

    #[test]
    fn generated_trace_ids_are_hex() {
        let id = TraceId::from_headers(&HeaderMap::new()).0;
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn unsafe_forwarded_trace_ids_are_replaced() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACE_ID_HEADER, HeaderValue::from_static("abc def"));
        assert_ne!(TraceId::from_headers(&headers).0, "abc def");
    }

    #[tokio::test]
    async fn forwarded_trace_id_is_echoed_and_body_passes_through() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/echo")
            .header(TRACE_ID_HEADER, "agent-42")
            .body(Body::from("{\"hostname\":\"db01\"}"))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[TRACE_ID_HEADER], "agent-42");
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"{\"hostname\":\"db01\"}");
    }

    #[tokio::test]
    async fn error_responses_keep_their_body() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/fail")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(resp.headers().contains_key(TRACE_ID_HEADER));
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"bad hostdata");
    }
}
