//! Read-only HTTP status page.

use axum::{
    Json, Router,
    extract::State,
    response::Html,
    routing::get,
};
use mower_core::{SharedStatus, Status};
use tower_http::trace::TraceLayer;

use crate::page;

/// Shared state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub status: SharedStatus,
}

pub fn router(status: SharedStatus) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status_json))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { status })
}

/// GET / - Status page
async fn index(State(state): State<AppState>) -> Html<String> {
    Html(page::render_status(&state.status.snapshot().await))
}

/// GET /api/status - Raw snapshot
async fn status_json(State(state): State<AppState>) -> Json<Status> {
    Json(state.status.snapshot().await)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn get_body(uri: &str) -> (StatusCode, String) {
        let res = router(SharedStatus::default())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_is_ok() {
        assert_eq!(get_body("/health").await, (StatusCode::OK, "OK".to_string()));
    }

    #[tokio::test]
    async fn status_json_starts_empty() {
        let (code, body) = get_body("/api/status").await;
        assert_eq!(code, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["decision"], serde_json::Value::Null);
        assert_eq!(json["mower_names"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn index_renders_html() {
        let (code, body) = get_body("/").await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.contains("<h1>Mower control</h1>"));
    }
}
