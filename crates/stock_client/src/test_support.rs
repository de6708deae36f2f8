//! Local HTTP stubs for client tests.

use std::time::Duration;

use axum::{routing::get, Json, Router};
use serde_json::Value;

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

/// A route that answers `body` only after `delay`.
pub fn stalled(path: &str, delay: Duration, body: Value) -> Router {
    Router::new().route(
        path,
        get(move || {
            let body = body.clone();
            async move {
                tokio::time::sleep(delay).await;
                Json(body)
            }
        }),
    )
}
