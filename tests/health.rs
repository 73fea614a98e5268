use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use baudboard::test_helpers::test_router;

#[tokio::test]
async fn health_reports_ok() {
    let response = test_router()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["status"].as_str(), Some("ok"));
}
