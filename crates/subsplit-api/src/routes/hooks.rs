//! Push hook intake.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subsplit_core::JobPayload;
use tracing::{debug, error, warn};

use crate::AppState;
use crate::error::ApiError;

pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Enqueue the raw request body as a job.
///
/// The body is not interpreted here. The sender gets `200 Thanks!` whether
/// or not the enqueue worked; queue failures are only logged.
pub async fn receive_hook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), ApiError> {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if !verify_signature(secret, &body, signature) {
            warn!("Invalid webhook signature");
            return Err(ApiError::Unauthorized("invalid signature".to_string()));
        }
    }

    let payload = JobPayload::new(body.to_vec());
    match state.queue.enqueue(&payload).await {
        Ok(()) => debug!(bytes = body.len(), "Enqueued push hook"),
        Err(e) => error!(error = %e, "Failed to enqueue push hook"),
    }

    Ok((StatusCode::OK, "Thanks!"))
}

/// Check a `sha256=<hex>` HMAC signature of `body`.
pub fn verify_signature(secret: &str, body: &[u8], signature: Option<&str>) -> bool {
    let Some(signature) = signature else {
        return false;
    };

    let Some(sig_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(sig_bytes) = hex::decode(sig_hex) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&sig_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::router;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use subsplit_core::queue::JobQueue;
    use subsplit_scheduler::MemoryJobQueue;
    use tower::ServiceExt;

    const BODY: &str = r#"{"repository":{"url":"https://x/y.git"},"ref":"refs/heads/main"}"#;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn post(uri: &str, body: &str, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn read_body(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_hook_body_is_enqueued_verbatim() {
        let queue = Arc::new(MemoryJobQueue::new());
        let app = router(AppState::new(queue.clone()), "/hook");

        let response = app.oneshot(post("/hook", BODY, None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_body(response).await, "Thanks!");
        assert_eq!(queue.incoming().await.unwrap(), vec![JobPayload::from(BODY)]);
    }

    #[tokio::test]
    async fn test_garbage_is_enqueued_too() {
        let queue = Arc::new(MemoryJobQueue::new());
        let app = router(AppState::new(queue.clone()), "/hook");

        let response = app.oneshot(post("/hook", "not json", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(queue.stats().await.unwrap().incoming, 1);
    }

    #[tokio::test]
    async fn test_queue_failure_still_acknowledged() {
        let queue = Arc::new(MemoryJobQueue::new());
        queue.set_unavailable(true).await;
        let app = router(AppState::new(queue.clone()), "/hook");

        let response = app.oneshot(post("/hook", BODY, None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        queue.set_unavailable(false).await;
        assert_eq!(queue.stats().await.unwrap().incoming, 0);
    }

    #[tokio::test]
    async fn test_valid_signature_is_accepted() {
        let queue = Arc::new(MemoryJobQueue::new());
        let state = AppState::new(queue.clone()).with_webhook_secret(Some("hush".to_string()));
        let app = router(state, "/hook");

        let signature = sign("hush", BODY.as_bytes());
        let response = app
            .oneshot(post("/hook", BODY, Some(signature)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(queue.stats().await.unwrap().incoming, 1);
    }

    #[tokio::test]
    async fn test_bad_signature_is_rejected() {
        let queue = Arc::new(MemoryJobQueue::new());
        let state = AppState::new(queue.clone()).with_webhook_secret(Some("hush".to_string()));
        let app = router(state, "/hook");

        let signature = sign("wrong", BODY.as_bytes());
        let response = app
            .clone()
            .oneshot(post("/hook", BODY, Some(signature)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(post("/hook", BODY, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(queue.stats().await.unwrap().incoming, 0);
    }

    #[tokio::test]
    async fn test_other_routes_are_not_found() {
        let queue = Arc::new(MemoryJobQueue::new());
        let app = router(AppState::new(queue), "/hook");

        let response = app.oneshot(post("/elsewhere", BODY, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_readiness_reports_queue_lengths() {
        let queue = Arc::new(MemoryJobQueue::new());
        queue.enqueue(&JobPayload::from("a")).await.unwrap();
        let app = router(AppState::new(queue.clone()), "/hook");

        let request = Request::builder()
            .uri("/health/ready")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&read_body(response).await).unwrap();
        assert_eq!(body["incoming"], 1);
        assert_eq!(body["processing"], 0);

        queue.set_unavailable(true).await;
        let request = Request::builder()
            .uri("/health/ready")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_verify_signature_rejects_malformed_headers() {
        assert!(!verify_signature("k", b"body", None));
        assert!(!verify_signature("k", b"body", Some("sha1=abcd")));
        assert!(!verify_signature("k", b"body", Some("sha256=zz")));
        assert!(verify_signature("k", b"body", Some(&sign("k", b"body"))));
    }
}
