//! End-to-end webhook tests through the HTTP router.
//!
//! Tests verify:
//! - A signed LINE text event produces a stored image and one reply
//! - Invalid signatures are accepted as no-ops (LINE) or rejected (Telegram)
//! - Platform API rejections surface as `ReplyError::Rejected` and HTTP 500
//! - Telegram webhook registration payload
//! - Error status codes and JSON error bodies
//! - Generated images are served with immutable cache headers

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use textshot::error::ReplyError;
use textshot::platform::{
    BodySigner, LinePlatform, Platform, TelegramPlatform, LINE_SIGNATURE_HEADER,
    TELEGRAM_SECRET_HEADER,
};
use textshot::{create_router, Dispatcher, ImagePipeline, Platforms, RouterConfig};

use super::test_utils::{create_test_pipeline, is_valid_jpeg, list_files, FakeChatApi, TEST_BASE_URL};

const LINE_SECRET: &str = "line-channel-secret";
const TELEGRAM_TOKEN: &str = "123:abc";
const TELEGRAM_SECRET: &str = "tg-secret";

fn line_platform(api: &FakeChatApi) -> LinePlatform {
    LinePlatform::new(LINE_SECRET, "line-access-token", Duration::from_secs(5))
        .unwrap()
        .with_api_base(api.base_url())
}

fn telegram_platform(api: &FakeChatApi) -> TelegramPlatform {
    TelegramPlatform::new(
        TELEGRAM_TOKEN,
        Some(TELEGRAM_SECRET.to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_api_base(api.base_url())
}

fn test_router(pipeline: Arc<ImagePipeline>, api: &FakeChatApi) -> Router {
    let dispatcher = Arc::new(Dispatcher::new(pipeline).with_deadline(Duration::from_secs(10)));
    let platforms = Platforms::new()
        .with_line(Arc::new(line_platform(api)))
        .with_telegram(Arc::new(telegram_platform(api)));
    create_router(
        dispatcher,
        platforms,
        RouterConfig::new().with_cache_max_age(600).with_tracing(false),
    )
}

fn line_body(text: &str) -> String {
    serde_json::json!({
        "destination": "Uabc",
        "events": [{
            "type": "message",
            "replyToken": "reply-token-1",
            "source": { "type": "user", "userId": "U1" },
            "message": { "type": "text", "id": "1", "text": text }
        }]
    })
    .to_string()
}

fn signed_line_request(uri: &str, body: String) -> Request<Body> {
    let signature = BodySigner::new(LINE_SECRET).sign(body.as_bytes());
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(LINE_SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// LINE
// =============================================================================

#[tokio::test]
async fn test_line_text_event_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let response = router
        .oneshot(signed_line_request("/platforms/line/callback", line_body("hello")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["events"], 1);
    assert_eq!(summary["replied"], 1);

    let files = list_files(dir.path());
    assert_eq!(files.len(), 1);
    let bytes = std::fs::read(dir.path().join(&files[0])).unwrap();
    assert!(is_valid_jpeg(&bytes));

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    let (path, reply) = &requests[0];
    assert_eq!(path, "/v2/bot/message/reply");
    assert_eq!(reply["replyToken"], "reply-token-1");

    let expected_url = format!("{}/images/{}", TEST_BASE_URL, files[0]);
    assert_eq!(reply["messages"][0]["type"], "image");
    assert_eq!(reply["messages"][0]["originalContentUrl"], expected_url);
    assert_eq!(reply["messages"][0]["previewImageUrl"], expected_url);
}

#[tokio::test]
async fn test_line_legacy_callback_path() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let response = router
        .oneshot(signed_line_request("/callback", line_body("legacy")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(api.requests().len(), 1);
}

#[tokio::test]
async fn test_line_invalid_signature_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let body = line_body("hello");
    let signature = BodySigner::new("some other secret").sign(body.as_bytes());
    let request = Request::builder()
        .method("POST")
        .uri("/platforms/line/callback")
        .header(LINE_SIGNATURE_HEADER, signature)
        .body(Body::from(body))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_signature");

    assert!(list_files(dir.path()).is_empty());
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_line_empty_text_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let response = router
        .oneshot(signed_line_request("/platforms/line/callback", line_body("")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_input");
    assert_eq!(json["status"], 400);
    assert!(list_files(dir.path()).is_empty());
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_line_malformed_payload_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let response = router
        .oneshot(signed_line_request(
            "/platforms/line/callback",
            "{not json".to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "malformed_payload");
}

#[tokio::test]
async fn test_line_rejected_reply() {
    let api = FakeChatApi::start_with_response(
        StatusCode::BAD_REQUEST,
        serde_json::json!({ "message": "Invalid reply token" }),
    )
    .await;

    let err = line_platform(&api)
        .reply("U1", Some("stale-token"), "https://x/images/a.jpeg")
        .await
        .unwrap_err();

    match err {
        ReplyError::Rejected { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("Invalid reply token"), "{}", body);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(api.requests().len(), 1);
}

#[tokio::test]
async fn test_line_rejected_reply_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start_with_response(
        StatusCode::BAD_REQUEST,
        serde_json::json!({ "message": "Invalid reply token" }),
    )
    .await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let response = router
        .oneshot(signed_line_request("/platforms/line/callback", line_body("late")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "reply_failed");
    assert!(json["message"].as_str().unwrap().contains("(400)"));

    // The image was stored before the reply failed and stays cached.
    assert_eq!(list_files(dir.path()).len(), 1);
}

// =============================================================================
// Telegram
// =============================================================================

fn telegram_request(secret: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/platforms/telegram/callback")
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header(TELEGRAM_SECRET_HEADER, secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn telegram_update(text: &str) -> Value {
    serde_json::json!({
        "update_id": 10,
        "message": {
            "message_id": 77,
            "chat": { "id": 4242, "type": "private" },
            "text": text
        }
    })
}

#[tokio::test]
async fn test_telegram_text_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let response = router
        .oneshot(telegram_request(Some(TELEGRAM_SECRET), telegram_update("hi")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let files = list_files(dir.path());
    assert_eq!(files.len(), 1);

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    let (path, payload) = &requests[0];
    assert_eq!(path, &format!("/bot{}/sendPhoto", TELEGRAM_TOKEN));
    assert_eq!(payload["chat_id"], 4242);
    assert_eq!(payload["reply_to_message_id"], 77);
    assert_eq!(
        payload["photo"],
        format!("{}/images/{}", TEST_BASE_URL, files[0])
    );
}

#[tokio::test]
async fn test_telegram_invalid_secret_is_unauthorized() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let response = router
        .oneshot(telegram_request(Some("wrong"), telegram_update("hi")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(list_files(dir.path()).is_empty());
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_telegram_non_text_update_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let update = serde_json::json!({
        "update_id": 11,
        "message": { "message_id": 78, "chat": { "id": 1 }, "sticker": { "file_id": "x" } }
    });
    let response = router
        .oneshot(telegram_request(Some(TELEGRAM_SECRET), update))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let summary = body_json(response).await;
    assert_eq!(summary["ignored"], 1);
    assert_eq!(summary["replied"], 0);
    assert!(api.requests().is_empty());
}

#[tokio::test]
async fn test_telegram_not_ok_is_rejected() {
    // Telegram reports failures in the body, sometimes with a 200 status.
    let api = FakeChatApi::start_with_response(
        StatusCode::OK,
        serde_json::json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        }),
    )
    .await;

    let err = telegram_platform(&api)
        .reply("4242", Some("77"), "https://x/images/a.jpeg")
        .await
        .unwrap_err();

    match err {
        ReplyError::Rejected { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "Bad Request: chat not found");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_telegram_error_status_is_rejected() {
    let api = FakeChatApi::start_with_response(
        StatusCode::FORBIDDEN,
        serde_json::json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        }),
    )
    .await;
    let dir = tempfile::tempdir().unwrap();
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let response = router
        .oneshot(telegram_request(Some(TELEGRAM_SECRET), telegram_update("hi")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "reply_failed");
    let message = json["message"].as_str().unwrap();
    assert!(message.contains("bot was blocked"), "{}", message);
    assert!(!message.contains(TELEGRAM_TOKEN), "{}", message);
}

#[tokio::test]
async fn test_telegram_register_webhook() {
    let api = FakeChatApi::start().await;
    let webhook = "https://bot.test/platforms/telegram/callback";

    telegram_platform(&api)
        .register_webhook(webhook)
        .await
        .unwrap();

    let requests = api.requests();
    assert_eq!(requests.len(), 1);
    let (path, payload) = &requests[0];
    assert_eq!(path, &format!("/bot{}/setWebhook", TELEGRAM_TOKEN));
    assert_eq!(payload["url"], webhook);
    assert_eq!(payload["secret_token"], TELEGRAM_SECRET);
}

#[tokio::test]
async fn test_telegram_register_webhook_without_secret() {
    let api = FakeChatApi::start().await;
    let platform = TelegramPlatform::new(TELEGRAM_TOKEN, None, Duration::from_secs(5))
        .unwrap()
        .with_api_base(api.base_url());

    platform
        .register_webhook("https://bot.test/platforms/telegram/callback")
        .await
        .unwrap();

    let (_, payload) = &api.requests()[0];
    assert!(payload.get("secret_token").is_none());
}

#[tokio::test]
async fn test_telegram_register_webhook_rejected() {
    let api = FakeChatApi::start_with_response(
        StatusCode::BAD_REQUEST,
        serde_json::json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: bad webhook: HTTPS url must be provided for webhook"
        }),
    )
    .await;

    let err = telegram_platform(&api)
        .register_webhook("http://insecure.test/platforms/telegram/callback")
        .await
        .unwrap_err();

    assert!(matches!(err, ReplyError::Rejected { status: 400, .. }));
    assert!(err.to_string().contains("HTTPS url must be provided"));
}

// =============================================================================
// Images and Health
// =============================================================================

#[tokio::test]
async fn test_generated_image_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let pipeline = create_test_pipeline(dir.path()).await;
    let image = pipeline.generate("served").await.unwrap();
    let router = test_router(Arc::clone(&pipeline), &api);

    let path = image.url.trim_start_matches(TEST_BASE_URL).to_string();
    let request = Request::builder().uri(path).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/jpeg");
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=600, immutable"
    );

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert!(is_valid_jpeg(&body));
}

#[tokio::test]
async fn test_missing_image_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let uri = format!("/images/{}.jpeg", "0".repeat(64));
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get("cache-control").is_none());
}

#[tokio::test]
async fn test_only_digest_names_are_served() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let pipeline = create_test_pipeline(dir.path()).await;
    let image = pipeline.generate("guarded").await.unwrap();
    let digest = image.digest.to_string();

    // Files that exist in the store root but are not published images.
    let temp_name = format!(".{}.1-0.tmp", digest);
    std::fs::write(dir.path().join(&temp_name), b"partial").unwrap();
    std::fs::write(dir.path().join("notes.jpeg"), b"not an image").unwrap();

    let uris = [
        format!("/images/{}", temp_name),
        "/images/notes.jpeg".to_string(),
        format!("/images/{}.jpeg", digest.to_uppercase()),
        format!("/images/{}", digest),
        "/images/".to_string(),
    ];
    for uri in uris {
        let router = test_router(Arc::clone(&pipeline), &api);
        let request = Request::builder().uri(&uri).body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert!(response.headers().get("cache-control").is_none());
    }

    let router = test_router(Arc::clone(&pipeline), &api);
    let uri = format!("/images/{}.jpeg", digest);
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let api = FakeChatApi::start().await;
    let router = test_router(create_test_pipeline(dir.path()).await, &api);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unconfigured_platform_route_absent() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = Arc::new(Dispatcher::new(create_test_pipeline(dir.path()).await));
    let router = create_router(dispatcher, Platforms::new(), RouterConfig::new());

    let request = Request::builder()
        .method("POST")
        .uri("/platforms/telegram/callback")
        .body(Body::from("{}"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
