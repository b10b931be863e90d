//! Integration test driving the image pipeline end to end: a stub
//! generation endpoint producing a temp PNG, then webhook delivery of the
//! persisted file.

use base64::Engine;
use lib::channels::{GroupMessage, WecomChannel};
use lib::images::ImageClient;
use std::sync::Arc;

const IMAGE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot a real png body";

/// Stub reply webhook capturing delivered payloads; returns its URL and sink.
async fn spawn_reply_webhook() -> (String, Arc<tokio::sync::Mutex<Vec<serde_json::Value>>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind webhook stub");
    let port = listener.local_addr().expect("local_addr").port();
    let delivered: Arc<tokio::sync::Mutex<Vec<serde_json::Value>>> =
        Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let sink = delivered.clone();
    let app = axum::Router::new().route(
        "/reply",
        axum::routing::post(
            move |axum::Json(payload): axum::Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().await.push(payload);
                    axum::Json(serde_json::json!({"errcode": 0, "errmsg": "ok"}))
                }
            },
        ),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://127.0.0.1:{}/reply", port), delivered)
}

#[tokio::test]
async fn generated_image_is_persisted_and_delivered_as_base64() {
    // One stub serves both the generation endpoint and the image download.
    let requests: Arc<tokio::sync::Mutex<Vec<serde_json::Value>>> =
        Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind image stub");
    let port = listener.local_addr().expect("local_addr").port();
    let image_url = format!("http://127.0.0.1:{}/files/one.png", port);
    let sink = requests.clone();
    let app = axum::Router::new()
        .route(
            "/generate",
            axum::routing::post(
                move |axum::Json(body): axum::Json<serde_json::Value>| {
                    let sink = sink.clone();
                    let image_url = image_url.clone();
                    async move {
                        sink.lock().await.push(body);
                        axum::Json(serde_json::json!({"data": [{"url": image_url}]}))
                    }
                },
            ),
        )
        .route(
            "/files/one.png",
            axum::routing::get(|| async { IMAGE_BYTES.to_vec() }),
        );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let client = ImageClient::new(
        &format!("http://127.0.0.1:{}/generate", port),
        "256x256",
        "secret-token",
    );
    let path = client
        .generate("img a red panda？")
        .await
        .expect("generate image");
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
    assert_eq!(
        std::fs::read(&path).expect("read generated file"),
        IMAGE_BYTES
    );

    let generation_requests = requests.lock().await;
    assert_eq!(generation_requests.len(), 1);
    let request = &generation_requests[0];
    assert_eq!(
        request.get("prompt").and_then(|v| v.as_str()),
        Some("img a red panda？")
    );
    assert_eq!(request.get("n").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(
        request.get("size").and_then(|v| v.as_str()),
        Some("256x256")
    );
    drop(generation_requests);

    let (webhook_url, delivered) = spawn_reply_webhook().await;
    let channel = WecomChannel::new(None, Some(webhook_url));
    let msg = GroupMessage {
        channel_id: "wecom".to_string(),
        msg_id: "m-1".to_string(),
        sender_id: "u-1".to_string(),
        sender_name: "alice".to_string(),
        group_id: "g-1".to_string(),
        group_name: "dev group".to_string(),
        text: "@Bot img a red panda".to_string(),
        created_at: 1700000000,
        mentions_bot: true,
        is_text: true,
        reply_url: None,
    };
    channel.send_image(&msg, &path).await.expect("send image");
    let _ = std::fs::remove_file(&path);

    let delivered = delivered.lock().await;
    assert_eq!(delivered.len(), 1, "expected one image delivery");
    let payload = &delivered[0];
    assert_eq!(
        payload.get("msgtype").and_then(|v| v.as_str()),
        Some("image")
    );
    let encoded = payload
        .pointer("/image/base64")
        .and_then(|v| v.as_str())
        .expect("image base64");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .expect("decode image base64");
    assert_eq!(decoded, IMAGE_BYTES);
    assert_eq!(
        payload.pointer("/image/md5").and_then(|v| v.as_str()),
        Some(format!("{:x}", md5::compute(IMAGE_BYTES)).as_str())
    );
}
