use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use tubechat_core::{HistoryEntry, SessionPolicy};
use tubechat_http::youtube::{SourceError, VideoSource};
use tubechat_http::{build_router, RateLimitConfig, RateLimiter, ServerState, SessionManager, SessionManagerConfig};
use tubechat_llm::{Answerer, Author, LlmError, VideoContext, VideoInfo};

struct StubVideos {
    transcript: Option<String>,
}

#[async_trait]
impl VideoSource for StubVideos {
    async fn video_info(&self, video_id: &str) -> Result<VideoInfo, SourceError> {
        if video_id == "missing" {
            return Err(SourceError::NotFound(video_id.to_string()));
        }
        Ok(VideoInfo {
            id: video_id.to_string(),
            url: format!("https://www.youtube.com/watch?v={video_id}"),
            title: "Ownership explained".to_string(),
            description: "Borrowing and moves".to_string(),
            author: Author {
                name: "Rust Channel".to_string(),
                channel_id: "UC123".to_string(),
                thumbnail: String::new(),
            },
            thumbnail: String::new(),
            author_thumbnail: String::new(),
            comment_count: Some(3),
        })
    }

    async fn transcript(&self, video_id: &str) -> Result<String, SourceError> {
        self.transcript
            .clone()
            .ok_or_else(|| SourceError::NoTranscript(video_id.to_string()))
    }
}

struct Echo;

#[async_trait]
impl Answerer for Echo {
    async fn answer(
        &self,
        context: &VideoContext,
        _history: &[HistoryEntry],
        question: &str,
    ) -> Result<String, LlmError> {
        Ok(format!("{} / {}", context.info.title, question))
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

struct Broken;

#[async_trait]
impl Answerer for Broken {
    async fn answer(&self, _: &VideoContext, _: &[HistoryEntry], _: &str) -> Result<String, LlmError> {
        Err("upstream 503".into())
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

struct Stalled;

#[async_trait]
impl Answerer for Stalled {
    async fn answer(&self, _: &VideoContext, _: &[HistoryEntry], _: &str) -> Result<String, LlmError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("never".to_string())
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

fn app_with(answerer: Arc<dyn Answerer>, max_messages: usize, rate_limit: RateLimitConfig) -> Router {
    let config = SessionManagerConfig {
        policy: SessionPolicy {
            max_messages,
            ..SessionPolicy::default()
        },
        answer_timeout: Duration::from_secs(5),
    };
    let sessions = Arc::new(SessionManager::new(config, answerer));
    let videos = Arc::new(StubVideos {
        transcript: Some("today we talk about ownership".to_string()),
    });
    build_router(
        ServerState::new(sessions, videos),
        Arc::new(RateLimiter::new(rate_limit)),
    )
}

fn app(max_messages: usize) -> Router {
    app_with(Arc::new(Echo), max_messages, RateLimitConfig::default())
}

async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn start(app: &Router) -> String {
    let (status, json) = post_json(
        app,
        "/startchat",
        serde_json::json!({ "urlAddress": "https://www.youtube.com/watch?v=abc123" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    json["chatId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_check() {
    let response = app(15)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["message"], "Server is working");
}

#[tokio::test]
async fn start_chat_returns_id_info_and_transcript() {
    let app = app(15);
    let (status, json) = post_json(
        &app,
        "/startchat",
        serde_json::json!({ "urlAddress": "https://youtu.be/abc123" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Chat session initialized.");
    assert!(json["chatId"].as_str().unwrap().parse::<uuid::Uuid>().is_ok());
    assert_eq!(json["info"]["id"], "abc123");
    assert_eq!(json["info"]["author"]["channelId"], "UC123");
    assert_eq!(json["trans"], "today we talk about ownership");
}

#[tokio::test]
async fn start_chat_validates_input() {
    let app = app(15);

    let (status, json) = post_json(&app, "/startchat", serde_json::json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "urlAddress is required.");

    let (status, _) = post_json(
        &app,
        "/startchat",
        serde_json::json!({ "urlAddress": "https://vimeo.com/1" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = post_json(
        &app,
        "/startchat",
        serde_json::json!({ "urlAddress": "https://www.youtube.com/watch?v=missing" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid YouTube URL or unable to fetch video info.");
}

#[tokio::test]
async fn start_chat_without_transcript_is_rejected() {
    let sessions = Arc::new(SessionManager::new(SessionManagerConfig::default(), Arc::new(Echo)));
    let app = build_router(
        ServerState::new(sessions.clone(), Arc::new(StubVideos { transcript: None })),
        Arc::new(RateLimiter::new(RateLimitConfig::default())),
    );

    let (status, json) = post_json(
        &app,
        "/startchat",
        serde_json::json!({ "urlAddress": "https://www.youtube.com/watch?v=abc123" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Unable to fetch transcript for the video.");
    assert_eq!(sessions.session_count().await, 0);
}

#[tokio::test]
async fn chat_until_quota_then_end() {
    let app = app(2);
    let chat_id = start(&app).await;

    let (status, json) = post_json(
        &app,
        "/chatroute",
        serde_json::json!({ "chatId": chat_id, "message": "hi" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["response"], "Ownership explained / hi");

    let (status, json) = post_json(
        &app,
        "/chatroute",
        serde_json::json!({ "chatId": chat_id, "message": "again" }),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["message"], "Message limit reached for this chat session.");

    let (status, json) = post_json(&app, "/endchat", serde_json::json!({ "chatId": chat_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Chat session ended successfully.");
    let history = json["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["sender"], "user");
    assert_eq!(history[0]["message"], "hi");
    assert_eq!(history[1]["sender"], "AI");
    assert_eq!(history[1]["message"], "Ownership explained / hi");

    let (status, json) = post_json(&app, "/endchat", serde_json::json!({ "chatId": chat_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Invalid chatId or session has already ended.");
}

#[tokio::test]
async fn chat_route_validates_input() {
    let app = app(15);

    let (status, json) = post_json(&app, "/chatroute", serde_json::json!({ "message": "hi" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "chatId is required.");

    let chat_id = start(&app).await;
    let (status, json) = post_json(&app, "/chatroute", serde_json::json!({ "chatId": chat_id })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "Message is required.");

    for bogus in ["not-a-uuid", "00000000-0000-4000-8000-000000000000"] {
        let (status, json) = post_json(
            &app,
            "/chatroute",
            serde_json::json!({ "chatId": bogus, "message": "hi" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Invalid chatId or session has ended.");
    }
}

#[tokio::test]
async fn model_failure_maps_to_bad_gateway_and_keeps_session() {
    let app = app_with(Arc::new(Broken), 4, RateLimitConfig::default());
    let chat_id = start(&app).await;

    let (status, _) = post_json(
        &app,
        "/chatroute",
        serde_json::json!({ "chatId": chat_id, "message": "hi" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, json) = post_json(&app, "/endchat", serde_json::json!({ "chatId": chat_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn slow_model_maps_to_gateway_timeout() {
    let config = SessionManagerConfig {
        answer_timeout: Duration::from_millis(50),
        ..SessionManagerConfig::default()
    };
    let sessions = Arc::new(SessionManager::new(config, Arc::new(Stalled)));
    let app = build_router(
        ServerState::new(
            sessions,
            Arc::new(StubVideos {
                transcript: Some("today we talk about ownership".to_string()),
            }),
        ),
        Arc::new(RateLimiter::new(RateLimitConfig::default())),
    );
    let chat_id = start(&app).await;

    let (status, json) = post_json(
        &app,
        "/chatroute",
        serde_json::json!({ "chatId": chat_id, "message": "hi" }),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(json["message"].is_string());

    let (status, json) = post_json(&app, "/endchat", serde_json::json!({ "chatId": chat_id })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["history"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let response = app(15)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/endchat")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["message"].is_string());
}

#[tokio::test]
async fn chat_history_is_not_implemented() {
    let response = app(15)
        .oneshot(Request::builder().uri("/chathistory").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn rate_limit_applies_across_routes() {
    let app = app_with(
        Arc::new(Echo),
        15,
        RateLimitConfig {
            max_requests: 2,
            window: Duration::from_secs(600),
        },
    );

    for expected_remaining in ["1", "0"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["ratelimit-limit"], "2");
        assert_eq!(response.headers()["ratelimit-remaining"], expected_remaining);
    }

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/chathistory").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("ratelimit-reset"));
}
