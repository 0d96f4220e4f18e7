use axum::extract::State;
use tracing::{error, info, warn};
use tubechat_core::{SessionId, StoreError};
use tubechat_llm::VideoContext;
use uuid::Uuid;

use super::types::{
    ChatMessageRequest, ChatMessageResponse, EndChatRequest, EndChatResponse, StartChatRequest,
    StartChatResponse, StatusMessage,
};
use crate::error::{ApiError, ApiJson};
use crate::session::ChatError;
use crate::youtube::video_id_from_url;
use crate::ServerState;

const INVALID_VIDEO: &str = "Invalid YouTube URL or unable to fetch video info.";
const NO_TRANSCRIPT: &str = "Unable to fetch transcript for the video.";

/// Health check
pub async fn handle_health() -> ApiJson<StatusMessage> {
    ApiJson(StatusMessage {
        message: "Server is working".to_string(),
    })
}

/// Fetch the video and its transcript, then open a chat session about it
pub async fn handle_start_chat(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<StartChatRequest>,
) -> Result<ApiJson<StartChatResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    info!("[{}] POST /startchat", request_id);

    let url_address = required(payload.url_address, "urlAddress is required.")?;
    let video_id = video_id_from_url(&url_address).ok_or_else(|| {
        warn!("[{}] Not a YouTube URL: {}", request_id, url_address);
        ApiError::BadRequest(INVALID_VIDEO.to_string())
    })?;

    let info = state.videos.video_info(&video_id).await.map_err(|e| {
        error!("[{}] Video info for {} failed: {}", request_id, video_id, e);
        ApiError::BadRequest(INVALID_VIDEO.to_string())
    })?;

    let transcript = state.videos.transcript(&info.id).await.map_err(|e| {
        error!("[{}] Transcript for {} failed: {}", request_id, info.id, e);
        ApiError::BadRequest(NO_TRANSCRIPT.to_string())
    })?;

    let context = VideoContext::new(info.clone(), transcript.clone());
    let chat_id = state
        .sessions
        .start_chat(&request_id, context)
        .await
        .map_err(|e| {
            error!("[{}] StartChat error: {}", request_id, e);
            ApiError::Internal(
                "Something went wrong while initializing the chat session.".to_string(),
            )
        })?;

    Ok(ApiJson(StartChatResponse {
        message: "Chat session initialized.".to_string(),
        chat_id,
        info,
        trans: transcript,
    }))
}

/// Answer one message within an existing chat
pub async fn handle_chat_message(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<ChatMessageRequest>,
) -> Result<ApiJson<ChatMessageResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    info!("[{}] POST /chatroute", request_id);

    let chat_id = required(payload.chat_id, "chatId is required.")?;
    let message = required(payload.message, "Message is required.")?;

    const ENDED: &str = "Invalid chatId or session has ended.";
    let session_id = parse_chat_id(&chat_id, ENDED)?;

    let response = state
        .sessions
        .post_message(&request_id, session_id, message)
        .await
        .map_err(|e| match e {
            ChatError::Store(StoreError::NotFound(_)) => ApiError::BadRequest(ENDED.to_string()),
            ChatError::Store(StoreError::QuotaExceeded { .. }) => ApiError::TooManyRequests(
                "Message limit reached for this chat session.".to_string(),
            ),
            ChatError::Timeout(_) => ApiError::GatewayTimeout(
                "The model took too long to answer, please try again.".to_string(),
            ),
            ChatError::Answer(_) => ApiError::BadGateway(
                "Something went wrong while processing the chat.".to_string(),
            ),
            ChatError::Store(other) => {
                error!("[{}] Chat route error: {}", request_id, other);
                ApiError::Internal("Something went wrong while processing the chat.".to_string())
            }
        })?;

    Ok(ApiJson(ChatMessageResponse { response }))
}

/// Close a chat and hand its history to the client for local storage
pub async fn handle_end_chat(
    State(state): State<ServerState>,
    ApiJson(payload): ApiJson<EndChatRequest>,
) -> Result<ApiJson<EndChatResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    info!("[{}] POST /endchat", request_id);

    let chat_id = required(payload.chat_id, "chatId is required.")?;

    const ENDED: &str = "Invalid chatId or session has already ended.";
    let session_id = parse_chat_id(&chat_id, ENDED)?;

    let history = state
        .sessions
        .end_chat(&request_id, session_id)
        .await
        .map_err(|e| match e {
            ChatError::Store(StoreError::NotFound(_)) => ApiError::BadRequest(ENDED.to_string()),
            other => {
                error!("[{}] EndChat error: {}", request_id, other);
                ApiError::Internal(
                    "Something went wrong while ending the chat session.".to_string(),
                )
            }
        })?;

    Ok(ApiJson(EndChatResponse {
        message: "Chat session ended successfully.".to_string(),
        history,
    }))
}

/// Stored chat histories are not kept server-side
pub async fn handle_chat_history() -> ApiError {
    ApiError::NotImplemented("Not Implemented.".to_string())
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// A malformed id can never name a session, so it reads as "ended"
fn parse_chat_id(chat_id: &str, message: &str) -> Result<SessionId, ApiError> {
    chat_id
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(message.to_string()))
}
