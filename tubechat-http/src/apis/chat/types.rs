use serde::{Deserialize, Serialize};
use tubechat_core::{HistoryEntry, SessionId};
use tubechat_llm::VideoInfo;

/// Fields are optional so a missing one gets a specific message instead
/// of a generic JSON rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartChatRequest {
    #[serde(rename = "urlAddress")]
    pub url_address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartChatResponse {
    pub message: String,
    #[serde(rename = "chatId")]
    pub chat_id: SessionId,
    pub info: VideoInfo,
    pub trans: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMessageRequest {
    #[serde(rename = "chatId")]
    pub chat_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageResponse {
    pub response: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndChatRequest {
    #[serde(rename = "chatId")]
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EndChatResponse {
    pub message: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusMessage {
    pub message: String,
}
