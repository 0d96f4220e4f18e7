pub mod types;
pub mod handler;

pub use types::{ChatMessageRequest, ChatMessageResponse, EndChatRequest, EndChatResponse, StartChatRequest, StartChatResponse, StatusMessage};
pub use handler::{handle_chat_history, handle_chat_message, handle_end_chat, handle_health, handle_start_chat};
