use openai_dive::v1::resources::chat::{ChatMessage, ChatMessageContent};
use tubechat_core::{HistoryEntry, Speaker};

use crate::context::VideoContext;

pub const PRIMER: &str = "What would you like to ask about the video?";

/// Context message carrying the transcript and metadata of the video
pub fn context_message(context: &VideoContext) -> String {
    format!(
        "Here is the video transcript: {}\nThe title: {}\nDescription of the video: {}\n{}",
        context.transcript,
        context.info.title,
        context.info.description,
        context.attribution()
    )
}

/// Build the chat-completions message list for one question.
///
/// Layout: video context, primer, prior exchanges in order, then the
/// new question.
pub fn build_messages(
    context: &VideoContext,
    history: &[HistoryEntry],
    question: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 3);

    messages.push(user(context_message(context)));
    messages.push(assistant(PRIMER.to_string()));

    for entry in history {
        messages.push(match entry.speaker {
            Speaker::User => user(entry.text.clone()),
            Speaker::Ai => assistant(entry.text.clone()),
        });
    }

    messages.push(user(question.to_string()));
    messages
}

fn user(text: String) -> ChatMessage {
    ChatMessage::User {
        content: ChatMessageContent::Text(text),
        name: None,
    }
}

fn assistant(text: String) -> ChatMessage {
    ChatMessage::Assistant {
        content: Some(ChatMessageContent::Text(text)),
        tool_calls: None,
        name: None,
        audio: None,
        reasoning_content: None,
        refusal: None,
    }
}
