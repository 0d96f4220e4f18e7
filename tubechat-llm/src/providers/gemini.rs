// providers/gemini.rs
use crate::context::VideoContext;
use crate::logging::log_llm_error;
use crate::prompt::build_messages;
use crate::provider::{Answerer, EnvVar, LlmError, ProviderInfo};
use async_trait::async_trait;
use openai_dive::v1::{
    api::Client,
    resources::chat::{ChatCompletionParametersBuilder, ChatMessage, ChatMessageContent},
};
use tracing::{debug, error};
use tubechat_core::HistoryEntry;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Gemini through its OpenAI-compatible chat-completions endpoint
pub struct GeminiProvider {
    client: Client,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        let mut client = Client::new(api_key);
        let url = base_url.unwrap_or(DEFAULT_BASE_URL.to_string());
        client.set_base_url(&url);
        Self {
            client,
            model: model.unwrap_or(DEFAULT_MODEL.to_string()),
        }
    }

    /// Create Gemini provider from environment variables
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").ok()?;
        Some(Self::new(
            api_key,
            std::env::var("GEMINI_BASE_URL").ok(),
            std::env::var("GEMINI_MODEL").ok(),
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn info() -> ProviderInfo {
        ProviderInfo {
            name: "gemini",
            display_name: "Google Gemini",
            env_vars: vec![
                EnvVar::required("GEMINI_API_KEY", "Gemini API Key"),
                EnvVar::optional(
                    "GEMINI_BASE_URL",
                    "OpenAI-compatible base URL (default: https://generativelanguage.googleapis.com/v1beta/openai)",
                ),
                EnvVar::optional("GEMINI_MODEL", "Model name (default: gemini-1.5-flash)"),
            ],
        }
    }
}

#[async_trait]
impl Answerer for GeminiProvider {
    async fn answer(
        &self,
        context: &VideoContext,
        history: &[HistoryEntry],
        question: &str,
    ) -> Result<String, LlmError> {
        let request = ChatCompletionParametersBuilder::default()
            .model(&self.model)
            .messages(build_messages(context, history, question))
            .build()
            .map_err(|e| LlmError::from(e.to_string()))?;

        debug!("Gemini request: model={} history={}", self.model, history.len());

        let response = match self.client.chat().create(request.clone()).await {
            Ok(response) => response,
            Err(e) => {
                let err = Box::new(e) as LlmError;
                error!("Gemini request failed: {}", err);
                log_llm_error(&request, &err, self.name());
                return Err(err);
            }
        };

        response
            .choices
            .iter()
            .find_map(|choice| assistant_text(&choice.message))
            .ok_or_else(|| LlmError::from("model returned an empty answer"))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Non-blank text of an assistant message
fn assistant_text(message: &ChatMessage) -> Option<String> {
    match message {
        ChatMessage::Assistant {
            content: Some(ChatMessageContent::Text(text)),
            ..
        } if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}
