use async_trait::async_trait;
use tubechat_core::HistoryEntry;

use crate::context::VideoContext;

pub type LlmError = Box<dyn std::error::Error + Send + Sync>;

/// Environment variable a provider reads at startup
#[derive(Debug, Clone)]
pub struct EnvVar {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl EnvVar {
    pub fn required(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: true,
        }
    }

    pub fn optional(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            required: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub env_vars: Vec<EnvVar>,
}

/// Answers a question about a video given the conversation so far.
///
/// Implementations may take arbitrarily long; callers bound them with
/// their own timeout and must not hold any session lock while waiting.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn answer(
        &self,
        context: &VideoContext,
        history: &[HistoryEntry],
        question: &str,
    ) -> Result<String, LlmError>;

    fn name(&self) -> &'static str;
}
