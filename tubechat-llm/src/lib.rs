pub mod context;
pub mod logging;
pub mod prompt;
pub mod provider;
pub mod providers;

pub use context::{Author, VideoContext, VideoInfo};
pub use provider::{Answerer, EnvVar, LlmError, ProviderInfo};
pub use providers::gemini::GeminiProvider;
