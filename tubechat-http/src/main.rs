use std::sync::Arc;

use tracing::{error, warn};
use tubechat_http::youtube::YouTubeSource;
use tubechat_http::{start_server, ServerConfig};
use tubechat_llm::GeminiProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Use RUST_LOG environment variable, default to info level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env();

    let Some(gemini) = GeminiProvider::from_env() else {
        for var in GeminiProvider::info().env_vars.iter().filter(|v| v.required) {
            error!("Missing {}: {}", var.name, var.description);
        }
        anyhow::bail!("no language model configured");
    };

    if config.youtube_api_key.is_none() {
        warn!("YOUTUBE_API_KEY is not set; starting chats will fail until it is");
    }
    let videos = YouTubeSource::new(config.youtube_api_key.clone(), config.transcript_lang.clone())?;

    start_server(config, Arc::new(gemini), Arc::new(videos)).await
}
