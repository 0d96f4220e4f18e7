use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tubechat_core::{SessionPolicy, MIN_SWEEP_INTERVAL};
use tubechat_llm::Answerer;

use crate::apis::chat::{
    handle_chat_history, handle_chat_message, handle_end_chat, handle_health, handle_start_chat,
};
use crate::rate_limit::{rate_limit, RateLimitConfig, RateLimiter};
use crate::session::{SessionManager, SessionManagerConfig};
use crate::youtube::VideoSource;

/// Server configuration, read once at startup
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub session: SessionManagerConfig,
    pub rate_limit: RateLimitConfig,
    pub youtube_api_key: Option<String>,
    pub transcript_lang: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            session: SessionManagerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            youtube_api_key: None,
            transcript_lang: "en".to_string(),
        }
    }
}

impl ServerConfig {
    /// Build the configuration from environment variables
    ///
    /// - `HOST`, `PORT`: bind address (default `0.0.0.0:8000`)
    /// - `MAX_MESSAGES`, `SESSION_IDLE_TIMEOUT_SECS`, `SESSION_SWEEP_INTERVAL_SECS`: session policy
    /// - `ANSWER_TIMEOUT_SECS`: upper bound on one model answer (default 60)
    /// - `RATE_LIMIT_MAX`, `RATE_LIMIT_WINDOW_SECS`: per-client limit (default 100 per 600s)
    /// - `YOUTUBE_API_KEY`, `TRANSCRIPT_LANG`: video collaborators
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ServerConfig::from_env`] with variables read through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse_secs = |name: &str| {
            env_parse::<u64>(name, lookup(name))
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
        };
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT", lookup("PORT")).unwrap_or(defaults.port),
            session: SessionManagerConfig {
                policy: SessionPolicy::from_lookup(&lookup),
                answer_timeout: parse_secs("ANSWER_TIMEOUT_SECS")
                    .unwrap_or(defaults.session.answer_timeout),
            },
            rate_limit: RateLimitConfig {
                max_requests: env_parse("RATE_LIMIT_MAX", lookup("RATE_LIMIT_MAX"))
                    .unwrap_or(defaults.rate_limit.max_requests),
                window: parse_secs("RATE_LIMIT_WINDOW_SECS").unwrap_or(defaults.rate_limit.window),
            },
            youtube_api_key: lookup("YOUTUBE_API_KEY").filter(|key| !key.is_empty()),
            transcript_lang: lookup("TRANSCRIPT_LANG").unwrap_or(defaults.transcript_lang),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}, using default", name, raw);
            None
        }
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ServerState {
    pub sessions: Arc<SessionManager>,
    pub videos: Arc<dyn VideoSource>,
}

impl ServerState {
    pub fn new(sessions: Arc<SessionManager>, videos: Arc<dyn VideoSource>) -> Self {
        Self { sessions, videos }
    }
}

/// All routes with rate limiting, CORS and request tracing applied
pub fn build_router(state: ServerState, limiter: Arc<RateLimiter>) -> Router {
    Router::new()
        .route("/", get(handle_health))
        .route("/startchat", post(handle_start_chat))
        .route("/chatroute", post(handle_chat_message))
        .route("/endchat", post(handle_end_chat))
        .route("/chathistory", get(handle_chat_history))
        .layer(middleware::from_fn_with_state(limiter, rate_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C / SIGTERM, then stop background tasks
pub async fn start_server(
    config: ServerConfig,
    answerer: Arc<dyn Answerer>,
    videos: Arc<dyn VideoSource>,
) -> anyhow::Result<()> {
    let sessions = Arc::new(SessionManager::new(config.session.clone(), answerer));
    let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
    let shutdown = CancellationToken::new();

    let reaper = sessions.reaper().spawn(shutdown.clone());
    let pruner = spawn_rate_limit_pruner(limiter.clone(), shutdown.clone());

    let app = build_router(ServerState::new(sessions.clone(), videos), limiter);

    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running on {}", address);

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    shutdown.cancel();
    if let Err(e) = reaper.await {
        error!("Reaper task failed: {}", e);
    }
    if let Err(e) = pruner.await {
        error!("Rate limit pruner failed: {}", e);
    }
    info!(
        "Server stopped, dropping {} live session(s)",
        sessions.session_count().await
    );

    served?;
    Ok(())
}

fn spawn_rate_limit_pruner(
    limiter: Arc<RateLimiter>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut period = limiter.config().window;
        if period < MIN_SWEEP_INTERVAL {
            warn!("Rate limit window {:?} is too short to prune on, using {:?}", period, MIN_SWEEP_INTERVAL);
            period = MIN_SWEEP_INTERVAL;
        }
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    limiter.prune(tokio::time::Instant::now()).await;
                }
            }
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
