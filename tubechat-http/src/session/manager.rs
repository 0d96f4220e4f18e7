use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};
use tubechat_core::{HistoryEntry, Reaper, SessionId, SessionPolicy, SessionStore, StoreError};
use tubechat_llm::{Answerer, LlmError, VideoContext};

pub const DEFAULT_ANSWER_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for the session manager
#[derive(Clone, Debug)]
pub struct SessionManagerConfig {
    /// Quota, idle limit and sweep cadence
    pub policy: SessionPolicy,
    /// Upper bound on one answer from the language model
    pub answer_timeout: Duration,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            policy: SessionPolicy::default(),
            answer_timeout: DEFAULT_ANSWER_TIMEOUT,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("answer generation failed: {0}")]
    Answer(LlmError),

    #[error("answer generation timed out after {0:?}")]
    Timeout(Duration),
}

/// Session manager - chat operations over the session store.
///
/// The store is never locked while the language model is working: the
/// session is snapshotted, the answer generated, and the exchange
/// appended in a separate atomic step.
pub struct SessionManager {
    store: Arc<SessionStore<VideoContext>>,
    policy: SessionPolicy,
    answerer: Arc<dyn Answerer>,
    answer_timeout: Duration,
}

impl SessionManager {
    pub fn new(config: SessionManagerConfig, answerer: Arc<dyn Answerer>) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            policy: config.policy,
            answerer,
            answer_timeout: config.answer_timeout,
        }
    }

    pub fn store(&self) -> Arc<SessionStore<VideoContext>> {
        Arc::clone(&self.store)
    }

    /// Reaper bound to this manager's store and policy
    pub fn reaper(&self) -> Reaper<VideoContext> {
        Reaper::new(self.store(), self.policy.clone())
    }

    /// Open a chat about `context`
    pub async fn start_chat(
        &self,
        http_request_id: &str,
        context: VideoContext,
    ) -> Result<SessionId, ChatError> {
        let video_id = context.info.id.clone();
        let session_id = self.store.create(context, self.policy.max_messages).await?;
        info!("[{}] - [{}] Chat started for video {}", http_request_id, session_id, video_id);
        Ok(session_id)
    }

    /// Answer one user message and record the exchange.
    ///
    /// A failed or timed-out answer leaves the session unchanged.
    pub async fn post_message(
        &self,
        http_request_id: &str,
        session_id: SessionId,
        message: String,
    ) -> Result<String, ChatError> {
        let session = self.store.get(session_id).await?;

        if self.policy.is_quota_exceeded(&session) || !self.policy.has_room_for_exchange(&session) {
            warn!("[{}] - [{}] Message limit reached", http_request_id, session_id);
            return Err(StoreError::QuotaExceeded {
                id: session_id,
                max_messages: session.max_messages(),
            }
            .into());
        }

        info!(
            "[{}] - [{}] Message from user ({} chars)",
            http_request_id,
            session_id,
            message.chars().count()
        );

        let pending = self
            .answerer
            .answer(session.context(), session.history(), &message);

        let answer = match tokio::time::timeout(self.answer_timeout, pending).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                error!("[{}] - [{}] {} failed: {}", http_request_id, session_id, self.answerer.name(), e);
                return Err(ChatError::Answer(e));
            }
            Err(_) => {
                error!(
                    "[{}] - [{}] {} timed out after {:?}",
                    http_request_id,
                    session_id,
                    self.answerer.name(),
                    self.answer_timeout
                );
                return Err(ChatError::Timeout(self.answer_timeout));
            }
        };

        // The session may have ended or been reaped while we waited.
        let updated = self
            .store
            .append_exchange(session_id, message, answer.clone())
            .await?;
        info!(
            "[{}] - [{}] Answered ({}/{})",
            http_request_id,
            session_id,
            updated.message_count(),
            updated.max_messages()
        );
        Ok(answer)
    }

    /// Close a chat and return its history
    pub async fn end_chat(
        &self,
        http_request_id: &str,
        session_id: SessionId,
    ) -> Result<Vec<HistoryEntry>, ChatError> {
        let history = self.store.remove(session_id).await?;
        info!("[{}] - [{}] Chat ended", http_request_id, session_id);
        Ok(history)
    }

    /// Get the number of active sessions
    pub async fn session_count(&self) -> usize {
        self.store.len().await
    }
}
