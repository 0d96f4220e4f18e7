use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::policy::idle_exceeds;
use crate::session::{HistoryEntry, Session, SessionId};

/// How many fresh ids `create` tries before giving up
const MAX_ID_ATTEMPTS: usize = 8;

/// Evictions performed per write-lock acquisition during a sweep
const SWEEP_BATCH: usize = 256;

type SessionSlot<C> = Arc<Mutex<Session<C>>>;

/// In-memory session store.
///
/// The map sits behind a read/write lock and each session behind its own
/// mutex. Per-session operations hold the map read lock for their whole
/// (short, in-memory) critical section, so two operations on different
/// ids never wait on each other, while `remove` and eviction take the
/// write lock and therefore never race an in-flight append.
///
/// Nothing here awaits external I/O while a lock is held.
pub struct SessionStore<C> {
    sessions: RwLock<HashMap<SessionId, SessionSlot<C>>>,
}

impl<C> Default for SessionStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> SessionStore<C> {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a fresh session and return its id
    pub async fn create(&self, context: C, max_messages: usize) -> StoreResult<SessionId> {
        let mut sessions = self.sessions.write().await;

        let id = (0..MAX_ID_ATTEMPTS)
            .map(|_| SessionId::generate())
            .find(|candidate| !sessions.contains_key(candidate))
            .ok_or(StoreError::IdentifierExhaustion {
                attempts: MAX_ID_ATTEMPTS,
            })?;

        let session = Session::new(id, context, max_messages, Utc::now());
        sessions.insert(id, Arc::new(Mutex::new(session)));

        info!(session_id = %id, max_messages, "Session created");
        Ok(id)
    }

    /// Snapshot of a session; does not count as activity
    pub async fn get(&self, id: SessionId) -> StoreResult<Session<C>> {
        let sessions = self.sessions.read().await;
        let slot = sessions.get(&id).ok_or(StoreError::NotFound(id))?;
        let session = slot.lock().await;
        Ok(session.clone())
    }

    /// Append one user/AI pair, or refuse without touching the session
    /// when the pair would overrun its quota.
    pub async fn append_exchange(
        &self,
        id: SessionId,
        user_text: impl Into<String>,
        response_text: impl Into<String>,
    ) -> StoreResult<Session<C>> {
        let sessions = self.sessions.read().await;
        let slot = sessions.get(&id).ok_or(StoreError::NotFound(id))?;
        let mut session = slot.lock().await;

        if session.message_count() + 2 > session.max_messages() {
            warn!(
                session_id = %id,
                message_count = session.message_count(),
                max_messages = session.max_messages(),
                "Message quota reached"
            );
            return Err(StoreError::QuotaExceeded {
                id,
                max_messages: session.max_messages(),
            });
        }

        session.push_exchange(user_text.into(), response_text.into(), Utc::now());
        debug!(
            session_id = %id,
            message_count = session.message_count(),
            max_messages = session.max_messages(),
            "Exchange recorded"
        );
        Ok(session.clone())
    }

    /// Delete a session and hand its history back to the caller
    pub async fn remove(&self, id: SessionId) -> StoreResult<Vec<HistoryEntry>> {
        let slot = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(StoreError::NotFound(id))?;

        let history = slot.lock().await.take_history();
        info!(session_id = %id, entries = history.len(), "Session removed");
        Ok(history)
    }

    /// Evict every session idle for longer than `max_idle` at `now`.
    ///
    /// Candidates are collected under the read lock, then evicted in
    /// batches under the write lock with staleness re-checked, yielding
    /// to the scheduler between batches. A session that is busy during
    /// the scan stays a candidate: under the write lock no per-session
    /// operation can be running, so the re-check sees its settled
    /// `last_active_at` and an append in the meantime keeps it alive.
    pub async fn sweep_stale(&self, max_idle: Duration, now: DateTime<Utc>) -> usize {
        let candidates: Vec<SessionId> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, slot)| slot_is_stale(slot, now, max_idle, true))
                .map(|(id, _)| *id)
                .collect()
        };

        if candidates.is_empty() {
            return 0;
        }

        let mut evicted = 0;
        for batch in candidates.chunks(SWEEP_BATCH) {
            {
                let mut sessions = self.sessions.write().await;
                for id in batch {
                    let still_stale = sessions
                        .get(id)
                        .map(|slot| slot_is_stale(slot, now, max_idle, false))
                        .unwrap_or(false);
                    if still_stale {
                        sessions.remove(id);
                        evicted += 1;
                        debug!(session_id = %id, "Session expired after idling");
                    }
                }
            }
            tokio::task::yield_now().await;
        }

        evicted
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

/// `if_busy` is the answer when the session lock is currently held
fn slot_is_stale<C>(
    slot: &Mutex<Session<C>>,
    now: DateTime<Utc>,
    max_idle: Duration,
    if_busy: bool,
) -> bool {
    match slot.try_lock() {
        Ok(session) => idle_exceeds(session.last_active_at(), now, max_idle),
        Err(_) => if_busy,
    }
}
