use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::session::Session;

pub const DEFAULT_MAX_MESSAGES: usize = 15;
pub const DEFAULT_MAX_IDLE: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Rules deciding when a session is exhausted or stale.
///
/// Holds configuration only; all decisions are pure functions of a
/// session snapshot and the current time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Quota handed to every new session
    pub max_messages: usize,
    /// Idle time after which a session may be reaped
    pub max_idle: Duration,
    /// How often the reaper scans the store
    pub sweep_interval: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            max_idle: DEFAULT_MAX_IDLE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SessionPolicy {
    /// Build the policy from the environment
    ///
    /// - `MAX_MESSAGES`: per-session quota (default 15)
    /// - `SESSION_IDLE_TIMEOUT_SECS`: idle threshold (default 3600)
    /// - `SESSION_SWEEP_INTERVAL_SECS`: reaper period (default 3600)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`SessionPolicy::from_env`] with variables read through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let positive = |name: &str| positive_var(name, lookup(name));
        Self {
            max_messages: positive("MAX_MESSAGES").unwrap_or(defaults.max_messages),
            max_idle: positive("SESSION_IDLE_TIMEOUT_SECS")
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(defaults.max_idle),
            sweep_interval: positive("SESSION_SWEEP_INTERVAL_SECS")
                .map(|secs| Duration::from_secs(secs as u64))
                .unwrap_or(defaults.sweep_interval),
        }
    }

    pub fn is_quota_exceeded<C>(&self, session: &Session<C>) -> bool {
        session.message_count() >= session.max_messages()
    }

    /// Whether one more user/AI pair fits in the session's quota
    pub fn has_room_for_exchange<C>(&self, session: &Session<C>) -> bool {
        session.message_count() + 2 <= session.max_messages()
    }

    pub fn is_stale<C>(&self, session: &Session<C>, now: DateTime<Utc>, max_idle: Duration) -> bool {
        idle_exceeds(session.last_active_at(), now, max_idle)
    }
}

/// `now - last_active_at > max_idle`; activity stamped in the future is never stale.
pub(crate) fn idle_exceeds(last_active_at: DateTime<Utc>, now: DateTime<Utc>, max_idle: Duration) -> bool {
    (now - last_active_at)
        .to_std()
        .map(|idle| idle > max_idle)
        .unwrap_or(false)
}

fn positive_var(name: &str, raw: Option<String>) -> Option<usize> {
    let raw = raw?;
    match raw.trim().parse::<usize>() {
        Ok(0) | Err(_) => {
            warn!("Ignoring invalid {}={:?}, using default", name, raw);
            None
        }
        Ok(value) => Some(value),
    }
}
