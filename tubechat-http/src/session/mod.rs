mod manager;

pub use manager::{ChatError, SessionManager, SessionManagerConfig, DEFAULT_ANSWER_TIMEOUT};
