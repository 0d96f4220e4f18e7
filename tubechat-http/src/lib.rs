pub mod http;
pub mod apis;
pub mod error;
pub mod rate_limit;
pub mod session;
pub mod youtube;

pub use error::{ApiError, ApiJson, ErrorResponse};
pub use session::{ChatError, SessionManager, SessionManagerConfig};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use http::{build_router, start_server, ServerConfig, ServerState};
