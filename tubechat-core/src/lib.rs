pub mod error;
pub mod policy;
pub mod reaper;
pub mod session;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use policy::SessionPolicy;
pub use reaper::{Reaper, MIN_SWEEP_INTERVAL};
pub use session::{HistoryEntry, Session, SessionId, Speaker};
pub use store::SessionStore;
