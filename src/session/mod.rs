pub mod cache;
pub mod cleaner;
pub mod clock;
pub mod generator;
pub mod manager;

pub use cache::{ResetTokenCache, SessionCache};
pub use cleaner::spawn_cleanup_worker;
pub use clock::{Clock, SystemClock};
pub use manager::{SessionError, SessionManager};
