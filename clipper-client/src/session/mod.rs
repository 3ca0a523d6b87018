//! # Session
//!
//! Current-user state and the lifecycle that keeps it in sync with the
//! backend session, the stored cookies, and the telemetry sinks.
//!
//! ```text
//! Bootstrapping -> Authenticated   fetch ok, or test login ok
//! Bootstrapping -> Anonymous       fetch failed and no test login
//! Authenticated -> Anonymous       logout, unauthorized, refresh failed
//! Anonymous     -> Authenticated   refresh ok
//! ```

mod manager;
mod state;

#[cfg(test)]
pub(crate) mod test_implementations;

pub use manager::{LOGOUT_EVENT, SessionManager};
pub use state::{SessionPhase, SessionState};
