#![cfg_attr(not(test), forbid(unsafe_code))]
#![deny(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)] // TODO(deps-001): remove once transitive dependencies converge.

//! Session client for Clipper.
//!
//! [`session::SessionManager`] owns the current-user state and drives it
//! through bootstrap, login, logout, refresh, and authorization failures.
//! [`api::ClipperClient`] talks to the backend auth endpoints,
//! [`storage::CookieSessionStore`] persists the auth cookies, and
//! [`telemetry`] provides `tracing`-backed sinks.

pub mod api;
pub mod errors;
pub mod services;
pub mod session;
pub mod storage;
pub mod telemetry;
pub mod unauthorized;

pub use api::ClipperClient;
pub use errors::{ClientError, ClientResult};
pub use services::Collaborators;
pub use session::{SessionManager, SessionPhase, SessionState};
pub use storage::CookieSessionStore;
pub use unauthorized::UnauthorizedHook;
