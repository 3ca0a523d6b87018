pub mod auth;
pub mod errors;
pub mod permissions;
pub mod timestamp;
pub mod user;

pub use auth::{AuthMessage, TestLoginRequest};
pub use errors::ErrorResponse;
pub use permissions::{AccountType, Permission};
pub use timestamp::Timestamp;
pub use user::{User, UserRole};
