use serde::{Deserialize, Serialize};

/// Body for `POST /auth/test-login`, only honoured by test deployments.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TestLoginRequest {
    /// Username of the fixture account to sign in as.
    pub username: String,
    /// Optional fixed identifier for the fixture account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Plain acknowledgement body, e.g. `{"message":"Logged out successfully"}`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthMessage {
    pub message: String,
}
