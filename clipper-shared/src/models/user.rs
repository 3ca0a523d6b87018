use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::{AccountType, Permission, Timestamp};

/// Site-wide role assignment for a user account.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
}

impl UserRole {
    /// Roles allowed into moderation surfaces.
    pub const MODERATION: [Self; 2] = [Self::Moderator, Self::Admin];

    /// Return the canonical string representation used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    /// Capability-set membership check.
    #[must_use]
    pub fn is_any_of(self, roles: &[Self]) -> bool {
        roles.contains(&self)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            _ => Err("unknown user role"),
        }
    }
}

/// The authenticated identity returned by `GET /auth/me`.
///
/// Always fetched whole from the session service and replaced wholesale; the
/// client never patches individual fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub account_type: AccountType,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_tier: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_banned: bool,
    /// Signup date.
    pub created_at: Timestamp,
}

impl User {
    #[must_use]
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }

    #[must_use]
    pub fn has_any_role(&self, roles: &[UserRole]) -> bool {
        self.role.is_any_of(roles)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.has_role(UserRole::Moderator)
    }

    #[must_use]
    pub fn is_moderator_or_admin(&self) -> bool {
        self.has_any_role(&UserRole::MODERATION)
    }

    /// Whether the account may perform `permission`.
    ///
    /// The admin role and the admin account type both grant everything;
    /// otherwise the account type's permission table decides.
    #[must_use]
    pub fn can(&self, permission: Permission) -> bool {
        self.is_admin() || self.account_type.grants(permission)
    }

    /// Name to show in prompts, falling back to the username.
    #[must_use]
    pub fn display_label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }
}
