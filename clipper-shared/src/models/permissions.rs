//! Account types and the permissions they grant.
//!
//! The table mirrors the Clipper backend: each account type builds on the one
//! below it (member, broadcaster, moderator), community moderators get a
//! narrow channel-scoped set, and admins hold every permission.

use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

/// Granular capability checked by views before exposing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "create:submission")]
    CreateSubmission,
    #[serde(rename = "create:comment")]
    CreateComment,
    #[serde(rename = "create:vote")]
    CreateVote,
    #[serde(rename = "create:follow")]
    CreateFollow,
    #[serde(rename = "view:broadcaster_analytics")]
    ViewBroadcasterAnalytics,
    #[serde(rename = "claim:broadcaster_profile")]
    ClaimBroadcasterProfile,
    #[serde(rename = "moderate:content")]
    ModerateContent,
    #[serde(rename = "moderate:users")]
    ModerateUsers,
    #[serde(rename = "create:discovery_lists")]
    CreateDiscoveryLists,
    #[serde(rename = "community:moderate")]
    CommunityModerate,
    #[serde(rename = "view:channel_analytics")]
    ViewChannelAnalytics,
    #[serde(rename = "manage:moderators")]
    ManageModerators,
    #[serde(rename = "manage:users")]
    ManageUsers,
    #[serde(rename = "manage:system")]
    ManageSystem,
    #[serde(rename = "view:analytics_dashboard")]
    ViewAnalyticsDashboard,
    #[serde(rename = "moderate:override")]
    ModerateOverride,
}

impl Permission {
    /// Every known permission, in backend declaration order.
    pub const ALL: [Self; 16] = [
        Self::CreateSubmission,
        Self::CreateComment,
        Self::CreateVote,
        Self::CreateFollow,
        Self::ViewBroadcasterAnalytics,
        Self::ClaimBroadcasterProfile,
        Self::ModerateContent,
        Self::ModerateUsers,
        Self::CreateDiscoveryLists,
        Self::CommunityModerate,
        Self::ViewChannelAnalytics,
        Self::ManageModerators,
        Self::ManageUsers,
        Self::ManageSystem,
        Self::ViewAnalyticsDashboard,
        Self::ModerateOverride,
    ];

    /// Wire representation (`scope:action`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateSubmission => "create:submission",
            Self::CreateComment => "create:comment",
            Self::CreateVote => "create:vote",
            Self::CreateFollow => "create:follow",
            Self::ViewBroadcasterAnalytics => "view:broadcaster_analytics",
            Self::ClaimBroadcasterProfile => "claim:broadcaster_profile",
            Self::ModerateContent => "moderate:content",
            Self::ModerateUsers => "moderate:users",
            Self::CreateDiscoveryLists => "create:discovery_lists",
            Self::CommunityModerate => "community:moderate",
            Self::ViewChannelAnalytics => "view:channel_analytics",
            Self::ManageModerators => "manage:moderators",
            Self::ManageUsers => "manage:users",
            Self::ManageSystem => "manage:system",
            Self::ViewAnalyticsDashboard => "view:analytics_dashboard",
            Self::ModerateOverride => "moderate:override",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|permission| permission.as_str() == value)
            .ok_or("unknown permission")
    }
}

const MEMBER_PERMISSIONS: &[Permission] = &[
    Permission::CreateSubmission,
    Permission::CreateComment,
    Permission::CreateVote,
    Permission::CreateFollow,
];

const BROADCASTER_PERMISSIONS: &[Permission] = &[
    Permission::CreateSubmission,
    Permission::CreateComment,
    Permission::CreateVote,
    Permission::CreateFollow,
    Permission::ViewBroadcasterAnalytics,
    Permission::ClaimBroadcasterProfile,
];

const MODERATOR_PERMISSIONS: &[Permission] = &[
    Permission::CreateSubmission,
    Permission::CreateComment,
    Permission::CreateVote,
    Permission::CreateFollow,
    Permission::ViewBroadcasterAnalytics,
    Permission::ClaimBroadcasterProfile,
    Permission::ModerateContent,
    Permission::ModerateUsers,
    Permission::CreateDiscoveryLists,
    Permission::ManageUsers,
];

const COMMUNITY_MODERATOR_PERMISSIONS: &[Permission] = &[
    Permission::CommunityModerate,
    Permission::ModerateUsers,
    Permission::ViewChannelAnalytics,
    Permission::ManageModerators,
];

/// Account tier driving the permission table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Member,
    Broadcaster,
    Moderator,
    CommunityModerator,
    Admin,
}

impl AccountType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Broadcaster => "broadcaster",
            Self::Moderator => "moderator",
            Self::CommunityModerator => "community_moderator",
            Self::Admin => "admin",
        }
    }

    /// Permissions granted by this account type.
    #[must_use]
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Member => MEMBER_PERMISSIONS,
            Self::Broadcaster => BROADCASTER_PERMISSIONS,
            Self::Moderator => MODERATOR_PERMISSIONS,
            Self::CommunityModerator => COMMUNITY_MODERATOR_PERMISSIONS,
            Self::Admin => &Permission::ALL,
        }
    }

    #[must_use]
    pub fn grants(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "member" => Ok(Self::Member),
            "broadcaster" => Ok(Self::Broadcaster),
            "moderator" => Ok(Self::Moderator),
            "community_moderator" => Ok(Self::CommunityModerator),
            "admin" => Ok(Self::Admin),
            _ => Err("unknown account type"),
        }
    }
}

// Empty, null, or unrecognised account types fall back to member.
impl<'de> Deserialize<'de> for AccountType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default())
    }
}
