//! Profile and response models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Full profile row as stored in the remote profile table.
///
/// `id` is the provider-issued identifier and is immutable once assigned.
/// Exactly one row exists per email; the reconciliation engine treats an
/// existing row as authoritative before ever creating a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub is_verified: bool,
    pub social_provider: Option<String>,
    pub social_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// A password account never carries social linkage.
    pub fn is_social(&self) -> bool {
        self.social_provider.is_some()
    }
}

/// Insert payload for a new profile row. Timestamps are set by the store.
#[derive(Debug, Clone, Serialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_id: Option<String>,
}

/// Sparse update payload; only set fields are written.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
}

impl ProfileChanges {
    pub fn verified() -> Self {
        Self {
            is_verified: Some(true),
            ..Self::default()
        }
    }
}

/// Projection of a profile returned by engine operations. Never exposes
/// lifecycle timestamps or social linkage internals.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl From<&UserProfile> for UserSummary {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            username: profile.username.clone(),
            is_verified: profile.is_verified,
            profile_image: profile.profile_image.clone(),
        }
    }
}

/// Outcome of a credential flow: a message, the reconciled user, and a
/// session token when the flow authenticates the caller.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// Outcome of a flow with no user projection (resend, reset, logout, OTP dispatch).
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Authorize URL handed to the client to start a social login.
#[derive(Debug, Clone, Serialize)]
pub struct OAuthRedirect {
    pub message: String,
    pub url: String,
}
