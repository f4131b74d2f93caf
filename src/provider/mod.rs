//! Identity provider client.
//!
//! The provider is the system of record for credentials, OTP and OAuth. This
//! module is a thin, typed seam over its remote API: one remote operation per
//! method, error-shape normalization, and nothing else — reconciliation logic
//! lives in [`crate::service`].

mod supabase;

pub use supabase::SupabaseAuth;

use crate::error::Result;
use crate::models::{SocialMetadata, SocialProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity as the provider reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_metadata: SocialMetadata,
    #[serde(default)]
    pub app_metadata: AppMetadata,
}

impl ProviderUser {
    /// Email of the identity, treating the provider's empty string as absent.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.is_empty())
    }
}

/// Provider-side metadata about how the identity authenticates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub provider: Option<String>,
}

/// Provider session returned by password, OTP and code-exchange flows.
/// `access_token` is the provider's own credential, distinct from the session
/// tokens this crate issues.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    pub user: ProviderUser,
}

/// Where an OTP is delivered and verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpTarget {
    Email(String),
    Sms(String),
}

/// Metadata forwarded to the provider at password sign-up.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpMetadata {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Remote authentication backend. Every method is a single provider call; no
/// business logic, no retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Register a password account. The provider issues the user id.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SignUpMetadata,
        redirect: &str,
    ) -> Result<ProviderUser>;

    /// Password sign-in. Provider rejections surface as `InvalidCredentials`.
    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession>;

    /// Verify an email or SMS one-time code, yielding a provider session.
    async fn verify_otp(&self, target: OtpTarget, code: &str) -> Result<ProviderSession>;

    /// Dispatch a one-time code. `create_user` lets the provider mint an
    /// account for an unknown address/number.
    // The named lifetime is for mock generation on the Option<&str> argument.
    async fn send_otp<'a>(
        &self,
        target: OtpTarget,
        create_user: bool,
        redirect: Option<&'a str>,
    ) -> Result<()>;

    /// Re-trigger the sign-up verification email.
    async fn resend_signup_email(&self, email: &str, redirect: &str) -> Result<()>;

    /// Dispatch a password reset email.
    async fn send_password_reset(&self, email: &str, redirect: &str) -> Result<()>;

    /// Set a new password for the identity behind `provider_token`.
    async fn update_password(&self, provider_token: &str, new_password: &str)
        -> Result<ProviderUser>;

    /// Advisory sign-out at the provider. Does not invalidate locally issued
    /// session tokens.
    async fn sign_out<'a>(&self, provider_token: Option<&'a str>) -> Result<()>;

    /// Authorization URL starting an OAuth flow. Pure construction, no call.
    fn authorize_url(&self, provider: SocialProvider, redirect: &str) -> String;

    /// Exchange an OAuth callback code for a provider session.
    async fn exchange_code(&self, code: &str) -> Result<ProviderSession>;
}
