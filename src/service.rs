//! Identity reconciliation engine.
//!
//! Receives credential events (sign-up, sign-in, OTP verification, social
//! callbacks) and drives the provider and profile store to a single consistent
//! user record, issuing a session token where the flow authenticates the
//! caller.
//!
//! Two ordering rules govern every multi-step flow:
//! - store lookups precede provider mutation for duplicate checks, so an
//!   obviously-conflicting request never reaches the provider;
//! - provider calls precede store mutation for creation flows, so a provider
//!   failure never leaves an orphan local record.
//!
//! The inverse gap remains: a store write failing after a provider success
//! leaves the provider account without a profile. There is no compensating
//! transaction; the failure is logged and surfaced as an upstream error.

use crate::config::{RedirectSettings, Settings};
use crate::error::{IdentityError, Result};
use crate::models::social::generated_username;
use crate::models::{
    AuthResponse, MessageResponse, NewProfile, OAuthRedirect, ProfileChanges, SocialProvider,
    UserProfile, UserSummary,
};
use crate::provider::{AuthProvider, OtpTarget, ProviderUser, SignUpMetadata, SupabaseAuth};
use crate::store::{ProfileStore, SupabaseProfiles};
use crate::token::{AuthenticatedUser, TokenIssuer};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The reconciliation engine. Immutable after construction; holds no state
/// beyond its injected clients, so concurrent requests never contend on it.
pub struct IdentityService {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn ProfileStore>,
    tokens: TokenIssuer,
    redirects: RedirectSettings,
}

impl IdentityService {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn ProfileStore>,
        tokens: TokenIssuer,
        redirects: RedirectSettings,
    ) -> Self {
        Self {
            provider,
            store,
            tokens,
            redirects,
        }
    }

    /// Wire the engine against a real provider deployment.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            Arc::new(SupabaseAuth::new(&settings.provider)),
            Arc::new(SupabaseProfiles::new(&settings.provider)),
            TokenIssuer::new(&settings.jwt)?,
            settings.redirects.clone(),
        ))
    }

    /// Register a password account.
    ///
    /// Duplicate checks run against the store before the provider is touched;
    /// the store's unique constraints close the remaining race. No token is
    /// returned — email verification gates the first sign-in.
    pub async fn sign_up(
        &self,
        email: &str,
        username: &str,
        password: &str,
        bio: Option<String>,
    ) -> Result<AuthResponse> {
        if self.store.find_by_email(email).await?.is_some() {
            return Err(IdentityError::EmailTaken);
        }
        if self.store.find_by_username(username).await?.is_some() {
            return Err(IdentityError::UsernameTaken);
        }

        let provider_user = self
            .provider
            .sign_up(
                email,
                password,
                SignUpMetadata {
                    username: username.to_string(),
                    bio: bio.clone(),
                },
                &self.redirects.verify_redirect(),
            )
            .await?;

        let profile = self
            .create_profile(NewProfile {
                id: provider_user.id,
                email: email.to_string(),
                username: username.to_string(),
                bio,
                profile_image: None,
                is_verified: false,
                social_provider: None,
                social_id: None,
            })
            .await?;

        info!(user_id = %profile.id, email = %profile.email, "Password account registered");
        Ok(AuthResponse {
            message: "Sign-up complete. Check your email to verify your address.".to_string(),
            user: UserSummary::from(&profile),
            access_token: None,
        })
    }

    /// Password sign-in. The provider authenticates first; the verification
    /// gate rejects unverified accounts regardless of password correctness,
    /// with an error callers can tell apart from bad credentials.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthResponse> {
        self.provider.sign_in(email, password).await?;

        let profile = match self.store.find_by_email(email).await? {
            Some(profile) => profile,
            None => {
                warn!(
                    email = %email,
                    "Provider authenticated an account with no local profile (desync)"
                );
                return Err(IdentityError::ProfileMissing);
            }
        };

        if !profile.is_verified {
            return Err(IdentityError::EmailNotVerified);
        }

        let access_token = self.tokens.issue(profile.id, &profile.email)?;
        info!(user_id = %profile.id, "User signed in");
        Ok(AuthResponse {
            message: "Signed in.".to_string(),
            user: UserSummary::from(&profile),
            access_token: Some(access_token),
        })
    }

    /// Confirm an email verification code. Verifying an already-verified
    /// account is an error, not a silent success.
    pub async fn verify_email(&self, email: &str, code: &str) -> Result<AuthResponse> {
        self.provider
            .verify_otp(OtpTarget::Email(email.to_string()), code)
            .await?;

        let profile = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(IdentityError::AccountMissing)?;

        if profile.is_verified {
            return Err(IdentityError::AlreadyVerified);
        }

        let updated = self
            .store
            .update(profile.id, ProfileChanges::verified())
            .await?;

        info!(user_id = %updated.id, "Email verified");
        Ok(AuthResponse {
            message: "Email verified.".to_string(),
            user: UserSummary::from(&updated),
            access_token: None,
        })
    }

    /// Re-send the verification email. Store checks come first so an absent
    /// or already-verified account never reaches the provider.
    pub async fn resend_verification(&self, email: &str) -> Result<MessageResponse> {
        let profile = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(IdentityError::AccountMissing)?;

        if profile.is_verified {
            return Err(IdentityError::AlreadyVerified);
        }

        self.provider
            .resend_signup_email(email, &self.redirects.verify_redirect())
            .await?;
        Ok(MessageResponse::new("Verification email sent."))
    }

    /// Authorize URL starting a social login flow.
    pub fn social_login_url(&self, provider: SocialProvider) -> OAuthRedirect {
        let url = self
            .provider
            .authorize_url(provider, &self.redirects.oauth_callback());
        OAuthRedirect {
            message: format!("{} login URL created.", provider.as_str()),
            url,
        }
    }

    /// Complete a social login. Identities without an email are rejected
    /// outright — email is the only reconciliation key. On repeat logins the
    /// existing profile wins as-is; fresh provider metadata is never re-synced
    /// over it.
    pub async fn social_callback(&self, code: &str, _state: &str) -> Result<AuthResponse> {
        let session = self.provider.exchange_code(code).await?;

        let email = session
            .user
            .email()
            .ok_or(IdentityError::MissingSocialEmail)?
            .to_string();

        let profile = match self.store.find_by_email(&email).await? {
            Some(existing) => existing,
            None => {
                self.create_from_provider_identity(&session.user, email, true)
                    .await?
            }
        };

        let access_token = self.tokens.issue(profile.id, &profile.email)?;
        info!(user_id = %profile.id, "Social login completed");
        Ok(AuthResponse {
            message: "Social login complete.".to_string(),
            user: UserSummary::from(&profile),
            access_token: Some(access_token),
        })
    }

    /// Dispatch an email one-time code; unknown addresses get a provider
    /// account minted for them.
    pub async fn send_email_otp(&self, email: &str) -> Result<MessageResponse> {
        self.provider
            .send_otp(
                OtpTarget::Email(email.to_string()),
                true,
                Some(&self.redirects.verify_redirect()),
            )
            .await?;
        Ok(MessageResponse::new("Verification code sent."))
    }

    /// Verify an email one-time code and reconcile: an existing profile is
    /// marked verified (the code proves mailbox ownership), an absent one is
    /// created verified from the provider identity.
    pub async fn verify_email_otp(&self, email: &str, code: &str) -> Result<AuthResponse> {
        let session = self
            .provider
            .verify_otp(OtpTarget::Email(email.to_string()), code)
            .await?;

        let profile = match self.store.find_by_email(email).await? {
            Some(existing) if existing.is_verified => existing,
            Some(existing) => {
                self.store
                    .update(existing.id, ProfileChanges::verified())
                    .await?
            }
            None => {
                self.create_from_provider_identity(&session.user, email.to_string(), false)
                    .await?
            }
        };

        let access_token = self.tokens.issue(profile.id, &profile.email)?;
        Ok(AuthResponse {
            message: "Verification complete.".to_string(),
            user: UserSummary::from(&profile),
            access_token: Some(access_token),
        })
    }

    /// Dispatch an SMS one-time code.
    pub async fn send_sms_otp(&self, phone: &str) -> Result<MessageResponse> {
        self.provider
            .send_otp(OtpTarget::Sms(phone.to_string()), true, None)
            .await?;
        Ok(MessageResponse::new("Verification code sent."))
    }

    /// Verify an SMS one-time code. The provider identity must carry an email
    /// to reconcile against; phone-only identities are rejected rather than
    /// half-created. An SMS code proves the phone, not the mailbox, so an
    /// existing unverified profile is left unverified.
    pub async fn verify_sms_otp(&self, phone: &str, code: &str) -> Result<AuthResponse> {
        let session = self
            .provider
            .verify_otp(OtpTarget::Sms(phone.to_string()), code)
            .await?;

        let email = session
            .user
            .email()
            .ok_or(IdentityError::MissingSocialEmail)?
            .to_string();

        let profile = match self.store.find_by_email(&email).await? {
            Some(existing) => existing,
            None => {
                self.create_from_provider_identity(&session.user, email, false)
                    .await?
            }
        };

        let access_token = self.tokens.issue(profile.id, &profile.email)?;
        Ok(AuthResponse {
            message: "Verification complete.".to_string(),
            user: UserSummary::from(&profile),
            access_token: Some(access_token),
        })
    }

    /// Dispatch a password reset email. Pure provider delegation; passwords
    /// are never mirrored locally.
    pub async fn reset_password(&self, email: &str) -> Result<MessageResponse> {
        self.provider
            .send_password_reset(email, &self.redirects.reset_redirect())
            .await?;
        Ok(MessageResponse::new("Password reset email sent."))
    }

    /// Set a new password using the provider-issued recovery token. The token
    /// is passed explicitly; the engine holds no ambient provider session.
    pub async fn update_password(
        &self,
        provider_token: &str,
        new_password: &str,
    ) -> Result<MessageResponse> {
        self.provider
            .update_password(provider_token, new_password)
            .await?;
        Ok(MessageResponse::new("Password updated."))
    }

    /// Advisory sign-out. Session tokens are stateless and stay valid until
    /// expiry, so callers must not treat this as a security boundary; a
    /// provider failure here is logged and swallowed.
    pub async fn logout(
        &self,
        user_id: Uuid,
        provider_token: Option<&str>,
    ) -> Result<MessageResponse> {
        if let Err(err) = self.provider.sign_out(provider_token).await {
            warn!(user_id = %user_id, error = %err, "Advisory provider sign-out failed");
        }
        info!(user_id = %user_id, "User signed out");
        Ok(MessageResponse::new("Signed out."))
    }

    /// Live profile for an authenticated subject. A valid token whose subject
    /// has no profile is an authorization failure, not a 404.
    pub async fn current_user(&self, user_id: Uuid) -> Result<UserSummary> {
        let profile = self
            .store
            .get_by_id(user_id)
            .await?
            .ok_or(IdentityError::ProfileMissing)?;
        Ok(UserSummary::from(&profile))
    }

    /// Validate a bearer token and resolve its subject against the live
    /// profile, so profile edits take effect without reissuing tokens.
    pub async fn authenticate(&self, token: &str) -> Result<UserSummary> {
        let AuthenticatedUser { user_id, .. } = self.tokens.validate(token)?;
        self.current_user(user_id).await
    }

    /// Token validation without the profile fetch, for collaborators that
    /// only need the subject and email.
    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser> {
        self.tokens.validate(token)
    }

    /// Create a verified profile from a provider identity (social callback or
    /// OTP verification). The username follows the explicit fallback chain:
    /// metadata `username`, then `name`, then `user_<epoch-millis>`.
    async fn create_from_provider_identity(
        &self,
        user: &ProviderUser,
        email: String,
        link_social: bool,
    ) -> Result<UserProfile> {
        let meta = &user.user_metadata;
        let username = meta
            .preferred_username()
            .unwrap_or_else(generated_username);

        let (social_provider, social_id) = if link_social {
            (
                Some(
                    user.app_metadata
                        .provider
                        .clone()
                        .unwrap_or_else(|| "oauth".to_string()),
                ),
                Some(
                    meta.provider_id
                        .clone()
                        .unwrap_or_else(|| user.id.to_string()),
                ),
            )
        } else {
            (None, None)
        };

        let profile = self
            .create_profile(NewProfile {
                id: user.id,
                email,
                username,
                bio: Some(meta.bio.clone().unwrap_or_default()),
                profile_image: Some(meta.image_url()),
                is_verified: true,
                social_provider,
                social_id,
            })
            .await?;

        info!(
            user_id = %profile.id,
            username = %profile.username,
            social = link_social,
            "Profile created from provider identity"
        );
        Ok(profile)
    }

    /// Store insert shared by every creation flow. Conflicts pass through so
    /// the uniqueness race stays user-visible; anything else at this point
    /// means the provider and store have diverged.
    async fn create_profile(&self, new_profile: NewProfile) -> Result<UserProfile> {
        let email = new_profile.email.clone();
        match self.store.create(new_profile).await {
            Ok(profile) => Ok(profile),
            Err(err @ (IdentityError::EmailTaken | IdentityError::UsernameTaken)) => Err(err),
            Err(err) => {
                error!(
                    email = %email,
                    error = %err,
                    "Profile creation failed after provider success; provider account has no profile"
                );
                Err(err)
            }
        }
    }
}
