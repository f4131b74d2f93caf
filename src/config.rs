//! Configuration for the identity core.
//!
//! Everything is supplied by the environment at startup; the library owns no
//! configuration source of its own. A missing signing secret is startup-fatal
//! by design: the process must not come up able to mint unverifiable tokens.

use anyhow::{Context, Result};
use std::env;

/// Settings consumed by the identity core at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub jwt: JwtSettings,
    pub redirects: RedirectSettings,
}

impl Settings {
    /// Load settings from environment variables (and `.env` in debug builds).
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }

        Ok(Settings {
            provider: ProviderSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            redirects: RedirectSettings::from_env()?,
        })
    }
}

/// Endpoint and API key of the identity provider deployment. The same host
/// serves the auth API (`/auth/v1`) and the profile table (`/rest/v1`).
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub url: String,
    pub anon_key: String,
}

impl ProviderSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("SUPABASE_URL").context("SUPABASE_URL must be set")?,
            anon_key: env::var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY must be set")?,
        })
    }
}

/// Session token signing settings.
#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub expiry_seconds: i64,
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        let secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        Ok(Self {
            secret,
            expiry_seconds: env::var("JWT_EXPIRES_IN")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("Invalid JWT_EXPIRES_IN")?,
        })
    }
}

/// Frontend URLs the provider redirects back to after email links and OAuth.
#[derive(Debug, Clone)]
pub struct RedirectSettings {
    pub frontend_url: String,
}

impl RedirectSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            frontend_url: env::var("FRONTEND_URL").context("FRONTEND_URL must be set")?,
        })
    }

    /// Landing page for email verification links.
    pub fn verify_redirect(&self) -> String {
        format!("{}/auth/verify", self.frontend_url.trim_end_matches('/'))
    }

    /// Landing page for password reset links.
    pub fn reset_redirect(&self) -> String {
        format!(
            "{}/auth/reset-password",
            self.frontend_url.trim_end_matches('/')
        )
    }

    /// OAuth callback the provider sends the authorization code to.
    pub fn oauth_callback(&self) -> String {
        format!("{}/auth/callback", self.frontend_url.trim_end_matches('/'))
    }
}
