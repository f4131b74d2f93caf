//! Session token issuance and validation.
//!
//! Tokens are stateless bearer credentials: validity is determined entirely by
//! signature and expiry, never by a server-side lookup. There is no revocation
//! list — logout is advisory only and callers must not treat it as a security
//! boundary for already-issued tokens.

use crate::config::JwtSettings;
use crate::error::{IdentityError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claim set bound into every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the local user id.
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Identity recovered from a validated token. The live profile is fetched
/// separately so profile edits take effect without reissuing tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
}

/// Signs and validates session tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    /// Build an issuer from settings. An empty secret is a startup-fatal
    /// configuration error, never a runtime one.
    pub fn new(settings: &JwtSettings) -> Result<Self> {
        if settings.secret.trim().is_empty() {
            return Err(IdentityError::Configuration(
                "session token signing secret is not configured".to_string(),
            ));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            ttl: Duration::seconds(settings.expiry_seconds),
        })
    }

    /// Issue a token binding `{sub: user_id, email}` with the configured expiry.
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| IdentityError::Upstream(format!("failed to sign session token: {}", e)))
    }

    /// Validate signature and expiry, returning the bound identity.
    pub fn validate(&self, token: &str) -> Result<AuthenticatedUser> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
                _ => IdentityError::InvalidToken,
            },
        )?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| IdentityError::InvalidToken)?;
        Ok(AuthenticatedUser {
            user_id,
            email: data.claims.email,
        })
    }
}
