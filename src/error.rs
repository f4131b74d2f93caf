use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IdentityError>;

/// Error taxonomy for every identity operation.
///
/// Each variant carries a stable kind (see [`IdentityError::status_code`]) and
/// a human-readable message. Nothing here is retried automatically; remote
/// failures surface to the caller with the upstream message attached.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("This email address is already in use")]
    EmailTaken,

    #[error("This username is already in use")]
    UsernameTaken,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email verification is required before signing in")]
    EmailNotVerified,

    /// A session or provider identity resolved to no local profile.
    /// Distinct from [`IdentityError::UserNotFound`]: this one means the
    /// caller presented otherwise-valid credentials.
    #[error("No profile found for this account")]
    ProfileMissing,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("This email address is already verified")]
    AlreadyVerified,

    /// Verification or resend requested for an email with no account.
    #[error("No account found for this email address")]
    AccountMissing,

    /// The identity returned by the provider carries no email address, so it
    /// cannot be reconciled with a local profile (email is the only merge key).
    #[error("The authenticated identity has no email address")]
    MissingSocialEmail,

    /// The provider rejected the request (weak password, malformed code,
    /// policy violation, ...). The message is the provider's own.
    #[error("{0}")]
    ProviderRejected(String),

    #[error("User not found")]
    UserNotFound,

    /// Provider or store unreachable, or returned an unrecognized shape.
    /// Also covers a store write failing after the provider call succeeded,
    /// which leaves the two records divergent (logged at the call site).
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// Startup-fatal misconfiguration; never shown to end users.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl IdentityError {
    /// HTTP status class for the (out-of-scope) transport layer:
    /// 409 / 401 / 400 / 404 / 502.
    pub fn status_code(&self) -> StatusCode {
        match self {
            IdentityError::EmailTaken | IdentityError::UsernameTaken => StatusCode::CONFLICT,
            IdentityError::InvalidCredentials
            | IdentityError::EmailNotVerified
            | IdentityError::ProfileMissing
            | IdentityError::InvalidToken
            | IdentityError::TokenExpired => StatusCode::UNAUTHORIZED,
            IdentityError::AlreadyVerified
            | IdentityError::AccountMissing
            | IdentityError::MissingSocialEmail
            | IdentityError::ProviderRejected(_) => StatusCode::BAD_REQUEST,
            IdentityError::UserNotFound => StatusCode::NOT_FOUND,
            IdentityError::Upstream(_) | IdentityError::Configuration(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl From<reqwest::Error> for IdentityError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Remote call failed: {}", err);
        IdentityError::Upstream(err.to_string())
    }
}
