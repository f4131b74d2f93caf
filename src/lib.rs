//! Authentication and identity reconciliation core for the photo-sharing
//! backend.
//!
//! The crate reconciles two records of every user — the external identity
//! provider's account and the local profile row — into one canonical identity
//! per email, across password sign-up, sign-in, OTP, and social login. It
//! exposes:
//!
//! - [`service::IdentityService`] — the reconciliation engine, one method per
//!   credential event;
//! - [`token::TokenIssuer`] — stateless session tokens (signature + expiry,
//!   no revocation);
//! - [`provider::AuthProvider`] / [`store::ProfileStore`] — the typed seams
//!   over the two remote services, with production implementations speaking
//!   the provider's REST dialects.
//!
//! HTTP routing, photo/like/comment bookkeeping and upload handling live
//! elsewhere; they consume this crate through `IdentityService` only.

pub mod config;
pub mod error;
pub mod models;
pub mod provider;
pub mod service;
pub mod store;
pub mod token;

#[cfg(test)]
mod tests;

pub use config::Settings;
pub use error::{IdentityError, Result};
pub use service::IdentityService;
pub use token::{AuthenticatedUser, TokenIssuer};
