//! Profile store client.
//!
//! The store is the system of record for user-facing identity attributes,
//! keyed by id, email and username. Absent rows are `None`, never errors;
//! unique-constraint violations are surfaced as conflicts so the engine can
//! treat the race two preliminary existence checks cannot close.

mod supabase;

pub use supabase::SupabaseProfiles;

use crate::error::Result;
use crate::models::{NewProfile, ProfileChanges, UserProfile};
use async_trait::async_trait;
use uuid::Uuid;

/// Remote profile table. One remote operation per method.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert a new profile row. A unique violation on email or username
    /// maps to `EmailTaken` / `UsernameTaken`.
    async fn create(&self, profile: NewProfile) -> Result<UserProfile>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserProfile>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserProfile>>;

    /// Apply a sparse update and return the stored row.
    async fn update(&self, id: Uuid, changes: ProfileChanges) -> Result<UserProfile>;
}
