//! Supabase profile table client.
//!
//! PostgREST dialect over `{base}/rest/v1/users`: equality filters in the
//! query string, `Prefer: return=representation` on writes, and Postgres
//! error codes in JSON bodies. Unique violations (`23505`) become conflicts;
//! every other failure is an upstream error.

use crate::config::ProviderSettings;
use crate::error::{IdentityError, Result};
use crate::models::{NewProfile, ProfileChanges, UserProfile};
use crate::store::ProfileStore;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use uuid::Uuid;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct SupabaseProfiles {
    base_url: String,
    anon_key: String,
    http: Client,
}

impl SupabaseProfiles {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone(),
            http: Client::new(),
        }
    }

    fn table(&self, method: reqwest::Method) -> RequestBuilder {
        self.http
            .request(method, format!("{}/rest/v1/users", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<UserProfile>> {
        let filter = format!("eq.{}", value);
        let response = self
            .table(reqwest::Method::GET)
            .query(&[("select", "*"), (column, filter.as_str()), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(store_error(response).await);
        }

        let mut rows: Vec<UserProfile> = decode_rows(response).await?;
        Ok(rows.pop())
    }
}

#[async_trait]
impl ProfileStore for SupabaseProfiles {
    async fn create(&self, profile: NewProfile) -> Result<UserProfile> {
        let response = self
            .table(reqwest::Method::POST)
            .header("Prefer", "return=representation")
            .json(&profile)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(store_error(response).await);
        }

        let mut rows: Vec<UserProfile> = decode_rows(response).await?;
        rows.pop().ok_or_else(|| {
            IdentityError::Upstream("store returned no row for the created profile".to_string())
        })
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserProfile>> {
        self.find_one("id", &id.to_string()).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        self.find_one("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserProfile>> {
        self.find_one("username", username).await
    }

    async fn update(&self, id: Uuid, changes: ProfileChanges) -> Result<UserProfile> {
        let response = self
            .table(reqwest::Method::PATCH)
            .header("Prefer", "return=representation")
            .query(&[("id", format!("eq.{}", id).as_str())])
            .json(&changes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(store_error(response).await);
        }

        let mut rows: Vec<UserProfile> = decode_rows(response).await?;
        rows.pop().ok_or_else(|| {
            IdentityError::Upstream(format!("store matched no profile row for id {}", id))
        })
    }
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct StoreError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn decode_rows(response: Response) -> Result<Vec<UserProfile>> {
    let rows: Vec<UserProfile> = response.json().await.map_err(|e| {
        IdentityError::Upstream(format!("unrecognized row shape from store: {}", e))
    })?;
    Ok(rows)
}

async fn store_error(response: Response) -> IdentityError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if let Ok(err) = serde_json::from_str::<StoreError>(&body) {
        let message = err.message.unwrap_or_default();
        if err.code.as_deref() == Some(UNIQUE_VIOLATION) {
            // The constraint name tells us which key raced.
            return if message.contains("username") {
                IdentityError::UsernameTaken
            } else {
                IdentityError::EmailTaken
            };
        }
        if !message.is_empty() {
            return IdentityError::Upstream(format!("store returned {}: {}", status, message));
        }
    }

    IdentityError::Upstream(format!("store returned {}: {}", status, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_maps_to_the_racing_key() {
        let email: StoreError = serde_json::from_str(
            r#"{"code":"23505","message":"duplicate key value violates unique constraint \"users_email_key\""}"#,
        )
        .unwrap();
        assert_eq!(email.code.as_deref(), Some(UNIQUE_VIOLATION));

        let username_body =
            r#"{"code":"23505","message":"duplicate key value violates unique constraint \"users_username_key\""}"#;
        let err: StoreError = serde_json::from_str(username_body).unwrap();
        assert!(err.message.unwrap().contains("username"));
    }

    #[test]
    fn sparse_updates_serialize_only_set_fields() {
        let json = serde_json::to_string(&ProfileChanges::verified()).unwrap();
        assert_eq!(json, r#"{"is_verified":true}"#);
    }
}
