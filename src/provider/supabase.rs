//! Supabase GoTrue client.
//!
//! Speaks the provider's REST dialect under `{base}/auth/v1`. Each method maps
//! to exactly one endpoint; provider error bodies come in several shapes
//! (`error_description`, `msg`, `message`, `error`) and are normalized into
//! the crate taxonomy here so nothing upstream ever inspects raw bodies.

use crate::config::ProviderSettings;
use crate::error::{IdentityError, Result};
use crate::models::SocialProvider;
use crate::provider::{
    AuthProvider, OtpTarget, ProviderSession, ProviderUser, SignUpMetadata,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::debug;

#[derive(Clone)]
pub struct SupabaseAuth {
    base_url: String,
    anon_key: String,
    http: Client,
}

impl SupabaseAuth {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            anon_key: settings.anon_key.clone(),
            http: Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    /// Request with the API key attached; bearer defaults to the API key and
    /// is overridden for the user-scoped endpoints.
    fn request(&self, method: reqwest::Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: SignUpMetadata,
        redirect: &str,
    ) -> Result<ProviderUser> {
        let response = self
            .request(reqwest::Method::POST, "/signup", None)
            .query(&[("redirect_to", redirect)])
            .json(&SignUpRequest {
                email,
                password,
                data: metadata,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        decode_user(response).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderSession> {
        let response = self
            .request(reqwest::Method::POST, "/token", None)
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password })
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let message = read_message(response).await;
            debug!(email = %email, %message, "Provider rejected password sign-in");
            return Err(IdentityError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(upstream(status, response).await);
        }
        decode_session(response).await
    }

    async fn verify_otp(&self, target: OtpTarget, code: &str) -> Result<ProviderSession> {
        let body = match &target {
            OtpTarget::Email(email) => VerifyRequest {
                kind: "email",
                email: Some(email),
                phone: None,
                token: code,
            },
            OtpTarget::Sms(phone) => VerifyRequest {
                kind: "sms",
                email: None,
                phone: Some(phone),
                token: code,
            },
        };

        let response = self
            .request(reqwest::Method::POST, "/verify", None)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        decode_session(response).await
    }

    async fn send_otp<'a>(
        &self,
        target: OtpTarget,
        create_user: bool,
        redirect: Option<&'a str>,
    ) -> Result<()> {
        let body = match &target {
            OtpTarget::Email(email) => OtpRequest {
                email: Some(email),
                phone: None,
                create_user,
            },
            OtpTarget::Sms(phone) => OtpRequest {
                email: None,
                phone: Some(phone),
                create_user,
            },
        };

        let mut request = self.request(reqwest::Method::POST, "/otp", None).json(&body);
        if let Some(redirect) = redirect {
            request = request.query(&[("redirect_to", redirect)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(())
    }

    async fn resend_signup_email(&self, email: &str, redirect: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, "/resend", None)
            .query(&[("redirect_to", redirect)])
            .json(&ResendRequest {
                kind: "signup",
                email,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, redirect: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, "/recover", None)
            .query(&[("redirect_to", redirect)])
            .json(&RecoverRequest { email })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(())
    }

    async fn update_password(
        &self,
        provider_token: &str,
        new_password: &str,
    ) -> Result<ProviderUser> {
        let response = self
            .request(reqwest::Method::PUT, "/user", Some(provider_token))
            .json(&UpdatePasswordRequest {
                password: new_password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        decode_user(response).await
    }

    async fn sign_out<'a>(&self, provider_token: Option<&'a str>) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, "/logout", provider_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(())
    }

    fn authorize_url(&self, provider: SocialProvider, redirect: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect)
            .finish();
        format!("{}?{}", self.endpoint("/authorize"), query)
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderSession> {
        let response = self
            .request(reqwest::Method::POST, "/token", None)
            .query(&[("grant_type", "pkce")])
            .json(&CodeExchangeRequest { auth_code: code })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        decode_session(response).await
    }
}

// ===== Wire types =====

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    token: &'a str,
}

#[derive(Serialize)]
struct OtpRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    create_user: bool,
}

#[derive(Serialize)]
struct ResendRequest<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct RecoverRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct UpdatePasswordRequest<'a> {
    password: &'a str,
}

#[derive(Serialize)]
struct CodeExchangeRequest<'a> {
    auth_code: &'a str,
}

// ===== Response normalization =====

/// Some endpoints return the user object bare, others wrapped in `{"user": …}`.
async fn decode_user(response: Response) -> Result<ProviderUser> {
    let value: serde_json::Value = response.json().await?;
    let node = value.get("user").cloned().unwrap_or(value);
    serde_json::from_value(node)
        .map_err(|e| IdentityError::Upstream(format!("unrecognized user shape from provider: {}", e)))
}

async fn decode_session(response: Response) -> Result<ProviderSession> {
    let value: serde_json::Value = response.json().await?;
    serde_json::from_value(value).map_err(|e| {
        IdentityError::Upstream(format!("unrecognized session shape from provider: {}", e))
    })
}

/// 4xx → the provider rejected the request; 5xx → upstream failure.
async fn rejection(response: Response) -> IdentityError {
    let status = response.status();
    if status.is_client_error() {
        IdentityError::ProviderRejected(read_message(response).await)
    } else {
        upstream(status, response).await
    }
}

async fn upstream(status: reqwest::StatusCode, response: Response) -> IdentityError {
    IdentityError::Upstream(format!(
        "provider returned {}: {}",
        status,
        read_message(response).await
    ))
}

async fn read_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    extract_message(&body).unwrap_or_else(|| {
        if body.is_empty() {
            "no error detail from provider".to_string()
        } else {
            body
        }
    })
}

fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["error_description", "msg", "message", "error"] {
        if let Some(message) = value.get(key).and_then(|v| v.as_str()) {
            return Some(message.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseAuth {
        SupabaseAuth::new(&ProviderSettings {
            url: "https://proj.supabase.co/".to_string(),
            anon_key: "anon".to_string(),
        })
    }

    #[test]
    fn signup_request_carries_metadata_under_data() {
        let json = serde_json::to_string(&SignUpRequest {
            email: "a@x.com",
            password: "secret1",
            data: SignUpMetadata {
                username: "alice".to_string(),
                bio: None,
            },
        })
        .unwrap();
        assert!(json.contains("\"data\":{\"username\":\"alice\"}"));
        assert!(!json.contains("bio"));
    }

    #[test]
    fn verify_request_type_field_matches_the_channel() {
        let email = serde_json::to_value(VerifyRequest {
            kind: "email",
            email: Some("a@x.com"),
            phone: None,
            token: "123456",
        })
        .unwrap();
        assert_eq!(email["type"], "email");
        assert!(email.get("phone").is_none());

        let sms = serde_json::to_value(VerifyRequest {
            kind: "sms",
            email: None,
            phone: Some("+821012345678"),
            token: "123456",
        })
        .unwrap();
        assert_eq!(sms["type"], "sms");
        assert!(sms.get("email").is_none());
    }

    #[test]
    fn error_message_extraction_handles_every_known_shape() {
        assert_eq!(
            extract_message(r#"{"error":"invalid_grant","error_description":"bad login"}"#),
            Some("bad login".to_string())
        );
        assert_eq!(
            extract_message(r#"{"code":400,"msg":"Token has expired"}"#),
            Some("Token has expired".to_string())
        );
        assert_eq!(
            extract_message(r#"{"message":"nope"}"#),
            Some("nope".to_string())
        );
        assert_eq!(extract_message("not json"), None);
    }

    #[test]
    fn authorize_url_is_built_locally_with_encoded_query() {
        let url = client().authorize_url(
            SocialProvider::Google,
            "https://app.example.com/auth/callback",
        );
        assert!(url.starts_with("https://proj.supabase.co/auth/v1/authorize?"));
        assert!(url.contains("provider=google"));
        assert!(url.contains("redirect_to=https%3A%2F%2Fapp.example.com%2Fauth%2Fcallback"));
    }
}
