//! Social login models.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Supported OAuth providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Google,
    Facebook,
    Github,
}

impl SocialProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocialProvider::Google => "google",
            SocialProvider::Facebook => "facebook",
            SocialProvider::Github => "github",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google" => Some(SocialProvider::Google),
            "facebook" => Some(SocialProvider::Facebook),
            "github" => Some(SocialProvider::Github),
            _ => None,
        }
    }
}

/// Sparse metadata bag attached to a provider identity.
///
/// Social providers populate an arbitrary subset of these fields; everything
/// is optional and defaults are filled explicitly by the consumer, never
/// implied by field order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialMetadata {
    pub username: Option<String>,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub picture: Option<String>,
    /// Provider-side subject id, when the provider exposes one.
    pub provider_id: Option<String>,
}

impl SocialMetadata {
    /// Ordered username fallback rule: `username`, then `name`. The
    /// `user_<epoch-millis>` generation is deliberately separate (see
    /// [`generated_username`]) so the chain stays an explicit rule.
    pub fn preferred_username(&self) -> Option<String> {
        let non_empty = |v: &&String| !v.is_empty();
        self.username
            .as_ref()
            .filter(non_empty)
            .or_else(|| self.name.as_ref().filter(non_empty))
            .cloned()
    }

    /// Ordered image fallback rule: `avatar_url`, then `picture`, then empty.
    pub fn image_url(&self) -> String {
        self.avatar_url
            .as_ref()
            .or(self.picture.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}

/// Last resort of the username fallback chain: unique per call at
/// millisecond granularity.
pub fn generated_username() -> String {
    format!("user_{}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_falls_back_from_username_to_name() {
        let meta = SocialMetadata {
            username: Some("han".to_string()),
            name: Some("Han Solo".to_string()),
            ..SocialMetadata::default()
        };
        assert_eq!(meta.preferred_username().as_deref(), Some("han"));

        let meta = SocialMetadata {
            name: Some("Han Solo".to_string()),
            ..SocialMetadata::default()
        };
        assert_eq!(meta.preferred_username().as_deref(), Some("Han Solo"));

        let meta = SocialMetadata::default();
        assert_eq!(meta.preferred_username(), None);
    }

    #[test]
    fn empty_strings_do_not_win_the_fallback() {
        let meta = SocialMetadata {
            username: Some(String::new()),
            name: Some("Leia".to_string()),
            ..SocialMetadata::default()
        };
        // An empty username is no username.
        assert_eq!(meta.preferred_username().as_deref(), Some("Leia"));
    }

    #[test]
    fn generated_usernames_match_the_documented_pattern() {
        let name = generated_username();
        let suffix = name.strip_prefix("user_").expect("prefix");
        assert!(suffix.parse::<i64>().is_ok(), "suffix must be an integer");
    }

    #[test]
    fn image_url_prefers_avatar_url_over_picture() {
        let meta = SocialMetadata {
            avatar_url: Some("https://cdn/a.png".to_string()),
            picture: Some("https://cdn/p.png".to_string()),
            ..SocialMetadata::default()
        };
        assert_eq!(meta.image_url(), "https://cdn/a.png");

        let meta = SocialMetadata {
            picture: Some("https://cdn/p.png".to_string()),
            ..SocialMetadata::default()
        };
        assert_eq!(meta.image_url(), "https://cdn/p.png");

        assert_eq!(SocialMetadata::default().image_url(), "");
    }

    #[test]
    fn provider_parse_round_trips() {
        for p in [
            SocialProvider::Google,
            SocialProvider::Facebook,
            SocialProvider::Github,
        ] {
            assert_eq!(SocialProvider::parse(p.as_str()), Some(p));
        }
        assert_eq!(SocialProvider::parse("myspace"), None);
    }
}
