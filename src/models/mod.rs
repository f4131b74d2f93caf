pub mod social;
pub mod user;

pub use social::{SocialMetadata, SocialProvider};
pub use user::{
    AuthResponse, MessageResponse, NewProfile, OAuthRedirect, ProfileChanges, UserProfile,
    UserSummary,
};
