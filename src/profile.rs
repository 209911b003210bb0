//! OIDC provider profile mapping.
//!
//! The OAuth/OIDC handshake itself is delegated to a library; this module
//! only covers what happens to the verified identity claims afterwards.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::domain_elements;

pub const GOOGLE_ISSUER: &str = "https://accounts.google.com";
pub const GOOGLE_SCOPES: [&str; 3] = ["openid", "email", "profile"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Your Google Email is Unverified")]
    UnverifiedEmail,
}

/// Settings for the Google sign-in strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleProvider {
    pub client_id: String,
    pub redirect_uri: String,
}

impl GoogleProvider {
    pub fn new(client_id: impl Into<String>, root_url: &str) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri: format!("{}/auth/google/callback", root_url.trim_end_matches('/')),
        }
    }

    /// Client ids prefixed with `MOCK_` short-circuit the real flow in development.
    pub fn is_mock(&self) -> bool {
        self.client_id.starts_with("MOCK_")
    }
}

/// Claims returned by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcProfile {
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub preferred_username: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

/// Profile attached to a new provider connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionProfile {
    pub id: String,
    pub email: String,
    pub username: Option<String>,
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
    pub domain: Option<String>,
    pub website: Option<String>,
    pub company: Option<String>,
}

impl TryFrom<OidcProfile> for ConnectionProfile {
    type Error = ProfileError;

    fn try_from(profile: OidcProfile) -> Result<Self, Self::Error> {
        let email = match (profile.email, profile.email_verified) {
            (Some(email), Some(true)) if !email.is_empty() => email,
            _ => return Err(ProfileError::UnverifiedEmail),
        };
        let elements = domain_elements(&email);

        Ok(Self {
            id: profile.sub,
            email,
            username: profile.preferred_username,
            name: profile.name,
            first_name: profile.given_name,
            last_name: profile.family_name,
            image_url: profile.picture,
            domain: elements.domain,
            website: elements.website,
            company: elements.company,
        })
    }
}
