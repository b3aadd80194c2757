//! User model for storage and API.

use super::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile stored in the credential store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user ID (also used as document ID)
    pub id: String,
    /// Email address (unique)
    pub email: String,
    /// Display name
    pub name: String,
    /// Google subject ID
    pub google_user_id: Option<String>,
    /// Microsoft Graph object ID
    pub microsoft_user_id: Option<String>,
    /// When user first connected
    pub created_at: DateTime<Utc>,
    /// Last profile update
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a user from a provider profile seen for the first time.
    pub fn from_profile(profile: &ProviderProfile, provider: Provider, now: DateTime<Utc>) -> Self {
        let mut user = Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            google_user_id: None,
            microsoft_user_id: None,
            created_at: now,
            updated_at: now,
        };
        user.set_external_id(provider, &profile.external_id);
        user
    }

    /// Copy of this user refreshed with the latest provider profile.
    ///
    /// Google logins overwrite name and email; Microsoft logins only fill in
    /// the Graph ID so a Google identity keeps precedence.
    pub fn merged_with(&self, profile: &ProviderProfile, provider: Provider, now: DateTime<Utc>) -> Self {
        let mut user = self.clone();
        match provider {
            Provider::Google => {
                user.email = profile.email.clone();
                user.name = profile.name.clone();
                user.set_external_id(provider, &profile.external_id);
            }
            Provider::Microsoft => {
                if user.microsoft_user_id.is_none() {
                    user.set_external_id(provider, &profile.external_id);
                }
            }
        }
        user.updated_at = now;
        user
    }

    /// External ID for the given provider, if linked.
    pub fn external_id(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Google => self.google_user_id.as_deref(),
            Provider::Microsoft => self.microsoft_user_id.as_deref(),
        }
    }

    fn set_external_id(&mut self, provider: Provider, external_id: &str) {
        match provider {
            Provider::Google => self.google_user_id = Some(external_id.to_string()),
            Provider::Microsoft => self.microsoft_user_id = Some(external_id.to_string()),
        }
    }
}

/// Identity returned by a provider's profile endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    /// Google `id` / Graph `id`
    pub external_id: String,
    pub email: String,
    pub name: String,
}
