//! Application configuration loaded from environment variables.
//!
//! Secrets are read once at startup and cached in memory.

use std::env;

/// Which credential store backend to run against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local store; data is lost on restart.
    Memory,
    /// Firestore in the given GCP project.
    Firestore { project_id: String },
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Redirect URI registered for the Google client
    pub google_redirect_uri: String,
    /// Google Picker API key handed to the frontend
    pub google_api_key: Option<String>,
    /// Microsoft OAuth client ID (public)
    pub microsoft_client_id: String,
    /// Redirect URI registered for the Microsoft client
    pub microsoft_redirect_uri: String,
    /// Azure AD tenant (`common` for personal + work accounts)
    pub microsoft_tenant: String,
    /// Frontend URL for CORS and post-login redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Credential store backend
    pub storage: StorageBackend,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Microsoft OAuth client secret
    pub microsoft_client_secret: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// HMAC key for the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Config for testing only.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test_google_client_id".to_string(),
            google_redirect_uri: "http://localhost:8000/oauth2/callback".to_string(),
            google_api_key: Some("test_api_key".to_string()),
            microsoft_client_id: "test_microsoft_client_id".to_string(),
            microsoft_redirect_uri: "http://localhost:8000/oauth2/microsoft/callback".to_string(),
            microsoft_tenant: "common".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            port: 8000,
            storage: StorageBackend::Memory,
            google_client_secret: "test_google_secret".to_string(),
            microsoft_client_secret: "test_microsoft_secret".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            oauth_state_key: b"test_state_key_32_bytes_minimum!".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local
    /// development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "firestore" => StorageBackend::Firestore {
                project_id: required("GCP_PROJECT_ID")?,
            },
            other => return Err(ConfigError::Invalid("STORAGE_BACKEND", other.to_string())),
        };

        Ok(Self {
            google_client_id: required("GOOGLE_CLIENT_ID")?,
            google_redirect_uri: env::var("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8000/oauth2/callback".to_string()),
            google_api_key: env::var("GOOGLE_API_KEY").ok().filter(|v| !v.is_empty()),
            microsoft_client_id: required("MICROSOFT_CLIENT_ID")?,
            microsoft_redirect_uri: env::var("MICROSOFT_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8000/oauth2/microsoft/callback".to_string()),
            microsoft_tenant: env::var("MICROSOFT_TENANT").unwrap_or_else(|_| "common".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .unwrap_or(8000),
            storage,

            google_client_secret: required("GOOGLE_CLIENT_SECRET")?,
            microsoft_client_secret: required("MICROSOFT_CLIENT_SECRET")?,
            jwt_signing_key: required("JWT_SIGNING_KEY")?.into_bytes(),
            oauth_state_key: required("OAUTH_STATE_KEY")?.into_bytes(),
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

/// Read a required variable, trimming stray whitespace from secret mounts.
fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
