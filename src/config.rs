//! Application configuration loaded from environment variables.
//!
//! Credentials for the hosted services (Firebase project, storage bucket,
//! geocoding key) are read once at startup.

use std::env;

const DEFAULT_GEOCODING_BASE_URL: &str = "https://maps.googleapis.com/maps/api";
const DEFAULT_STORAGE_BASE_URL: &str = "https://firebasestorage.googleapis.com/v0";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Firebase / GCP project ID (Firestore database and ID token audience)
    pub firebase_project_id: String,
    /// Firebase Storage bucket (e.g. "vaid-99446.appspot.com")
    pub storage_bucket: String,
    /// Firebase Storage REST base URL
    pub storage_base_url: String,
    /// Frontend URL for CORS
    pub frontend_url: String,
    /// Geocoding API base URL
    pub geocoding_base_url: String,
    /// Server port
    pub port: u16,

    // --- Secrets ---
    /// Google Geocoding API key
    pub geocoding_api_key: String,
    /// Optional bearer token for storage uploads
    pub storage_auth_token: Option<String>,
    /// JWT signing key for session cookies (raw bytes)
    pub jwt_signing_key: Vec<u8>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            firebase_project_id: "test-project".to_string(),
            storage_bucket: "test-project.appspot.com".to_string(),
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            geocoding_base_url: DEFAULT_GEOCODING_BASE_URL.to_string(),
            port: 8080,
            geocoding_api_key: "test_geocoding_key".to_string(),
            storage_auth_token: None,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let firebase_project_id = env::var("FIREBASE_PROJECT_ID")
            .map_err(|_| ConfigError::Missing("FIREBASE_PROJECT_ID"))?;

        Ok(Self {
            storage_bucket: env::var("FIREBASE_STORAGE_BUCKET")
                .map_err(|_| ConfigError::Missing("FIREBASE_STORAGE_BUCKET"))?,
            storage_base_url: env::var("STORAGE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_STORAGE_BASE_URL.to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            geocoding_base_url: env::var("GEOCODING_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_GEOCODING_BASE_URL.to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            geocoding_api_key: env::var("GEOCODING_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GEOCODING_API_KEY"))?,
            storage_auth_token: env::var("STORAGE_AUTH_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            firebase_project_id,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
