//! Application configuration loaded from environment variables.
//!
//! Sign-in is handled by an external identity provider; this service only
//! needs the shared JWT secret to trust its session tokens. A `.env` file
//! is read first when present.

use std::env;

/// Maximum leaderboard page size a client may request.
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// Which store implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process tables (local development, tests)
    Memory,
    /// Hosted Firestore
    Firestore,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore backend)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Store implementation
    pub store_backend: StoreBackend,
    /// Expected `aud` claim on session tokens, if any
    pub jwt_audience: Option<String>,
    /// Emission estimator endpoint (estimation disabled if unset)
    pub estimator_url: Option<String>,
    /// Leaderboard size when the client does not ask for one
    pub leaderboard_default_limit: usize,

    // --- Secrets ---
    /// Auth platform's HS256 signing secret (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Bearer key for the estimator endpoint
    pub estimator_api_key: Option<String>,
}

impl Config {
    /// Deterministic config for tests.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            jwt_audience: None,
            estimator_url: None,
            leaderboard_default_limit: 10,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            estimator_api_key: None,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "firestore" => StoreBackend::Firestore,
            other => {
                return Err(ConfigError::Invalid(
                    "STORE_BACKEND",
                    format!("unknown backend '{}'", other),
                ))
            }
        };

        let leaderboard_default_limit = match env::var("LEADERBOARD_DEFAULT_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=MAX_LEADERBOARD_LIMIT).contains(n))
                .ok_or_else(|| {
                    ConfigError::Invalid(
                        "LEADERBOARD_DEFAULT_LIMIT",
                        format!("expected 1..={}, got '{}'", MAX_LEADERBOARD_LIMIT, raw),
                    )
                })?,
            Err(_) => 10,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            jwt_audience: non_empty_var("JWT_AUDIENCE"),
            estimator_url: non_empty_var("ESTIMATOR_URL"),
            leaderboard_default_limit,

            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            estimator_api_key: non_empty_var("ESTIMATOR_API_KEY"),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
