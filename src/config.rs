//! Application configuration loaded from environment variables.
//!
//! Everything is read and validated once at startup; the rest of the
//! application only ever sees the resulting `Config`.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Strava host (OAuth + REST API).
pub const DEFAULT_STRAVA_BASE_URL: &str = "https://www.strava.com";

/// Where the activity mirror and credential live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process memory only; lost on restart.
    Memory,
    /// Single JSON state file.
    File(PathBuf),
    /// Firestore collections in the given GCP project.
    Firestore { project_id: String },
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Strava OAuth client ID (public)
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Externally reachable base URL, without trailing slash
    pub app_address: String,
    /// Webhook verification token
    pub webhook_verify_token: String,
    /// Key for signing the OAuth `state` parameter
    pub oauth_state_key: Vec<u8>,
    pub storage: StorageBackend,
    /// Deadline for HTTP-triggered resync sweeps (`None` = unbounded)
    pub resync_timeout: Option<Duration>,
    /// Strava host, overridable for tests and proxies
    pub strava_base_url: String,
    /// Server port
    pub port: u16,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            app_address: "http://localhost:8080".to_string(),
            webhook_verify_token: "test_verify_token".to_string(),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            storage: StorageBackend::Memory,
            resync_timeout: Some(Duration::from_secs(5)),
            strava_base_url: DEFAULT_STRAVA_BASE_URL.to_string(),
            port: 8080,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let strava_client_secret = required("STRAVA_CLIENT_SECRET")?;
        let oauth_state_key = env::var("OAUTH_STATE_KEY")
            .map(|v| v.trim().to_string())
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| strava_client_secret.clone())
            .into_bytes();

        Ok(Self {
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            app_address: parse_base_url("APP_ADDRESS", &required("APP_ADDRESS")?)?,
            webhook_verify_token: required("WEBHOOK_VERIFY_TOKEN")?,
            strava_client_secret,
            oauth_state_key,
            storage: storage_from_env()?,
            resync_timeout: match env::var("RESYNC_TIMEOUT_SECS") {
                Ok(v) => {
                    let secs: u64 = v.trim().parse().map_err(|_| {
                        ConfigError::Invalid("RESYNC_TIMEOUT_SECS", "expected whole seconds")
                    })?;
                    (secs > 0).then(|| Duration::from_secs(secs))
                }
                Err(_) => Some(Duration::from_secs(120)),
            },
            strava_base_url: match env::var("STRAVA_BASE_URL") {
                Ok(v) => parse_base_url("STRAVA_BASE_URL", &v)?,
                Err(_) => DEFAULT_STRAVA_BASE_URL.to_string(),
            },
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", "expected a port number"))?,
        })
    }

    /// URL Strava should deliver webhook events to.
    pub fn webhook_callback_url(&self) -> String {
        format!("{}/webhook", self.app_address)
    }

    /// URL Strava redirects to after the user authorizes the app.
    pub fn oauth_redirect_url(&self) -> String {
        format!("{}/auth", self.app_address)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    let value = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.to_string())
}

fn parse_base_url(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let url = reqwest::Url::parse(value.trim())
        .map_err(|_| ConfigError::Invalid(name, "expected an absolute URL"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid(name, "expected an http(s) URL"));
    }
    Ok(value.trim().trim_end_matches('/').to_string())
}

fn storage_from_env() -> Result<StorageBackend, ConfigError> {
    let backend = env::var("STORAGE_BACKEND").unwrap_or_else(|_| "file".to_string());
    match backend.trim().to_ascii_lowercase().as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "file" => Ok(StorageBackend::File(PathBuf::from(
            env::var("STATE_FILE").unwrap_or_else(|_| "state.json".to_string()),
        ))),
        "firestore" => Ok(StorageBackend::Firestore {
            project_id: required("GCP_PROJECT_ID")?,
        }),
        _ => Err(ConfigError::Invalid(
            "STORAGE_BACKEND",
            "expected one of memory, file, firestore",
        )),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
