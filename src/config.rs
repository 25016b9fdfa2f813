use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// The API version prefix appended to the configured origin.
pub const API_PREFIX: &str = "/api/v1";

/// Upper bound for `CRM_SESSION_DURATION_DAYS` (ten years).
pub const MAX_SESSION_DURATION_DAYS: i64 = 3650;

/// Which durable storage backend persists the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File(PathBuf),
    Redis(String),
}

/// The client's configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The origin of the remote API, without the version prefix.
    pub api_url: String,
    /// The budget for every outbound request.
    pub request_timeout: Duration,
    /// Where the session is persisted.
    pub storage: StorageBackend,
    /// Lifetime of the token cookie and of redis session keys, in days.
    pub session_duration_days: i64,
    /// How long to keep the "unauthorized" notice visible before redirecting.
    pub redirect_delay: Duration,
    /// Bounded wait of the session guard for rehydration.
    pub rehydrate_timeout: Duration,
    /// The route unauthenticated users are sent to.
    pub login_route: String,
}

impl Config {
    /// Creates a `Config` with default settings for the given API origin.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(10),
            storage: StorageBackend::Memory,
            session_duration_days: 7,
            redirect_delay: Duration::from_millis(1500),
            rehydrate_timeout: Duration::from_millis(500),
            login_route: "/login".to_string(),
        }
    }

    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let api_url = env::var("CRM_API_URL").context("CRM_API_URL must be set")?;
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            anyhow::bail!("CRM_API_URL must start with http:// or https://");
        }

        let storage = match env::var("CRM_STORAGE")
            .unwrap_or_else(|_| "file".to_string())
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            "file" => StorageBackend::File(PathBuf::from(
                env::var("CRM_STORAGE_PATH")
                    .unwrap_or_else(|_| ".carecrm/storage.json".to_string()),
            )),
            "redis" => StorageBackend::Redis(
                env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            ),
            other => anyhow::bail!("Unknown CRM_STORAGE backend: {}", other),
        };

        let defaults = Self::new(api_url);

        Ok(Self {
            request_timeout: Duration::from_secs(
                env::var("CRM_REQUEST_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("Invalid CRM_REQUEST_TIMEOUT_SECS")?,
            ),
            storage,
            session_duration_days: parse_session_duration_days(
                &env::var("CRM_SESSION_DURATION_DAYS").unwrap_or_else(|_| "7".to_string()),
            )?,
            redirect_delay: Duration::from_millis(
                env::var("CRM_REDIRECT_DELAY_MS")
                    .unwrap_or_else(|_| "1500".to_string())
                    .parse()
                    .context("Invalid CRM_REDIRECT_DELAY_MS")?,
            ),
            rehydrate_timeout: Duration::from_millis(
                env::var("CRM_REHYDRATE_TIMEOUT_MS")
                    .unwrap_or_else(|_| "500".to_string())
                    .parse()
                    .context("Invalid CRM_REHYDRATE_TIMEOUT_MS")?,
            ),
            login_route: env::var("CRM_LOGIN_ROUTE").unwrap_or(defaults.login_route.clone()),
            ..defaults
        })
    }

    /// The versioned API base, e.g. `https://crm.example.com/api/v1`.
    pub fn api_base(&self) -> String {
        format!("{}{}", self.api_url, API_PREFIX)
    }

    /// Session lifetime in seconds.
    pub fn session_ttl_secs(&self) -> u64 {
        (self.session_duration_days.clamp(0, MAX_SESSION_DURATION_DAYS) as u64) * 86_400
    }
}

fn parse_session_duration_days(raw: &str) -> Result<i64> {
    let days: i64 = raw
        .trim()
        .parse()
        .context("Invalid CRM_SESSION_DURATION_DAYS")?;
    if !(1..=MAX_SESSION_DURATION_DAYS).contains(&days) {
        anyhow::bail!(
            "CRM_SESSION_DURATION_DAYS must be between 1 and {}, got {}",
            MAX_SESSION_DURATION_DAYS,
            days
        );
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_duration_is_range_checked() {
        assert_eq!(parse_session_duration_days("7").unwrap(), 7);
        assert_eq!(parse_session_duration_days(" 3650 ").unwrap(), 3650);
        assert!(parse_session_duration_days("0").is_err());
        assert!(parse_session_duration_days("3651").is_err());
        assert!(parse_session_duration_days("9223372036854775807").is_err());
        assert!(parse_session_duration_days("seven").is_err());
    }

    #[test]
    fn oversized_duration_never_overflows_ttl() {
        let mut config = Config::new("http://localhost:8080");
        config.session_duration_days = i64::MAX;
        assert_eq!(
            config.session_ttl_secs(),
            MAX_SESSION_DURATION_DAYS as u64 * 86_400
        );

        config.session_duration_days = -3;
        assert_eq!(config.session_ttl_secs(), 0);
    }
}
