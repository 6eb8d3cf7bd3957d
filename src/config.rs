use crate::domain::response_form::SubmitPolicy;
use crate::error::{ClientError, ClientResult};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SESSION_FILE: &str = ".polls_session.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub session_file: PathBuf,
    pub timeout: Duration,
    pub submit_policy: SubmitPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            submit_policy: SubmitPolicy::default(),
        }
    }
}

impl Config {
    /// Reads `POLLS_*` variables. Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = load_or(&lookup, "POLLS_API_URL", DEFAULT_API_URL);
        let api_url = api_url.trim_end_matches('/').to_string();
        if api_url.is_empty() {
            return Err(ClientError::Config("POLLS_API_URL is empty".to_string()));
        }

        let session_file = PathBuf::from(load_or(&lookup, "POLLS_SESSION_FILE", DEFAULT_SESSION_FILE));

        let timeout_secs: u64 = parse_or(&lookup, "POLLS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ClientError::Config(
                "POLLS_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        let policy = load_or(&lookup, "POLLS_SUBMIT_POLICY", SubmitPolicy::default().as_str());
        let submit_policy = SubmitPolicy::try_from(policy.as_str()).map_err(|e| {
            tracing::warn!("Invalid POLLS_SUBMIT_POLICY value: {}", e.reason);
            ClientError::Config(e.reason)
        })?;

        Ok(Self {
            api_url,
            session_file,
            timeout: Duration::from_secs(timeout_secs),
            submit_policy,
        })
    }
}

fn load_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value.trim().to_string(),
        None => {
            tracing::info!("{} not set, using default: {}", key, default);
            default.to_string()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> ClientResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw.trim().parse().map_err(|e| {
            tracing::warn!("Invalid {} value: {}", key, e);
            ClientError::Config(format!("{key}: {e}"))
        }),
        None => {
            tracing::info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}
