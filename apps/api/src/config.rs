use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub backend_token: String,
    /// Push feed. Without it the service relies on polling alone.
    pub redis_url: Option<String>,
    pub channel_prefix: String,
    pub port: u16,
    pub rust_log: String,
    pub cache_duration_ms: u64,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub notification_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        Ok(Config {
            backend_url: require("BACKEND_URL")?,
            backend_token: require("BACKEND_TOKEN")?,
            redis_url: lookup("REDIS_URL").filter(|v| !v.trim().is_empty()),
            channel_prefix: lookup("CHANNEL_PREFIX").unwrap_or_else(|| "ats".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            cache_duration_ms: parse_or(&lookup, "CACHE_DURATION_MS", 30_000)?,
            poll_interval_secs: parse_or(&lookup, "POLL_INTERVAL_SECS", 15)?,
            request_timeout_secs: parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30)?,
            notification_capacity: parse_or(&lookup, "NOTIFICATION_CAPACITY", 200)?,
        })
    }

    pub fn cache_duration(&self) -> Duration {
        Duration::from_millis(self.cache_duration_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("BACKEND_URL", "http://ats.local/api"),
            ("BACKEND_TOKEN", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_duration(), Duration::from_secs(30));
        assert_eq!(config.poll_interval_secs, 15);
        assert_eq!(config.channel_prefix, "ats");
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_missing_required_var() {
        let err = Config::from_lookup(lookup(&[("BACKEND_URL", "http://x")])).unwrap_err();
        assert!(err.to_string().contains("BACKEND_TOKEN"));
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("BACKEND_URL", "http://x"),
            ("BACKEND_TOKEN", "t"),
            ("CACHE_DURATION_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CACHE_DURATION_MS"));
    }
}
