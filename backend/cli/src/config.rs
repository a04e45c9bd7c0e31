use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Manasik runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the completion service
    pub api_key: Option<String>,
    /// Full chat-completions URL of the completion service
    pub api_endpoint: Option<String>,
    /// Model identifier sent upstream
    pub model: String,
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Idle time before a session is evicted
    pub session_ttl: Duration,
    /// Session cache capacity
    pub max_sessions: u64,
    /// Outbound HTTP timeout
    pub request_timeout: Duration,
    /// Log level
    pub log_level: String,
    /// Directory for rolling JSON logs
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: None,
            model: "gpt-3.5-turbo".to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 8000,
            session_ttl: Duration::from_secs(3600),
            max_sessions: 10_000,
            request_timeout: Duration::from_secs(60),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to `./.env`.
    pub fn load() -> Result<Self> {
        let dotenv = read_dotenv(Path::new(".env"))?;
        Ok(Self::from_lookup(|key| {
            std::env::var(key).ok().or_else(|| dotenv.get(key).cloned())
        }))
    }

    /// Build a configuration from any key lookup, with defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str| non_empty(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            api_key: non_empty("API_KEY"),
            api_endpoint: non_empty("API_ENDPOINT"),
            model: non_empty("MANASIK_MODEL").unwrap_or(defaults.model),
            bind_address: non_empty("MANASIK_BIND").unwrap_or(defaults.bind_address),
            port: non_empty("MANASIK_PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            session_ttl: number("MANASIK_SESSION_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            max_sessions: number("MANASIK_MAX_SESSIONS").unwrap_or(defaults.max_sessions),
            request_timeout: number("MANASIK_REQUEST_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_dir: non_empty("MANASIK_LOG_DIR").map(PathBuf::from),
        }
    }

    /// Credentials needed to reach the completion service.
    pub fn upstream(&self) -> Result<(&str, &str)> {
        match (&self.api_key, &self.api_endpoint) {
            (Some(key), Some(endpoint)) => Ok((key.as_str(), endpoint.as_str())),
            (None, _) => bail!("API_KEY is not set"),
            (_, None) => bail!("API_ENDPOINT is not set"),
        }
    }
}

/// Read `KEY=VALUE` pairs from a dotenv file. A missing file is not an error.
fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(parse_dotenv(&contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

fn parse_dotenv(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some((key.trim().to_string(), value.to_string()))
        })
        .collect()
}
