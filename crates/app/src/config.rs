use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: SocketAddr,
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub storage_bucket: String,
    pub request_timeout: Duration,
    pub query_stale_time: Duration,
    pub vote_poll_interval: Duration,
    pub max_upload_bytes: usize,
    pub cors_allow_origins: Vec<String>,
    pub offline_token: String,
    pub offline_user: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid socket address: {0}")]
    InvalidSocket(String),
    #[error("invalid integer for {0}: {1}")]
    InvalidNumber(&'static str, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("missing required setting {0}")]
    Missing(&'static str),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr_raw = read_string("AGORA_HTTP_ADDR", "127.0.0.1:8080");
        let http_addr = http_addr_raw
            .parse()
            .map_err(|_| ConfigError::InvalidSocket(http_addr_raw.clone()))?;
        let supabase_url = read_optional_string("AGORA_SUPABASE_URL");
        if let Some(url) = supabase_url.as_deref() {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(ConfigError::InvalidValue(
                    "AGORA_SUPABASE_URL",
                    url.to_string(),
                ));
            }
        }
        let supabase_anon_key = read_optional_string("AGORA_SUPABASE_ANON_KEY");
        let storage_bucket = read_string("AGORA_STORAGE_BUCKET", "post-images");
        if storage_bucket.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "AGORA_STORAGE_BUCKET",
                storage_bucket,
            ));
        }
        let request_timeout_secs = read_u64("AGORA_REQUEST_TIMEOUT_SECS", 15)?;
        let query_stale_secs = read_u64("AGORA_QUERY_STALE_SECS", 30)?;
        let vote_poll_interval_secs = read_u64("AGORA_VOTE_POLL_INTERVAL_SECS", 5)?;
        let max_upload_bytes = read_usize("AGORA_MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?;
        let cors_allow_origins = read_list("AGORA_CORS_ALLOW_ORIGINS");
        let offline_token = read_string("AGORA_OFFLINE_TOKEN", "offline");
        if offline_token.trim().is_empty() {
            return Err(ConfigError::InvalidValue("AGORA_OFFLINE_TOKEN", offline_token));
        }
        let offline_user = read_string("AGORA_OFFLINE_USER", "Offline User");

        Ok(Self {
            http_addr,
            supabase_url,
            supabase_anon_key,
            storage_bucket: storage_bucket.trim().to_string(),
            request_timeout: Duration::from_secs(request_timeout_secs),
            query_stale_time: Duration::from_secs(query_stale_secs),
            vote_poll_interval: Duration::from_secs(vote_poll_interval_secs),
            max_upload_bytes,
            cors_allow_origins,
            offline_token: offline_token.trim().to_string(),
            offline_user: offline_user.trim().to_string(),
        })
    }

    pub fn supabase(&self) -> Result<(&str, &str), ConfigError> {
        let url = self
            .supabase_url
            .as_deref()
            .ok_or(ConfigError::Missing("AGORA_SUPABASE_URL"))?;
        let key = self
            .supabase_anon_key
            .as_deref()
            .ok_or(ConfigError::Missing("AGORA_SUPABASE_ANON_KEY"))?;
        Ok((url, key))
    }
}

#[cfg(test)]
impl AppConfig {
    pub(crate) fn for_tests() -> Self {
        Self {
            http_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            supabase_url: None,
            supabase_anon_key: None,
            storage_bucket: "post-images".to_string(),
            request_timeout: Duration::from_secs(15),
            query_stale_time: Duration::from_secs(30),
            vote_poll_interval: Duration::from_secs(5),
            max_upload_bytes: 1024,
            cors_allow_origins: Vec::new(),
            offline_token: "offline".to_string(),
            offline_user: "Offline User".to_string(),
        }
    }
}

pub fn load_dotenv() -> Result<(), std::io::Error> {
    let path = Path::new(".env");
    if !path.exists() {
        return Ok(());
    }
    let contents = std::fs::read_to_string(path)?;
    for (key, value) in parse_dotenv(&contents) {
        if std::env::var_os(&key).is_none() {
            // Safety: invoked during startup before any threads are spawned.
            unsafe {
                std::env::set_var(key, value);
            }
        }
    }
    Ok(())
}

fn read_string(key: &'static str, default: &'static str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn read_u64(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|_| ConfigError::InvalidNumber(key, raw))
}

fn read_usize(key: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|_| ConfigError::InvalidNumber(key, raw))
}

fn read_list(key: &'static str) -> Vec<String> {
    split_list(&std::env::var(key).unwrap_or_default())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_optional_string(key: &'static str) -> Option<String> {
    let value = std::env::var(key).unwrap_or_default();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    contents
        .lines()
        .filter_map(parse_dotenv_line)
        .collect()
}

fn parse_dotenv_line(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = parse_dotenv_value(value.trim());
    Some((key.to_string(), value))
}

fn parse_dotenv_value(value: &str) -> String {
    if let Some(stripped) = value.strip_prefix('"').and_then(|inner| inner.strip_suffix('"')) {
        return unescape_double_quoted(stripped);
    }
    if let Some(stripped) = value.strip_prefix('\'').and_then(|inner| inner.strip_suffix('\'')) {
        return stripped.to_string();
    }
    value.to_string()
}

fn unescape_double_quoted(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => output.push('\n'),
                Some('r') => output.push('\r'),
                Some('t') => output.push('\t'),
                Some('\\') => output.push('\\'),
                Some('"') => output.push('"'),
                Some(other) => {
                    output.push('\\');
                    output.push(other);
                }
                None => output.push('\\'),
            }
        } else {
            output.push(ch);
        }
    }
    output
}
