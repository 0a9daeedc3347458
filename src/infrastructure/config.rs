use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

const CLIENT_JSON: &str = "client.json";
const BASE_URL_ENV: &str = "POMODORO_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 60_000;
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_TOAST_VISIBLE_MS: u64 = 3_000;
pub const DEFAULT_TOAST_COOLDOWN_MS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub poll_interval_ms: u64,
    pub tick_interval_ms: u64,
    pub toast_visible_ms: u64,
    pub toast_cooldown_ms: u64,
    pub request_timeout_ms: Option<u64>,
}

impl ClientConfig {
    /// Default timings against `base_url`.
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            toast_visible_ms: DEFAULT_TOAST_VISIBLE_MS,
            toast_cooldown_ms: DEFAULT_TOAST_COOLDOWN_MS,
            request_timeout_ms: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientConfigFile {
    schema: u8,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    poll_interval_ms: Option<u64>,
    #[serde(default)]
    tick_interval_ms: Option<u64>,
    #[serde(default)]
    toast_visible_ms: Option<u64>,
    #[serde(default)]
    toast_cooldown_ms: Option<u64>,
    #[serde(default)]
    request_timeout_ms: Option<u64>,
}

fn default_client_json() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "baseUrl": DEFAULT_BASE_URL,
        "pollIntervalMs": DEFAULT_POLL_INTERVAL_MS,
        "tickIntervalMs": DEFAULT_TICK_INTERVAL_MS,
        "toastVisibleMs": DEFAULT_TOAST_VISIBLE_MS,
        "toastCooldownMs": DEFAULT_TOAST_COOLDOWN_MS,
        "requestTimeoutMs": null
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(CLIENT_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_client_json())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_client_config(config_dir: &Path) -> Result<ClientConfig, InfraError> {
    load_client_config_with_lookup(config_dir, |key| std::env::var(key).ok())
}

pub fn load_client_config_with_lookup<F>(config_dir: &Path, lookup: F) -> Result<ClientConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = config_dir.join(CLIENT_JSON);
    let raw = read_config(&path)?;
    let file: ClientConfigFile = serde_json::from_value(raw)?;

    let base_url = lookup(BASE_URL_ENV)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            file.base_url
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned)
        })
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let config = ClientConfig {
        poll_interval_ms: positive_or_default(file.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS),
        tick_interval_ms: positive_or_default(file.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS),
        toast_visible_ms: positive_or_default(file.toast_visible_ms, DEFAULT_TOAST_VISIBLE_MS),
        toast_cooldown_ms: file.toast_cooldown_ms.unwrap_or(DEFAULT_TOAST_COOLDOWN_MS),
        request_timeout_ms: file.request_timeout_ms.filter(|value| *value > 0),
        ..ClientConfig::with_base_url(parse_base_url(&base_url)?)
    };
    Ok(config)
}

pub fn parse_base_url(raw: &str) -> Result<Url, InfraError> {
    let url = Url::parse(raw.trim())
        .map_err(|error| InfraError::InvalidConfig(format!("baseUrl must be an absolute url: {error}")))?;
    if url.cannot_be_a_base() {
        return Err(InfraError::InvalidConfig(format!(
            "baseUrl cannot be used as a base: {raw}"
        )));
    }
    Ok(url)
}

fn positive_or_default(value: Option<u64>, default: u64) -> u64 {
    value.filter(|value| *value > 0).unwrap_or(default)
}
