use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use url::Url;

use crate::backend::CallPolicy;

pub const DEFAULT_SETTINGS_FILE: &str = "operator.toml";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub server_url: String,
    pub request_timeout: Duration,
    pub read_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            request_timeout: Duration::from_secs(30),
            read_attempts: 2,
            retry_delay: Duration::from_millis(500),
        }
    }
}

impl ClientSettings {
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: self.request_timeout,
            read_attempts: self.read_attempts,
            retry_delay: self.retry_delay,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
    read_attempts: Option<u32>,
    retry_delay_ms: Option<u64>,
}

/// Defaults, then `operator.toml` (or `path`), then `APP__*` environment overrides.
pub fn load_client_settings(path: Option<&Path>) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    let path = path.unwrap_or_else(|| Path::new(DEFAULT_SETTINGS_FILE));
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_settings(&mut settings, &raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
    }

    if let Ok(v) = std::env::var("APP__SERVER_URL") {
        settings.server_url = v;
    }
    if let Ok(v) = std::env::var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout = Duration::from_secs(parsed);
        }
    }
    if let Ok(v) = std::env::var("APP__READ_ATTEMPTS") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.read_attempts = parsed;
        }
    }
    if let Ok(v) = std::env::var("APP__RETRY_DELAY_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.retry_delay = Duration::from_millis(parsed);
        }
    }

    settings.server_url = normalize_server_url(&settings.server_url)?;
    Ok(settings)
}

fn apply_file_settings(settings: &mut ClientSettings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout = Duration::from_secs(v);
    }
    if let Some(v) = file_cfg.read_attempts {
        settings.read_attempts = v;
    }
    if let Some(v) = file_cfg.retry_delay_ms {
        settings.retry_delay = Duration::from_millis(v);
    }
    Ok(())
}

pub fn normalize_server_url(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(ClientSettings::default().server_url);
    }

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let parsed =
        Url::parse(&with_scheme).with_context(|| format!("invalid server url '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!("unsupported server url scheme '{}'", parsed.scheme()));
    }

    Ok(with_scheme.trim_end_matches('/').to_string())
}
