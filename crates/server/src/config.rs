use std::{collections::HashMap, fs, time::Duration};

use anyhow::{anyhow, Context};
use url::Url;

pub const DEFAULT_FACTORY_LOCATIONS: [&str; 6] = [
    "Station A",
    "Station B",
    "Station C",
    "Main Warehouse",
    "Painting Booth",
    "Quality Control",
];

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub inventory_path: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_endpoint: String,
    pub gemini_timeout: Duration,
    pub factory_locations: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            inventory_path: "inventory.json".into(),
            gemini_api_key: None,
            gemini_model: "gemini-2.5-pro".into(),
            gemini_endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            gemini_timeout: Duration::from_secs(120),
            factory_locations: DEFAULT_FACTORY_LOCATIONS
                .iter()
                .map(|l| l.to_string())
                .collect(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("server.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            apply_file_settings(&mut settings, &file_cfg);
        }
    }

    if let Ok(v) = std::env::var("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Ok(v) = std::env::var("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Ok(v) = std::env::var("INVENTORY_PATH") {
        settings.inventory_path = v;
    }
    if let Ok(v) = std::env::var("APP__INVENTORY_PATH") {
        settings.inventory_path = v;
    }

    if let Ok(v) = std::env::var("GOOGLE_API_KEY") {
        settings.gemini_api_key = non_blank(v);
    }
    if let Ok(v) = std::env::var("APP__GEMINI_API_KEY") {
        settings.gemini_api_key = non_blank(v);
    }

    if let Ok(v) = std::env::var("APP__GEMINI_MODEL") {
        settings.gemini_model = v;
    }
    if let Ok(v) = std::env::var("APP__GEMINI_ENDPOINT") {
        settings.gemini_endpoint = v;
    }
    if let Ok(v) = std::env::var("APP__GEMINI_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.gemini_timeout = Duration::from_secs(parsed);
        }
    }

    if let Ok(v) = std::env::var("APP__FACTORY_LOCATIONS") {
        settings.factory_locations = split_locations(&v);
    }

    settings
}

fn apply_file_settings(settings: &mut Settings, file_cfg: &HashMap<String, String>) {
    if let Some(v) = file_cfg.get("bind_addr") {
        settings.server_bind = v.clone();
    }
    if let Some(v) = file_cfg.get("inventory_path") {
        settings.inventory_path = v.clone();
    }
    if let Some(v) = file_cfg.get("gemini_api_key") {
        settings.gemini_api_key = non_blank(v.clone());
    }
    if let Some(v) = file_cfg.get("gemini_model") {
        settings.gemini_model = v.clone();
    }
    if let Some(v) = file_cfg.get("gemini_endpoint") {
        settings.gemini_endpoint = v.clone();
    }
    if let Some(v) = file_cfg.get("factory_locations") {
        settings.factory_locations = split_locations(v);
    }
}

/// Comma separated, blanks dropped.
fn split_locations(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn normalize_endpoint(raw: &str) -> anyhow::Result<String> {
    let raw = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(raw).with_context(|| format!("invalid gemini endpoint '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!(
            "unsupported gemini endpoint scheme '{}'",
            parsed.scheme()
        ));
    }
    Ok(raw.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
