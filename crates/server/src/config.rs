use std::{collections::HashMap, fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use server_api::Venue;
use shared::domain::ChatId;
use storage::Catalog;
use transport::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_bind: String,
    pub bot_api_url: String,
    pub bot_token: Option<String>,
    pub staff_chat_id: Option<i64>,
    pub catalog_path: Option<PathBuf>,
    pub venue_name: String,
    pub currency: String,
    pub notify_max_attempts: u32,
    pub notify_base_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            bot_api_url: "https://api.telegram.org".into(),
            bot_token: None,
            staff_chat_id: None,
            catalog_path: None,
            venue_name: "Playground Lounge".into(),
            currency: "ETB".into(),
            notify_max_attempts: 3,
            notify_base_delay_ms: 1000,
        }
    }
}

impl Settings {
    pub fn staff_chat(&self) -> anyhow::Result<ChatId> {
        self.staff_chat_id
            .map(ChatId)
            .ok_or_else(|| anyhow!("staff chat id is not configured; set GROUP_ID"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.notify_max_attempts,
            Duration::from_millis(self.notify_base_delay_ms),
        )
    }

    pub fn venue(&self) -> Venue {
        Venue {
            name: self.venue_name.clone(),
            currency: self.currency.clone(),
        }
    }

    pub fn load_catalog(&self) -> anyhow::Result<Catalog> {
        match &self.catalog_path {
            Some(path) => Catalog::load(path)
                .with_context(|| format!("failed to load catalog from '{}'", path.display())),
            None => Ok(Catalog::default_menu()),
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new("server.toml"), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `key = "value"` file, then environment. Each
/// setting accepts a plain variable and an `APP__` prefixed one; the prefixed
/// one wins.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            for (key, value) in &file_cfg {
                apply(&mut settings, key, value);
            }
        }
    }

    for (key, plain) in [
        ("bind_addr", "SERVER_BIND"),
        ("bot_api_url", "BOT_API_URL"),
        ("bot_token", "BOT_TOKEN"),
        ("staff_chat_id", "GROUP_ID"),
        ("catalog_path", "CATALOG_PATH"),
        ("venue_name", "VENUE_NAME"),
        ("currency", "CURRENCY"),
        ("notify_max_attempts", "NOTIFY_MAX_ATTEMPTS"),
        ("notify_base_delay_ms", "NOTIFY_BASE_DELAY_MS"),
    ] {
        if let Some(v) = env(plain) {
            apply(&mut settings, key, &v);
        }
        if let Some(v) = env(&format!("APP__{}", key.to_ascii_uppercase())) {
            apply(&mut settings, key, &v);
        }
    }

    settings
}

fn apply(settings: &mut Settings, key: &str, value: &str) {
    let value = value.trim();
    match key {
        "bind_addr" => settings.server_bind = value.to_string(),
        "bot_api_url" => settings.bot_api_url = value.to_string(),
        "bot_token" => settings.bot_token = non_empty(value),
        "staff_chat_id" => {
            if let Ok(parsed) = value.parse::<i64>() {
                settings.staff_chat_id = Some(parsed);
            }
        }
        "catalog_path" => settings.catalog_path = non_empty(value).map(PathBuf::from),
        "venue_name" => settings.venue_name = value.to_string(),
        "currency" => settings.currency = value.to_string(),
        "notify_max_attempts" => {
            if let Ok(parsed) = value.parse::<u32>() {
                settings.notify_max_attempts = parsed;
            }
        }
        "notify_base_delay_ms" => {
            if let Ok(parsed) = value.parse::<u64>() {
                settings.notify_base_delay_ms = parsed;
            }
        }
        _ => {}
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
