use std::{fs, path::Path, time::Duration};

use mutation_engine::MutationOptions;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server_url: String,
    pub resource: String,
    pub request_timeout_secs: u64,
    pub engine: MutationOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:3000".into(),
            resource: "api/items".into(),
            request_timeout_secs: 15,
            engine: MutationOptions::default(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// File values first, then environment overrides.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = read_settings_file(path);
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    settings
}

fn read_settings_file(path: &Path) -> Settings {
    let Ok(raw) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match toml::from_str::<Settings>(&raw) {
        Ok(settings) => settings,
        Err(error) => {
            warn!(path = %path.display(), %error, "config: ignoring unreadable settings file");
            Settings::default()
        }
    }
}

pub(crate) fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ADMIN_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("APP__RESOURCE") {
        settings.resource = v;
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(_) => warn!(value = %v, "config: APP__REQUEST_TIMEOUT_SECS is not a number"),
        }
    }

    if let Some(v) = lookup("APP__ID_FIELD") {
        settings.engine.id_field = v;
    }
    if let Some(v) = lookup("APP__TEMP_ID_PREFIX") {
        settings.engine.temp_id_prefix = v;
    }
    if let Some(v) = lookup("APP__ENTITY_LABEL") {
        settings.engine.entity_label = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
