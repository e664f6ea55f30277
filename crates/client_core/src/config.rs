use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::protocol::{DEFAULT_BACKEND_URL, REQUESTED_WITH_VALUE};
use url::Url;

pub const CONFIG_FILE_NAME: &str = "image_lab.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub backend_url: String,
    /// Value sent in `X-Requested-With`; `None` omits the header.
    pub requested_with: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.into(),
            requested_with: Some(REQUESTED_WITH_VALUE.into()),
        }
    }
}

/// Defaults, then the first config file found, then environment overrides.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    for path in config_file_candidates() {
        if let Ok(raw) = fs::read_to_string(&path) {
            tracing::debug!(path = %path.display(), "loading settings file");
            apply_file_overrides(&mut settings, &raw);
            break;
        }
    }

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings
}

fn config_file_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("image_lab").join("config.toml"));
    }
    candidates
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) else {
        tracing::warn!("ignoring malformed settings file");
        return;
    };
    if let Some(v) = file_cfg.get("backend_url") {
        settings.backend_url = v.clone();
    }
    if let Some(v) = file_cfg.get("requested_with") {
        settings.requested_with = non_empty(v);
    }
}

fn apply_env_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = lookup("APP__BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = lookup("APP__REQUESTED_WITH_HEADER") {
        settings.requested_with = non_empty(&v);
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl Settings {
    pub fn with_backend_url(mut self, backend_url: Option<String>) -> Self {
        if let Some(url) = backend_url {
            self.backend_url = url;
        }
        self
    }

    /// Parsed endpoint; only http and https are accepted.
    pub fn endpoint(&self) -> anyhow::Result<Url> {
        let raw = self.backend_url.trim();
        let url = Url::parse(raw).with_context(|| format!("invalid backend url '{raw}'"))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("backend url '{raw}' must use http or https");
        }
        Ok(url)
    }
}

/// Reads a settings file at an explicit path, failing loudly.
pub fn load_settings_from(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, &raw);
    Ok(settings)
}
