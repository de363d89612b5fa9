use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Console preferences persisted between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "Config::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    /// Directory the JSON outbox writes to. Defaults to `<base>/outbox`.
    pub outbox_dir: Option<PathBuf>,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,
    #[serde(default)]
    pub accessibility: AccessibilitySettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_postcode: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::default_api_base_url(),
            request_timeout_secs: Self::default_request_timeout_secs(),
            outbox_dir: None,
            ui_color_enabled: Self::default_ui_color_enabled(),
            accessibility: AccessibilitySettings::default(),
            last_postcode: None,
        }
    }
}

impl Config {
    pub const KEYS: &'static [&'static str] = &[
        "api_base_url",
        "request_timeout_secs",
        "outbox_dir",
        "ui_color_enabled",
        "plain_output",
        "high_contrast",
        "last_postcode",
    ];

    pub fn default_api_base_url() -> String {
        "http://localhost:8000/api".into()
    }

    pub fn default_request_timeout_secs() -> u64 {
        30
    }

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn resolve_outbox_dir(&self, base: &Path) -> PathBuf {
        match &self.outbox_dir {
            Some(path) => path.clone(),
            None => base.join("outbox"),
        }
    }

    /// Setting name/value pairs in display order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let optional = |value: Option<String>| value.unwrap_or_else(|| "(not set)".into());
        vec![
            ("api_base_url", self.api_base_url.clone()),
            ("request_timeout_secs", self.request_timeout_secs.to_string()),
            (
                "outbox_dir",
                optional(self.outbox_dir.as_ref().map(|path| path.display().to_string())),
            ),
            ("ui_color_enabled", self.ui_color_enabled.to_string()),
            ("plain_output", self.accessibility.plain_output.to_string()),
            ("high_contrast", self.accessibility.high_contrast.to_string()),
            ("last_postcode", optional(self.last_postcode.clone())),
        ]
    }

    /// Updates one setting from its textual form. `none` clears optional
    /// settings.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let trimmed = value.trim();
        let cleared = trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none");
        match key.trim() {
            "api_base_url" => {
                if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                    return Err(invalid(key, "expected an http(s) URL"));
                }
                self.api_base_url = trimmed.trim_end_matches('/').to_string();
            }
            "request_timeout_secs" => {
                self.request_timeout_secs = trimmed
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| invalid(key, "expected a positive number of seconds"))?;
            }
            "outbox_dir" => {
                self.outbox_dir = (!cleared).then(|| PathBuf::from(trimmed));
            }
            "ui_color_enabled" => self.ui_color_enabled = parse_bool(key, trimmed)?,
            "plain_output" => self.accessibility.plain_output = parse_bool(key, trimmed)?,
            "high_contrast" => self.accessibility.high_contrast = parse_bool(key, trimmed)?,
            "last_postcode" => {
                self.last_postcode = (!cleared).then(|| trimmed.to_ascii_uppercase());
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, "expected true or false")),
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibilitySettings {
    #[serde(default)]
    pub plain_output: bool,
    #[serde(default)]
    pub high_contrast: bool,
}
