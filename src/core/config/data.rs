use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_SHARE_DOMAIN: &str = "devochat.com";
/// Classes marking per-message controls and copy buttons in captured content.
pub const DEFAULT_SANITIZE_CLASSES: &[&str] = &["message-function", "copy-button"];
pub const API_URL_ENV: &str = "DEVOCHAT_API_URL";

/// Starting values for new sessions. Out-of-range values are clamped on use.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct ParameterDefaults {
    pub temperature: Option<f64>,
    pub reason: Option<f64>,
    pub verbosity: Option<f64>,
    pub memory: Option<i64>,
}

impl ParameterDefaults {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Base URL of the chat service API
    pub api_base_url: Option<String>,
    /// Domain whose `share.` host serves published snapshots
    pub share_domain: Option<String>,
    /// Element classes removed from snapshot captures
    pub sanitize_classes: Option<Vec<String>>,
    /// Model selected for new sessions
    pub default_model: Option<String>,
    #[serde(default, skip_serializing_if = "ParameterDefaults::is_empty")]
    pub parameters: ParameterDefaults,
}

impl Config {
    /// API base URL; the environment override wins over the file.
    pub fn api_base_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn share_domain(&self) -> &str {
        self.share_domain.as_deref().unwrap_or(DEFAULT_SHARE_DOMAIN)
    }

    pub fn sanitize_classes(&self) -> Vec<String> {
        match &self.sanitize_classes {
            Some(classes) => classes.clone(),
            None => DEFAULT_SANITIZE_CLASSES
                .iter()
                .map(|class| class.to_string())
                .collect(),
        }
    }

    /// Apply a `key = value` assignment from the command line.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        let parse_float = |value: &str| {
            value
                .parse::<f64>()
                .map_err(|_| format!("Invalid number for {key}: {value}"))
        };
        match key {
            "api-base-url" => self.api_base_url = Some(value.to_string()),
            "share-domain" => self.share_domain = Some(value.to_string()),
            "default-model" => self.default_model = Some(value.to_string()),
            "sanitize-classes" => {
                self.sanitize_classes = Some(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|class| !class.is_empty())
                        .map(str::to_string)
                        .collect(),
                )
            }
            "temperature" => self.parameters.temperature = Some(parse_float(value)?),
            "reason" => self.parameters.reason = Some(parse_float(value)?),
            "verbosity" => self.parameters.verbosity = Some(parse_float(value)?),
            "memory" => {
                self.parameters.memory = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| format!("Invalid number for {key}: {value}"))?,
                )
            }
            _ => return Err(format!("Unknown config key: {key}")),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "api-base-url" => self.api_base_url = None,
            "share-domain" => self.share_domain = None,
            "default-model" => self.default_model = None,
            "sanitize-classes" => self.sanitize_classes = None,
            "temperature" => self.parameters.temperature = None,
            "reason" => self.parameters.reason = None,
            "verbosity" => self.parameters.verbosity = None,
            "memory" => self.parameters.memory = None,
            _ => return Err(format!("Unknown config key: {key}")),
        }
        Ok(())
    }

    pub fn print_all(&self) {
        fn show<T: std::fmt::Display>(value: &Option<T>) -> String {
            value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "(unset)".to_string())
        }
        println!("api-base-url: {}", self.api_base_url());
        println!("share-domain: {}", self.share_domain());
        println!("sanitize-classes: {}", self.sanitize_classes().join(", "));
        println!("default-model: {}", show(&self.default_model));
        println!("temperature: {}", show(&self.parameters.temperature));
        println!("reason: {}", show(&self.parameters.reason));
        println!("verbosity: {}", show(&self.parameters.verbosity));
        println!("memory: {}", show(&self.parameters.memory));
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
