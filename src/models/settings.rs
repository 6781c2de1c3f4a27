//! Settings Models
//!
//! Application configuration and settings data structures.
//! The API credential is never part of the config file; it comes from the
//! environment at startup.

use politisight_core::ProxyConfig;
use serde::{Deserialize, Serialize};

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model used for report generation
    pub model: String,
    /// Model used for the side chat
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    /// Sampling temperature for reports (kept low for factual output)
    #[serde(default = "default_report_temperature")]
    pub report_temperature: f32,
    /// Sampling temperature for chat replies
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,
    /// Upper bound on generated tokens per request
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Ground reports with Google Search
    #[serde(default = "default_true")]
    pub enable_search: bool,
    /// Override for the Generative Language API endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Outbound proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

fn default_chat_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_report_temperature() -> f32 {
    0.2
}

fn default_chat_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            chat_model: default_chat_model(),
            report_temperature: default_report_temperature(),
            chat_temperature: default_chat_temperature(),
            max_output_tokens: default_max_output_tokens(),
            enable_search: true,
            base_url: None,
            proxy: None,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub model: Option<String>,
    pub chat_model: Option<String>,
    pub report_temperature: Option<f32>,
    pub chat_temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub enable_search: Option<bool>,
    /// An empty string clears the override
    pub base_url: Option<String>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(model) = update.model {
            self.model = model;
        }
        if let Some(chat_model) = update.chat_model {
            self.chat_model = chat_model;
        }
        if let Some(temperature) = update.report_temperature {
            self.report_temperature = temperature;
        }
        if let Some(temperature) = update.chat_temperature {
            self.chat_temperature = temperature;
        }
        if let Some(max) = update.max_output_tokens {
            self.max_output_tokens = max;
        }
        if let Some(enabled) = update.enable_search {
            self.enable_search = enabled;
        }
        if let Some(base_url) = update.base_url {
            self.base_url = if base_url.trim().is_empty() {
                None
            } else {
                Some(base_url)
            };
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.chat_model.trim().is_empty() {
            return Err("chat_model must not be empty".to_string());
        }

        for (name, value) in [
            ("report_temperature", self.report_temperature),
            ("chat_temperature", self.chat_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 2.0, got {}", name, value));
            }
        }

        if !(256..=65536).contains(&self.max_output_tokens) {
            return Err(format!(
                "max_output_tokens must be between 256 and 65536, got {}",
                self.max_output_tokens
            ));
        }

        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("Invalid base_url: {}", url));
            }
        }

        if let Some(proxy) = &self.proxy {
            proxy.validate()?;
        }

        Ok(())
    }
}
