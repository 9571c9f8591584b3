//! Settings Models
//!
//! Application configuration and settings data structures.

use mint_ai_core::SessionMode;
use mint_ai_llm::{
    RetryPolicy,
    retry::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest trailing window the plan parser may keep.
pub const MIN_PLAN_BUFFER_WINDOW: usize = 64;

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the generation service
    pub backend_url: String,
    /// Path of the streaming generation endpoint, joined onto `backend_url`
    #[serde(default = "default_generate_path")]
    pub generate_path: String,
    /// Mode used when a command does not specify one
    #[serde(default)]
    pub default_mode: SessionMode,
    /// Connection setup timeout; streamed bodies are never timed out
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Retry policy for the initial request
    #[serde(default)]
    pub retry: RetryConfig,
    /// Trailing characters the plan parser keeps between chunks
    #[serde(default = "default_plan_buffer_window")]
    pub plan_buffer_window: usize,
    /// Enable debug mode
    #[serde(default)]
    pub debug_mode: bool,
}

/// Retry settings for the initial generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

fn default_generate_path() -> String {
    "/api/generate".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_plan_buffer_window() -> usize {
    500
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3000".to_string(),
            generate_path: default_generate_path(),
            default_mode: SessionMode::default(),
            connect_timeout_secs: default_connect_timeout(),
            retry: RetryConfig::default(),
            plan_buffer_window: default_plan_buffer_window(),
            debug_mode: false,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub backend_url: Option<String>,
    pub generate_path: Option<String>,
    pub default_mode: Option<SessionMode>,
    pub connect_timeout_secs: Option<u64>,
    pub retry: Option<RetryConfig>,
    pub plan_buffer_window: Option<usize>,
    pub debug_mode: Option<bool>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(url) = update.backend_url {
            self.backend_url = url;
        }
        if let Some(path) = update.generate_path {
            self.generate_path = path;
        }
        if let Some(mode) = update.default_mode {
            self.default_mode = mode;
        }
        if let Some(timeout) = update.connect_timeout_secs {
            self.connect_timeout_secs = timeout;
        }
        if let Some(retry) = update.retry {
            self.retry = retry;
        }
        if let Some(window) = update.plan_buffer_window {
            self.plan_buffer_window = window;
        }
        if let Some(debug) = update.debug_mode {
            self.debug_mode = debug;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.backend_url.trim().is_empty() {
            return Err("backend_url must not be empty".to_string());
        }

        if self.connect_timeout_secs < 1 {
            return Err("connect_timeout_secs must be at least 1 second".to_string());
        }

        if !(1..=10).contains(&self.retry.max_attempts) {
            return Err(format!(
                "retry.max_attempts must be between 1 and 10, got {}",
                self.retry.max_attempts
            ));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err("retry.base_delay_ms cannot exceed retry.max_delay_ms".to_string());
        }

        if self.plan_buffer_window < MIN_PLAN_BUFFER_WINDOW {
            return Err(format!(
                "plan_buffer_window must be at least {MIN_PLAN_BUFFER_WINDOW} characters"
            ));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
