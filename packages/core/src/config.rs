//! Session configuration
//!
//! Timing and retry knobs for page sessions. Every field has a default, so a
//! partial JSON document only overrides what it names.

use crate::models::DEFAULT_PAGE_TITLE;
use crate::services::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period before a content save is issued
    pub save_debounce_ms: u64,

    /// Quiet period before a renamed page gets its new slug
    pub slug_debounce_ms: u64,

    /// Total load attempts, including the first
    pub load_max_attempts: u32,

    /// Linear backoff unit: the wait after attempt `n` is `n * base`
    pub load_backoff_base_ms: u64,

    /// Title given to pages created without one
    pub default_title: String,

    pub event_channel_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            save_debounce_ms: 1000,
            slug_debounce_ms: 1000,
            load_max_attempts: 3,
            load_backoff_base_ms: 1000,
            default_title: DEFAULT_PAGE_TITLE.to_string(),
            event_channel_capacity: 64,
        }
    }
}

impl SessionConfig {
    /// Parse overrides from JSON, filling the rest with defaults
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| format!("Invalid session config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.load_max_attempts == 0 {
            return Err("load_max_attempts must be greater than 0".to_string());
        }

        if self.event_channel_capacity == 0 {
            return Err("event_channel_capacity must be greater than 0".to_string());
        }

        if self.default_title.trim().is_empty() {
            return Err("default_title cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    pub fn slug_debounce(&self) -> Duration {
        Duration::from_millis(self.slug_debounce_ms)
    }

    pub fn load_backoff_base(&self) -> Duration {
        Duration::from_millis(self.load_backoff_base_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.load_max_attempts, self.load_backoff_base())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.save_debounce(), Duration::from_millis(1000));
        assert_eq!(config.default_title, "Untitled");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SessionConfig::from_json_str(r#"{"save_debounce_ms": 250}"#).unwrap();
        assert_eq!(config.save_debounce_ms, 250);
        assert_eq!(config.slug_debounce_ms, 1000);
        assert_eq!(config.load_max_attempts, 3);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = SessionConfig {
            load_max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            default_title: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(SessionConfig::from_json_str(r#"{"event_channel_capacity": 0}"#).is_err());
        assert!(SessionConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = SessionConfig::default().retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(2), Duration::from_millis(2000));
    }
}
