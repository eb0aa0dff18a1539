use serde::Deserialize;
use std::time::Duration;

use crate::error::SyncError;

/// Engine tuning. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Quiet period before the tree is rebuilt.
    pub refresh_debounce_ms: u64,
    /// Quiet period before the text is re-highlighted.
    pub highlight_debounce_ms: u64,
    /// Spaces per level when formatting.
    pub indent: usize,
    /// Max chars of a string value shown in a tree label.
    pub label_preview_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_debounce_ms: 400,
            highlight_debounce_ms: 300,
            indent: 4,
            label_preview_limit: 120,
        }
    }
}

impl SyncConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, SyncError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(SyncError::Config)
    }

    pub fn refresh_debounce(&self) -> Duration {
        Duration::from_millis(self.refresh_debounce_ms)
    }

    pub fn highlight_debounce(&self) -> Duration {
        Duration::from_millis(self.highlight_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = SyncConfig::from_json_str(r#"{"refresh_debounce_ms": 50}"#).unwrap();
        assert_eq!(config.refresh_debounce(), Duration::from_millis(50));
        assert_eq!(config.highlight_debounce(), Duration::from_millis(300));
        assert_eq!(config.indent, 4);
        assert_eq!(SyncConfig::from_json_str("").unwrap(), SyncConfig::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = SyncConfig::from_json_str(r#"{"refresh_ms": 1}"#).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
