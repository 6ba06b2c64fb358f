use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::KeywordTable;
use crate::error::AppError;
pub use crate::normalize::timestamps::TimezonePolicy;

pub const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 30_000;

/// Settings for month bucketing, event classification and the generation deadline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ActivityLogConfig {
    pub timezone: TimezonePolicy,
    pub keywords: KeywordTable,
    pub generation_timeout_ms: u64,
}

impl Default for ActivityLogConfig {
    fn default() -> Self {
        Self {
            timezone: TimezonePolicy::default(),
            keywords: KeywordTable::default(),
            generation_timeout_ms: DEFAULT_GENERATION_TIMEOUT_MS,
        }
    }
}

impl ActivityLogConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        self.keywords.validate()?;
        if self.generation_timeout_ms == 0 {
            return Err(AppError::new(
                "CONFIG_INVALID",
                "generation_timeout_ms must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }
}

/// Load a JSON config file. A missing file yields defaults; anything unreadable or invalid
/// is a `CONFIG_INVALID` error.
pub fn load_config(path: &Path) -> Result<ActivityLogConfig, AppError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found; using defaults");
        return Ok(ActivityLogConfig::default());
    }

    let text = std::fs::read_to_string(path).map_err(|e| {
        AppError::new("CONFIG_READ_FAILED", "Failed to read config file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;

    let cfg: ActivityLogConfig = serde_json::from_str(&text).map_err(|e| {
        AppError::new("CONFIG_INVALID", "Config file is not valid JSON for this schema")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    cfg.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::EventKind;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&dir.path().join("nope.json")).expect("load");
        assert_eq!(cfg, ActivityLogConfig::default());
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("activity_log.json");
        std::fs::write(
            &path,
            r#"{ "timezone": { "mode": "fixed_offset", "hours": 9, "minutes": 30 } }"#,
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.timezone, TimezonePolicy::fixed_offset(9, 30).expect("offset"));
        assert_eq!(cfg.generation_timeout_ms, DEFAULT_GENERATION_TIMEOUT_MS);
        assert_eq!(cfg.keywords.rules[0].kind, EventKind::Dispatch);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("activity_log.json");
        std::fs::write(&path, r#"{ "generation_timeout_ms": 0 }"#).expect("write");
        assert_eq!(load_config(&path).expect_err("invalid").code, "CONFIG_INVALID");

        std::fs::write(
            &path,
            r#"{ "timezone": { "mode": "fixed_offset", "hours": 30, "minutes": 0 } }"#,
        )
        .expect("write");
        assert_eq!(load_config(&path).expect_err("offset").code, "CONFIG_INVALID");

        std::fs::write(&path, "not json").expect("write");
        assert_eq!(load_config(&path).expect_err("invalid").code, "CONFIG_INVALID");
    }
}
