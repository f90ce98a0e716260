use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::BaselineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditDispatch {
    /// Append after the primary commit, in the caller's task, bounded by
    /// `append_timeout_ms`.
    Inline,
    /// Queue to a background dispatcher.
    Outbox,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    Database,
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub enabled: bool,
    pub dispatch: AuditDispatch,
    pub sink: AuditSinkKind,
    pub log_path: PathBuf,
    pub append_timeout_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dispatch: AuditDispatch::Outbox,
            sink: AuditSinkKind::Database,
            log_path: PathBuf::from("audit/integrity.jsonl"),
            append_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub log_filter: String,
    pub audit: AuditConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://budget-baseline.db".to_string(),
            log_filter: "budget_baseline=info".to_string(),
            audit: AuditConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the optional file, then `BASELINE__*` environment
    /// variables (e.g. `BASELINE__AUDIT__SINK=jsonl`).
    pub fn load(path: Option<&str>) -> Result<Self, BaselineError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        builder = builder.add_source(
            config::File::with_name(path.unwrap_or("baseline")).required(path.is_some()),
        );

        builder = builder.add_source(
            config::Environment::with_prefix("BASELINE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BaselineError> {
        if !self.database_url.starts_with("sqlite:") {
            return Err(BaselineError::ConfigError(format!(
                "database_url must be a sqlite URL, got {}",
                self.database_url
            )));
        }
        if self.audit.enabled
            && self.audit.sink == AuditSinkKind::Jsonl
            && self.audit.log_path.as_os_str().is_empty()
        {
            return Err(BaselineError::ConfigError(
                "audit.log_path is required for the jsonl sink".to_string(),
            ));
        }
        if self.audit.append_timeout_ms == 0 {
            return Err(BaselineError::ConfigError(
                "audit.append_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, BaselineError> {
        toml::to_string_pretty(self).map_err(|e| BaselineError::SerializationError(e.to_string()))
    }
}
