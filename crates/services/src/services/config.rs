//! Shop-wide settings persisted as a JSON file next to the database.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use ts_rs::TS;
use validator::{Validate, ValidationError};

use super::validation::ValidationErrors;

static INVOICE_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("invoice prefix pattern is valid"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(length(max = 120), custom(function = "not_blank"))]
    pub shop_name: String,
    /// Used when an invoice is generated without an explicit rate.
    #[validate(range(min = 0, max = 1_000_000))]
    pub default_hourly_rate_cents: i64,
    #[validate(range(min = 0, max = 365))]
    pub invoice_due_days: i64,
    #[validate(
        length(min = 1, max = 16),
        regex(
            path = *INVOICE_PREFIX_RE,
            message = "The invoice prefix may only contain letters and digits."
        )
    )]
    pub invoice_prefix: String,
    /// Reorder level given to parts created without one.
    #[validate(range(min = 0))]
    pub low_stock_threshold: i64,
    #[validate(range(min = 15, max = 480))]
    pub default_appointment_minutes: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shop_name: "Motorcycle Repair Shop".to_string(),
            default_hourly_rate_cents: 8_500,
            invoice_due_days: 14,
            invoice_prefix: "INV".to_string(),
            low_stock_threshold: 5,
            default_appointment_minutes: 60,
        }
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required"))
    } else {
        Ok(())
    }
}

/// Read the config at `path`. A missing file yields the defaults.
pub async fn load_config_from_file(path: &Path) -> Result<Config, ConfigError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => {
            let config: Config = serde_json::from_str(&raw)?;
            if let Err(errors) = ValidationErrors::of(&config).into_result() {
                warn!(path = %path.display(), ?errors, "Config file has invalid values, using defaults");
                return Ok(Config::default());
            }
            Ok(config)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn save_config_to_file(config: &Config, path: &Path) -> Result<(), ConfigError> {
    ValidationErrors::of(config).into_result()?;
    let raw = serde_json::to_string_pretty(config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, raw).await?;
    info!(path = %path.display(), "Config saved");
    Ok(())
}

pub fn config_path(raw: Option<String>) -> PathBuf {
    PathBuf::from(raw.unwrap_or_else(|| "config.json".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from_file(&dir.path().join("absent.json"))
            .await
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            shop_name: "Two Wheels Garage".to_string(),
            default_hourly_rate_cents: 9_900,
            ..Config::default()
        };

        save_config_to_file(&config, &path).await.unwrap();
        assert_eq!(load_config_from_file(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"invoice_due_days": 30}"#)
            .await
            .unwrap();

        let config = load_config_from_file(&path).await.unwrap();
        assert_eq!(config.invoice_due_days, 30);
        assert_eq!(config.invoice_prefix, "INV");
    }

    #[tokio::test]
    async fn test_invalid_config_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = Config {
            invoice_prefix: "IN V".to_string(),
            ..Config::default()
        };

        let err = save_config_to_file(&config, &path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref v) if v.has("invoice_prefix")));
        assert!(!path.exists());
    }

    #[test]
    fn test_blank_shop_name_is_rejected() {
        let config = Config {
            shop_name: "   ".to_string(),
            invoice_due_days: 400,
            ..Config::default()
        };
        let errors = ValidationErrors::of(&config);
        assert_eq!(errors.field_names(), vec!["invoice_due_days", "shop_name"]);
        assert_eq!(
            errors.fields["shop_name"],
            vec!["The shop name field is required.".to_string()]
        );
    }
}
