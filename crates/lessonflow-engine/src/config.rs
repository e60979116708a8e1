//! Configuration types for lesson flow tooling.
//!
//! Configuration is read from `lessonflow.json`. Every field has a default,
//! unknown fields are ignored, and the loaded values are validated before
//! use.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::matcher::{default_keyword_groups, KeywordGroup};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "lessonflow.json";

/// Default record snapshot path.
fn default_store() -> String {
    "lessons.json".to_string()
}

/// Default output directory for audit reports.
fn default_output_dir() -> String {
    ".".to_string()
}

/// Default audit report base name (without extension).
fn default_report_name() -> String {
    "lesson-flow-audit".to_string()
}

/// Default port for the HTTP endpoints.
const fn default_port() -> u16 {
    3000
}

/// Order keys at or above this value are treated as corrupted.
const fn default_corrupted_order_threshold() -> i64 {
    500
}

/// Shared normalized title words that mark two exercises as duplicates.
const fn default_min_shared_title_words() -> usize {
    2
}

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Path to the record snapshot.
    #[serde(default = "default_store")]
    pub store: String,

    /// Output directory for audit reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Base file name for audit reports.
    #[serde(default = "default_report_name")]
    pub report_name: String,

    /// Port for `lessonflow serve`.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Placement validator tuning.
    #[serde(default)]
    pub validator: ValidatorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: default_store(),
            output_dir: default_output_dir(),
            report_name: default_report_name(),
            port: default_port(),
            validator: ValidatorConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `lessonflow.json`; returns defaults if it is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            FlowError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `lessonflow.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is invalid.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ConfigParseError` if the file contains invalid
    /// JSON and `FlowError::ConfigValidationError` if a value is invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(FlowError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| FlowError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ConfigValidationError` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.store.trim().is_empty() {
            return Err(FlowError::config_validation(
                "store path must not be empty",
                "Provide the path of the record snapshot in the 'store' field of your lessonflow.json",
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(FlowError::config_validation(
                "outputDir must not be empty",
                "Provide a valid output directory path in your lessonflow.json (use '.' for current directory)",
            ));
        }

        if self.report_name.trim().is_empty() {
            return Err(FlowError::config_validation(
                "reportName must not be empty",
                "Set reportName to a file name without extension, e.g. 'lesson-flow-audit'",
            ));
        }

        self.validator.validate()
    }
}

/// Tuning for the placement validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorConfig {
    /// Exercise order keys at or above this value are reported as corrupted.
    #[serde(default = "default_corrupted_order_threshold")]
    pub corrupted_order_threshold: i64,

    /// Minimum shared normalized title words for two exercises to be duplicates.
    #[serde(default = "default_min_shared_title_words")]
    pub min_shared_title_words: usize,

    /// Ranked topic groups for context matching; the first match wins.
    #[serde(default = "default_keyword_groups")]
    pub keyword_groups: Vec<KeywordGroup>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            corrupted_order_threshold: default_corrupted_order_threshold(),
            min_shared_title_words: default_min_shared_title_words(),
            keyword_groups: default_keyword_groups(),
        }
    }
}

impl ValidatorConfig {
    /// Validates the validator settings.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::ConfigValidationError` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.corrupted_order_threshold <= 0 {
            return Err(FlowError::config_validation(
                "validator.corruptedOrderThreshold must be greater than 0",
                "Set validator.corruptedOrderThreshold above the largest legitimate order key (default 500)",
            ));
        }

        if self.min_shared_title_words == 0 {
            return Err(FlowError::config_validation(
                "validator.minSharedTitleWords must be at least 1",
                "Set validator.minSharedTitleWords to 1 or more in your lessonflow.json (default 2)",
            ));
        }

        if self.keyword_groups.is_empty() {
            return Err(FlowError::config_validation(
                "validator.keywordGroups must not be empty",
                "Remove validator.keywordGroups to use the built-in topic groups",
            ));
        }

        for group in &self.keyword_groups {
            if group.keywords.is_empty() || group.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(FlowError::config_validation(
                    format!(
                        "validator.keywordGroups entry '{}' has no usable keywords",
                        group.name
                    ),
                    "Give every keyword group at least one non-blank keyword",
                ));
            }
        }

        Ok(())
    }
}
