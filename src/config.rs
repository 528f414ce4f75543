// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Engine configuration.
//!
//! Configuration is read from an optional YAML file and then overridden by the
//! `PRUNE` and `TEST` environment variables. Every field has a default, so an
//! empty file (or no file at all) yields a working configuration.
//!
//! # Example
//!
//! ```yaml
//! prune: true
//! pollIntervalSecs: 5
//! naming:
//!   environmentCodes: "dps"
//!   locations:
//!     us-east-1: ue1
//! ```

use crate::change_applier::RetryPolicy;
use crate::constants::{
    DEFAULT_APPLICATION_CODE_MAX_LEN, DEFAULT_APPLICATION_CODE_MIN_LEN, DEFAULT_COMPANY_CODE_LEN,
    DEFAULT_ENVIRONMENT_CODES, DEFAULT_EVENT_DETAIL_TYPE, DEFAULT_EVENT_SOURCE,
    DEFAULT_HOSTNAME_TAG, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_RECORD_TTL_SECS, ENV_PRUNE, ENV_TEST,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Region → location code table used when no table is configured.
///
/// Keep codes in alphabetical order of region to better see conflicts.
const DEFAULT_LOCATIONS: &[(&str, &str)] = &[
    ("ap-east-1", "ae1"),
    ("ap-northeast-1", "an1"),
    ("ap-northeast-2", "an2"),
    ("ap-south-1", "id1"),
    ("ap-southeast-1", "as1"),
    ("ap-southeast-2", "as2"),
    ("ca-central-1", "cc1"),
    ("eu-central-1", "ec1"),
    ("eu-north-1", "en1"),
    ("eu-west-1", "ew1"),
    ("eu-west-2", "ew2"),
    ("eu-west-3", "ew3"),
    ("me-south-1", "ms1"),
    ("sa-east-1", "se1"),
    ("us-east-1", "ue1"),
    ("us-east-2", "ue2"),
    ("us-west-1", "uw1"),
    ("us-west-2", "uw2"),
];

/// Lookup tables and segment widths for the fleet hostname convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamingConfig {
    /// Region → 3-character location code. Regions missing here fail hard.
    pub locations: BTreeMap<String, String>,
    /// Characters accepted in the environment segment
    pub environment_codes: String,
    pub company_code_min_len: usize,
    pub company_code_max_len: usize,
    pub application_code_min_len: usize,
    pub application_code_max_len: usize,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            locations: DEFAULT_LOCATIONS
                .iter()
                .map(|(region, code)| ((*region).to_string(), (*code).to_string()))
                .collect(),
            environment_codes: DEFAULT_ENVIRONMENT_CODES.to_string(),
            company_code_min_len: DEFAULT_COMPANY_CODE_LEN,
            company_code_max_len: DEFAULT_COMPANY_CODE_LEN,
            application_code_min_len: DEFAULT_APPLICATION_CODE_MIN_LEN,
            application_code_max_len: DEFAULT_APPLICATION_CODE_MAX_LEN,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Run the orphan sweep after each termination
    pub prune: bool,
    /// Rewrite company codes to the test code and treat `stopped` as terminating
    pub test_mode: bool,
    /// Instance tag carrying the declared hostname
    pub hostname_tag: String,
    /// TTL for created records
    pub record_ttl: u32,
    pub poll_interval_secs: u64,
    pub poll_attempts: u32,
    /// Notification `source` accepted by the binary
    pub expected_source: String,
    /// Notification `detail-type` accepted by the binary
    pub expected_detail_type: String,
    pub naming: NamingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prune: false,
            test_mode: false,
            hostname_tag: DEFAULT_HOSTNAME_TAG.to_string(),
            record_ttl: DEFAULT_RECORD_TTL_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            expected_source: DEFAULT_EVENT_SOURCE.to_string(),
            expected_detail_type: DEFAULT_EVENT_DETAIL_TYPE.to_string(),
            naming: NamingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML for this schema.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).context("Failed to parse engine configuration")
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading engine configuration");
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&yaml)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Apply `PRUNE` / `TEST` overrides from the given variable lookup.
    ///
    /// A variable that is set replaces the file value, truthy or not.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_PRUNE) {
            self.prune = parse_boolean(&value);
        }
        if let Some(value) = lookup(ENV_TEST) {
            self.test_mode = parse_boolean(&value);
        }
        if self.test_mode {
            info!("Test mode enabled: hostname company codes are rewritten and stopped instances are treated as terminating");
        }
        self
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Synchronization poll policy derived from this configuration
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            attempts: self.poll_attempts,
        }
    }
}

/// Lenient boolean parse: `t`, `true`, `1`, `on`, `y`, `yes` (any case) are true.
#[must_use]
pub fn parse_boolean(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "t" | "true" | "1" | "on" | "y" | "yes"
    )
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
