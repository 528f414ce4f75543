// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Fleet hostname naming convention.
//!
//! Hostnames are built from fixed-width segments:
//!
//! ```text
//! cml  ue1  d  bl   01  a
//! │    │    │  │    │   └─ zone suffix (last character of the placement)
//! │    │    │  │    └───── two-digit instance number
//! │    │    │  └────────── application code (2-5 letters)
//! │    │    └───────────── environment code (one of the configured set)
//! │    └────────────────── location code (from the region table)
//! └─────────────────────── company code (3 letters)
//! ```
//!
//! A *full* hostname carries every segment. A *partial* hostname stops after the
//! application code and gets its number allocated by the reconciler.
//!
//! # Example
//!
//! ```rust
//! use hostwarden::config::NamingConfig;
//! use hostwarden::naming::{HostnameKind, NamingConvention};
//!
//! # fn example() -> hostwarden::errors::Result<()> {
//! let naming = NamingConvention::new(NamingConfig::default())?;
//! let placement = "us-east-1a".parse()?;
//!
//! assert_eq!(naming.classify("cmlue1dbl", &placement)?, HostnameKind::Partial);
//! assert_eq!(naming.first_number("cmlue1dbl", &placement)?, "cmlue1dbl01a");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use crate::config::NamingConfig;
use crate::constants::{
    ANY_ZONE_SUFFIX_PATTERN, INSTANCE_NUMBER_PATTERN, MAX_INSTANCE_NUMBER, TEST_COMPANY_CODE,
};
use crate::errors::{ReconcileError, Result};
use crate::types::Placement;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Whether a hostname carries its instance number and zone suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostnameKind {
    Full,
    Partial,
}

/// Zone-suffix scope of a sibling pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternScope {
    /// Only hostnames in the placement's own zone
    SameZone,
    /// Hostnames in any zone of the region
    CrossZone,
}

/// Hostname templates compiled from an injected [`NamingConfig`].
#[derive(Debug, Clone)]
pub struct NamingConvention {
    config: NamingConfig,
}

impl NamingConvention {
    /// Build a convention from its lookup tables.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidPattern`] if segment widths are inconsistent
    /// or the environment code set is empty or not lowercase letters.
    pub fn new(config: NamingConfig) -> Result<Self> {
        let invalid = |reason: &str| ReconcileError::InvalidPattern {
            pattern: "naming configuration".to_string(),
            reason: reason.to_string(),
        };

        if config.environment_codes.is_empty()
            || !config.environment_codes.chars().all(|c| c.is_ascii_lowercase())
        {
            return Err(invalid("environment codes must be lowercase letters"));
        }
        if config.company_code_min_len == 0
            || config.company_code_min_len > config.company_code_max_len
        {
            return Err(invalid("company code width range is empty"));
        }
        if config.application_code_min_len > config.application_code_max_len {
            return Err(invalid("application code width range is empty"));
        }

        Ok(Self { config })
    }

    /// Map a placement's region to its 3-character location code.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownRegion`] if the region is not in the table.
    pub fn location_code(&self, placement: &Placement) -> Result<&str> {
        self.config
            .locations
            .get(placement.region())
            .map(String::as_str)
            .ok_or_else(|| ReconcileError::UnknownRegion {
                region: placement.region().to_string(),
            })
    }

    /// Unanchored pattern for the company..application segments.
    fn prefix_pattern(&self, placement: &Placement) -> Result<String> {
        let location = regex::escape(self.location_code(placement)?);
        let c = &self.config;
        Ok(format!(
            "[a-z]{{{},{}}}{location}[{}][a-z]{{{},{}}}",
            c.company_code_min_len,
            c.company_code_max_len,
            c.environment_codes,
            c.application_code_min_len,
            c.application_code_max_len,
        ))
    }

    /// Template matching full hostnames valid for the placement.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is unknown.
    pub fn full_pattern(&self, placement: &Placement) -> Result<Regex> {
        let prefix = self.prefix_pattern(placement)?;
        compile(&format!(
            "^{prefix}{INSTANCE_NUMBER_PATTERN}{}$",
            placement.zone_suffix()
        ))
    }

    /// Template matching partial hostnames valid for the placement.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is unknown.
    pub fn partial_pattern(&self, placement: &Placement) -> Result<Regex> {
        let prefix = self.prefix_pattern(placement)?;
        compile(&format!("^{prefix}$"))
    }

    /// Classify a hostname as full or partial for the placement.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidHostname`] if it matches neither template,
    /// or [`ReconcileError::UnknownRegion`] if the placement's region is unknown.
    pub fn classify(&self, hostname: &str, placement: &Placement) -> Result<HostnameKind> {
        if self.full_pattern(placement)?.is_match(hostname) {
            debug!(hostname, %placement, "HostName is a full hostname");
            Ok(HostnameKind::Full)
        } else if self.partial_pattern(placement)?.is_match(hostname) {
            debug!(hostname, %placement, "HostName is a partial hostname");
            Ok(HostnameKind::Partial)
        } else {
            Err(ReconcileError::InvalidHostname {
                hostname: hostname.to_string(),
                placement: placement.to_string(),
            })
        }
    }

    /// Pattern matching every full hostname that shares this hostname's prefix.
    ///
    /// The instance number is wildcarded. With [`PatternScope::CrossZone`] the zone
    /// suffix is wildcarded too.
    ///
    /// # Errors
    ///
    /// Returns an error if the hostname is invalid for the placement.
    pub fn sibling_pattern(
        &self,
        hostname: &str,
        placement: &Placement,
        scope: PatternScope,
    ) -> Result<Regex> {
        let prefix = self.shared_prefix(hostname, placement)?;
        let zone = match scope {
            PatternScope::SameZone => placement.zone_suffix().to_string(),
            PatternScope::CrossZone => ANY_ZONE_SUFFIX_PATTERN.to_string(),
        };
        compile(&format!(
            "^{}{INSTANCE_NUMBER_PATTERN}{zone}$",
            regex::escape(prefix)
        ))
    }

    /// First full hostname for a hostname's prefix: number `01` in the placement's zone.
    ///
    /// # Errors
    ///
    /// Returns an error if the hostname is invalid for the placement.
    pub fn first_number(&self, hostname: &str, placement: &Placement) -> Result<String> {
        let prefix = self.shared_prefix(hostname, placement)?;
        Ok(format!("{prefix}01{}", placement.zone_suffix()))
    }

    /// Non-numeric prefix shared by a hostname and its siblings.
    fn shared_prefix<'a>(&self, hostname: &'a str, placement: &Placement) -> Result<&'a str> {
        match self.classify(hostname, placement)? {
            HostnameKind::Partial => Ok(hostname),
            // Full hostnames end in two ASCII digits and an ASCII letter
            HostnameKind::Full => Ok(&hostname[..hostname.len() - 3]),
        }
    }

    /// Allocate the lowest unused instance number among existing full hostnames.
    ///
    /// Candidates are sorted and walked in order; each one whose number equals the
    /// next expected value advances the counter, and the first gap wins. Numbers
    /// freed by deleted instances are therefore reused before the range grows.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NoCandidates`] for an empty set (use
    /// [`NamingConvention::first_number`] instead) and
    /// [`ReconcileError::NumberSpaceExhausted`] when 01-99 are all taken.
    pub fn next_number<S: AsRef<str>>(existing: &[S]) -> Result<String> {
        let mut names: Vec<&str> = existing.iter().map(AsRef::as_ref).collect();
        names.sort_unstable();
        names.dedup();

        let (prefix, _, suffix) = names
            .iter()
            .find_map(|name| split_instance_number(name))
            .ok_or(ReconcileError::NoCandidates)?;

        let mut expected = 1;
        for name in &names {
            match split_instance_number(name) {
                Some((_, number, _)) if number == expected => expected += 1,
                Some((_, number, _)) if number > expected => break,
                _ => {}
            }
        }

        if expected > MAX_INSTANCE_NUMBER {
            return Err(ReconcileError::NumberSpaceExhausted {
                prefix: prefix.to_string(),
            });
        }

        Ok(format!("{prefix}{expected:02}{suffix}"))
    }
}

/// Replace the leading company code with the test company code.
#[must_use]
pub fn test_hostname(hostname: &str) -> String {
    match hostname.get(TEST_COMPANY_CODE.len()..) {
        Some(rest) => format!("{TEST_COMPANY_CODE}{rest}"),
        None => hostname.to_string(),
    }
}

/// Split `<prefix><NN>[<letter>]` into its parts.
fn split_instance_number(name: &str) -> Option<(&str, u32, &str)> {
    let suffix_len = usize::from(name.ends_with(|c: char| c.is_ascii_lowercase()));
    let body = &name[..name.len() - suffix_len];
    let split = body.len().checked_sub(2)?;
    let digits = body.get(split..)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let number = digits.parse().ok()?;
    Some((body.get(..split)?, number, &name[body.len()..]))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ReconcileError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod naming_tests;
