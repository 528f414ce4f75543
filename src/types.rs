// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Core data types shared by the reconciliation engine and its collaborators.

use crate::errors::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Location designator of a compute instance: a region plus a one-letter zone suffix.
///
/// `us-east-1a` splits into region `us-east-1` and zone suffix `a`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Placement {
    region: String,
    zone: char,
}

impl Placement {
    /// Region portion of the placement (everything but the zone suffix)
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Zone suffix: always the last character of the placement identifier
    #[must_use]
    pub fn zone_suffix(&self) -> char {
        self.zone
    }
}

impl FromStr for Placement {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| ReconcileError::InvalidPlacement {
            placement: s.to_string(),
            reason: reason.to_string(),
        };

        let zone = s.chars().last().ok_or_else(|| invalid("empty"))?;
        if !zone.is_ascii_lowercase() {
            return Err(invalid("zone suffix must be a lowercase letter"));
        }
        let region = &s[..s.len() - 1];
        if region.is_empty() {
            return Err(invalid("region is missing"));
        }

        Ok(Self {
            region: region.to_string(),
            zone,
        })
    }
}

impl TryFrom<String> for Placement {
    type Error = ReconcileError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Placement> for String {
    fn from(value: Placement) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.region, self.zone)
    }
}

/// Compute instance state as reported by the instance directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceState {
    Pending,
    Running,
    Stopping,
    Stopped,
    ShuttingDown,
    Terminated,
}

impl InstanceState {
    /// An instance still holds its private address unless it has terminated.
    #[must_use]
    pub fn holds_address(self) -> bool {
        !matches!(self, Self::Terminated)
    }
}

/// A compute instance as seen by the instance directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    pub state: InstanceState,
    #[serde(default)]
    pub private_address: Option<IpAddr>,
    pub placement: Placement,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Instance {
    /// Value of the named tag, if present
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

/// Lifecycle transition that triggered a reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Instance is running (fresh launch or restart after stop)
    Starting,
    /// Instance stopped; ignored outside test mode
    Stopped,
    /// Instance is shutting down for termination
    Terminating,
}

impl LifecycleState {
    /// Label used in logs and metrics
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Stopped => "stopped",
            Self::Terminating => "terminating",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single DNS address record.
///
/// The engine only ever writes single-valued records; `values` is a list so that
/// records modified outside the engine can be detected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    #[serde(default)]
    pub zone_id: String,
    /// Fully-qualified name, with trailing dot
    pub name: String,
    pub ttl: u32,
    pub values: Vec<IpAddr>,
}

impl AddressRecord {
    /// First (and normally only) address value
    #[must_use]
    pub fn address(&self) -> Option<IpAddr> {
        self.values.first().copied()
    }

    /// Host label: the record name with `.<domain>.` removed
    #[must_use]
    pub fn host_label<'a>(&'a self, domain: &str) -> &'a str {
        let domain = domain.trim_end_matches('.');
        self.name
            .strip_suffix('.')
            .unwrap_or(&self.name)
            .strip_suffix(domain)
            .and_then(|s| s.strip_suffix('.'))
            .unwrap_or(&self.name)
    }
}

/// A private hosted zone and the networks it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostedZone {
    pub id: String,
    /// Domain name without trailing dot
    pub name: String,
    #[serde(default = "default_private")]
    pub private: bool,
    #[serde(default)]
    pub networks: Vec<String>,
}

fn default_private() -> bool {
    true
}

impl HostedZone {
    /// Fully-qualified name for a host label in this zone
    #[must_use]
    pub fn fqdn(&self, host: &str) -> String {
        format!("{host}.{}.", self.name.trim_end_matches('.'))
    }
}

/// One change in an atomic change batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum Change {
    /// Create a new single-valued record
    Create {
        name: String,
        address: IpAddr,
        ttl: u32,
    },
    /// Re-point an existing record to a new address, replacing its value wholesale
    Upsert { record: AddressRecord, address: IpAddr },
    /// Remove an existing record
    Delete { record: AddressRecord },
}

impl Change {
    /// Change action as submitted to the store
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Create { .. } => "CREATE",
            Self::Upsert { .. } => "UPSERT",
            Self::Delete { .. } => "DELETE",
        }
    }

    /// Fully-qualified name of the record affected by this change
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Create { name, .. } => name,
            Self::Upsert { record, .. } | Self::Delete { record } => &record.name,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { name, address, ttl } => {
                write!(f, "CREATE {name} A {address} (TTL {ttl})")
            }
            Self::Upsert { record, address } => {
                write!(f, "UPSERT {} A {address} (TTL {})", record.name, record.ttl)
            }
            Self::Delete { record } => {
                let values: Vec<String> = record.values.iter().map(ToString::to_string).collect();
                write!(f, "DELETE {} A {}", record.name, values.join(","))
            }
        }
    }
}

/// Propagation status of a submitted change batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Pending,
    Synchronized,
}

/// Everything the reconciler needs to know about one lifecycle transition.
///
/// Constructed per invocation and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationEvent {
    pub instance_id: String,
    /// Declared hostname tag, full or partial
    pub hostname: Option<String>,
    pub address: IpAddr,
    pub placement: Placement,
    pub network_id: Option<String>,
    pub state: LifecycleState,
}

impl ReconciliationEvent {
    /// Build an event from an instance description and the notified state.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidEvent`] if the instance has no private address.
    pub fn from_instance(
        instance: &Instance,
        hostname_tag: &str,
        state: LifecycleState,
    ) -> Result<Self> {
        let address = instance
            .private_address
            .ok_or_else(|| ReconcileError::InvalidEvent {
                reason: format!("instance {} has no private address", instance.id),
            })?;

        Ok(Self {
            instance_id: instance.id.clone(),
            hostname: instance.tag(hostname_tag).map(str::to_string),
            address,
            placement: instance.placement.clone(),
            network_id: instance.network_id.clone(),
            state,
        })
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod types_tests;
