// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory collaborators.
//!
//! [`InMemoryFleet`] and [`InMemoryDnsStore`] implement the collaborator traits
//! over a [`FleetSnapshot`], a YAML document describing instances, zones and
//! records. The CLI uses them to plan and apply reconciliations against an
//! exported snapshot; the test suites use them as a fake provider.
//!
//! Change batches are validated in full before any record is touched, so a
//! rejected batch leaves the zone unchanged.

use crate::errors::ProviderError;
use crate::providers::{DnsStore, InstanceDirectory, InstanceFilter, Sleeper};
use crate::types::{AddressRecord, Change, ChangeStatus, HostedZone, Instance, InstanceState};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// A hosted zone together with its address records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSnapshot {
    #[serde(flatten)]
    pub zone: HostedZone,
    #[serde(default)]
    pub records: Vec<AddressRecord>,
}

/// Serializable picture of a fleet and its private zones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub zones: Vec<ZoneSnapshot>,
}

impl FleetSnapshot {
    /// Parse a snapshot from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the snapshot schema.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse fleet snapshot")
    }

    /// Render the snapshot as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize fleet snapshot")
    }

    /// Split the snapshot into its two collaborators.
    #[must_use]
    pub fn into_collaborators(self) -> (Arc<InMemoryFleet>, Arc<InMemoryDnsStore>) {
        (
            Arc::new(InMemoryFleet::new(self.instances)),
            Arc::new(InMemoryDnsStore::new(self.zones)),
        )
    }
}

// ============================================================================
// Instance Directory
// ============================================================================

/// [`InstanceDirectory`] over a mutable list of instances.
#[derive(Debug, Default)]
pub struct InMemoryFleet {
    instances: RwLock<Vec<Instance>>,
}

impl InMemoryFleet {
    #[must_use]
    pub fn new(instances: Vec<Instance>) -> Self {
        Self {
            instances: RwLock::new(instances),
        }
    }

    /// Add an instance, replacing any instance with the same identifier.
    pub async fn upsert(&self, instance: Instance) {
        let mut instances = self.instances.write().await;
        instances.retain(|i| i.id != instance.id);
        instances.push(instance);
    }

    /// Change the state of an instance; returns false if it does not exist.
    pub async fn set_state(&self, instance_id: &str, state: InstanceState) -> bool {
        let mut instances = self.instances.write().await;
        match instances.iter_mut().find(|i| i.id == instance_id) {
            Some(instance) => {
                instance.state = state;
                true
            }
            None => false,
        }
    }

    pub async fn instances(&self) -> Vec<Instance> {
        self.instances.read().await.clone()
    }
}

#[async_trait]
impl InstanceDirectory for InMemoryFleet {
    async fn list_instances(
        &self,
        filter: &InstanceFilter,
    ) -> Result<Vec<Instance>, ProviderError> {
        let instances = self.instances.read().await;
        let matched = instances
            .iter()
            .filter(|i| match filter {
                InstanceFilter::Ids(ids) => ids.contains(&i.id),
                InstanceFilter::PrivateAddress(address) => i.private_address == Some(*address),
            })
            .cloned()
            .collect();
        Ok(matched)
    }
}

// ============================================================================
// DNS Store
// ============================================================================

/// A batch accepted by [`InMemoryDnsStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedBatch {
    pub token: String,
    pub zone_id: String,
    pub changes: Vec<Change>,
}

#[derive(Debug, Default)]
struct StoreState {
    zones: Vec<ZoneSnapshot>,
    submissions: Vec<SubmittedBatch>,
    polls: HashMap<String, u32>,
}

/// [`DnsStore`] over in-memory zones.
///
/// Every accepted batch reports `Pending` for `pending_polls` status checks and
/// then `Synchronized`. With `pending_polls == None` a batch never synchronizes.
#[derive(Debug)]
pub struct InMemoryDnsStore {
    state: RwLock<StoreState>,
    pending_polls: Option<u32>,
}

impl InMemoryDnsStore {
    #[must_use]
    pub fn new(zones: Vec<ZoneSnapshot>) -> Self {
        let zones = zones
            .into_iter()
            .map(|mut z| {
                for record in &mut z.records {
                    record.zone_id.clone_from(&z.zone.id);
                }
                z
            })
            .collect();
        Self {
            state: RwLock::new(StoreState {
                zones,
                ..StoreState::default()
            }),
            pending_polls: Some(0),
        }
    }

    /// Report `Pending` for this many polls before `Synchronized`.
    #[must_use]
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = Some(polls);
        self
    }

    /// Never report a batch as synchronized.
    #[must_use]
    pub fn never_synchronized(mut self) -> Self {
        self.pending_polls = None;
        self
    }

    /// Current records of a zone (empty if the zone does not exist).
    pub async fn records(&self, zone_id: &str) -> Vec<AddressRecord> {
        let state = self.state.read().await;
        state
            .zones
            .iter()
            .find(|z| z.zone.id == zone_id)
            .map(|z| z.records.clone())
            .unwrap_or_default()
    }

    /// Every accepted batch, in submission order.
    pub async fn submissions(&self) -> Vec<SubmittedBatch> {
        self.state.read().await.submissions.clone()
    }

    /// Current zones and records, for writing a snapshot back out.
    pub async fn zones(&self) -> Vec<ZoneSnapshot> {
        self.state.read().await.zones.clone()
    }
}

/// Apply a batch to a copy of `records`; the copy replaces the original only if
/// every change is valid.
fn apply_batch(
    zone_id: &str,
    records: &[AddressRecord],
    changes: &[Change],
) -> std::result::Result<Vec<AddressRecord>, String> {
    let mut next = records.to_vec();

    for change in changes {
        match change {
            Change::Create { name, address, ttl } => {
                if next.iter().any(|r| r.name == *name) {
                    return Err(format!("record {name} already exists"));
                }
                next.push(AddressRecord {
                    zone_id: zone_id.to_string(),
                    name: name.clone(),
                    ttl: *ttl,
                    values: vec![*address],
                });
            }
            Change::Upsert { record, address } => {
                match next.iter_mut().find(|r| r.name == record.name) {
                    Some(existing) => {
                        existing.ttl = record.ttl;
                        existing.values = vec![*address];
                    }
                    None => next.push(AddressRecord {
                        zone_id: zone_id.to_string(),
                        name: record.name.clone(),
                        ttl: record.ttl,
                        values: vec![*address],
                    }),
                }
            }
            Change::Delete { record } => {
                let position = next
                    .iter()
                    .position(|r| r.name == record.name && r.values == record.values)
                    .ok_or_else(|| {
                        format!("record {} not found or its values differ", record.name)
                    })?;
                next.remove(position);
            }
        }
    }

    Ok(next)
}

#[async_trait]
impl DnsStore for InMemoryDnsStore {
    async fn list_records(&self, zone_id: &str) -> Result<Vec<AddressRecord>, ProviderError> {
        let state = self.state.read().await;
        state
            .zones
            .iter()
            .find(|z| z.zone.id == zone_id)
            .map(|z| z.records.clone())
            .ok_or_else(|| ProviderError::RequestFailed {
                operation: "ListRecords".to_string(),
                reason: format!("no such hosted zone {zone_id}"),
            })
    }

    async fn find_private_zone_for_network(
        &self,
        network_id: &str,
    ) -> Result<Option<HostedZone>, ProviderError> {
        let state = self.state.read().await;
        Ok(state
            .zones
            .iter()
            .filter(|z| z.zone.private)
            .find(|z| z.zone.networks.iter().any(|n| n == network_id))
            .map(|z| z.zone.clone()))
    }

    async fn submit_change_batch(
        &self,
        zone_id: &str,
        changes: &[Change],
    ) -> Result<String, ProviderError> {
        let mut state = self.state.write().await;
        let token = format!("C{:04}", state.submissions.len() + 1);

        let zone = state
            .zones
            .iter_mut()
            .find(|z| z.zone.id == zone_id)
            .ok_or_else(|| ProviderError::BatchRejected {
                zone: zone_id.to_string(),
                reason: "no such hosted zone".to_string(),
            })?;

        zone.records = apply_batch(zone_id, &zone.records, changes).map_err(|reason| {
            ProviderError::BatchRejected {
                zone: zone_id.to_string(),
                reason,
            }
        })?;

        debug!(zone = zone_id, token = %token, changes = changes.len(), "Accepted change batch");
        state.submissions.push(SubmittedBatch {
            token: token.clone(),
            zone_id: zone_id.to_string(),
            changes: changes.to_vec(),
        });
        state.polls.insert(token.clone(), 0);
        Ok(token)
    }

    async fn get_change_status(&self, token: &str) -> Result<ChangeStatus, ProviderError> {
        let mut state = self.state.write().await;
        let polls = state
            .polls
            .get_mut(token)
            .ok_or_else(|| ProviderError::UnknownChange {
                token: token.to_string(),
            })?;
        *polls += 1;

        match self.pending_polls {
            Some(pending) if *polls > pending => Ok(ChangeStatus::Synchronized),
            _ => Ok(ChangeStatus::Pending),
        }
    }
}

// ============================================================================
// Sleeper
// ============================================================================

/// [`Sleeper`] that returns immediately and remembers what it was asked to wait.
#[derive(Debug, Default)]
pub struct InstantSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    /// Durations requested so far.
    pub async fn slept(&self) -> Vec<Duration> {
        self.slept.lock().await.clone()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().await.push(duration);
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
