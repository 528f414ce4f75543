// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hostname reconciliation for instance lifecycle events.
//!
//! One event is reconciled per call, in three phases:
//!
//! 1. **Gather** - classify the hostname tag, find the private zone for the
//!    instance's network, list its records and narrow them to the hostname's
//!    siblings, look the instance up by name and by address, and resolve the
//!    current owner of the name record's address when it may be overwritten.
//! 2. **Decide** - [`decide`] maps the gathered [`ReconcileFacts`] to a
//!    [`Decision`]. It performs no I/O.
//! 3. **Act** - submit the changes through the [`ChangeApplier`], then run the
//!    [`Pruner`] after a termination when pruning is enabled.
//!
//! No mutation is issued before every read for the decision has completed.
//!
//! # Decision Table
//!
//! | state       | by name | by address | same record | action                                    |
//! |-------------|---------|------------|-------------|-------------------------------------------|
//! | starting    | yes     | yes        | yes         | none (restart after stop)                 |
//! | starting    | yes     | any        | no          | `AddressInUse` if owned, else UPSERT      |
//! | starting    | no      | yes        | -           | none (tracked under another name)         |
//! | starting    | no      | no         | -           | CREATE next free (or first) hostname      |
//! | terminating | yes     | yes        | yes         | DELETE                                    |
//! | terminating | no      | yes        | -           | DELETE the address record                 |
//! | terminating | otherwise | -        | -           | none                                      |
//! | stopped     | -       | -          | -           | none (terminating in test mode)           |

use crate::change_applier::ChangeApplier;
use crate::config::EngineConfig;
use crate::errors::{ReconcileError, Result};
use crate::metrics;
use crate::naming::{test_hostname, HostnameKind, NamingConvention, PatternScope};
use crate::notification::StateChangeNotification;
use crate::providers::{DnsStore, InstanceDirectory, Sleeper};
use crate::pruner::{PruneReport, Pruner};
use crate::record_index::RecordIndex;
use crate::types::{
    AddressRecord, Change, HostedZone, LifecycleState, Placement, ReconciliationEvent,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Why a reconciliation made no change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NoActionReason {
    /// The instance carries no hostname tag
    NoHostnameTag,
    /// The instance's network has no private hosted zone
    NoPrivateZone,
    /// Stop events never change DNS outside test mode
    StoppedIgnored,
    /// Name and address already resolve to the same record
    AlreadyRecorded,
    /// The address is already recorded under a different sibling name
    TrackedUnderOtherName,
    /// Nothing recorded for this instance
    NothingToDelete,
}

impl NoActionReason {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::NoHostnameTag => "HostName tag not found",
            Self::NoPrivateZone => "Private hosted zone not associated with network",
            Self::StoppedIgnored => "Stopped state ignored, except in test mode",
            Self::AlreadyRecorded => "Record found for hostname and address (restart after stop)",
            Self::TrackedUnderOtherName => {
                "Record found for address under another hostname (restart after stop)"
            }
            Self::NothingToDelete => "No record found for hostname or address",
        }
    }
}

impl fmt::Display for NoActionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Everything [`decide`] needs, read from the collaborators beforehand.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileFacts<'a> {
    /// Effective state: `Stopped` is already mapped to `Terminating` in test mode
    pub state: LifecycleState,
    /// Hostname after any test-mode rewrite
    pub hostname: &'a str,
    pub kind: HostnameKind,
    pub address: IpAddr,
    pub placement: &'a Placement,
    pub zone: &'a HostedZone,
    /// Records sharing the hostname's prefix in the placement's zone suffix
    pub siblings: &'a RecordIndex,
    /// Sibling whose host label is the hostname (full hostnames only)
    pub by_name: Option<&'a AddressRecord>,
    /// Sibling carrying the instance's address
    pub by_address: Option<&'a AddressRecord>,
    /// Another live instance holding the name record's current address
    pub name_record_owner: Option<&'a str>,
    pub record_ttl: u32,
    pub naming: &'a NamingConvention,
}

/// Output of [`decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NoAction(NoActionReason),
    Apply(Vec<Change>),
}

/// Map the facts of one event to the changes it requires.
///
/// # Errors
///
/// - [`ReconcileError::AddressInUse`] if the name record would be re-pointed while
///   another live instance still holds its address
/// - [`ReconcileError::NumberSpaceExhausted`] if no instance number is free
pub fn decide(facts: &ReconcileFacts<'_>) -> Result<Decision> {
    match facts.state {
        LifecycleState::Stopped => Ok(Decision::NoAction(NoActionReason::StoppedIgnored)),
        LifecycleState::Starting => decide_starting(facts),
        LifecycleState::Terminating => Ok(decide_terminating(facts)),
    }
}

fn decide_starting(facts: &ReconcileFacts<'_>) -> Result<Decision> {
    match (facts.by_name, facts.by_address) {
        (Some(named), Some(addressed)) if named == addressed => {
            Ok(Decision::NoAction(NoActionReason::AlreadyRecorded))
        }
        (Some(named), _) => {
            if let (Some(owner), Some(current)) = (facts.name_record_owner, named.address()) {
                return Err(ReconcileError::AddressInUse {
                    hostname: facts.hostname.to_string(),
                    address: current,
                    owner: owner.to_string(),
                });
            }
            Ok(Decision::Apply(vec![Change::Upsert {
                record: named.clone(),
                address: facts.address,
            }]))
        }
        (None, Some(_)) => Ok(Decision::NoAction(NoActionReason::TrackedUnderOtherName)),
        (None, None) => {
            let host = if facts.siblings.is_empty() {
                match facts.kind {
                    HostnameKind::Full => facts.hostname.to_string(),
                    HostnameKind::Partial => {
                        facts.naming.first_number(facts.hostname, facts.placement)?
                    }
                }
            } else {
                NamingConvention::next_number(&facts.siblings.host_labels())?
            };
            Ok(Decision::Apply(vec![Change::Create {
                name: facts.zone.fqdn(&host),
                address: facts.address,
                ttl: facts.record_ttl,
            }]))
        }
    }
}

fn decide_terminating(facts: &ReconcileFacts<'_>) -> Decision {
    match (facts.by_name, facts.by_address) {
        (Some(named), Some(addressed)) if named == addressed => {
            Decision::Apply(vec![Change::Delete {
                record: named.clone(),
            }])
        }
        (None, Some(addressed)) => Decision::Apply(vec![Change::Delete {
            record: addressed.clone(),
        }]),
        _ => Decision::NoAction(NoActionReason::NothingToDelete),
    }
}

/// What a reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum Disposition {
    /// Changes were submitted; `synchronized` is false if a delete batch was
    /// accepted but not observed as synchronized in time
    Applied {
        changes: Vec<Change>,
        synchronized: bool,
    },
    NoAction { reason: NoActionReason },
}

/// Result of reconciling one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileOutcome {
    pub instance_id: String,
    /// Effective hostname (after any test-mode rewrite)
    pub hostname: Option<String>,
    /// Lifecycle state as received
    pub state: LifecycleState,
    pub zone_id: Option<String>,
    pub disposition: Disposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pruned: Option<PruneReport>,
    pub reconciled_at: DateTime<Utc>,
}

impl ReconcileOutcome {
    fn new(event: &ReconciliationEvent, disposition: Disposition) -> Self {
        Self {
            instance_id: event.instance_id.clone(),
            hostname: event.hostname.clone(),
            state: event.state,
            zone_id: None,
            disposition,
            pruned: None,
            reconciled_at: Utc::now(),
        }
    }

    /// Changes submitted, empty for no-action outcomes
    #[must_use]
    pub fn changes(&self) -> &[Change] {
        match &self.disposition {
            Disposition::Applied { changes, .. } => changes,
            Disposition::NoAction { .. } => &[],
        }
    }

    #[must_use]
    pub fn no_action_reason(&self) -> Option<NoActionReason> {
        match self.disposition {
            Disposition::NoAction { reason } => Some(reason),
            Disposition::Applied { .. } => None,
        }
    }

    fn metric_outcome(&self) -> &'static str {
        match self.disposition {
            Disposition::Applied { .. } => "applied",
            Disposition::NoAction { .. } => "no_action",
        }
    }
}

/// Reconciles instance lifecycle events against the private zone of their network.
#[derive(Clone)]
pub struct Reconciler {
    directory: Arc<dyn InstanceDirectory>,
    store: Arc<dyn DnsStore>,
    applier: ChangeApplier,
    pruner: Pruner,
    naming: Arc<NamingConvention>,
    config: EngineConfig,
}

impl Reconciler {
    /// Build a reconciler and its applier and pruner from one configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::InvalidPattern`] if the naming configuration is invalid.
    pub fn new(
        config: EngineConfig,
        directory: Arc<dyn InstanceDirectory>,
        store: Arc<dyn DnsStore>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self> {
        let naming = Arc::new(NamingConvention::new(config.naming.clone())?);
        let applier = ChangeApplier::new(store.clone(), sleeper, config.retry_policy());
        let pruner = Pruner::new(
            store.clone(),
            directory.clone(),
            applier.clone(),
            naming.clone(),
        );

        Ok(Self {
            directory,
            store,
            applier,
            pruner,
            naming,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn naming(&self) -> &NamingConvention {
        &self.naming
    }

    #[must_use]
    pub fn pruner(&self) -> &Pruner {
        &self.pruner
    }

    /// Validate a state-change notification, look up its instance and reconcile it.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::InvalidEvent`] if the envelope does not match the
    ///   configured source and detail type, or the instance has no address
    /// - [`ReconcileError::InstanceNotFound`] if the directory does not know the instance
    /// - any error from [`Reconciler::reconcile`]
    pub async fn handle_notification(
        &self,
        notification: &StateChangeNotification,
    ) -> Result<ReconcileOutcome> {
        let event = self
            .event_for(notification)
            .await
            .inspect_err(|e| {
                error!(error = %e, "Rejected state-change notification");
                metrics::record_error(e.reason());
            })?;
        self.reconcile(&event).await
    }

    async fn event_for(&self, notification: &StateChangeNotification) -> Result<ReconciliationEvent> {
        debug!("Validating event");
        let (instance_id, state) = notification.validate(
            &self.config.expected_source,
            &self.config.expected_detail_type,
        )?;

        info!(instance = instance_id, "Obtaining instance");
        let instance = self
            .directory
            .get_instance(instance_id)
            .await?
            .ok_or_else(|| ReconcileError::InstanceNotFound {
                instance_id: instance_id.to_string(),
            })?;

        ReconciliationEvent::from_instance(&instance, &self.config.hostname_tag, state)
    }

    /// Reconcile one lifecycle event.
    ///
    /// # Errors
    ///
    /// Validation, decision and store errors are returned unchanged; see
    /// [`ReconcileError`]. A sync timeout on a delete batch is not an error.
    pub async fn reconcile(&self, event: &ReconciliationEvent) -> Result<ReconcileOutcome> {
        let start = Instant::now();
        let result = self.reconcile_event(event).await;
        let duration = start.elapsed();

        match &result {
            Ok(outcome) => {
                metrics::record_reconciliation(
                    event.state.as_str(),
                    outcome.metric_outcome(),
                    duration,
                );
            }
            Err(e) => {
                error!(
                    instance = %event.instance_id,
                    state = %event.state,
                    reason = e.reason(),
                    error = %e,
                    "Reconciliation failed"
                );
                metrics::record_reconciliation(event.state.as_str(), "error", duration);
                metrics::record_error(e.reason());
            }
        }
        result
    }

    async fn reconcile_event(&self, event: &ReconciliationEvent) -> Result<ReconcileOutcome> {
        let Some(tag) = event.hostname.as_deref() else {
            info!(instance = %event.instance_id, "{}", NoActionReason::NoHostnameTag);
            return Ok(ReconcileOutcome::new(
                event,
                Disposition::NoAction {
                    reason: NoActionReason::NoHostnameTag,
                },
            ));
        };

        let hostname = if self.config.test_mode {
            test_hostname(tag)
        } else {
            tag.to_string()
        };

        info!(hostname = %hostname, placement = %event.placement, "HostName tag found, validating");
        let kind = self.naming.classify(&hostname, &event.placement)?;

        let state = match (event.state, self.config.test_mode) {
            (LifecycleState::Stopped, true) => LifecycleState::Terminating,
            (state, _) => state,
        };

        let no_action = |reason: NoActionReason, zone_id: Option<String>| {
            let mut outcome = ReconcileOutcome::new(event, Disposition::NoAction { reason });
            outcome.hostname = Some(hostname.clone());
            outcome.zone_id = zone_id;
            outcome
        };

        if state == LifecycleState::Stopped {
            info!(instance = %event.instance_id, "{}", NoActionReason::StoppedIgnored);
            return Ok(no_action(NoActionReason::StoppedIgnored, None));
        }

        let Some(zone) = self.private_zone(event).await? else {
            info!(network = ?event.network_id, "{}", NoActionReason::NoPrivateZone);
            return Ok(no_action(NoActionReason::NoPrivateZone, None));
        };

        info!(
            instance = %event.instance_id,
            state = %event.state,
            hostname = %hostname,
            address = %event.address,
            zone = %zone.id,
            "Reconciling instance"
        );

        let records = self.store.list_records(&zone.id).await?;
        let index = RecordIndex::new(&zone.name, records);
        let pattern = self
            .naming
            .sibling_pattern(&hostname, &event.placement, PatternScope::SameZone)?;
        let siblings = index.narrowed(&pattern);
        debug!(pattern = %pattern, count = siblings.len(), "Sibling records found");

        let by_name = match kind {
            HostnameKind::Full => siblings.by_hostname(&hostname)?,
            HostnameKind::Partial => None,
        };
        let by_address = siblings.by_address(event.address)?;

        let name_record_owner = match (state, by_name) {
            (LifecycleState::Starting, Some(named)) if by_address != Some(named) => {
                self.live_owner(named, &event.instance_id).await?
            }
            _ => None,
        };

        let facts = ReconcileFacts {
            state,
            hostname: &hostname,
            kind,
            address: event.address,
            placement: &event.placement,
            zone: &zone,
            siblings: &siblings,
            by_name,
            by_address,
            name_record_owner: name_record_owner.as_deref(),
            record_ttl: self.config.record_ttl,
            naming: &self.naming,
        };

        let mut outcome = match decide(&facts)? {
            Decision::NoAction(reason) => {
                info!(hostname = %hostname, address = %event.address, "{reason} - NO ACTION");
                no_action(reason, Some(zone.id.clone()))
            }
            Decision::Apply(changes) => {
                let synchronized = self.apply(&zone.id, &changes).await?;
                let mut outcome = ReconcileOutcome::new(
                    event,
                    Disposition::Applied {
                        changes,
                        synchronized,
                    },
                );
                outcome.hostname = Some(hostname.clone());
                outcome.zone_id = Some(zone.id.clone());
                outcome
            }
        };

        if event.state == LifecycleState::Terminating && self.config.prune {
            info!(zone = %zone.id, "Pruning hostname records");
            outcome.pruned = Some(
                self.pruner
                    .prune(&zone, &hostname, &event.placement)
                    .await?,
            );
        }

        Ok(outcome)
    }

    /// Private zone bound to the event's network, if any.
    async fn private_zone(&self, event: &ReconciliationEvent) -> Result<Option<HostedZone>> {
        let Some(network) = event.network_id.as_deref() else {
            return Ok(None);
        };
        debug!(network, "Obtaining private hosted zone");
        Ok(self.store.find_private_zone_for_network(network).await?)
    }

    /// Live instance other than `instance_id` holding the record's current address.
    async fn live_owner(&self, record: &AddressRecord, instance_id: &str) -> Result<Option<String>> {
        let Some(current) = record.address() else {
            return Ok(None);
        };
        let owner = self
            .directory
            .get_instance_by_address(current)
            .await?
            .filter(|instance| instance.id != instance_id)
            .map(|instance| instance.id);
        debug!(record = %record.name, address = %current, owner = ?owner, "Resolved name record owner");
        Ok(owner)
    }

    /// Apply a batch; a sync timeout on a delete-only batch is reported as unsynchronized.
    async fn apply(&self, zone_id: &str, changes: &[Change]) -> Result<bool> {
        let delete_only = changes.iter().all(|c| matches!(c, Change::Delete { .. }));

        match self.applier.apply(zone_id, changes).await {
            Ok(()) => Ok(true),
            Err(e @ ReconcileError::SyncTimeout { .. }) if delete_only => {
                warn!(zone = zone_id, error = %e, "Delete accepted but not yet synchronized");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
