// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Orphaned record sweep.
//!
//! After an instance terminates, every record sharing its hostname prefix, in
//! any zone suffix of the region, is checked against the live fleet. Records
//! whose address is no longer held by any instance are deleted in one batch.

use crate::change_applier::ChangeApplier;
use crate::errors::{ReconcileError, Result};
use crate::metrics;
use crate::naming::{NamingConvention, PatternScope};
use crate::providers::{DnsStore, InstanceDirectory};
use crate::record_index::RecordIndex;
use crate::types::{AddressRecord, Change, HostedZone, Placement};
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a prune sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneReport {
    pub zone_id: String,
    /// Records matching the cross-zone sibling pattern
    pub examined: usize,
    /// Fully-qualified names of deleted records
    pub deleted: Vec<String>,
    /// False if the delete batch was accepted but not observed as synchronized
    pub synchronized: bool,
}

/// Deletes address records that no live instance holds.
#[derive(Clone)]
pub struct Pruner {
    store: Arc<dyn DnsStore>,
    directory: Arc<dyn InstanceDirectory>,
    applier: ChangeApplier,
    naming: Arc<NamingConvention>,
}

impl Pruner {
    pub fn new(
        store: Arc<dyn DnsStore>,
        directory: Arc<dyn InstanceDirectory>,
        applier: ChangeApplier,
        naming: Arc<NamingConvention>,
    ) -> Self {
        Self {
            store,
            directory,
            applier,
            naming,
        }
    }

    /// Sweep `zone` for orphaned siblings of `hostname`.
    ///
    /// A sync timeout on the delete batch is logged and reported with
    /// `synchronized: false` instead of failing.
    ///
    /// # Errors
    ///
    /// Returns an error if the hostname is invalid for the placement, a lookup
    /// fails, or the store rejects the delete batch.
    pub async fn prune(
        &self,
        zone: &HostedZone,
        hostname: &str,
        placement: &Placement,
    ) -> Result<PruneReport> {
        let pattern = self
            .naming
            .sibling_pattern(hostname, placement, PatternScope::CrossZone)?;
        debug!(zone = %zone.id, pattern = %pattern, "Pruning records matching pattern");

        let records = self.store.list_records(&zone.id).await?;
        let index = RecordIndex::new(&zone.name, records).narrowed(&pattern);

        let lookups = index.records().iter().map(|record| self.owner_of(record));
        let owned = try_join_all(lookups).await?;

        let orphans: Vec<&AddressRecord> = index
            .records()
            .iter()
            .zip(owned)
            .filter_map(|(record, has_owner)| (!has_owner).then_some(record))
            .collect();

        let mut report = PruneReport {
            zone_id: zone.id.clone(),
            examined: index.len(),
            deleted: orphans.iter().map(|r| r.name.clone()).collect(),
            synchronized: true,
        };

        if orphans.is_empty() {
            info!(zone = %zone.id, examined = report.examined, "No orphaned records found");
            return Ok(report);
        }

        for record in &orphans {
            info!(
                record = %record.name,
                values = ?record.values,
                "Instance not found for record - DELETE"
            );
        }

        let changes: Vec<Change> = orphans
            .into_iter()
            .map(|record| Change::Delete {
                record: record.clone(),
            })
            .collect();

        match self.applier.apply(&zone.id, &changes).await {
            Ok(()) => {}
            Err(e @ ReconcileError::SyncTimeout { .. }) => {
                warn!(zone = %zone.id, error = %e, "Prune batch accepted but not yet synchronized");
                report.synchronized = false;
            }
            Err(e) => return Err(e),
        }

        metrics::record_pruned(report.deleted.len());
        info!(zone = %zone.id, deleted = report.deleted.len(), "Pruned orphaned records");
        Ok(report)
    }

    /// Whether any live instance holds one of the record's addresses.
    async fn owner_of(&self, record: &AddressRecord) -> Result<bool> {
        for address in &record.values {
            if let Some(instance) = self.directory.get_instance_by_address(*address).await? {
                debug!(record = %record.name, %address, instance = %instance.id, "Record has a live owner");
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
#[path = "pruner_tests.rs"]
mod pruner_tests;
