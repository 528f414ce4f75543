// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Atomic change submission with bounded synchronization polling.
//!
//! A batch is submitted once. The returned change token is then polled at a fixed
//! interval until the store reports it synchronized or the attempt budget runs
//! out. Convergence time for private zones is well known and constant, so the
//! interval does not back off.
//!
//! # Poll Schedule
//!
//! With the default policy (10 s × 9 attempts) the applier waits up to ~90 s:
//!
//! 1. check, sleep 10 s
//! 2. check, sleep 10 s
//! 3. ...
//! 9. check, sleep 10 s → [`ReconcileError::SyncTimeout`]

use crate::constants::{DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL_SECS};
use crate::errors::{ProviderError, ReconcileError, Result};
use crate::metrics;
use crate::providers::{DnsStore, Sleeper};
use crate::types::{Change, ChangeStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed-interval synchronization poll policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after each status check that is not yet synchronized
    pub interval: Duration,
    /// Number of status checks before giving up
    pub attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Total time the poll loop may spend waiting
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval * self.attempts
    }
}

/// Submits change batches and waits for them to synchronize.
#[derive(Clone)]
pub struct ChangeApplier {
    store: Arc<dyn DnsStore>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
}

impl ChangeApplier {
    pub fn new(store: Arc<dyn DnsStore>, sleeper: Arc<dyn Sleeper>, policy: RetryPolicy) -> Self {
        Self {
            store,
            sleeper,
            policy,
        }
    }

    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Submit `changes` to `zone_id` as one atomic batch and wait for synchronization.
    ///
    /// An empty batch is not submitted.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::ChangeRejected`] if the store refuses the batch
    /// - [`ReconcileError::SyncTimeout`] if the batch was accepted but not observed
    ///   as synchronized within the poll budget (soft failure)
    /// - [`ReconcileError::Provider`] for other store failures
    pub async fn apply(&self, zone_id: &str, changes: &[Change]) -> Result<()> {
        if changes.is_empty() {
            debug!(zone = zone_id, "No changes to submit");
            return Ok(());
        }

        for change in changes {
            info!(zone = zone_id, change = %change, "Constructed {} change", change.action());
        }

        info!(
            zone = zone_id,
            changes = changes.len(),
            "Submitting change batch"
        );
        let token = self
            .store
            .submit_change_batch(zone_id, changes)
            .await
            .map_err(|e| match e {
                ProviderError::BatchRejected { zone, reason } => {
                    ReconcileError::ChangeRejected { zone, reason }
                }
                other => ReconcileError::Provider(other),
            })?;

        for change in changes {
            metrics::record_change_submitted(change.action());
        }

        info!(zone = zone_id, token = %token, "Waiting for change to synchronize");
        for attempt in 1..=self.policy.attempts {
            let status = self.store.get_change_status(&token).await?;
            debug!(token = %token, attempt, status = ?status, "Change status");

            if status == ChangeStatus::Synchronized {
                info!(token = %token, attempt, "Change synchronized");
                return Ok(());
            }
            self.sleeper.sleep(self.policy.interval).await;
        }

        let waited_secs = self.policy.budget().as_secs();
        warn!(
            zone = zone_id,
            token = %token,
            waited_secs,
            "Change was not synchronized within the poll budget"
        );
        metrics::record_sync_timeout();
        Err(ReconcileError::SyncTimeout {
            zone: zone_id.to_string(),
            token,
            waited_secs,
        })
    }
}

#[cfg(test)]
#[path = "change_applier_tests.rs"]
mod change_applier_tests;
