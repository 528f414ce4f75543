// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Collaborator interfaces consumed by the reconciliation engine.
//!
//! The engine never talks to a cloud API directly. Instance lookups, zone
//! listings and change submission all go through these traits, so the same
//! engine runs against a real provider, the in-memory store in
//! [`crate::memory`], or a test double.
//!
//! Implementations perform one request per call and never retry; the only
//! retry loop lives in [`crate::change_applier::ChangeApplier`].

use crate::errors::ProviderError;
use crate::types::{AddressRecord, Change, ChangeStatus, HostedZone, Instance};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Selection criteria for [`InstanceDirectory::list_instances`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceFilter {
    /// Instances with any of these identifiers
    Ids(Vec<String>),
    /// Instances holding this private address
    PrivateAddress(IpAddr),
}

/// Read-only view of the compute fleet.
#[async_trait]
pub trait InstanceDirectory: Send + Sync {
    /// List instances matching the filter.
    async fn list_instances(&self, filter: &InstanceFilter)
        -> Result<Vec<Instance>, ProviderError>;

    /// Instance currently holding `address`, if any.
    ///
    /// Terminated instances have released their address and are never returned.
    async fn get_instance_by_address(
        &self,
        address: IpAddr,
    ) -> Result<Option<Instance>, ProviderError> {
        let instances = self
            .list_instances(&InstanceFilter::PrivateAddress(address))
            .await?;
        Ok(instances.into_iter().find(|i| i.state.holds_address()))
    }

    /// Instance with the given identifier, if it exists.
    async fn get_instance(&self, instance_id: &str) -> Result<Option<Instance>, ProviderError> {
        let instances = self
            .list_instances(&InstanceFilter::Ids(vec![instance_id.to_string()]))
            .await?;
        Ok(instances.into_iter().next())
    }
}

/// DNS zone store holding the private hosted zones.
#[async_trait]
pub trait DnsStore: Send + Sync {
    /// List every address record in a zone.
    async fn list_records(&self, zone_id: &str) -> Result<Vec<AddressRecord>, ProviderError>;

    /// Private zone bound to a network, if one exists.
    async fn find_private_zone_for_network(
        &self,
        network_id: &str,
    ) -> Result<Option<HostedZone>, ProviderError>;

    /// Submit a batch of changes atomically; returns a change-tracking token.
    async fn submit_change_batch(
        &self,
        zone_id: &str,
        changes: &[Change],
    ) -> Result<String, ProviderError>;

    /// Propagation status of a previously submitted batch.
    async fn get_change_status(&self, token: &str) -> Result<ChangeStatus, ProviderError>;
}

/// Delay strategy used between change status polls.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
