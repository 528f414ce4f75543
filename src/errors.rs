// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for hostname reconciliation.
//!
//! This module provides specialized error types for:
//! - Naming convention violations (unknown regions, malformed hostnames)
//! - Record index invariant violations (duplicate or multi-valued records)
//! - Conflicts with other live instances
//! - DNS store and instance directory failures
//!
//! Every error is terminal for the event being processed. The only retry in the
//! engine is the change synchronization poll, and its timeout is reported as a
//! *soft* failure (see [`ReconcileError::is_soft`]).

use std::net::IpAddr;
use thiserror::Error;

/// Result alias used throughout the reconciliation engine.
pub type Result<T, E = ReconcileError> = std::result::Result<T, E>;

/// Violations of the record index invariants.
///
/// The naming convention guarantees at most one record per hostname and one
/// address value per record. These errors mean the zone was modified by
/// something other than this engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordIndexViolation {
    /// More than one record carries the same host label
    #[error("More than one record with hostname '{hostname}' found in zone {domain} ({count} matches)")]
    MultipleNameMatches {
        /// The zone domain name
        domain: String,
        /// The host label that matched more than once
        hostname: String,
        /// Number of matching records
        count: usize,
    },

    /// More than one record carries the same address value
    #[error("More than one record with address {address} found in zone {domain}: {names}")]
    MultipleAddressMatches {
        /// The zone domain name
        domain: String,
        /// The address that matched more than once
        address: IpAddr,
        /// Comma-separated names of the matching records
        names: String,
    },

    /// The single record holding an address also holds other values
    #[error("Record '{name}' with address {address} contains additional values {extra}")]
    UnexpectedMultiValue {
        /// Fully-qualified record name
        name: String,
        /// The address that was looked up
        address: IpAddr,
        /// Comma-separated extra values
        extra: String,
    },
}

/// Failures reported by collaborator implementations (DNS store, instance directory).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// A read or write request could not be completed
    #[error("{operation} failed: {reason}")]
    RequestFailed {
        /// Collaborator operation name (e.g. `ListRecords`)
        operation: String,
        /// Underlying failure description
        reason: String,
    },

    /// The store refused a change batch outright
    #[error("Change batch rejected by zone {zone}: {reason}")]
    BatchRejected {
        /// Zone the batch was submitted to
        zone: String,
        /// Store-provided reason
        reason: String,
    },

    /// A change token the store does not know about
    #[error("Unknown change token '{token}'")]
    UnknownChange {
        /// The token that was queried
        token: String,
    },
}

/// Errors that can occur while reconciling a single lifecycle event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Placement region is not in the location table (no fallback)
    #[error("Region {region} is unknown")]
    UnknownRegion {
        /// The region portion of the placement identifier
        region: String,
    },

    /// Placement identifier could not be split into region and zone letter
    #[error("Placement '{placement}' is invalid: {reason}")]
    InvalidPlacement {
        /// The raw placement identifier
        placement: String,
        /// Explanation of what is invalid
        reason: String,
    },

    /// Hostname tag conforms to neither the full nor the partial template
    #[error("HostName {hostname} is invalid: it does not conform to the naming convention, or is invalid for placement {placement}")]
    InvalidHostname {
        /// The declared hostname
        hostname: String,
        /// The instance placement
        placement: String,
    },

    /// Hostname template could not be compiled from the naming configuration
    #[error("Hostname pattern '{pattern}' is invalid: {reason}")]
    InvalidPattern {
        /// The generated pattern
        pattern: String,
        /// Regex compiler message
        reason: String,
    },

    /// Next-number allocation was asked to work from an empty candidate set
    #[error("No existing hostnames to allocate a number from")]
    NoCandidates,

    /// Every two-digit instance number is already in use
    #[error("All instance numbers are in use for hostnames matching {prefix}")]
    NumberSpaceExhausted {
        /// Shared non-numeric prefix of the candidates
        prefix: String,
    },

    /// The hostname's record points to an address still held by another live instance
    #[error("HostName {hostname} maps to {address}, which is in use by instance {owner}; refusing to update the existing record")]
    AddressInUse {
        /// Hostname of the conflicting record
        hostname: String,
        /// Address currently stored in that record
        address: IpAddr,
        /// Instance currently holding the address
        owner: String,
    },

    /// Record index invariant violated
    #[error(transparent)]
    RecordIndex(#[from] RecordIndexViolation),

    /// The store refused the change batch outright
    #[error("Change batch for zone {zone} rejected: {reason}")]
    ChangeRejected {
        /// Zone the batch was submitted to
        zone: String,
        /// Store-provided reason
        reason: String,
    },

    /// Change was accepted but not observed as synchronized within the poll budget
    #[error("Change {token} for zone {zone} was not synchronized within {waited_secs} seconds")]
    SyncTimeout {
        /// Zone the batch was submitted to
        zone: String,
        /// Change tracking token
        token: String,
        /// Total seconds spent polling
        waited_secs: u64,
    },

    /// Lifecycle notification failed envelope validation
    #[error("Event invalid: {reason}")]
    InvalidEvent {
        /// Explanation of what is invalid
        reason: String,
    },

    /// The instance named by the event does not exist
    #[error("Instance {instance_id} not found")]
    InstanceNotFound {
        /// The instance identifier
        instance_id: String,
    },

    /// Collaborator failure
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ReconcileError {
    /// Returns true for failures the caller may report as success with a warning.
    ///
    /// Only [`ReconcileError::SyncTimeout`] is soft: the batch was accepted and
    /// will almost certainly converge.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::SyncTimeout { .. })
    }

    /// Returns a stable, machine-readable reason code for this error.
    ///
    /// Used as the `reason` label on error metrics and in CLI output.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownRegion { .. } => "UnknownRegion",
            Self::InvalidPlacement { .. } => "InvalidPlacement",
            Self::InvalidHostname { .. } => "InvalidHostname",
            Self::InvalidPattern { .. } => "InvalidPattern",
            Self::NoCandidates => "NoCandidates",
            Self::NumberSpaceExhausted { .. } => "NumberSpaceExhausted",
            Self::AddressInUse { .. } => "AddressInUse",
            Self::RecordIndex(_) => "RecordIndexViolation",
            Self::ChangeRejected { .. } => "ChangeRejected",
            Self::SyncTimeout { .. } => "SyncTimeout",
            Self::InvalidEvent { .. } => "InvalidEvent",
            Self::InstanceNotFound { .. } => "InstanceNotFound",
            Self::Provider(_) => "ProviderError",
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
