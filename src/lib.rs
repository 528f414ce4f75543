// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Hostwarden - hostname-driven private DNS reconciliation
//!
//! Hostwarden keeps a private DNS zone consistent with a fleet of virtual machines.
//! Each instance declares a hostname through a tag, either complete
//! (`cmlue1dbl01a`) or without its instance number and zone suffix (`cmlue1dbl`).
//! When an instance starts or terminates, the engine lists the zone, works out the
//! minimal set of address record changes, and applies them as one atomic batch.
//!
//! ## Overview
//!
//! - Partial hostnames get the lowest free instance number among their siblings
//! - Restarts after a stop never churn records
//! - A record is never re-pointed while another live instance holds its address
//! - Optional pruning removes records whose address no live instance holds
//!
//! ## Modules
//!
//! - [`naming`] - Hostname templates, classification and number allocation
//! - [`record_index`] - Point-in-time view of a zone's address records
//! - [`reconciler`] - Decision table and event handling
//! - [`change_applier`] - Atomic batch submission with synchronization polling
//! - [`pruner`] - Orphaned record sweep
//! - [`providers`] - Collaborator traits for the instance directory and DNS store
//! - [`memory`] - In-memory collaborators and YAML fleet snapshots
//! - [`notification`] - State-change notification envelope
//! - [`config`] - Engine configuration
//! - [`errors`] - Error types
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use hostwarden::config::EngineConfig;
//! use hostwarden::memory::FleetSnapshot;
//! use hostwarden::providers::TokioSleeper;
//! use hostwarden::reconciler::Reconciler;
//! use hostwarden::types::{LifecycleState, ReconciliationEvent};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let snapshot = FleetSnapshot::from_yaml_str(&std::fs::read_to_string("fleet.yaml")?)?;
//! let (fleet, store) = snapshot.into_collaborators();
//! let reconciler = Reconciler::new(
//!     EngineConfig::default().with_env_overrides(),
//!     fleet,
//!     store,
//!     Arc::new(TokioSleeper),
//! )?;
//!
//! let event = ReconciliationEvent {
//!     instance_id: "i-0abc".to_string(),
//!     hostname: Some("cmlue1dbl".to_string()),
//!     address: "10.0.0.5".parse()?,
//!     placement: "us-east-1a".parse()?,
//!     network_id: Some("vpc-1".to_string()),
//!     state: LifecycleState::Starting,
//! };
//! let outcome = reconciler.reconcile(&event).await?;
//! println!("{:?}", outcome.changes());
//! # Ok(())
//! # }
//! ```

pub mod change_applier;
pub mod config;
pub mod constants;
pub mod errors;
pub mod memory;
pub mod metrics;
pub mod naming;
pub mod notification;
pub mod providers;
pub mod pruner;
pub mod reconciler;
pub mod record_index;
pub mod types;
