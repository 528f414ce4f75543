// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

// Common fixtures for integration tests

#![allow(dead_code)]

use hostwarden::config::EngineConfig;
use hostwarden::memory::{FleetSnapshot, InMemoryDnsStore, InMemoryFleet, InstantSleeper};
use hostwarden::notification::StateChangeNotification;
use hostwarden::reconciler::{ReconcileOutcome, Reconciler};
use hostwarden::types::{Instance, InstanceState};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const ZONE_ID: &str = "Z0PRIVATE";
pub const DOMAIN: &str = "corp.internal";
pub const NETWORK: &str = "vpc-0a1b2c";

/// Snapshot with one empty private zone bound to [`NETWORK`].
pub const EMPTY_FLEET: &str = r#"
instances: []
zones:
  - id: Z0PRIVATE
    name: corp.internal
    networks: [vpc-0a1b2c]
    records: []
"#;

/// A fleet backed by in-memory collaborators.
pub struct TestFleet {
    pub fleet: Arc<InMemoryFleet>,
    pub store: Arc<InMemoryDnsStore>,
    pub sleeper: Arc<InstantSleeper>,
    pub reconciler: Reconciler,
}

impl TestFleet {
    pub fn from_yaml(yaml: &str, config: EngineConfig) -> Self {
        let snapshot = FleetSnapshot::from_yaml_str(yaml).expect("valid fleet snapshot");
        let (fleet, store) = snapshot.into_collaborators();
        let sleeper = Arc::new(InstantSleeper::default());
        let reconciler = Reconciler::new(config, fleet.clone(), store.clone(), sleeper.clone())
            .expect("valid engine configuration");
        Self {
            fleet,
            store,
            sleeper,
            reconciler,
        }
    }

    pub fn empty(config: EngineConfig) -> Self {
        Self::from_yaml(EMPTY_FLEET, config)
    }

    /// Host labels of every record in the zone, sorted
    pub async fn hostnames(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .store
            .records(ZONE_ID)
            .await
            .iter()
            .map(|r| r.host_label(DOMAIN).to_string())
            .collect();
        names.sort();
        names
    }

    /// Add a running instance and deliver its `running` notification.
    pub async fn launch(
        &self,
        id: &str,
        hostname: &str,
        address: &str,
        placement: &str,
    ) -> ReconcileOutcome {
        self.fleet
            .upsert(instance(id, hostname, address, placement, InstanceState::Running))
            .await;
        self.notify(id, "running")
            .await
            .expect("running reconciliation succeeds")
    }

    /// Mark an instance shutting down and deliver its notification.
    pub async fn terminate(&self, id: &str) -> ReconcileOutcome {
        self.fleet.set_state(id, InstanceState::ShuttingDown).await;
        let outcome = self
            .notify(id, "shutting-down")
            .await
            .expect("termination reconciliation succeeds");
        self.fleet.set_state(id, InstanceState::Terminated).await;
        outcome
    }

    pub async fn notify(
        &self,
        id: &str,
        state: &str,
    ) -> hostwarden::errors::Result<ReconcileOutcome> {
        self.reconciler
            .handle_notification(&notification(id, state))
            .await
    }
}

pub fn instance(
    id: &str,
    hostname: &str,
    address: &str,
    placement: &str,
    state: InstanceState,
) -> Instance {
    Instance {
        id: id.to_string(),
        state,
        private_address: Some(address.parse().expect("valid address")),
        placement: placement.parse().expect("valid placement"),
        network_id: Some(NETWORK.to_string()),
        tags: BTreeMap::from([("HostName".to_string(), hostname.to_string())]),
    }
}

pub fn notification(id: &str, state: &str) -> StateChangeNotification {
    StateChangeNotification::from_json(&format!(
        r#"{{
            "version": "0",
            "source": "aws.ec2",
            "detail-type": "EC2 Instance State-change Notification",
            "detail": {{ "instance-id": "{id}", "state": "{state}" }}
        }}"#
    ))
    .expect("valid notification")
}
