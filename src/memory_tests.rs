// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the in-memory collaborators.

#[cfg(test)]
mod tests {
    use crate::errors::ProviderError;
    use crate::memory::{FleetSnapshot, InMemoryDnsStore, InMemoryFleet};
    use crate::providers::{DnsStore, InstanceDirectory, InstanceFilter};
    use crate::types::{AddressRecord, Change, ChangeStatus, InstanceState};
    use std::net::IpAddr;

    const SNAPSHOT: &str = r#"
instances:
  - id: i-0001
    state: running
    privateAddress: 10.0.0.5
    placement: us-east-1a
    networkId: vpc-1
    tags:
      HostName: cmlue1dbl01a
  - id: i-0002
    state: terminated
    privateAddress: 10.0.0.6
    placement: us-east-1a
    networkId: vpc-1
zones:
  - id: Z1
    name: example.internal
    networks: [vpc-1]
    records:
      - name: cmlue1dbl01a.example.internal.
        ttl: 300
        values: [10.0.0.5]
  - id: Z2
    name: public.example
    private: false
    networks: [vpc-1]
"#;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn record(host: &str, address: &str) -> AddressRecord {
        AddressRecord {
            zone_id: "Z1".to_string(),
            name: format!("{host}.example.internal."),
            ttl: 300,
            values: vec![ip(address)],
        }
    }

    #[test]
    fn test_snapshot_parses_and_defaults() {
        let snapshot = FleetSnapshot::from_yaml_str(SNAPSHOT).unwrap();

        assert_eq!(snapshot.instances.len(), 2);
        assert_eq!(snapshot.instances[0].tag("HostName"), Some("cmlue1dbl01a"));
        assert!(snapshot.instances[1].tags.is_empty());
        assert!(snapshot.zones[0].zone.private);
        assert!(!snapshot.zones[1].zone.private);
        assert!(snapshot.zones[1].records.is_empty());
    }

    #[test]
    fn test_snapshot_yaml_round_trip() {
        let snapshot = FleetSnapshot::from_yaml_str(SNAPSHOT).unwrap();
        let yaml = snapshot.to_yaml_string().unwrap();
        assert_eq!(FleetSnapshot::from_yaml_str(&yaml).unwrap(), snapshot);
    }

    #[test]
    fn test_snapshot_rejects_bad_placement() {
        let yaml = "instances:\n  - id: i-1\n    state: running\n    placement: US\n";
        assert!(FleetSnapshot::from_yaml_str(yaml).is_err());
    }

    #[tokio::test]
    async fn test_store_fills_zone_id() {
        let snapshot = FleetSnapshot::from_yaml_str(SNAPSHOT).unwrap();
        let (_, store) = snapshot.into_collaborators();

        let records = store.list_records("Z1").await.unwrap();
        assert_eq!(records, vec![record("cmlue1dbl01a", "10.0.0.5")]);
    }

    #[tokio::test]
    async fn test_list_records_unknown_zone() {
        let store = InMemoryDnsStore::new(vec![]);
        let err = store.list_records("Z9").await.unwrap_err();
        assert!(matches!(err, ProviderError::RequestFailed { .. }));
    }

    #[tokio::test]
    async fn test_find_private_zone_skips_public_zones() {
        let (_, store) = FleetSnapshot::from_yaml_str(SNAPSHOT)
            .unwrap()
            .into_collaborators();

        let zone = store.find_private_zone_for_network("vpc-1").await.unwrap();
        assert_eq!(zone.map(|z| z.id), Some("Z1".to_string()));
        assert!(store
            .find_private_zone_for_network("vpc-2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_directory_lookups() {
        let (fleet, _) = FleetSnapshot::from_yaml_str(SNAPSHOT)
            .unwrap()
            .into_collaborators();

        let owner = fleet.get_instance_by_address(ip("10.0.0.5")).await.unwrap();
        assert_eq!(owner.map(|i| i.id), Some("i-0001".to_string()));

        // Terminated instances have released their address
        assert!(fleet
            .get_instance_by_address(ip("10.0.0.6"))
            .await
            .unwrap()
            .is_none());

        let by_id = fleet
            .list_instances(&InstanceFilter::Ids(vec!["i-0002".to_string()]))
            .await
            .unwrap();
        assert_eq!(by_id.len(), 1);
        assert!(fleet.get_instance("i-9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fleet_mutation_helpers() {
        let fleet = InMemoryFleet::default();
        assert!(!fleet.set_state("i-1", InstanceState::Stopped).await);

        let snapshot = FleetSnapshot::from_yaml_str(SNAPSHOT).unwrap();
        let mut instance = snapshot.instances[0].clone();
        fleet.upsert(instance.clone()).await;
        instance.private_address = Some(ip("10.0.0.7"));
        fleet.upsert(instance).await;

        let instances = fleet.instances().await;
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].private_address, Some(ip("10.0.0.7")));

        assert!(fleet.set_state("i-0001", InstanceState::Terminated).await);
        assert!(fleet
            .get_instance_by_address(ip("10.0.0.7"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_batch_applies_all_actions() {
        let (_, store) = FleetSnapshot::from_yaml_str(SNAPSHOT)
            .unwrap()
            .into_collaborators();
        let existing = record("cmlue1dbl01a", "10.0.0.5");

        store
            .submit_change_batch(
                "Z1",
                &[
                    Change::Upsert {
                        record: existing.clone(),
                        address: ip("10.0.0.8"),
                    },
                    Change::Create {
                        name: "cmlue1dbl02a.example.internal.".to_string(),
                        address: ip("10.0.0.9"),
                        ttl: 300,
                    },
                ],
            )
            .await
            .unwrap();

        let records = store.records("Z1").await;
        assert_eq!(
            records,
            vec![
                record("cmlue1dbl01a", "10.0.0.8"),
                record("cmlue1dbl02a", "10.0.0.9"),
            ]
        );

        store
            .submit_change_batch(
                "Z1",
                &[Change::Delete {
                    record: record("cmlue1dbl02a", "10.0.0.9"),
                }],
            )
            .await
            .unwrap();
        assert_eq!(store.records("Z1").await.len(), 1);
        assert_eq!(store.submissions().await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_with_stale_values_is_rejected() {
        let (_, store) = FleetSnapshot::from_yaml_str(SNAPSHOT)
            .unwrap()
            .into_collaborators();

        let err = store
            .submit_change_batch(
                "Z1",
                &[Change::Delete {
                    record: record("cmlue1dbl01a", "10.0.0.99"),
                }],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::BatchRejected { .. }));
        assert_eq!(store.records("Z1").await.len(), 1);
        assert!(store.submissions().await.is_empty());
    }

    #[tokio::test]
    async fn test_change_status_progression() {
        let store = InMemoryDnsStore::new(
            FleetSnapshot::from_yaml_str(SNAPSHOT).unwrap().zones,
        )
        .with_pending_polls(1);

        let token = store
            .submit_change_batch(
                "Z1",
                &[Change::Create {
                    name: "cmlue1dbl02a.example.internal.".to_string(),
                    address: ip("10.0.0.9"),
                    ttl: 300,
                }],
            )
            .await
            .unwrap();

        assert_eq!(token, "C0001");
        assert_eq!(
            store.get_change_status(&token).await.unwrap(),
            ChangeStatus::Pending
        );
        assert_eq!(
            store.get_change_status(&token).await.unwrap(),
            ChangeStatus::Synchronized
        );

        let err = store.get_change_status("C9999").await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownChange { .. }));
    }
}
