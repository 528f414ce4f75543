// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `types.rs`

#[cfg(test)]
mod tests {
    use crate::errors::ReconcileError;
    use crate::types::*;
    use std::collections::BTreeMap;
    use std::net::{IpAddr, Ipv4Addr};

    fn record(name: &str, values: &[[u8; 4]]) -> AddressRecord {
        AddressRecord {
            zone_id: "Z1".to_string(),
            name: name.to_string(),
            ttl: 300,
            values: values.iter().map(|v| IpAddr::V4(Ipv4Addr::from(*v))).collect(),
        }
    }

    #[test]
    fn test_placement_parse() {
        let placement: Placement = "us-east-1a".parse().unwrap();
        assert_eq!(placement.region(), "us-east-1");
        assert_eq!(placement.zone_suffix(), 'a');
        assert_eq!(placement.to_string(), "us-east-1a");
    }

    #[test]
    fn test_placement_rejects_uppercase_zone() {
        let err = "us-east-1A".parse::<Placement>().unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidPlacement { .. }));
    }

    #[test]
    fn test_placement_rejects_missing_region() {
        assert!("a".parse::<Placement>().is_err());
        assert!("".parse::<Placement>().is_err());
    }

    #[test]
    fn test_placement_serde_round_trip_as_string() {
        let placement: Placement = serde_json::from_str("\"eu-west-2c\"").unwrap();
        assert_eq!(placement.region(), "eu-west-2");
        assert_eq!(serde_json::to_string(&placement).unwrap(), "\"eu-west-2c\"");
    }

    #[test]
    fn test_host_label_strips_domain() {
        let rec = record("cmlue1dbl01a.example.internal.", &[[10, 0, 0, 5]]);
        assert_eq!(rec.host_label("example.internal"), "cmlue1dbl01a");
        assert_eq!(rec.host_label("example.internal."), "cmlue1dbl01a");
    }

    #[test]
    fn test_host_label_outside_domain_is_unchanged() {
        let rec = record("cmlue1dbl01a.other.internal.", &[[10, 0, 0, 5]]);
        assert_eq!(
            rec.host_label("example.internal"),
            "cmlue1dbl01a.other.internal."
        );
    }

    #[test]
    fn test_change_display_and_action() {
        let create = Change::Create {
            name: "cmlue1dbl01a.example.internal.".to_string(),
            address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)),
            ttl: 300,
        };
        assert_eq!(create.action(), "CREATE");
        assert_eq!(
            create.to_string(),
            "CREATE cmlue1dbl01a.example.internal. A 10.0.0.5 (TTL 300)"
        );

        let delete = Change::Delete {
            record: record("cmlue1dbl02a.example.internal.", &[[10, 0, 0, 9]]),
        };
        assert_eq!(delete.action(), "DELETE");
        assert_eq!(delete.name(), "cmlue1dbl02a.example.internal.");
    }

    #[test]
    fn test_change_serializes_with_action_tag() {
        let change = Change::Create {
            name: "a.example.internal.".to_string(),
            address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            ttl: 60,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["action"], "CREATE");
        assert_eq!(json["address"], "10.0.0.1");
    }

    #[test]
    fn test_event_from_instance() {
        let mut tags = BTreeMap::new();
        tags.insert("HostName".to_string(), "cmlue1dbl".to_string());
        let instance = Instance {
            id: "i-1".to_string(),
            state: InstanceState::Running,
            private_address: Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))),
            placement: "us-east-1a".parse().unwrap(),
            network_id: Some("vpc-1".to_string()),
            tags,
        };

        let event =
            ReconciliationEvent::from_instance(&instance, "HostName", LifecycleState::Starting)
                .unwrap();
        assert_eq!(event.hostname.as_deref(), Some("cmlue1dbl"));
        assert_eq!(event.network_id.as_deref(), Some("vpc-1"));
        assert_eq!(event.state, LifecycleState::Starting);
    }

    #[test]
    fn test_event_from_instance_without_address() {
        let instance = Instance {
            id: "i-2".to_string(),
            state: InstanceState::Pending,
            private_address: None,
            placement: "us-east-1a".parse().unwrap(),
            network_id: None,
            tags: BTreeMap::new(),
        };

        let err =
            ReconciliationEvent::from_instance(&instance, "HostName", LifecycleState::Starting)
                .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidEvent { .. }));
    }

    #[test]
    fn test_terminated_instance_releases_address() {
        assert!(InstanceState::Running.holds_address());
        assert!(InstanceState::Stopped.holds_address());
        assert!(!InstanceState::Terminated.holds_address());
    }
}
