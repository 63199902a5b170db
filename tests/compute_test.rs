//! EC2 capture parsing and self-managed cost model.

use cassandra_tco::compute::{self, Ec2CostModel, NetworkPricing, PriceTier, SnapshotPolicy};
use cassandra_tco::config::ComputeConfig;
use cassandra_tco::EstimateError;
use rust_decimal_macros::dec;

mod common;

#[test]
fn test_parse_describe_instances() {
    let instances = compute::parse_instances(common::DESCRIBE_INSTANCES).unwrap();
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].instance_id, "i-0abc");
    assert_eq!(instances[0].instance_type, "c5.4xlarge");
    assert_eq!(instances[0].availability_zone.as_deref(), Some("us-east-1a"));
    assert_eq!(instances[0].volume_ids, vec!["vol-01".to_string()]);
    assert!(instances[1].volume_ids.is_empty());
}

#[test]
fn test_parse_rejects_bad_documents() {
    assert!(matches!(
        compute::parse_instances("{not json"),
        Err(EstimateError::Format(_))
    ));
    assert!(matches!(
        compute::parse_instances(r#"{"Reservations": []}"#),
        Err(EstimateError::Format(_))
    ));
}

#[test]
fn test_parse_volumes_and_metrics() {
    let volumes = compute::parse_volumes(common::DESCRIBE_VOLUMES).unwrap();
    assert_eq!(volumes[0].volume_type, "gp3");
    assert_eq!(volumes[0].size_gb, dec!(100));

    let network = compute::parse_network_metrics(common::NETWORK_OUT_METRICS).unwrap();
    assert_eq!(network.daily_gb, dec!(10));
    assert_eq!(network.monthly_gb, dec!(300));
}

#[test]
fn test_estimate_with_fallback_instance_price() {
    let config = ComputeConfig::default();
    let model = Ec2CostModel::new(&config);
    let instances = compute::parse_instances(common::DESCRIBE_INSTANCES).unwrap();
    let volumes = compute::parse_volumes(common::DESCRIBE_VOLUMES).unwrap();
    let network = compute::parse_network_metrics(common::NETWORK_OUT_METRICS).unwrap();
    let policy = SnapshotPolicy::from_percentages(7, dec!(5), dec!(50));

    let summary = model.estimate(&instances, &volumes, Some(network), &policy);

    // c5.4xlarge is configured, the other type falls back to the default hourly price
    assert_eq!(summary.instances[0].monthly_compute, dec!(496.4));
    assert_eq!(summary.instances[1].hourly_price, config.default_hourly_price);

    let volume = &summary.volumes[0];
    assert_eq!(volume.monthly_storage, dec!(8));
    assert_eq!(volume.snapshot.actual_data_gb, dec!(50));
    assert_eq!(volume.snapshot.total_snapshot_gb, dec!(67.5));
    assert_eq!(volume.snapshot.monthly, dec!(3.375));

    let network = summary.network.as_ref().unwrap();
    assert_eq!(network.monthly_cost, dec!(18));

    assert_eq!(
        summary.monthly_total,
        dec!(496.4) * dec!(2) + dec!(8) + dec!(3.375) + dec!(18)
    );
    assert_eq!(summary.yearly_total, summary.monthly_total * dec!(12));
}

#[test]
fn test_network_schedules() {
    let tiered = ComputeConfig::default().network;
    assert_eq!(tiered.cost(dec!(50)), dec!(0));
    assert_eq!(tiered.cost(dec!(10240)), dec!(912.60));

    let custom = NetworkPricing::Tiered {
        tiers: vec![
            PriceTier::new(Some(dec!(100)), dec!(0)),
            PriceTier::new(None, dec!(0.02)),
        ],
    };
    assert_eq!(custom.cost(dec!(200)), dec!(2));

    let flat = NetworkPricing::Flat { rate_per_gb: dec!(0.02) };
    assert_eq!(flat.cost(dec!(100)), dec!(2.00));
}
