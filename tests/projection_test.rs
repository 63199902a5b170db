use cassandra_tco::config::{Config, UptimePolicy};
use cassandra_tco::models::*;
use cassandra_tco::parser;
use cassandra_tco::pricing::{self, PriceTable, PricingCatalog, RegionPrices};
use cassandra_tco::{AggregationEngine, AggregationInput, CostProjector};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

mod common;
use common::assert_close;

fn single_node_estimate(config: &Config) -> ClusterEstimate {
    let info = parser::parse_info(common::INFO_ONE_DAY, UptimePolicy::Strict).unwrap();
    let samples = vec![NodeSample {
        datacenter: None,
        node_id: "node1".to_string(),
        info,
        tablestats: parser::parse_tablestats(common::TABLESTATS_APP).unwrap(),
        row_sizes: parser::parse_row_sizes(common::ROW_SIZES_APP).unwrap(),
    }];
    AggregationEngine::new(&config.model)
        .aggregate(AggregationInput {
            samples: &samples,
            node_count_override: Some(3),
            ..Default::default()
        })
        .unwrap()
}

#[test]
fn test_project_user_keyspaces_only() {
    let config = Config::default();
    let estimate = single_node_estimate(&config);
    let catalog = PricingCatalog::new(BTreeMap::new(), config.pricing.fallback.clone());
    let costs = CostProjector::new(&config.pricing, &catalog).project(&estimate);

    let dc = &costs.datacenters["dc1"];
    assert_eq!(dc.region, "us-east-1");
    assert!(dc.keyspaces.contains_key("app"));
    assert!(!dc.keyspaces.contains_key("system"));

    let prices = PriceTable::default();
    let events = &dc.keyspaces["app"].tables["events"];
    assert_eq!(events.storage, dec!(0.5) * prices.storage_gb_month);
    assert_eq!(events.backup, dec!(0.5) * prices.backup_gb_month);
    assert_close(
        events.on_demand_writes,
        dec!(200000) / dec!(86400) * SECONDS_PER_MONTH * prices.write_request_unit,
    );
    assert_close(
        events.provisioned_writes,
        dec!(200000) / dec!(86400) * HOURS_PER_MONTH * prices.write_capacity_unit_hour,
    );
    assert_eq!(events.ttl_deletes, Decimal::ZERO);
    assert_close(events.provisioned_reads_eventual * dec!(2), events.provisioned_reads_strong);

    assert_eq!(costs.total, dc.total);
    assert_eq!(dc.total, dc.keyspaces["app"].subtotal);
}

#[test]
fn test_system_keyspaces_included_on_request() {
    let mut config = Config::default();
    config.pricing.include_system_keyspaces = true;
    let estimate = single_node_estimate(&config);
    let catalog = PricingCatalog::default();
    let costs = CostProjector::new(&config.pricing, &catalog).project(&estimate);
    assert!(costs.datacenters["dc1"].keyspaces.contains_key("system"));
}

#[test]
fn test_backup_opt_out_per_table() {
    let mut config = Config::default();
    config.pricing.backup_disabled_tables = vec!["app.events".to_string()];
    let estimate = single_node_estimate(&config);
    let catalog = PricingCatalog::default();
    let costs = CostProjector::new(&config.pricing, &catalog).project(&estimate);
    assert_eq!(costs.total.backup, Decimal::ZERO);
}

#[test]
fn test_datacenter_region_mapping_uses_region_prices() {
    let mut config = Config::default();
    config
        .pricing
        .datacenter_regions
        .insert("dc1".to_string(), "eu-west-1".to_string());
    let estimate = single_node_estimate(&config);

    let mut regions = BTreeMap::new();
    regions.insert(
        "eu-west-1".to_string(),
        RegionPrices {
            storage_gb_month: Some(dec!(1)),
            ..Default::default()
        },
    );
    let catalog = PricingCatalog::new(regions, PriceTable::default());
    let costs = CostProjector::new(&config.pricing, &catalog).project(&estimate);

    let dc = &costs.datacenters["dc1"];
    assert_eq!(dc.region, "eu-west-1");
    assert_eq!(dc.total.storage, dec!(0.5));
    // fields missing from the region fall back to the default table
    assert_eq!(
        dc.total.backup,
        dec!(0.5) * PriceTable::default().backup_gb_month
    );
}

#[test]
fn test_price_list_document_feeds_catalog() {
    let product = serde_json::json!({
        "product": {"attributes": {"regionCode": "ap-southeast-2", "usagetype": "APS2-TimedStorage-ByteHrs"}},
        "terms": {"OnDemand": {"T": {"priceDimensions": {"D": {"pricePerUnit": {"USD": "0.33"}}}}}}
    });
    let document = serde_json::json!({ "PriceList": [product.to_string(), product] }).to_string();

    let listed = pricing::parse_price_list(&document).unwrap();
    let catalog = PricingCatalog::default().merged_with(listed);
    let resolved = catalog.resolve("ap-southeast-2");
    assert_eq!(resolved.storage_gb_month, dec!(0.33));
    assert_eq!(resolved.write_request_unit, PriceTable::default().write_request_unit);
}

#[test]
fn test_target_utilization_scales_provisioned_only() {
    let config = Config::default();
    let estimate = single_node_estimate(&config);
    let catalog = PricingCatalog::default();
    let full = CostProjector::new(&config.pricing, &catalog).project(&estimate);

    let mut headroom = Config::default();
    headroom.pricing.target_utilization = dec!(0.5);
    let halved = CostProjector::new(&headroom.pricing, &catalog).project(&estimate);

    assert_eq!(halved.total.on_demand_total, full.total.on_demand_total);
    assert_close(halved.total.provisioned_writes, full.total.provisioned_writes * dec!(2));
}
