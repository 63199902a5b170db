use cassandra_tco::config::UptimePolicy;
use cassandra_tco::parser;
use cassandra_tco::units::{to_gib, SizeUnit};
use cassandra_tco::EstimateError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

mod common;

#[test]
fn test_parse_full_tablestats_capture() {
    let stats = parser::parse_tablestats(common::TABLESTATS_APP).unwrap();
    assert_eq!(stats.table_count(), 2);

    let events = stats.get("app", "events").unwrap();
    assert_eq!(events.compressed_bytes, dec!(1000000000));
    assert_eq!(events.compression_ratio, dec!(2));
    assert_eq!(events.local_write_count, dec!(100000));
    assert_eq!(events.local_read_count, dec!(50000));
    assert_eq!(events.uncompressed_bytes(), dec!(500000000));

    assert!(stats.get("system", "local").is_some());
}

#[test]
fn test_tablestats_parse_is_idempotent() {
    let first = parser::parse_tablestats(common::TABLESTATS_APP).unwrap();
    let second = parser::parse_tablestats(common::TABLESTATS_APP).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_duplicate_table_keeps_later_block() {
    let text = "\
Keyspace : app
Table: t
Space used (live): 10
SSTable Compression Ratio: 0.5
Local read count: 1
Local write count: 1
Table: t
Space used (live): 20
SSTable Compression Ratio: 0.5
Local read count: 2
Local write count: 2
";
    let stats = parser::parse_tablestats(text).unwrap();
    assert_eq!(stats.table_count(), 1);
    assert_eq!(stats.get("app", "t").unwrap().compressed_bytes, dec!(20));
}

#[test]
fn test_parse_info_capture() {
    let info = parser::parse_info(common::INFO_ONE_DAY, UptimePolicy::Strict).unwrap();
    assert_eq!(info.uptime_seconds, dec!(86400));
    assert_eq!(info.datacenter.as_deref(), Some("dc1"));
}

#[test]
fn test_info_without_uptime_is_format_error_when_strict() {
    let result = parser::parse_info("Gossip active : true\n", UptimePolicy::Strict);
    assert!(matches!(result, Err(EstimateError::Format(_))));
}

#[test]
fn test_parse_status_captures() {
    let single = parser::parse_status(common::STATUS_THREE_NODES).unwrap();
    assert_eq!(single.datacenter_count(), 1);
    assert_eq!(single.datacenter("dc1").unwrap().node_count, 3);
    assert_eq!(single.total_load_gib(), dec!(4.5));

    let multi = parser::parse_status(common::STATUS_TWO_DATACENTERS).unwrap();
    assert_eq!(multi.datacenter("us-east").unwrap().node_count, 4);
    assert_eq!(multi.datacenter("eu-west").unwrap().node_count, 2);
}

#[test]
fn test_parse_row_size_capture() {
    let rows = parser::parse_row_sizes(common::ROW_SIZES_APP).unwrap();
    let events = rows.sample("app", "events");
    assert_eq!(events.average_row_bytes, dec!(2048));
    assert!(!events.has_ttl);

    let ttl = parser::parse_row_sizes("ks.tbl = { average: 500 bytes, default-ttl: n }").unwrap();
    let sample = ttl.sample("ks", "tbl");
    assert_eq!(sample.average_row_bytes, dec!(500));
    assert!(sample.has_ttl);

    let absent = rows.sample("app", "missing");
    assert_eq!(absent.average_row_bytes, Decimal::ZERO);
    assert!(!absent.has_ttl);
}

#[test]
fn test_parse_schema_capture() {
    let schema = parser::parse_schema(common::SCHEMA_TWO_DATACENTERS);
    let app = &schema.keyspaces["app"];
    assert!(app.is_network_topology());
    assert_eq!(app.datacenters.get("us-east"), Some(&3));
    assert_eq!(app.datacenters.get("eu-west"), Some(&2));
    assert_eq!(app.tables, vec!["events".to_string()]);

    let local = &schema.keyspaces["local_only"];
    assert_eq!(local.datacenters.len(), 1);
    assert_eq!(local.tables, vec!["audit".to_string()]);
}

#[test]
fn test_unit_conversion_is_scale_invariant() {
    for unit in ["KiB", "MiB", "GiB", "TiB", "PiB"] {
        let parsed: SizeUnit = unit.parse().unwrap();
        let one = to_gib(dec!(1), unit).unwrap();
        assert_eq!(to_gib(dec!(1024), unit).unwrap(), one * dec!(1024), "{}", parsed);
    }
    assert_eq!(to_gib(dec!(3), "gib").unwrap(), dec!(3));
    assert!(matches!(to_gib(dec!(1), "bytes"), Err(EstimateError::Format(_))));
}
