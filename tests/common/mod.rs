#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const STATUS_THREE_NODES: &str = "\
Datacenter: dc1
===============
Status=Up/Down
|/ State=Normal/Leaving/Joining/Moving
--  Address    Load       Tokens  Owns (effective)  Host ID                               Rack
UN  10.0.0.1   1.5 GiB    256     100.0%            6d1f3c2a-9a55-4a1f-8a1e-3b1c2d4e5f60  rack1
UN  10.0.0.2   1.5 GiB    256     100.0%            7e2f3c2a-9a55-4a1f-8a1e-3b1c2d4e5f61  rack1
UN  10.0.0.3   1.5 GiB    256     100.0%            8f3f3c2a-9a55-4a1f-8a1e-3b1c2d4e5f62  rack1
";

pub const STATUS_TWO_DATACENTERS: &str = "\
Datacenter: us-east
===================
--  Address    Load       Tokens  Owns (effective)  Host ID                               Rack
UN  10.0.0.1   2 GiB      256     50.0%             6d1f3c2a-9a55-4a1f-8a1e-3b1c2d4e5f60  rack1
UN  10.0.0.2   2 GiB      256     50.0%             7e2f3c2a-9a55-4a1f-8a1e-3b1c2d4e5f61  rack1
UN  10.0.0.3   2 GiB      256     50.0%             8f3f3c2a-9a55-4a1f-8a1e-3b1c2d4e5f62  rack1
UN  10.0.0.4   2 GiB      256     50.0%             9a3f3c2a-9a55-4a1f-8a1e-3b1c2d4e5f63  rack1
Datacenter: eu-west
===================
--  Address    Load       Tokens  Owns (effective)  Host ID                               Rack
UN  10.1.0.1   2 GiB      256     100.0%            ab3f3c2a-9a55-4a1f-8a1e-3b1c2d4e5f64  rack1
UN  10.1.0.2   2 GiB      256     100.0%            bc3f3c2a-9a55-4a1f-8a1e-3b1c2d4e5f65  rack1
";

pub const INFO_ONE_DAY: &str = "\
ID                     : 6d1f3c2a-9a55-4a1f-8a1e-3b1c2d4e5f60
Gossip active          : true
Load                   : 1.5 GiB
Uptime (seconds)       : 86400
Data Center            : dc1
Rack                   : rack1
";

/// One user table `app.events` plus a system table.
pub const TABLESTATS_APP: &str = "\
Total number of tables: 2
----------------
Keyspace : system
\tRead Count: 10
\t\tTable: local
\t\tSpace used (live): 1000000
\t\tSSTable Compression Ratio: 0.5
\t\tLocal read count: 100
\t\tLocal write count: 10
----------------
Keyspace : app
\tRead Count: 50000
\t\tTable: events
\t\tSSTable count: 12
\t\tSpace used (live): 1000000000
\t\tSpace used (total): 1000000000
\t\tSSTable Compression Ratio: 2
\t\tLocal read count: 50000
\t\tLocal read latency: 0.120 ms
\t\tLocal write count: 100000
\t\tLocal write latency: 0.030 ms
----------------
";

pub const ROW_SIZES_APP: &str = "\
app.events = { lines: 2500, columns: 8, average: 2048 bytes, min: 512 bytes, max: 4000 bytes, default-ttl: y }
system.local = { lines: 1, columns: 20, average: 900 bytes, default-ttl: y }
";

pub const SCHEMA_TWO_DATACENTERS: &str = "\
CREATE KEYSPACE app WITH replication = {'class': 'org.apache.cassandra.locator.NetworkTopologyStrategy', 'us-east': '3', 'eu-west': '2'}  AND durable_writes = true;

CREATE TABLE app.events (
    id uuid PRIMARY KEY,
    payload text
) WITH default_time_to_live = 0;

CREATE KEYSPACE local_only WITH replication = {'class': 'NetworkTopologyStrategy', 'us-east': '3'};

CREATE TABLE local_only.audit (
    id uuid PRIMARY KEY
);
";

pub const DESCRIBE_INSTANCES: &str = r#"{
  "Reservations": [
    {
      "Instances": [
        {
          "InstanceId": "i-0abc",
          "InstanceType": "c5.4xlarge",
          "Placement": {"AvailabilityZone": "us-east-1a"},
          "BlockDeviceMappings": [{"DeviceName": "/dev/xvda", "Ebs": {"VolumeId": "vol-01"}}]
        },
        {
          "InstanceId": "i-0def",
          "InstanceType": "m5.unknown",
          "BlockDeviceMappings": []
        }
      ]
    }
  ]
}"#;

pub const DESCRIBE_VOLUMES: &str = r#"{
  "Volumes": [
    {"VolumeId": "vol-01", "VolumeType": "gp3", "Size": 100}
  ]
}"#;

/// Two datapoints summing to 10 GiB in one day.
pub const NETWORK_OUT_METRICS: &str = r#"{
  "Label": "NetworkOut",
  "Datapoints": [
    {"Timestamp": "2024-01-15T00:00:00Z", "Sum": 5368709120, "Unit": "Bytes"},
    {"Timestamp": "2024-01-15T12:00:00Z", "Sum": 5368709120, "Unit": "Bytes"}
  ]
}"#;

pub fn write_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Single-node capture set: tablestats, info, rowsize and status files.
pub fn create_single_node_captures() -> Result<TempDir> {
    let temp_dir = TempDir::new()?;
    write_file(temp_dir.path(), "tablestats.txt", TABLESTATS_APP)?;
    write_file(temp_dir.path(), "info.txt", INFO_ONE_DAY)?;
    write_file(temp_dir.path(), "rowsize.txt", ROW_SIZES_APP)?;
    write_file(temp_dir.path(), "status.txt", STATUS_THREE_NODES)?;
    Ok(temp_dir)
}

pub fn node_info(datacenter: &str, uptime_seconds: u64) -> String {
    format!(
        "ID : node-{dc}\nUptime (seconds) : {uptime}\nData Center : {dc}\n",
        dc = datacenter,
        uptime = uptime_seconds
    )
}

/// Capture directory with nodes in `us-east` (2 samples) and `eu-west` (1 sample).
pub fn create_cluster_captures() -> Result<TempDir> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    for (datacenter, node) in [("us-east", "node1"), ("us-east", "node2"), ("eu-west", "node1")] {
        let dir = root.join(datacenter).join(node);
        write_file(&dir, "tablestats.txt", TABLESTATS_APP)?;
        write_file(&dir, "info.txt", &node_info(datacenter, 86400))?;
        write_file(&dir, "rowsize.txt", ROW_SIZES_APP)?;
    }
    write_file(root, "status.txt", STATUS_TWO_DATACENTERS)?;
    write_file(root, "schema.cql", SCHEMA_TWO_DATACENTERS)?;
    Ok(temp_dir)
}

pub fn assert_close(actual: rust_decimal::Decimal, expected: rust_decimal::Decimal) {
    let tolerance = rust_decimal_macros::dec!(0.000001);
    assert!(
        (actual - expected).abs() < tolerance,
        "expected {} to be within {} of {}",
        actual,
        tolerance,
        expected
    );
}
