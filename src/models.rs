//! Core Data Models
//!
//! This module defines the data structures that flow through the estimator, from records
//! extracted out of `nodetool` captures to the scaled cluster estimate and its cost projection.
//!
//! ## Data Flow
//!
//! 1. **Captures**: [`NodeInfo`], [`Tablestats`], [`RowSizeTable`], [`ClusterTopology`],
//!    [`SchemaInfo`] - one parse pass each, rebuilt per run
//! 2. **Samples**: [`NodeSample`] - everything captured on a single node
//! 3. **Estimate**: [`ClusterEstimate`] - cluster → keyspace → datacenter → table usage
//! 4. **Costs**: [`CostEstimate`] - monthly dollars per datacenter, keyspace and table
//!
//! All quantities are [`rust_decimal::Decimal`]; nothing in the pipeline touches floats.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decimal gigabyte used for every GB figure in reports.
pub const GIGABYTE: Decimal = dec!(1000000000);
/// 365 / 12 days of seconds.
pub const SECONDS_PER_MONTH: Decimal = dec!(2628000);
/// 365 / 12 days of hours.
pub const HOURS_PER_MONTH: Decimal = dec!(730);
pub const SECONDS_PER_DAY: Decimal = dec!(86400);

/// Compression ratios closer to zero than this are treated as zero.
const RATIO_EPSILON: Decimal = dec!(0.000000001);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub uptime_seconds: Decimal,
    pub datacenter: Option<String>,
    pub node_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStat {
    pub keyspace: String,
    pub table: String,
    pub compressed_bytes: Decimal,
    pub compression_ratio: Decimal,
    pub local_read_count: Decimal,
    pub local_write_count: Decimal,
}

impl TableStat {
    /// Ratio safe to divide by: non-positive or vanishing ratios become 1.
    pub fn effective_ratio(&self) -> Decimal {
        if self.compression_ratio <= Decimal::ZERO || self.compression_ratio.abs() < RATIO_EPSILON {
            Decimal::ONE
        } else {
            self.compression_ratio
        }
    }

    pub fn uncompressed_bytes(&self) -> Decimal {
        self.compressed_bytes / self.effective_ratio()
    }
}

/// keyspace → table → stat, one entry per (keyspace, table) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tablestats {
    pub keyspaces: BTreeMap<String, BTreeMap<String, TableStat>>,
}

impl Tablestats {
    pub fn table_count(&self) -> usize {
        self.keyspaces.values().map(|tables| tables.len()).sum()
    }

    pub fn get(&self, keyspace: &str, table: &str) -> Option<&TableStat> {
        self.keyspaces.get(keyspace).and_then(|tables| tables.get(table))
    }
}

/// Raw `field → value` map of one row-size sampler line.
pub type RowSizeFields = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSizeTable {
    pub tables: BTreeMap<String, RowSizeFields>,
}

impl RowSizeTable {
    pub fn sample(&self, keyspace: &str, table: &str) -> RowSizeSample {
        let name = format!("{}.{}", keyspace, table);
        match self.tables.get(&name) {
            Some(fields) => RowSizeSample::from_fields(name, fields),
            None => RowSizeSample::absent(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowSizeSample {
    pub fully_qualified_table: String,
    pub average_row_bytes: Decimal,
    pub has_ttl: bool,
}

impl RowSizeSample {
    pub fn absent(fully_qualified_table: String) -> Self {
        Self {
            fully_qualified_table,
            average_row_bytes: Decimal::ZERO,
            has_ttl: false,
        }
    }

    /// `average` keeps only its leading number; `default-ttl: n` marks a TTL table.
    pub fn from_fields(fully_qualified_table: String, fields: &RowSizeFields) -> Self {
        let average_row_bytes = fields
            .get("average")
            .map(String::as_str)
            .unwrap_or("0 bytes")
            .split_whitespace()
            .next()
            .and_then(|number| number.parse::<Decimal>().ok())
            .unwrap_or(Decimal::ZERO);
        let has_ttl = fields
            .get("default-ttl")
            .map(String::as_str)
            .unwrap_or("y")
            .trim()
            == "n";

        Self {
            fully_qualified_table,
            average_row_bytes,
            has_ttl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub ip: String,
    pub load_gib: Decimal,
    pub host_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatacenterStatus {
    pub node_count: u32,
    pub nodes: Vec<NodeStatus>,
}

/// Datacenters in the order `nodetool status` printed them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterTopology {
    pub datacenters: Vec<(String, DatacenterStatus)>,
}

impl ClusterTopology {
    pub fn datacenter_count(&self) -> usize {
        self.datacenters.len()
    }

    pub fn datacenter(&self, name: &str) -> Option<&DatacenterStatus> {
        self.datacenters
            .iter()
            .find(|(dc, _)| dc == name)
            .map(|(_, status)| status)
    }

    pub fn first(&self) -> Option<(&str, &DatacenterStatus)> {
        self.datacenters
            .first()
            .map(|(dc, status)| (dc.as_str(), status))
    }

    pub fn total_load_gib(&self) -> Decimal {
        self.datacenters
            .iter()
            .flat_map(|(_, status)| status.nodes.iter())
            .map(|node| node.load_gib)
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyspaceSchema {
    pub replication_class: String,
    /// Per-datacenter replication, NetworkTopologyStrategy only.
    pub datacenters: BTreeMap<String, u32>,
    pub simple_replication_factor: Option<u32>,
    pub tables: Vec<String>,
}

impl KeyspaceSchema {
    pub fn is_network_topology(&self) -> bool {
        self.replication_class == "NetworkTopologyStrategy"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub keyspaces: BTreeMap<String, KeyspaceSchema>,
}

/// Everything captured on one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSample {
    pub datacenter: Option<String>,
    pub node_id: String,
    pub info: NodeInfo,
    pub tablestats: Tablestats,
    pub row_sizes: RowSizeTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyspaceKind {
    System,
    User,
}

/// Per-node quantities summed over every sample that reported the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawUsage {
    pub compressed_bytes: Decimal,
    pub uncompressed_bytes: Decimal,
    pub writes: Decimal,
    pub reads: Decimal,
    pub write_units: Decimal,
    pub read_units: Decimal,
    pub ttl_units: Decimal,
    pub network_traffic_bytes: Decimal,
    pub network_repair_bytes: Decimal,
    /// Σ write_units / uptime over samples.
    pub write_units_rate: Decimal,
    pub read_units_rate: Decimal,
    pub ttl_units_rate: Decimal,
    pub traffic_bytes_rate: Decimal,
    pub sample_count: u32,
}

impl RawUsage {
    pub fn add(&mut self, other: &RawUsage) {
        self.compressed_bytes += other.compressed_bytes;
        self.uncompressed_bytes += other.uncompressed_bytes;
        self.writes += other.writes;
        self.reads += other.reads;
        self.write_units += other.write_units;
        self.read_units += other.read_units;
        self.ttl_units += other.ttl_units;
        self.network_traffic_bytes += other.network_traffic_bytes;
        self.network_repair_bytes += other.network_repair_bytes;
        self.write_units_rate += other.write_units_rate;
        self.read_units_rate += other.read_units_rate;
        self.ttl_units_rate += other.ttl_units_rate;
        self.traffic_bytes_rate += other.traffic_bytes_rate;
        self.sample_count += other.sample_count;
    }
}

/// Cluster-wide figures for one datacenter after node-count and replication scaling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaledUsage {
    pub compressed_gb: Decimal,
    pub uncompressed_single_replica_gb: Decimal,
    pub write_units_per_sec: Decimal,
    pub read_units_per_sec: Decimal,
    pub ttl_units_per_sec: Decimal,
    pub network_traffic_gb_month: Decimal,
    pub network_repair_gb_month: Decimal,
}

impl ScaledUsage {
    pub fn add(&mut self, other: &ScaledUsage) {
        self.compressed_gb += other.compressed_gb;
        self.uncompressed_single_replica_gb += other.uncompressed_single_replica_gb;
        self.write_units_per_sec += other.write_units_per_sec;
        self.read_units_per_sec += other.read_units_per_sec;
        self.ttl_units_per_sec += other.ttl_units_per_sec;
        self.network_traffic_gb_month += other.network_traffic_gb_month;
        self.network_repair_gb_month += other.network_repair_gb_month;
    }

    /// Compressed over uncompressed across all replicas, 1 when empty.
    pub fn compression_ratio(&self, replication_factor: u32) -> Decimal {
        let uncompressed_all_replicas =
            self.uncompressed_single_replica_gb * Decimal::from(replication_factor.max(1));
        if uncompressed_all_replicas > Decimal::ZERO {
            self.compressed_gb / uncompressed_all_replicas
        } else {
            Decimal::ONE
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableUsage {
    pub row_size_bytes: Decimal,
    pub has_ttl: bool,
    pub compression_ratio: Decimal,
    pub raw: RawUsage,
    pub scaled: ScaledUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub tables: u32,
    pub raw: RawUsage,
    pub scaled: ScaledUsage,
}

impl UsageTotals {
    pub fn add_table(&mut self, table: &TableUsage) {
        self.tables += 1;
        self.raw.add(&table.raw);
        self.scaled.add(&table.scaled);
    }

    pub fn add(&mut self, other: &UsageTotals) {
        self.tables += other.tables;
        self.raw.add(&other.raw);
        self.scaled.add(&other.scaled);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatacenterUsage {
    pub number_of_nodes: u32,
    pub replication_factor: u32,
    pub tables: BTreeMap<String, TableUsage>,
    pub totals: UsageTotals,
    /// Write-weighted mean row size across the keyspace.
    pub avg_write_row_bytes: Decimal,
    pub avg_read_row_bytes: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyspaceUsage {
    pub kind: KeyspaceKind,
    pub datacenters: BTreeMap<String, DatacenterUsage>,
}

/// User tables that saw no traffic of some kind during the uptime window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdleTables {
    pub tables: u32,
    pub uncompressed_single_replica_gb: Decimal,
    pub write_units_per_sec: Decimal,
    pub read_units_per_sec: Decimal,
    pub ttl_units_per_sec: Decimal,
}

impl IdleTables {
    pub fn add_table(&mut self, table: &TableUsage) {
        self.tables += 1;
        self.uncompressed_single_replica_gb += table.scaled.uncompressed_single_replica_gb;
        self.write_units_per_sec += table.scaled.write_units_per_sec;
        self.read_units_per_sec += table.scaled.read_units_per_sec;
        self.ttl_units_per_sec += table.scaled.ttl_units_per_sec;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyNetwork {
    pub traffic_gb: Decimal,
    pub repair_gb: Decimal,
    pub gossip_gb: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub user_tables: u32,
    pub uptime_days: Decimal,
    pub tables_without_writes: IdleTables,
    pub tables_without_reads: IdleTables,
    pub tables_without_writes_and_reads: IdleTables,
    pub monthly_network: MonthlyNetwork,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatacenterSummary {
    pub number_of_nodes: u32,
    pub samples: u32,
    /// Mean uptime of the sampled nodes.
    pub uptime_seconds: Decimal,
    pub system: UsageTotals,
    pub user: UsageTotals,
    pub stats: ClusterStats,
}

/// Canonical result: cluster → keyspace → datacenter → table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterEstimate {
    pub keyspaces: BTreeMap<String, KeyspaceUsage>,
    pub datacenters: BTreeMap<String, DatacenterSummary>,
}

impl ClusterEstimate {
    pub fn user_keyspaces(&self) -> impl Iterator<Item = (&String, &KeyspaceUsage)> {
        self.keyspaces
            .iter()
            .filter(|(_, usage)| usage.kind == KeyspaceKind::User)
    }
}

/// Monthly dollars by pricing dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub storage: Decimal,
    pub backup: Decimal,
    pub on_demand_reads: Decimal,
    pub on_demand_writes: Decimal,
    pub ttl_deletes: Decimal,
    pub provisioned_reads_strong: Decimal,
    pub provisioned_reads_eventual: Decimal,
    pub provisioned_writes: Decimal,
    pub on_demand_total: Decimal,
    pub provisioned_total: Decimal,
}

impl CostBreakdown {
    pub fn add(&mut self, other: &CostBreakdown) {
        self.storage += other.storage;
        self.backup += other.backup;
        self.on_demand_reads += other.on_demand_reads;
        self.on_demand_writes += other.on_demand_writes;
        self.ttl_deletes += other.ttl_deletes;
        self.provisioned_reads_strong += other.provisioned_reads_strong;
        self.provisioned_reads_eventual += other.provisioned_reads_eventual;
        self.provisioned_writes += other.provisioned_writes;
        self.on_demand_total += other.on_demand_total;
        self.provisioned_total += other.provisioned_total;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyspaceCost {
    pub tables: BTreeMap<String, CostBreakdown>,
    pub subtotal: CostBreakdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatacenterCost {
    pub region: String,
    pub keyspaces: BTreeMap<String, KeyspaceCost>,
    pub total: CostBreakdown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub datacenters: BTreeMap<String, DatacenterCost>,
    pub total: CostBreakdown,
}
