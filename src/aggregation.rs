//! Aggregation Engine
//!
//! Turns per-node captures into cluster-wide capacity figures. The work happens in two steps:
//!
//! 1. **Accumulate**: every [`NodeSample`] contributes per-table raw quantities (bytes,
//!    request units, traffic) plus per-second rates normalised by that node's uptime.
//! 2. **Scale**: per datacenter, the averaged per-node figures are multiplied by the node
//!    count and divided by the keyspace replication factor, yielding single-replica storage
//!    and logical request rates.
//!
//! ## Capacity units
//!
//! A write of `r` bytes costs one write unit below `write_unit_bytes` (1 KiB) and
//! `ceil(r / 1024)` above it; reads use `read_unit_bytes` (4 KiB) the same way. Tables whose
//! default TTL is set also pay one TTL delete per write unit.
//!
//! ## Replication
//!
//! The replication factor comes from the schema's NetworkTopologyStrategy entry for the
//! datacenter, then a `replication_factor` option, then
//! [`ModelConfig::default_replication_factor`]. Reads are divided by
//! `rf - read_replica_offset` (quorum reads touch every replica but one). A keyspace the
//! schema knows but does not replicate into a datacenter is left out of that datacenter.

use crate::config::ModelConfig;
use crate::error::{EstimateError, Result};
use crate::models::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Datacenter name used when no capture names one.
pub const DEFAULT_DATACENTER: &str = "default";

/// Everything the engine reads for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregationInput<'a> {
    pub samples: &'a [NodeSample],
    pub topology: Option<&'a ClusterTopology>,
    pub schema: Option<&'a SchemaInfo>,
    /// Replaces the node count of every datacenter.
    pub node_count_override: Option<u32>,
    pub keyspace_filter: Option<&'a str>,
}

#[derive(Default)]
struct TableAccumulator {
    raw: RawUsage,
    row_size_bytes: Decimal,
    has_ttl: bool,
}

#[derive(Default)]
struct DatacenterAccumulator {
    samples: u32,
    uptime_total: Decimal,
    keyspaces: BTreeMap<String, BTreeMap<String, TableAccumulator>>,
}

pub struct AggregationEngine<'a> {
    model: &'a ModelConfig,
}

impl<'a> AggregationEngine<'a> {
    pub fn new(model: &'a ModelConfig) -> Self {
        Self { model }
    }

    pub fn write_units_per_write(&self, row_bytes: Decimal) -> Decimal {
        units_per_operation(row_bytes, self.model.write_unit_bytes)
    }

    pub fn read_units_per_read(&self, row_bytes: Decimal) -> Decimal {
        units_per_operation(row_bytes, self.model.read_unit_bytes)
    }

    /// Raw per-node figures for one table, with rates over `uptime_seconds`.
    pub fn table_usage(
        &self,
        stat: &TableStat,
        row: &RowSizeSample,
        uptime_seconds: Decimal,
    ) -> Result<RawUsage> {
        if uptime_seconds <= Decimal::ZERO {
            return Err(EstimateError::arithmetic(format!(
                "uptime must be positive to compute rates, got {}",
                uptime_seconds
            )));
        }

        let row_bytes = row.average_row_bytes;
        let writes = stat.local_write_count;
        let reads = stat.local_read_count;

        let write_units = writes * self.write_units_per_write(row_bytes);
        let read_units = reads * self.read_units_per_read(row_bytes);
        let ttl_units = if row.has_ttl { write_units } else { Decimal::ZERO };
        let network_traffic_bytes =
            self.model.traffic_fanout * (writes + reads) * (row_bytes + self.model.row_overhead_bytes);

        Ok(RawUsage {
            compressed_bytes: stat.compressed_bytes,
            uncompressed_bytes: stat.uncompressed_bytes(),
            writes,
            reads,
            write_units,
            read_units,
            ttl_units,
            network_traffic_bytes,
            network_repair_bytes: stat.compressed_bytes * self.model.repair_fraction,
            write_units_rate: write_units / uptime_seconds,
            read_units_rate: read_units / uptime_seconds,
            ttl_units_rate: ttl_units / uptime_seconds,
            traffic_bytes_rate: network_traffic_bytes / uptime_seconds,
            sample_count: 1,
        })
    }

    /// Cluster-wide figures for `number_of_nodes` nodes at `replication_factor`.
    pub fn scale(&self, raw: &RawUsage, number_of_nodes: u32, replication_factor: u32) -> ScaledUsage {
        if raw.sample_count == 0 {
            return ScaledUsage::default();
        }
        let per_node = |total: Decimal| total / Decimal::from(raw.sample_count);
        let nodes = Decimal::from(number_of_nodes);
        let rf = Decimal::from(replication_factor.max(1));
        let read_replicas = Decimal::from(
            replication_factor
                .saturating_sub(self.model.read_replica_offset)
                .max(1),
        );

        ScaledUsage {
            compressed_gb: per_node(raw.compressed_bytes) * nodes / GIGABYTE,
            uncompressed_single_replica_gb: per_node(raw.uncompressed_bytes) * nodes / rf / GIGABYTE,
            write_units_per_sec: per_node(raw.write_units_rate) * nodes / rf,
            read_units_per_sec: per_node(raw.read_units_rate) * nodes / read_replicas,
            ttl_units_per_sec: per_node(raw.ttl_units_rate) * nodes / rf,
            network_traffic_gb_month: per_node(raw.traffic_bytes_rate) * nodes * SECONDS_PER_MONTH / GIGABYTE,
            network_repair_gb_month: per_node(raw.network_repair_bytes) * nodes / GIGABYTE,
        }
    }

    pub fn gossip_gb_month(&self, number_of_nodes: u32) -> Decimal {
        (self.model.gossip_out_bytes_per_sec + self.model.gossip_in_bytes_per_sec)
            * Decimal::from(number_of_nodes)
            * SECONDS_PER_MONTH
            / GIGABYTE
    }

    pub fn aggregate(&self, input: AggregationInput<'_>) -> Result<ClusterEstimate> {
        if input.samples.is_empty() {
            return Err(EstimateError::configuration("no node samples to aggregate"));
        }

        let mut datacenters: BTreeMap<String, DatacenterAccumulator> = BTreeMap::new();
        for sample in input.samples {
            let datacenter = self.sample_datacenter(sample, input.topology);
            let accumulator = datacenters.entry(datacenter.clone()).or_default();
            self.accumulate_sample(sample, &datacenter, &input, accumulator)?;
        }

        let mut estimate = ClusterEstimate::default();
        for (datacenter, accumulator) in datacenters {
            let number_of_nodes = resolve_node_count(&datacenter, &input)?;
            let summary = self.finish_datacenter(&datacenter, accumulator, number_of_nodes, &input, &mut estimate);
            info!(
                datacenter = %datacenter,
                nodes = number_of_nodes,
                samples = summary.samples,
                user_tables = summary.stats.user_tables,
                "Aggregated datacenter"
            );
            estimate.datacenters.insert(datacenter, summary);
        }

        Ok(estimate)
    }

    fn sample_datacenter(&self, sample: &NodeSample, topology: Option<&ClusterTopology>) -> String {
        sample
            .datacenter
            .clone()
            .or_else(|| sample.info.datacenter.clone())
            .or_else(|| topology.and_then(|t| t.first()).map(|(dc, _)| dc.to_string()))
            .unwrap_or_else(|| DEFAULT_DATACENTER.to_string())
    }

    fn accumulate_sample(
        &self,
        sample: &NodeSample,
        datacenter: &str,
        input: &AggregationInput<'_>,
        accumulator: &mut DatacenterAccumulator,
    ) -> Result<()> {
        let uptime = sample.info.uptime_seconds;
        accumulator.samples += 1;
        accumulator.uptime_total += uptime;

        for (keyspace, tables) in &sample.tablestats.keyspaces {
            if input.keyspace_filter.is_some_and(|filter| filter != keyspace.as_str()) {
                continue;
            }
            if !replicated_into(input.schema, keyspace, datacenter) {
                debug!(keyspace = %keyspace, datacenter, "Keyspace not replicated into datacenter, skipping");
                continue;
            }

            for (table, stat) in tables {
                let row = sample.row_sizes.sample(keyspace, table);
                let usage = self.table_usage(stat, &row, uptime).map_err(|e| {
                    EstimateError::arithmetic(format!("node {}: {}", sample.node_id, e))
                })?;
                let entry = accumulator
                    .keyspaces
                    .entry(keyspace.clone())
                    .or_default()
                    .entry(table.clone())
                    .or_default();
                entry.raw.add(&usage);
                entry.row_size_bytes = row.average_row_bytes;
                entry.has_ttl = row.has_ttl;
            }
        }
        Ok(())
    }

    fn finish_datacenter(
        &self,
        datacenter: &str,
        accumulator: DatacenterAccumulator,
        number_of_nodes: u32,
        input: &AggregationInput<'_>,
        estimate: &mut ClusterEstimate,
    ) -> DatacenterSummary {
        let mut summary = DatacenterSummary {
            number_of_nodes,
            samples: accumulator.samples,
            uptime_seconds: accumulator.uptime_total / Decimal::from(accumulator.samples.max(1)),
            ..Default::default()
        };
        summary.stats.uptime_days = summary.uptime_seconds / SECONDS_PER_DAY;

        for (keyspace, tables) in accumulator.keyspaces {
            if tables.is_empty() {
                continue;
            }
            let kind = if self.model.is_system_keyspace(&keyspace) {
                KeyspaceKind::System
            } else {
                KeyspaceKind::User
            };
            let replication_factor = self.replication_factor(input.schema, &keyspace, datacenter);

            let mut usage = DatacenterUsage {
                number_of_nodes,
                replication_factor,
                ..Default::default()
            };
            for (table, acc) in tables {
                let compression_ratio = if acc.raw.uncompressed_bytes > Decimal::ZERO {
                    acc.raw.compressed_bytes / acc.raw.uncompressed_bytes
                } else {
                    Decimal::ONE
                };
                let table_usage = TableUsage {
                    row_size_bytes: acc.row_size_bytes,
                    has_ttl: acc.has_ttl,
                    compression_ratio,
                    scaled: self.scale(&acc.raw, number_of_nodes, replication_factor),
                    raw: acc.raw,
                };
                usage.totals.add_table(&table_usage);

                if kind == KeyspaceKind::User {
                    record_idle(&mut summary.stats, &table_usage);
                }
                usage.tables.insert(table, table_usage);
            }
            usage.avg_write_row_bytes = weighted_row_size(&usage.tables, |t| t.raw.writes);
            usage.avg_read_row_bytes = weighted_row_size(&usage.tables, |t| t.raw.reads);

            match kind {
                KeyspaceKind::System => summary.system.add(&usage.totals),
                KeyspaceKind::User => {
                    summary.stats.user_tables += usage.totals.tables;
                    summary.user.add(&usage.totals);
                }
            }

            estimate
                .keyspaces
                .entry(keyspace)
                .or_insert_with(|| KeyspaceUsage {
                    kind,
                    datacenters: BTreeMap::new(),
                })
                .datacenters
                .insert(datacenter.to_string(), usage);
        }

        summary.stats.monthly_network = MonthlyNetwork {
            traffic_gb: summary.system.scaled.network_traffic_gb_month + summary.user.scaled.network_traffic_gb_month,
            repair_gb: summary.system.scaled.network_repair_gb_month + summary.user.scaled.network_repair_gb_month,
            gossip_gb: self.gossip_gb_month(number_of_nodes),
        };
        summary
    }

    pub fn replication_factor(&self, schema: Option<&SchemaInfo>, keyspace: &str, datacenter: &str) -> u32 {
        let declared = schema
            .and_then(|s| s.keyspaces.get(keyspace))
            .and_then(|ks| ks.datacenters.get(datacenter).copied().or(ks.simple_replication_factor));
        declared.unwrap_or(self.model.default_replication_factor).max(1)
    }
}

fn units_per_operation(row_bytes: Decimal, unit_bytes: Decimal) -> Decimal {
    if row_bytes < unit_bytes {
        Decimal::ONE
    } else {
        (row_bytes / unit_bytes).ceil()
    }
}

/// False only when the schema lists per-datacenter replication without this datacenter.
fn replicated_into(schema: Option<&SchemaInfo>, keyspace: &str, datacenter: &str) -> bool {
    match schema.and_then(|s| s.keyspaces.get(keyspace)) {
        Some(ks) if !ks.datacenters.is_empty() => ks.datacenters.contains_key(datacenter),
        _ => true,
    }
}

fn resolve_node_count(datacenter: &str, input: &AggregationInput<'_>) -> Result<u32> {
    let count = input.node_count_override.or_else(|| {
        let topology = input.topology?;
        match topology.datacenter(datacenter) {
            Some(status) => Some(status.node_count),
            // Captures without a datacenter name fall back to the first one listed.
            None if datacenter == DEFAULT_DATACENTER => topology.first().map(|(_, status)| status.node_count),
            None => None,
        }
    });

    match count {
        Some(0) => Err(EstimateError::configuration(format!(
            "datacenter '{}' has zero nodes",
            datacenter
        ))),
        Some(nodes) => Ok(nodes),
        None => Err(EstimateError::configuration(format!(
            "no node count for datacenter '{}': supply a status capture or an explicit node count",
            datacenter
        ))),
    }
}

fn record_idle(stats: &mut ClusterStats, table: &TableUsage) {
    let no_writes = table.raw.write_units <= Decimal::ZERO;
    let no_reads = table.raw.read_units <= Decimal::ZERO;
    if no_writes {
        stats.tables_without_writes.add_table(table);
        if no_reads {
            stats.tables_without_writes_and_reads.add_table(table);
        }
    }
    if no_reads {
        stats.tables_without_reads.add_table(table);
    }
}

fn weighted_row_size(tables: &BTreeMap<String, TableUsage>, weight: impl Fn(&TableUsage) -> Decimal) -> Decimal {
    let (weighted, total) = tables.values().fold((Decimal::ZERO, Decimal::ZERO), |(sum, count), table| {
        let w = weight(table);
        (sum + w * table.row_size_bytes, count + w)
    });
    if total > Decimal::ZERO {
        weighted / total
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn stat(compressed: Decimal, ratio: Decimal, reads: Decimal, writes: Decimal) -> TableStat {
        TableStat {
            keyspace: "app".to_string(),
            table: "t".to_string(),
            compressed_bytes: compressed,
            compression_ratio: ratio,
            local_read_count: reads,
            local_write_count: writes,
        }
    }

    fn row(bytes: Decimal, has_ttl: bool) -> RowSizeSample {
        RowSizeSample {
            fully_qualified_table: "app.t".to_string(),
            average_row_bytes: bytes,
            has_ttl,
        }
    }

    #[test]
    fn test_unit_quantization_boundaries() {
        let model = ModelConfig::default();
        let engine = AggregationEngine::new(&model);
        assert_eq!(engine.write_units_per_write(dec!(0)), dec!(1));
        assert_eq!(engine.write_units_per_write(dec!(1023)), dec!(1));
        assert_eq!(engine.write_units_per_write(dec!(1024)), dec!(1));
        assert_eq!(engine.write_units_per_write(dec!(1025)), dec!(2));
        assert_eq!(engine.read_units_per_read(dec!(4096)), dec!(1));
        assert_eq!(engine.read_units_per_read(dec!(4097)), dec!(2));
    }

    #[test]
    fn test_ratio_clamp() {
        for ratio in [dec!(0), dec!(-1), dec!(0.0000000001)] {
            let s = stat(dec!(100), ratio, dec!(0), dec!(0));
            assert_eq!(s.uncompressed_bytes(), dec!(100));
        }
    }

    #[test]
    fn test_table_usage_scenario() {
        let model = ModelConfig::default();
        let engine = AggregationEngine::new(&model);
        let usage = engine
            .table_usage(
                &stat(dec!(1000000000), dec!(0.5), dec!(50000), dec!(200000)),
                &row(dec!(500), false),
                dec!(86400),
            )
            .unwrap();

        assert_eq!(usage.uncompressed_bytes, dec!(2000000000));
        assert_eq!(usage.write_units, dec!(200000));
        assert_eq!(usage.read_units, dec!(50000));
        assert_eq!(usage.ttl_units, dec!(0));
        assert_eq!(usage.network_traffic_bytes, dec!(2) * dec!(250000) * dec!(600));
        assert_eq!(usage.network_repair_bytes, dec!(50000000));
    }

    #[test]
    fn test_zero_uptime_is_rejected() {
        let model = ModelConfig::default();
        let engine = AggregationEngine::new(&model);
        let err = engine
            .table_usage(&stat(dec!(1), dec!(1), dec!(1), dec!(1)), &row(dec!(1), false), dec!(0))
            .unwrap_err();
        assert!(matches!(err, EstimateError::ArithmeticGuard(_)));
    }

    #[test]
    fn test_scale_divides_reads_by_rf_minus_one() {
        let model = ModelConfig::default();
        let engine = AggregationEngine::new(&model);
        let raw = RawUsage {
            write_units_rate: dec!(30),
            read_units_rate: dec!(20),
            sample_count: 1,
            ..Default::default()
        };
        let scaled = engine.scale(&raw, 6, 3);
        assert_eq!(scaled.write_units_per_sec, dec!(60));
        assert_eq!(scaled.read_units_per_sec, dec!(60));

        let single = engine.scale(&raw, 1, 1);
        assert_eq!(single.read_units_per_sec, dec!(20));
    }

    #[test]
    fn test_gossip() {
        let model = ModelConfig::default();
        let engine = AggregationEngine::new(&model);
        assert_eq!(engine.gossip_gb_month(1), dec!(4710) * dec!(2628000) / dec!(1000000000));
    }
}
