//! Monthly managed-service cost for an aggregated cluster.
//!
//! Each table is priced twice: on-demand (per request unit) and provisioned (per capacity
//! unit hour, sized at `target_utilization`). Storage, point-in-time backup and TTL deletes
//! are common to both modes.

use crate::config::PricingConfig;
use crate::models::*;
use crate::pricing::{PriceTable, PricingCatalog};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use tracing::{info, warn};

pub struct CostProjector<'a> {
    pricing: &'a PricingConfig,
    catalog: &'a PricingCatalog,
}

impl<'a> CostProjector<'a> {
    pub fn new(pricing: &'a PricingConfig, catalog: &'a PricingCatalog) -> Self {
        Self { pricing, catalog }
    }

    fn target_utilization(&self) -> Decimal {
        let utilization = self.pricing.target_utilization;
        if utilization <= Decimal::ZERO {
            warn!(%utilization, "Non-positive target utilization, sizing at 100%");
            Decimal::ONE
        } else {
            utilization
        }
    }

    /// Provisioned capacity cost for a steady `units_per_sec` load.
    fn provisioned(&self, units_per_sec: Decimal, price_per_unit_hour: Decimal) -> Decimal {
        let monthly_units = units_per_sec * SECONDS_PER_MONTH;
        (monthly_units / SECONDS_PER_MONTH) * HOURS_PER_MONTH * price_per_unit_hour / self.target_utilization()
    }

    pub fn table_cost(&self, usage: &ScaledUsage, prices: &PriceTable, backup_enabled: bool) -> CostBreakdown {
        let storage_gb = usage.uncompressed_single_replica_gb;
        let storage = storage_gb * prices.storage_gb_month;
        let backup = if backup_enabled {
            storage_gb * prices.backup_gb_month
        } else {
            Decimal::ZERO
        };

        let on_demand_writes = usage.write_units_per_sec * SECONDS_PER_MONTH * prices.write_request_unit;
        let on_demand_reads = usage.read_units_per_sec * SECONDS_PER_MONTH * prices.read_request_unit;
        let ttl_deletes = usage.ttl_units_per_sec * SECONDS_PER_MONTH * prices.ttl_delete_unit;

        let provisioned_writes = self.provisioned(usage.write_units_per_sec, prices.write_capacity_unit_hour);
        let provisioned_reads_strong = self.provisioned(usage.read_units_per_sec, prices.read_capacity_unit_hour);
        let provisioned_reads_eventual = provisioned_reads_strong / dec!(2);

        let common = storage + backup + ttl_deletes;
        CostBreakdown {
            storage,
            backup,
            on_demand_reads,
            on_demand_writes,
            ttl_deletes,
            provisioned_reads_strong,
            provisioned_reads_eventual,
            provisioned_writes,
            on_demand_total: on_demand_reads + on_demand_writes + common,
            provisioned_total: provisioned_reads_strong + provisioned_writes + common,
        }
    }

    pub fn project(&self, estimate: &ClusterEstimate) -> CostEstimate {
        let mut result = CostEstimate::default();
        let mut price_tables: BTreeMap<String, PriceTable> = BTreeMap::new();

        for (keyspace, usage) in &estimate.keyspaces {
            if usage.kind == KeyspaceKind::System && !self.pricing.include_system_keyspaces {
                continue;
            }

            for (datacenter, dc_usage) in &usage.datacenters {
                let region = self.pricing.region_for(datacenter).to_string();
                let prices = price_tables
                    .entry(region.clone())
                    .or_insert_with(|| self.catalog.resolve(&region));

                let dc_cost = result
                    .datacenters
                    .entry(datacenter.clone())
                    .or_insert_with(|| DatacenterCost {
                        region: region.clone(),
                        ..Default::default()
                    });
                let ks_cost = dc_cost.keyspaces.entry(keyspace.clone()).or_default();

                for (table, table_usage) in &dc_usage.tables {
                    let backup = self.pricing.backup_enabled_for(keyspace, table);
                    let cost = self.table_cost(&table_usage.scaled, prices, backup);
                    ks_cost.subtotal.add(&cost);
                    ks_cost.tables.insert(table.clone(), cost);
                }
                dc_cost.total.add(&ks_cost.subtotal);
            }
        }

        for dc_cost in result.datacenters.values() {
            result.total.add(&dc_cost.total);
        }

        info!(
            datacenters = result.datacenters.len(),
            on_demand_total = %result.total.on_demand_total.round_dp(2),
            provisioned_total = %result.total.provisioned_total.round_dp(2),
            "Cost projection complete"
        );
        result
    }
}
