//! Terminal and JSON rendering of estimates.
//!
//! Text output is a set of colored tables: per-datacenter usage, cluster statistics and the
//! monthly cost comparison between on-demand and provisioned capacity. With `json_output`
//! the whole report is printed as pretty JSON instead.

use crate::analyzer::{Ec2Report, Report};
use crate::models::*;
use colored::Colorize;
use rust_decimal::Decimal;

const WIDTH: usize = 100;

pub struct ReportDisplayManager;

impl Default for ReportDisplayManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportDisplayManager {
    pub fn new() -> Self {
        Self
    }

    pub fn display_report(&self, report: &Report, json_output: bool) {
        if json_output {
            print_json(report, "report");
            return;
        }

        self.header(&format!("Amazon Keyspaces Estimate: {}", report.report_name));
        println!(
            "{} generated {}",
            "🕒".bright_blue(),
            report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string().bright_white()
        );

        for (datacenter, summary) in &report.estimate.datacenters {
            self.display_datacenter(report, datacenter, summary);
        }
        self.display_costs(&report.costs);
    }

    fn header(&self, title: &str) {
        println!("\n{}", "=".repeat(WIDTH).bright_cyan());
        println!("{}", title.bright_white().bold());
        println!("{}", "=".repeat(WIDTH).bright_cyan());
    }

    fn display_datacenter(&self, report: &Report, datacenter: &str, summary: &DatacenterSummary) {
        let region = report
            .costs
            .datacenters
            .get(datacenter)
            .map(|c| c.region.as_str())
            .unwrap_or("-");
        println!(
            "\n{} {} • {} nodes • {} samples • uptime {} days • {}",
            "📍".bright_yellow(),
            datacenter.bright_white().bold(),
            summary.number_of_nodes.to_string().bright_white().bold(),
            summary.samples.to_string().bright_white(),
            summary.stats.uptime_days.round_dp(1).to_string().bright_white(),
            region.bright_cyan()
        );

        println!(
            "   {:<40} {:>4} {:>12} {:>12} {:>10} {:>10} {:>10}",
            "Table", "RF", "Comp GB", "Stored GB", "WCU/s", "RCU/s", "TTL/s"
        );
        println!("   {}", "-".repeat(WIDTH - 3).bright_black());

        for (keyspace, usage) in report.estimate.user_keyspaces() {
            let Some(dc) = usage.datacenters.get(datacenter) else {
                continue;
            };
            for (table, table_usage) in &dc.tables {
                let scaled = &table_usage.scaled;
                println!(
                    "   {:<40} {:>4} {:>12} {:>12} {:>10} {:>10} {:>10}",
                    truncate(&format!("{}.{}", keyspace, table), 40),
                    dc.replication_factor,
                    number(scaled.compressed_gb, 2),
                    number(scaled.uncompressed_single_replica_gb, 2),
                    number(scaled.write_units_per_sec, 2),
                    number(scaled.read_units_per_sec, 2),
                    number(scaled.ttl_units_per_sec, 2),
                );
            }
            println!(
                "   {:<40} {:>4} {:>12} {:>12} {:>10} {:>10} {:>10}",
                format!("{} ({} tables)", keyspace, dc.totals.tables).bright_white().bold(),
                "",
                number(dc.totals.scaled.compressed_gb, 2),
                number(dc.totals.scaled.uncompressed_single_replica_gb, 2),
                number(dc.totals.scaled.write_units_per_sec, 2),
                number(dc.totals.scaled.read_units_per_sec, 2),
                number(dc.totals.scaled.ttl_units_per_sec, 2),
            );
            println!(
                "     avg write row {} B • avg read row {} B",
                number(dc.avg_write_row_bytes, 0),
                number(dc.avg_read_row_bytes, 0)
            );
        }

        for (label, totals) in [("System", &summary.system), ("User", &summary.user)] {
            println!(
                "   {:<8} {} tables • {} GB stored • {} WCU/s • {} RCU/s",
                label.bright_white(),
                totals.tables,
                number(totals.scaled.uncompressed_single_replica_gb, 2),
                number(totals.scaled.write_units_per_sec, 2),
                number(totals.scaled.read_units_per_sec, 2),
            );
        }

        let stats = &summary.stats;
        println!("\n   {}", "Cluster statistics".bright_white().bold());
        println!("     User tables: {}", stats.user_tables.to_string().bright_white());
        println!(
            "     Without writes: {} tables • {} GB • {} RCU/s",
            stats.tables_without_writes.tables,
            number(stats.tables_without_writes.uncompressed_single_replica_gb, 2),
            number(stats.tables_without_writes.read_units_per_sec, 2)
        );
        println!(
            "     Without reads: {} tables • {} GB • {} WCU/s • {} TTL/s",
            stats.tables_without_reads.tables,
            number(stats.tables_without_reads.uncompressed_single_replica_gb, 2),
            number(stats.tables_without_reads.write_units_per_sec, 2),
            number(stats.tables_without_reads.ttl_units_per_sec, 2)
        );
        println!(
            "     Without writes and reads: {} tables • {} GB",
            stats.tables_without_writes_and_reads.tables,
            number(stats.tables_without_writes_and_reads.uncompressed_single_replica_gb, 2)
        );
        let network = &stats.monthly_network;
        println!(
            "     Network per month: traffic {} GB • repair {} GB • gossip {} GB",
            number(network.traffic_gb, 2),
            number(network.repair_gb, 2),
            number(network.gossip_gb, 2)
        );
    }

    fn display_costs(&self, costs: &CostEstimate) {
        println!("\n{}", "Monthly cost".bright_white().bold());
        println!(
            "   {:<40} {:>14} {:>14} {:>12} {:>12}",
            "Keyspace", "On-demand", "Provisioned", "Storage", "Backup"
        );
        println!("   {}", "-".repeat(WIDTH - 3).bright_black());

        for (datacenter, dc_cost) in &costs.datacenters {
            println!(
                "   {} ({})",
                datacenter.bright_white().bold(),
                dc_cost.region.bright_cyan()
            );
            for (keyspace, ks_cost) in &dc_cost.keyspaces {
                let subtotal = &ks_cost.subtotal;
                println!(
                    "   {:<40} {:>14} {:>14} {:>12} {:>12}",
                    truncate(keyspace, 40),
                    money(subtotal.on_demand_total),
                    money(subtotal.provisioned_total),
                    money(subtotal.storage),
                    money(subtotal.backup),
                );
            }
        }

        let total = &costs.total;
        println!("   {}", "-".repeat(WIDTH - 3).bright_black());
        println!(
            "   {:<40} {:>14} {:>14} {:>12} {:>12}",
            "Total".bright_white().bold(),
            money(total.on_demand_total).bright_green().bold(),
            money(total.provisioned_total).bright_green().bold(),
            money(total.storage),
            money(total.backup),
        );
        println!(
            "\n   Provisioned reads: strong {} • eventual {}",
            money(total.provisioned_reads_strong).bright_green(),
            money(total.provisioned_reads_eventual).bright_green()
        );
        println!(
            "   On-demand: writes {} • reads {} • TTL deletes {}",
            money(total.on_demand_writes).bright_green(),
            money(total.on_demand_reads).bright_green(),
            money(total.ttl_deletes).bright_green()
        );
        println!();
    }

    pub fn display_ec2(&self, report: &Ec2Report, json_output: bool) {
        if json_output {
            print_json(report, "EC2 report");
            return;
        }

        let summary = &report.summary;
        self.header("Self-managed Cassandra on EC2");
        println!(
            "\n{} {} instances • {} volumes • {} / month • {} / year\n",
            "📊".bright_yellow(),
            summary.instances.len().to_string().bright_white().bold(),
            summary.volumes.len().to_string().bright_white().bold(),
            money(summary.monthly_total).bright_green().bold(),
            money(summary.yearly_total).bright_green().bold()
        );

        for instance in &summary.instances {
            println!(
                "   {:<22} {:<14} {:>10}/h {:>12}",
                instance.instance_id.bright_cyan(),
                instance.instance_type,
                money(instance.hourly_price),
                money(instance.monthly_compute).bright_green()
            );
        }

        if !summary.volumes.is_empty() {
            let policy = &report.snapshot_policy;
            println!(
                "\n   Volumes (snapshots: {} days retention, {}% daily change, {}% utilization)",
                policy.retention_days,
                number(policy.daily_change_rate * Decimal::ONE_HUNDRED, 1),
                number(policy.utilization * Decimal::ONE_HUNDRED, 1)
            );
            for volume in &summary.volumes {
                println!(
                    "   {:<22} {:<6} {:>10} GB {:>12} storage {:>12} snapshots",
                    volume.volume_id.bright_cyan(),
                    volume.volume_type,
                    number(volume.size_gb, 0),
                    money(volume.monthly_storage).bright_green(),
                    money(volume.snapshot.monthly).bright_green()
                );
            }
        }

        if let Some(network) = &summary.network {
            println!(
                "\n   Network out: {} GB/day • {} GB/month • {}",
                number(network.daily_gb, 2),
                number(network.monthly_gb, 2),
                money(network.monthly_cost).bright_green()
            );
        }
        println!();
    }
}

fn print_json<T: serde::Serialize>(value: &T, what: &str) {
    match serde_json::to_string_pretty(value) {
        Ok(json_str) => println!("{}", json_str),
        Err(e) => eprintln!("Error serializing {} to JSON: {}", what, e),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

fn money(value: Decimal) -> String {
    format!("${}", number(value, 2))
}

/// Fixed-point with thousands separators.
pub fn number(value: Decimal, decimals: u32) -> String {
    let formatted = format!("{:.*}", decimals as usize, value.round_dp(decimals));
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, grouped, fraction),
        None => format!("{}{}", sign, grouped),
    }
}
