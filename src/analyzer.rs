//! Estimation Pipeline
//!
//! [`CostAnalyzer`] is the entry point the CLI drives. It reads capture files, hands the text
//! to the parsers, aggregates the parsed node samples and projects costs, then passes the
//! result to the [`ReportDisplayManager`].
//!
//! ## Commands
//!
//! - **keyspaces**: one node's captures plus an optional status/schema capture, scaled to the
//!   whole cluster (the classic single-node report)
//! - **cluster**: a capture directory with several datacenters and nodes, see [`crate::samples`]
//! - **ec2**: captured EC2/EBS/CloudWatch JSON priced as a self-managed deployment
//!
//! File reads are async so the independent captures of a run load concurrently; everything
//! after parsing is synchronous and deterministic.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use cassandra_tco::analyzer::{Command, CostAnalyzer, KeyspacesRequest};
//! use cassandra_tco::config::Config;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let analyzer = CostAnalyzer::new(Config::load()?);
//! let request = KeyspacesRequest::new("tablestats.txt", "info.txt", "rowsize.txt");
//! analyzer.run_command(Command::Keyspaces(request), false).await?;
//! # Ok(())
//! # }
//! ```

use crate::aggregation::{AggregationEngine, AggregationInput};
use crate::compute::{self, Ec2CostModel, Ec2CostSummary, SnapshotPolicy};
use crate::config::Config;
use crate::display::ReportDisplayManager;
use crate::models::*;
use crate::parser;
use crate::pricing::{self, PricingCatalog};
use crate::projection::CostProjector;
use crate::samples::{self, read_input, read_optional, SampleDiscovery};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub report_name: String,
    pub generated_at: DateTime<Utc>,
    pub topology: Option<ClusterTopology>,
    pub estimate: ClusterEstimate,
    pub costs: CostEstimate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ec2Report {
    pub generated_at: DateTime<Utc>,
    pub snapshot_policy: SnapshotPolicy,
    pub summary: Ec2CostSummary,
}

#[derive(Debug, Clone)]
pub struct KeyspacesRequest {
    pub report_name: String,
    pub table_stats_file: PathBuf,
    pub info_file: PathBuf,
    pub row_size_file: PathBuf,
    pub status_file: Option<PathBuf>,
    pub schema_file: Option<PathBuf>,
    pub price_list_file: Option<PathBuf>,
    pub number_of_nodes: Option<u32>,
    pub single_keyspace: Option<String>,
    /// Datacenter the captured node belongs to, when `nodetool info` does not say.
    pub datacenter: Option<String>,
}

impl KeyspacesRequest {
    pub fn new(table_stats_file: impl Into<PathBuf>, info_file: impl Into<PathBuf>, row_size_file: impl Into<PathBuf>) -> Self {
        Self {
            report_name: "Cassandra cluster".to_string(),
            table_stats_file: table_stats_file.into(),
            info_file: info_file.into(),
            row_size_file: row_size_file.into(),
            status_file: None,
            schema_file: None,
            price_list_file: None,
            number_of_nodes: None,
            single_keyspace: None,
            datacenter: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterRequest {
    pub report_name: String,
    pub samples_dir: PathBuf,
    pub price_list_file: Option<PathBuf>,
    pub single_keyspace: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Ec2Request {
    pub instance_file: PathBuf,
    pub volume_file: Option<PathBuf>,
    pub network_metrics_file: Option<PathBuf>,
    pub snapshot_retention_days: Option<u32>,
    pub change_rate_pct: Option<Decimal>,
    pub utilization_pct: Option<Decimal>,
}

pub enum Command {
    Keyspaces(KeyspacesRequest),
    Cluster(ClusterRequest),
    Ec2(Ec2Request),
}

pub struct CostAnalyzer {
    config: Config,
    display_manager: ReportDisplayManager,
}

impl CostAnalyzer {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            display_manager: ReportDisplayManager::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run_command(&self, command: Command, json_output: bool) -> Result<()> {
        match command {
            Command::Keyspaces(request) => {
                let report = self.keyspaces_report(&request).await?;
                self.display_manager.display_report(&report, json_output);
            }
            Command::Cluster(request) => {
                let report = self.cluster_report(&request).await?;
                self.display_manager.display_report(&report, json_output);
            }
            Command::Ec2(request) => {
                let report = self.ec2_report(&request).await?;
                self.display_manager.display_ec2(&report, json_output);
            }
        }
        Ok(())
    }

    pub async fn keyspaces_report(&self, request: &KeyspacesRequest) -> Result<Report> {
        let (tablestats, info, row_sizes, status, schema, price_list) = futures::try_join!(
            read_input(&request.table_stats_file),
            read_input(&request.info_file),
            read_input(&request.row_size_file),
            read_optional(request.status_file.as_deref()),
            read_optional(request.schema_file.as_deref()),
            read_optional(request.price_list_file.as_deref()),
        )?;

        let info = parser::parse_info(&info, self.config.model.uptime_policy)
            .with_context(|| format!("Failed to parse {}", request.info_file.display()))?;
        let sample = NodeSample {
            datacenter: request.datacenter.clone(),
            node_id: info.node_id.clone().unwrap_or_else(|| "node".to_string()),
            info,
            tablestats: parser::parse_tablestats(&tablestats)?,
            row_sizes: parser::parse_row_sizes(&row_sizes)?,
        };
        let topology = status.as_deref().map(parser::parse_status).transpose()?;
        let schema = schema.as_deref().map(parser::parse_schema);
        let catalog = self.catalog(price_list.as_deref())?;

        self.build_report(
            &request.report_name,
            &[sample],
            topology,
            schema.as_ref(),
            request.number_of_nodes,
            request.single_keyspace.as_deref(),
            &catalog,
        )
    }

    pub async fn cluster_report(&self, request: &ClusterRequest) -> Result<Report> {
        let discovery = SampleDiscovery::new(&request.samples_dir);
        let files = discovery.discover()?;
        if files.is_empty() {
            anyhow::bail!(
                "No node captures found under {} (expected <datacenter>/<node>/tablestats.txt)",
                request.samples_dir.display()
            );
        }

        let status_file = discovery.status_file();
        let schema_file = discovery.schema_file();
        let (node_samples, status, schema, price_list) = futures::try_join!(
            samples::load_samples(&files, self.config.model.uptime_policy),
            read_optional(status_file.as_deref()),
            read_optional(schema_file.as_deref()),
            read_optional(request.price_list_file.as_deref()),
        )?;

        let topology = status.as_deref().map(parser::parse_status).transpose()?;
        let schema = schema.as_deref().map(parser::parse_schema);
        let catalog = self.catalog(price_list.as_deref())?;

        self.build_report(
            &request.report_name,
            &node_samples,
            topology,
            schema.as_ref(),
            None,
            request.single_keyspace.as_deref(),
            &catalog,
        )
    }

    /// Aggregate and price already-parsed captures.
    #[allow(clippy::too_many_arguments)]
    pub fn build_report(
        &self,
        report_name: &str,
        node_samples: &[NodeSample],
        topology: Option<ClusterTopology>,
        schema: Option<&SchemaInfo>,
        node_count_override: Option<u32>,
        keyspace_filter: Option<&str>,
        catalog: &PricingCatalog,
    ) -> Result<Report> {
        let engine = AggregationEngine::new(&self.config.model);
        let estimate = engine.aggregate(AggregationInput {
            samples: node_samples,
            topology: topology.as_ref(),
            schema,
            node_count_override,
            keyspace_filter,
        })?;

        if let Some(filter) = keyspace_filter {
            if !estimate.keyspaces.contains_key(filter) {
                warn!(keyspace = filter, "Requested keyspace not found in captures");
            }
        }

        let costs = CostProjector::new(&self.config.pricing, catalog).project(&estimate);
        info!(
            report = report_name,
            keyspaces = estimate.keyspaces.len(),
            datacenters = estimate.datacenters.len(),
            "Report built"
        );

        Ok(Report {
            report_name: report_name.to_string(),
            generated_at: Utc::now(),
            topology,
            estimate,
            costs,
        })
    }

    fn catalog(&self, price_list: Option<&str>) -> Result<PricingCatalog> {
        let pricing = &self.config.pricing;
        let catalog = PricingCatalog::new(pricing.regions.clone(), pricing.fallback.clone());
        match price_list {
            Some(document) => {
                let listed = pricing::parse_price_list(document).context("Failed to read price list")?;
                info!(regions = listed.len(), "Loaded price list");
                Ok(catalog.merged_with(listed))
            }
            None => Ok(catalog),
        }
    }

    pub async fn ec2_report(&self, request: &Ec2Request) -> Result<Ec2Report> {
        let (instances, volumes, metrics) = futures::try_join!(
            read_input(&request.instance_file),
            read_optional(request.volume_file.as_deref()),
            read_optional(request.network_metrics_file.as_deref()),
        )?;

        let instances = compute::parse_instances(&instances)
            .with_context(|| format!("Failed to parse {}", request.instance_file.display()))?;
        let volumes = match volumes {
            Some(document) => compute::parse_volumes(&document)?,
            None => {
                if instances.iter().any(|i| !i.volume_ids.is_empty()) {
                    warn!("Instances reference EBS volumes but no describe-volumes capture was given");
                }
                Vec::new()
            }
        };
        let network = metrics
            .as_deref()
            .map(compute::parse_network_metrics)
            .transpose()?;

        let defaults = &self.config.compute;
        let snapshot_policy = SnapshotPolicy::from_percentages(
            request.snapshot_retention_days.unwrap_or(defaults.snapshot_retention_days),
            request.change_rate_pct.unwrap_or(defaults.snapshot_change_rate_pct),
            request.utilization_pct.unwrap_or(defaults.volume_utilization_pct),
        );
        let summary = Ec2CostModel::new(defaults).estimate(&instances, &volumes, network, &snapshot_policy);

        Ok(Ec2Report {
            generated_at: Utc::now(),
            snapshot_policy,
            summary,
        })
    }
}

/// Parse `dc=region` pairs given on the command line.
pub fn parse_region_mapping(pair: &str) -> Result<(String, String)> {
    let (datacenter, region) = pair
        .split_once('=')
        .with_context(|| format!("Expected DATACENTER=REGION, got '{}'", pair))?;
    let (datacenter, region) = (datacenter.trim(), region.trim());
    if datacenter.is_empty() || region.is_empty() {
        anyhow::bail!("Expected DATACENTER=REGION, got '{}'", pair);
    }
    Ok((datacenter.to_string(), region.to_string()))
}
