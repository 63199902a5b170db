use anyhow::Result;
use cassandra_tco::analyzer::{
    parse_region_mapping, ClusterRequest, Command, CostAnalyzer, Ec2Request, KeyspacesRequest,
};
use cassandra_tco::config::Config;
use cassandra_tco::logging;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::process;
use tracing::Instrument;

#[derive(Parser)]
#[command(name = "cassandra-tco")]
#[command(about = "Estimate Amazon Keyspaces and EC2 costs from Cassandra diagnostics")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./cassandra-tco.toml, then the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate Keyspaces cost from one node's captures
    Keyspaces {
        /// `nodetool tablestats` output
        #[arg(long)]
        table_stats_file: PathBuf,
        /// `nodetool info` output
        #[arg(long)]
        info_file: PathBuf,
        /// Row size sample output
        #[arg(long)]
        row_size_file: PathBuf,
        /// `nodetool status` output, supplies node counts per datacenter
        #[arg(long)]
        status_file: Option<PathBuf>,
        /// `DESCRIBE SCHEMA` output, supplies replication factors
        #[arg(long)]
        schema_file: Option<PathBuf>,
        /// Nodes in the datacenter, overrides the status capture
        #[arg(long)]
        number_of_nodes: Option<u32>,
        /// Only estimate this keyspace
        #[arg(long)]
        single_keyspace: Option<String>,
        /// Region mapping DATACENTER=REGION, or a bare REGION for every datacenter
        #[arg(long)]
        region: Vec<String>,
        /// Datacenter of the captured node
        #[arg(long)]
        datacenter: Option<String>,
        /// AWS Price List JSON for Amazon Keyspaces
        #[arg(long)]
        price_list: Option<PathBuf>,
        /// Name shown in the report header
        #[arg(long, default_value = "Cassandra cluster")]
        report_name: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Estimate Keyspaces cost from a multi-datacenter capture directory
    Cluster {
        /// Directory laid out as <datacenter>/<node>/{tablestats,info,rowsize}.txt
        #[arg(long)]
        samples_dir: PathBuf,
        /// Region mapping DATACENTER=REGION, or a bare REGION for every datacenter
        #[arg(long)]
        region: Vec<String>,
        /// Only estimate this keyspace
        #[arg(long)]
        single_keyspace: Option<String>,
        /// AWS Price List JSON for Amazon Keyspaces
        #[arg(long)]
        price_list: Option<PathBuf>,
        /// Name shown in the report header
        #[arg(long, default_value = "Cassandra cluster")]
        report_name: String,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
    /// Estimate self-managed cost on EC2 from AWS CLI captures
    Ec2 {
        /// `aws ec2 describe-instances` JSON
        #[arg(long)]
        instance_file: PathBuf,
        /// `aws ec2 describe-volumes` JSON
        #[arg(long)]
        volume_file: Option<PathBuf>,
        /// `aws cloudwatch get-metric-statistics` JSON for NetworkOut
        #[arg(long)]
        network_metrics_file: Option<PathBuf>,
        /// Snapshot retention in days
        #[arg(long)]
        snapshot_retention: Option<u32>,
        /// Daily change rate in percent
        #[arg(long)]
        change_rate: Option<Decimal>,
        /// Volume utilization in percent
        #[arg(long)]
        utilization: Option<Decimal>,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Keyspaces { .. } => "keyspaces",
            Commands::Cluster { .. } => "cluster",
            Commands::Ec2 { .. } => "ec2",
        }
    }

    fn json(&self) -> bool {
        match self {
            Commands::Keyspaces { json, .. } | Commands::Cluster { json, .. } | Commands::Ec2 { json, .. } => *json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = cli.command.json();

    let mut config = match Config::load_with(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return handle_error(e, json),
    };
    let _guard = logging::init_logging(&config.logging, &config.paths.log_directory);
    let span = logging::run_span(cli.command.name());

    let command = match into_command(cli.command, &mut config) {
        Ok(command) => command,
        Err(e) => return handle_error(e, json),
    };

    let analyzer = CostAnalyzer::new(config);
    match analyzer.run_command(command, json).instrument(span).await {
        Ok(_) => Ok(()),
        Err(e) => handle_error(e, json),
    }
}

fn apply_regions(config: &mut Config, regions: Vec<String>) -> Result<()> {
    for entry in regions {
        if entry.contains('=') {
            let (datacenter, region) = parse_region_mapping(&entry)?;
            config.pricing.datacenter_regions.insert(datacenter, region);
        } else {
            config.pricing.default_region = entry.trim().to_string();
        }
    }
    Ok(())
}

fn into_command(command: Commands, config: &mut Config) -> Result<Command> {
    Ok(match command {
        Commands::Keyspaces {
            table_stats_file,
            info_file,
            row_size_file,
            status_file,
            schema_file,
            number_of_nodes,
            single_keyspace,
            region,
            datacenter,
            price_list,
            report_name,
            json: _,
        } => {
            apply_regions(config, region)?;
            Command::Keyspaces(KeyspacesRequest {
                report_name,
                table_stats_file,
                info_file,
                row_size_file,
                status_file,
                schema_file,
                price_list_file: price_list,
                number_of_nodes,
                single_keyspace,
                datacenter,
            })
        }
        Commands::Cluster {
            samples_dir,
            region,
            single_keyspace,
            price_list,
            report_name,
            json: _,
        } => {
            apply_regions(config, region)?;
            Command::Cluster(ClusterRequest {
                report_name,
                samples_dir,
                price_list_file: price_list,
                single_keyspace,
            })
        }
        Commands::Ec2 {
            instance_file,
            volume_file,
            network_metrics_file,
            snapshot_retention,
            change_rate,
            utilization,
            json: _,
        } => Command::Ec2(Ec2Request {
            instance_file,
            volume_file,
            network_metrics_file,
            snapshot_retention_days: snapshot_retention,
            change_rate_pct: change_rate,
            utilization_pct: utilization,
        }),
    })
}

fn handle_error(e: anyhow::Error, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
