//! Production configuration system
//!
//! Provides centralized configuration management with:
//! - Environment variable support
//! - Config file loading (optional)
//! - Runtime defaults for every model constant and price
//! - Validation and type safety
//!
//! Nothing in the estimation core reads globals: the loaded [`Config`] is passed down
//! explicitly, so tests can build one with [`Config::default`] and tweak fields.

use crate::compute::{NetworkPricing, PriceTier};
use crate::pricing::{PriceTable, RegionPrices};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Paths configuration
    pub paths: PathsConfig,

    /// Capacity model constants
    pub model: ModelConfig,

    /// Managed-service price tables
    pub pricing: PricingConfig,

    /// EC2 self-managed cost model
    pub compute: ComputeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "WARN".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
        }
    }
}

/// What to do when `nodetool info` has no usable uptime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UptimePolicy {
    /// Missing or malformed uptime is a format error.
    #[default]
    Strict,
    /// Missing or malformed uptime counts as one second.
    Lenient,
}

impl FromStr for UptimePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(UptimePolicy::Strict),
            "lenient" => Ok(UptimePolicy::Lenient),
            other => Err(anyhow::anyhow!("Unknown uptime policy '{}', expected strict or lenient", other)),
        }
    }
}

impl fmt::Display for UptimePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UptimePolicy::Strict => f.write_str("strict"),
            UptimePolicy::Lenient => f.write_str("lenient"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub default_replication_factor: u32,
    /// Reads are spread over `rf - read_replica_offset` replicas.
    pub read_replica_offset: u32,
    pub traffic_fanout: Decimal,
    pub row_overhead_bytes: Decimal,
    pub repair_fraction: Decimal,
    pub write_unit_bytes: Decimal,
    pub read_unit_bytes: Decimal,
    pub gossip_out_bytes_per_sec: Decimal,
    pub gossip_in_bytes_per_sec: Decimal,
    pub uptime_policy: UptimePolicy,
    pub system_keyspaces: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_replication_factor: 3,
            read_replica_offset: 1,
            traffic_fanout: dec!(2),
            row_overhead_bytes: dec!(100),
            repair_fraction: dec!(0.05),
            write_unit_bytes: dec!(1024),
            read_unit_bytes: dec!(4096),
            gossip_out_bytes_per_sec: dec!(1638),
            gossip_in_bytes_per_sec: dec!(3072),
            uptime_policy: UptimePolicy::Strict,
            system_keyspaces: DEFAULT_SYSTEM_KEYSPACES
                .iter()
                .map(|ks| ks.to_string())
                .collect(),
        }
    }
}

impl ModelConfig {
    pub fn is_system_keyspace(&self, keyspace: &str) -> bool {
        self.system_keyspaces.iter().any(|ks| ks == keyspace)
    }
}

const DEFAULT_SYSTEM_KEYSPACES: &[&str] = &[
    "OpsCenter",
    "dse_insights_local",
    "solr_admin",
    "dse_system",
    "HiveMetaStore",
    "system_auth",
    "dse_analytics",
    "system_traces",
    "dse_audit",
    "system",
    "dse_system_local",
    "dsefs",
    "system_distributed",
    "system_schema",
    "dse_perf",
    "dse_insights",
    "system_backups",
    "dse_security",
    "dse_leases",
    "system_distributed_everywhere",
    "reaper_db",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub default_region: String,
    /// Datacenter name → region code.
    pub datacenter_regions: BTreeMap<String, String>,
    pub target_utilization: Decimal,
    pub include_system_keyspaces: bool,
    pub backups_enabled: bool,
    /// `keyspace.table` names excluded from point-in-time backup.
    pub backup_disabled_tables: Vec<String>,
    /// Used field by field whenever a region table lacks a price.
    pub fallback: PriceTable,
    pub regions: BTreeMap<String, RegionPrices>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_region: "us-east-1".to_string(),
            datacenter_regions: BTreeMap::new(),
            target_utilization: Decimal::ONE,
            include_system_keyspaces: false,
            backups_enabled: true,
            backup_disabled_tables: Vec::new(),
            fallback: PriceTable::default(),
            regions: BTreeMap::new(),
        }
    }
}

impl PricingConfig {
    pub fn region_for(&self, datacenter: &str) -> &str {
        self.datacenter_regions
            .get(datacenter)
            .map(String::as_str)
            .unwrap_or(&self.default_region)
    }

    pub fn backup_enabled_for(&self, keyspace: &str, table: &str) -> bool {
        if !self.backups_enabled {
            return false;
        }
        let name = format!("{}.{}", keyspace, table);
        !self.backup_disabled_tables.iter().any(|t| *t == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeConfig {
    pub default_hourly_price: Decimal,
    pub instance_prices: BTreeMap<String, Decimal>,
    /// Volume type (`gp3`, `ebs-gp3`, ...) → $ per GB-month.
    pub storage_prices: BTreeMap<String, Decimal>,
    pub default_storage_price: Decimal,
    pub snapshot_price_per_gb_month: Decimal,
    pub snapshot_retention_days: u32,
    pub snapshot_change_rate_pct: Decimal,
    pub volume_utilization_pct: Decimal,
    pub network: NetworkPricing,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        let mut instance_prices = BTreeMap::new();
        instance_prices.insert("c5.4xlarge".to_string(), dec!(0.68));

        let mut storage_prices = BTreeMap::new();
        storage_prices.insert("gp2".to_string(), dec!(0.10));
        storage_prices.insert("gp3".to_string(), dec!(0.08));
        storage_prices.insert("io1".to_string(), dec!(0.125));
        storage_prices.insert("io2".to_string(), dec!(0.125));

        Self {
            default_hourly_price: dec!(0.68),
            instance_prices,
            storage_prices,
            default_storage_price: dec!(0.10),
            snapshot_price_per_gb_month: dec!(0.05),
            snapshot_retention_days: 7,
            snapshot_change_rate_pct: dec!(5),
            volume_utilization_pct: dec!(50),
            network: NetworkPricing::Tiered {
                tiers: vec![
                    PriceTier::new(Some(dec!(100)), dec!(0)),
                    PriceTier::new(Some(dec!(10240)), dec!(0.09)),
                    PriceTier::new(Some(dec!(51200)), dec!(0.085)),
                    PriceTier::new(None, dec!(0.08)),
                ],
            },
        }
    }
}

impl Config {
    /// Load configuration from environment, file, and defaults
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Like [`Config::load`], but an explicit file wins over the search path.
    pub fn load_with(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => {
                info!(config_file = %path.display(), "Loading configuration from file");
                Self::load_from_file(path)?
            }
            None => Self::load_from_search_path()?,
        };

        // Override with environment variables
        config.apply_env_overrides()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    fn load_from_search_path() -> Result<Self> {
        let config_paths = [
            PathBuf::from("cassandra-tco.toml"),
            PathBuf::from(".cassandra-tco.toml"),
            dirs::config_dir()
                .map(|d| d.join("cassandra-tco").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                info!(config_file = %path.display(), "Loading configuration from file");
                return Self::load_from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }
        if let Ok(val) = env::var("CASSANDRA_TCO_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        // Model overrides
        if let Ok(val) = env::var("CASSANDRA_TCO_REPLICATION_FACTOR") {
            self.model.default_replication_factor = val
                .parse()
                .context("Invalid CASSANDRA_TCO_REPLICATION_FACTOR")?;
        }
        if let Ok(val) = env::var("CASSANDRA_TCO_UPTIME_POLICY") {
            self.model.uptime_policy = val
                .parse()
                .context("Invalid CASSANDRA_TCO_UPTIME_POLICY")?;
        }

        // Pricing overrides
        if let Ok(val) = env::var("CASSANDRA_TCO_REGION") {
            self.pricing.default_region = val;
        }
        if let Ok(val) = env::var("CASSANDRA_TCO_TARGET_UTILIZATION") {
            self.pricing.target_utilization = val
                .parse()
                .context("Invalid CASSANDRA_TCO_TARGET_UTILIZATION")?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let model = &self.model;
        if model.default_replication_factor == 0 {
            return Err(anyhow::anyhow!("Default replication factor must be at least 1"));
        }
        if model.write_unit_bytes <= Decimal::ZERO || model.read_unit_bytes <= Decimal::ZERO {
            return Err(anyhow::anyhow!(
                "Capacity unit sizes must be positive, got write={} read={}",
                model.write_unit_bytes,
                model.read_unit_bytes
            ));
        }
        if model.traffic_fanout < Decimal::ZERO || model.row_overhead_bytes < Decimal::ZERO {
            return Err(anyhow::anyhow!("Traffic fanout and row overhead cannot be negative"));
        }
        if model.repair_fraction < Decimal::ZERO || model.repair_fraction > Decimal::ONE {
            return Err(anyhow::anyhow!(
                "Repair fraction must be between 0 and 1, got {}",
                model.repair_fraction
            ));
        }
        if model.system_keyspaces.is_empty() {
            warn!("No system keyspaces configured, every keyspace will be priced as user data");
        }

        let utilization = self.pricing.target_utilization;
        if utilization <= Decimal::ZERO || utilization > Decimal::ONE {
            return Err(anyhow::anyhow!(
                "Target utilization must be in (0, 1], got {}",
                utilization
            ));
        }

        self.compute.network.validate()?;

        // Validate paths exist (create if needed)
        let writes_files = matches!(self.logging.output.as_str(), "file" | "both");
        if writes_files && !self.paths.log_directory.exists() {
            fs::create_dir_all(&self.paths.log_directory)
                .context("Failed to create log directory")?;
        }

        Ok(())
    }

    /// Save current configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        info!(path = %path.display(), "Configuration saved to file");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "WARN");
        assert_eq!(config.model.default_replication_factor, 3);
        assert_eq!(config.model.uptime_policy, UptimePolicy::Strict);
        assert!(config.model.is_system_keyspace("system_schema"));
        assert!(!config.model.is_system_keyspace("app"));
        assert_eq!(config.pricing.region_for("dc1"), "us-east-1");
    }

    #[test]
    fn test_env_override() {
        env::set_var("CASSANDRA_TCO_REPLICATION_FACTOR", "5");
        let mut config = Config::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.model.default_replication_factor, 5);
        env::remove_var("CASSANDRA_TCO_REPLICATION_FACTOR");
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.model.default_replication_factor = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pricing.target_utilization = dec!(1.5);
        assert!(config.validate().is_err());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_backup_opt_out() {
        let mut config = Config::default();
        config.pricing.backup_disabled_tables = vec!["app.events".to_string()];
        assert!(!config.pricing.backup_enabled_for("app", "events"));
        assert!(config.pricing.backup_enabled_for("app", "users"));

        config.pricing.backups_enabled = false;
        assert!(!config.pricing.backup_enabled_for("app", "users"));
    }
}
