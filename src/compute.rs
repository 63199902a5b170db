//! Self-managed cost model: Cassandra running on EC2 instances with EBS volumes.
//!
//! Inputs are captured `aws ec2 describe-instances`, `aws ec2 describe-volumes` and
//! `aws cloudwatch get-metric-statistics` (NetworkOut, Sum) responses. Nothing here talks to
//! AWS; the operator captures the JSON and hands it over.

use crate::config::ComputeConfig;
use crate::error::{EstimateError, Result};
use crate::models::HOURS_PER_MONTH;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Days in the month used by the snapshot daily figure.
const SNAPSHOT_DAYS_PER_MONTH: Decimal = dec!(30.4);
const TRANSFER_DAYS_PER_MONTH: Decimal = dec!(30);
const BYTES_PER_GIB: Decimal = dec!(1073741824);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    /// Upper bound of the tier in GB; `None` for the open-ended last tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_to_gb: Option<Decimal>,
    pub rate_per_gb: Decimal,
}

impl PriceTier {
    pub fn new(up_to_gb: Option<Decimal>, rate_per_gb: Decimal) -> Self {
        Self { up_to_gb, rate_per_gb }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum NetworkPricing {
    Flat { rate_per_gb: Decimal },
    /// Marginal rates, evaluated cumulatively over ascending bounds.
    Tiered { tiers: Vec<PriceTier> },
}

impl NetworkPricing {
    pub fn cost(&self, gb: Decimal) -> Decimal {
        if gb <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        match self {
            NetworkPricing::Flat { rate_per_gb } => gb * rate_per_gb,
            NetworkPricing::Tiered { tiers } => {
                let mut cost = Decimal::ZERO;
                let mut lower = Decimal::ZERO;
                for tier in tiers {
                    let upper = tier.up_to_gb.unwrap_or(gb).min(gb);
                    if upper > lower {
                        cost += (upper - lower) * tier.rate_per_gb;
                    }
                    match tier.up_to_gb {
                        Some(bound) if bound < gb => lower = bound,
                        _ => break,
                    }
                }
                cost
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            NetworkPricing::Flat { rate_per_gb } => {
                if *rate_per_gb < Decimal::ZERO {
                    return Err(anyhow::anyhow!("Network rate cannot be negative"));
                }
            }
            NetworkPricing::Tiered { tiers } => {
                if tiers.is_empty() {
                    return Err(anyhow::anyhow!("Tiered network pricing needs at least one tier"));
                }
                let mut previous = Decimal::ZERO;
                for (i, tier) in tiers.iter().enumerate() {
                    if tier.rate_per_gb < Decimal::ZERO {
                        return Err(anyhow::anyhow!("Network tier {} has a negative rate", i));
                    }
                    match tier.up_to_gb {
                        Some(bound) if bound <= previous => {
                            return Err(anyhow::anyhow!(
                                "Network tier bounds must ascend, tier {} ends at {}",
                                i,
                                bound
                            ));
                        }
                        Some(bound) => previous = bound,
                        None if i + 1 != tiers.len() => {
                            return Err(anyhow::anyhow!("Only the last network tier may be open-ended"));
                        }
                        None => {}
                    }
                }
            }
        }
        Ok(())
    }
}

/// Fractions, not percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPolicy {
    pub retention_days: u32,
    pub daily_change_rate: Decimal,
    pub utilization: Decimal,
}

impl SnapshotPolicy {
    pub fn from_percentages(retention_days: u32, change_rate_pct: Decimal, utilization_pct: Decimal) -> Self {
        Self {
            retention_days,
            daily_change_rate: change_rate_pct / dec!(100),
            utilization: utilization_pct / dec!(100),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotCost {
    pub actual_data_gb: Decimal,
    pub daily_change_gb: Decimal,
    pub total_snapshot_gb: Decimal,
    pub monthly: Decimal,
    pub daily: Decimal,
    pub yearly: Decimal,
}

/// `(u·size + d·u·size·retention) · price`.
pub fn snapshot_cost(size_gb: Decimal, policy: &SnapshotPolicy, price_per_gb_month: Decimal) -> SnapshotCost {
    let actual_data_gb = size_gb * policy.utilization;
    let daily_change_gb = actual_data_gb * policy.daily_change_rate;
    let total_snapshot_gb = actual_data_gb + daily_change_gb * Decimal::from(policy.retention_days);
    let monthly = total_snapshot_gb * price_per_gb_month;

    SnapshotCost {
        actual_data_gb,
        daily_change_gb,
        total_snapshot_gb,
        monthly,
        daily: monthly / SNAPSHOT_DAYS_PER_MONTH,
        yearly: monthly * dec!(12),
    }
}

pub fn monthly_compute(hourly_price: Decimal) -> Decimal {
    hourly_price * HOURS_PER_MONTH
}

pub fn monthly_storage(price_per_gb_month: Decimal, size_gb: Decimal) -> Decimal {
    price_per_gb_month * size_gb
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceFacts {
    pub instance_id: String,
    pub instance_type: String,
    pub availability_zone: Option<String>,
    pub volume_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeFacts {
    pub volume_id: String,
    pub volume_type: String,
    pub size_gb: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkUsage {
    pub daily_gb: Decimal,
    pub monthly_gb: Decimal,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstances {
    #[serde(default)]
    reservations: Vec<Reservation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Reservation {
    #[serde(default)]
    instances: Vec<Instance>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Instance {
    instance_id: String,
    instance_type: String,
    placement: Option<Placement>,
    #[serde(default)]
    block_device_mappings: Vec<BlockDeviceMapping>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Placement {
    availability_zone: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlockDeviceMapping {
    ebs: Option<EbsReference>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EbsReference {
    volume_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVolumes {
    #[serde(default)]
    volumes: Vec<Volume>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Volume {
    volume_id: String,
    volume_type: String,
    size: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetricStatistics {
    #[serde(default)]
    datapoints: Vec<Datapoint>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Datapoint {
    sum: Option<Decimal>,
}

fn from_json<'a, T: Deserialize<'a>>(document: &'a str, what: &str) -> Result<T> {
    serde_json::from_str(document).map_err(|e| EstimateError::format(format!("invalid {} JSON: {}", what, e)))
}

pub fn parse_instances(document: &str) -> Result<Vec<InstanceFacts>> {
    let described: DescribeInstances = from_json(document, "describe-instances")?;
    let instances: Vec<InstanceFacts> = described
        .reservations
        .into_iter()
        .flat_map(|reservation| reservation.instances)
        .map(|instance| InstanceFacts {
            instance_id: instance.instance_id,
            instance_type: instance.instance_type,
            availability_zone: instance.placement.and_then(|p| p.availability_zone),
            volume_ids: instance
                .block_device_mappings
                .into_iter()
                .filter_map(|mapping| mapping.ebs.map(|ebs| ebs.volume_id))
                .collect(),
        })
        .collect();

    if instances.is_empty() {
        return Err(EstimateError::format("describe-instances response lists no instances"));
    }
    Ok(instances)
}

pub fn parse_volumes(document: &str) -> Result<Vec<VolumeFacts>> {
    let described: DescribeVolumes = from_json(document, "describe-volumes")?;
    Ok(described
        .volumes
        .into_iter()
        .map(|volume| VolumeFacts {
            volume_id: volume.volume_id,
            volume_type: volume.volume_type,
            size_gb: Decimal::from(volume.size),
        })
        .collect())
}

/// Expects a 24 hour window of `Sum` datapoints in bytes.
pub fn parse_network_metrics(document: &str) -> Result<NetworkUsage> {
    let stats: MetricStatistics = from_json(document, "get-metric-statistics")?;
    let total_bytes: Decimal = stats.datapoints.iter().filter_map(|point| point.sum).sum();
    let daily_gb = total_bytes / BYTES_PER_GIB;
    Ok(NetworkUsage {
        daily_gb,
        monthly_gb: daily_gb * TRANSFER_DAYS_PER_MONTH,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceCost {
    pub instance_id: String,
    pub instance_type: String,
    pub hourly_price: Decimal,
    pub monthly_compute: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeCost {
    pub volume_id: String,
    pub volume_type: String,
    pub size_gb: Decimal,
    pub price_per_gb_month: Decimal,
    pub monthly_storage: Decimal,
    pub snapshot: SnapshotCost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkCost {
    pub daily_gb: Decimal,
    pub monthly_gb: Decimal,
    pub monthly_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ec2CostSummary {
    pub instances: Vec<InstanceCost>,
    pub volumes: Vec<VolumeCost>,
    pub network: Option<NetworkCost>,
    pub monthly_total: Decimal,
    pub yearly_total: Decimal,
}

pub struct Ec2CostModel<'a> {
    config: &'a ComputeConfig,
}

impl<'a> Ec2CostModel<'a> {
    pub fn new(config: &'a ComputeConfig) -> Self {
        Self { config }
    }

    pub fn instance_price(&self, instance_type: &str) -> Result<Decimal> {
        self.config
            .instance_prices
            .get(instance_type)
            .copied()
            .ok_or_else(|| EstimateError::lookup_miss("instance prices", instance_type))
    }

    /// Accepts both `gp3` and the pricing API form `ebs-gp3`.
    pub fn storage_price(&self, volume_type: &str) -> Result<Decimal> {
        let normalized = volume_type.trim().to_ascii_lowercase();
        let key = normalized.strip_prefix("ebs-").unwrap_or(&normalized);
        self.config
            .storage_prices
            .get(key)
            .copied()
            .ok_or_else(|| EstimateError::lookup_miss("storage prices", volume_type))
    }

    pub fn estimate(
        &self,
        instances: &[InstanceFacts],
        volumes: &[VolumeFacts],
        network: Option<NetworkUsage>,
        snapshot_policy: &SnapshotPolicy,
    ) -> Ec2CostSummary {
        let instances: Vec<InstanceCost> = instances
            .iter()
            .map(|instance| {
                let hourly_price = self.instance_price(&instance.instance_type).unwrap_or_else(|e| {
                    warn!(error = %e, fallback = %self.config.default_hourly_price, "Using default hourly price");
                    self.config.default_hourly_price
                });
                InstanceCost {
                    instance_id: instance.instance_id.clone(),
                    instance_type: instance.instance_type.clone(),
                    hourly_price,
                    monthly_compute: monthly_compute(hourly_price),
                }
            })
            .collect();

        let volumes: Vec<VolumeCost> = volumes
            .iter()
            .map(|volume| {
                let price = self.storage_price(&volume.volume_type).unwrap_or_else(|e| {
                    warn!(error = %e, fallback = %self.config.default_storage_price, "Using default storage price");
                    self.config.default_storage_price
                });
                VolumeCost {
                    volume_id: volume.volume_id.clone(),
                    volume_type: volume.volume_type.clone(),
                    size_gb: volume.size_gb,
                    price_per_gb_month: price,
                    monthly_storage: monthly_storage(price, volume.size_gb),
                    snapshot: snapshot_cost(volume.size_gb, snapshot_policy, self.config.snapshot_price_per_gb_month),
                }
            })
            .collect();

        let network = network.map(|usage| NetworkCost {
            daily_gb: usage.daily_gb,
            monthly_gb: usage.monthly_gb,
            monthly_cost: self.config.network.cost(usage.monthly_gb),
        });

        let monthly_total = instances.iter().map(|i| i.monthly_compute).sum::<Decimal>()
            + volumes
                .iter()
                .map(|v| v.monthly_storage + v.snapshot.monthly)
                .sum::<Decimal>()
            + network.as_ref().map(|n| n.monthly_cost).unwrap_or(Decimal::ZERO);

        debug!(
            instances = instances.len(),
            volumes = volumes.len(),
            monthly_total = %monthly_total,
            "EC2 estimate complete"
        );

        Ec2CostSummary {
            instances,
            volumes,
            network,
            monthly_total,
            yearly_total: monthly_total * dec!(12),
        }
    }
}
