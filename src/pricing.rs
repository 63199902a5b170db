//! Managed-service price tables.
//!
//! Region tables come from configuration (`[pricing.regions."us-east-1"]`) or from a captured
//! `aws pricing get-products` document. Any region or field that is missing resolves to the
//! fallback table, with a warning, so an estimate is always produced.

use crate::error::{EstimateError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, warn};

/// Complete price table: $ per request unit, per capacity-unit hour, per GB-month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceTable {
    pub read_request_unit: Decimal,
    pub write_request_unit: Decimal,
    pub ttl_delete_unit: Decimal,
    pub read_capacity_unit_hour: Decimal,
    pub write_capacity_unit_hour: Decimal,
    pub storage_gb_month: Decimal,
    pub backup_gb_month: Decimal,
}

impl Default for PriceTable {
    /// us-east-1 list prices.
    fn default() -> Self {
        Self {
            read_request_unit: dec!(0.00000029),
            write_request_unit: dec!(0.00000145),
            ttl_delete_unit: dec!(0.0000003575),
            read_capacity_unit_hour: dec!(0.00015),
            write_capacity_unit_hour: dec!(0.00075),
            storage_gb_month: dec!(0.25),
            backup_gb_month: dec!(0.20),
        }
    }
}

/// A region table where any price may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionPrices {
    pub read_request_unit: Option<Decimal>,
    pub write_request_unit: Option<Decimal>,
    pub ttl_delete_unit: Option<Decimal>,
    pub read_capacity_unit_hour: Option<Decimal>,
    pub write_capacity_unit_hour: Option<Decimal>,
    pub storage_gb_month: Option<Decimal>,
    pub backup_gb_month: Option<Decimal>,
}

impl RegionPrices {
    /// Set the field addressed by a normalized AWS usage type. Unknown types are ignored.
    fn set_usage_type(&mut self, usage_type: &str, price: Decimal) -> bool {
        let slot = match usage_type {
            "ReadRequestUnits" | "ReadUnits" => &mut self.read_request_unit,
            "WriteRequestUnits" | "WriteUnits" => &mut self.write_request_unit,
            "TTLDeletes" | "TimeToLive" => &mut self.ttl_delete_unit,
            "ReadCapacityUnitHrs" => &mut self.read_capacity_unit_hour,
            "WriteCapacityUnitHrs" => &mut self.write_capacity_unit_hour,
            "TimedStorageByteHrs" => &mut self.storage_gb_month,
            "TimedPITRStorageByteHrs" => &mut self.backup_gb_month,
            _ => return false,
        };
        *slot = Some(price);
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct PricingCatalog {
    regions: BTreeMap<String, RegionPrices>,
    fallback: PriceTable,
}

impl PricingCatalog {
    pub fn new(regions: BTreeMap<String, RegionPrices>, fallback: PriceTable) -> Self {
        Self { regions, fallback }
    }

    /// Regions from a price list layered over the configured ones; the price list wins per field.
    pub fn merged_with(mut self, other: BTreeMap<String, RegionPrices>) -> Self {
        for (region, prices) in other {
            let entry = self.regions.entry(region).or_default();
            macro_rules! overlay {
                ($($field:ident),*) => {
                    $(if prices.$field.is_some() { entry.$field = prices.$field; })*
                };
            }
            overlay!(
                read_request_unit,
                write_request_unit,
                ttl_delete_unit,
                read_capacity_unit_hour,
                write_capacity_unit_hour,
                storage_gb_month,
                backup_gb_month
            );
        }
        self
    }

    pub fn region(&self, region: &str) -> Result<&RegionPrices> {
        self.regions
            .get(region)
            .ok_or_else(|| EstimateError::lookup_miss("region prices", region))
    }

    pub fn regions(&self) -> impl Iterator<Item = &String> {
        self.regions.keys()
    }

    /// Complete table for a region; misses are logged and filled from the fallback.
    pub fn resolve(&self, region: &str) -> PriceTable {
        let prices = match self.region(region) {
            Ok(prices) => prices,
            Err(e) => {
                warn!(region, error = %e, "Using fallback prices for region");
                return self.fallback.clone();
            }
        };

        let fallback = &self.fallback;
        let pick = |field: &str, value: Option<Decimal>, default: Decimal| {
            value.unwrap_or_else(|| {
                warn!(region, field, fallback = %default, "Missing price, using fallback");
                default
            })
        };

        PriceTable {
            read_request_unit: pick("read_request_unit", prices.read_request_unit, fallback.read_request_unit),
            write_request_unit: pick("write_request_unit", prices.write_request_unit, fallback.write_request_unit),
            ttl_delete_unit: pick("ttl_delete_unit", prices.ttl_delete_unit, fallback.ttl_delete_unit),
            read_capacity_unit_hour: pick(
                "read_capacity_unit_hour",
                prices.read_capacity_unit_hour,
                fallback.read_capacity_unit_hour,
            ),
            write_capacity_unit_hour: pick(
                "write_capacity_unit_hour",
                prices.write_capacity_unit_hour,
                fallback.write_capacity_unit_hour,
            ),
            storage_gb_month: pick("storage_gb_month", prices.storage_gb_month, fallback.storage_gb_month),
            backup_gb_month: pick("backup_gb_month", prices.backup_gb_month, fallback.backup_gb_month),
        }
    }
}

/// `USE1-TimedStorage-ByteHrs` → `TimedStorageByteHrs`.
pub fn normalize_usage_type(usage_type: &str) -> String {
    match usage_type.split_once('-') {
        Some((_region, rest)) => rest.replace('-', ""),
        None => usage_type.to_string(),
    }
}

/// Region tables from an `aws pricing get-products --service-code AmazonMCS` response.
///
/// `PriceList` entries may be JSON strings (CLI output) or inline objects. Entries without a
/// region, usage type or USD price are skipped; a later duplicate wins.
pub fn parse_price_list(document: &str) -> Result<BTreeMap<String, RegionPrices>> {
    let root: Value = serde_json::from_str(document)
        .map_err(|e| EstimateError::format(format!("price list is not valid JSON: {}", e)))?;
    let items = root
        .get("PriceList")
        .and_then(Value::as_array)
        .ok_or_else(|| EstimateError::format("price list has no PriceList array"))?;

    let mut regions: BTreeMap<String, RegionPrices> = BTreeMap::new();
    for item in items {
        let parsed;
        let product = match item {
            Value::String(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(value) => {
                    parsed = value;
                    &parsed
                }
                Err(e) => {
                    debug!(error = %e, "Skipping unparseable price list entry");
                    continue;
                }
            },
            other => other,
        };

        let attributes = &product["product"]["attributes"];
        let (Some(region), Some(usage_type)) = (
            attributes["regionCode"].as_str(),
            attributes["usagetype"].as_str(),
        ) else {
            continue;
        };
        let Some(price) = first_usd_price(product) else {
            continue;
        };

        let normalized = normalize_usage_type(usage_type);
        if !regions.entry(region.to_string()).or_default().set_usage_type(&normalized, price) {
            debug!(region, usage_type = %normalized, "Ignoring unrelated usage type");
        }
    }

    regions.retain(|_, prices| *prices != RegionPrices::default());
    Ok(regions)
}

fn first_usd_price(product: &Value) -> Option<Decimal> {
    let term = product["terms"]["OnDemand"].as_object()?.values().next()?;
    let dimension = term["priceDimensions"].as_object()?.values().next()?;
    let usd = dimension["pricePerUnit"]["USD"].as_str()?;
    Decimal::from_str(usd).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(region: &str, usage_type: &str, usd: &str) -> String {
        serde_json::json!({
            "product": {"attributes": {"regionCode": region, "usagetype": usage_type}},
            "terms": {"OnDemand": {"T1": {"priceDimensions": {"D1": {"pricePerUnit": {"USD": usd}}}}}}
        })
        .to_string()
    }

    #[test]
    fn test_normalize_usage_type() {
        assert_eq!(normalize_usage_type("USE1-TimedStorage-ByteHrs"), "TimedStorageByteHrs");
        assert_eq!(normalize_usage_type("MCS-ReadUnits"), "ReadUnits");
        assert_eq!(normalize_usage_type("TTLDeletes"), "TTLDeletes");
    }

    #[test]
    fn test_parse_price_list_string_entries() {
        let doc = serde_json::json!({
            "PriceList": [
                product("eu-west-1", "EU-WriteRequestUnits", "0.0000016"),
                product("eu-west-1", "EU-TimedStorage-ByteHrs", "0.27"),
                product("eu-west-1", "EU-DataTransfer-Out-Bytes", "0.09"),
                "not json",
            ]
        })
        .to_string();

        let regions = parse_price_list(&doc).unwrap();
        let eu = &regions["eu-west-1"];
        assert_eq!(eu.write_request_unit, Some(dec!(0.0000016)));
        assert_eq!(eu.storage_gb_month, Some(dec!(0.27)));
        assert_eq!(eu.read_request_unit, None);
    }

    #[test]
    fn test_resolve_falls_back_per_field_and_per_region() {
        let mut regions = BTreeMap::new();
        regions.insert(
            "eu-west-1".to_string(),
            RegionPrices {
                storage_gb_month: Some(dec!(0.30)),
                ..Default::default()
            },
        );
        let catalog = PricingCatalog::new(regions, PriceTable::default());

        let eu = catalog.resolve("eu-west-1");
        assert_eq!(eu.storage_gb_month, dec!(0.30));
        assert_eq!(eu.write_request_unit, PriceTable::default().write_request_unit);

        assert!(matches!(
            catalog.region("ap-south-1"),
            Err(EstimateError::LookupMiss { .. })
        ));
        assert_eq!(catalog.resolve("ap-south-1"), PriceTable::default());
    }

    #[test]
    fn test_merge_prefers_price_list_fields() {
        let mut configured = BTreeMap::new();
        configured.insert(
            "us-east-1".to_string(),
            RegionPrices {
                storage_gb_month: Some(dec!(1)),
                backup_gb_month: Some(dec!(2)),
                ..Default::default()
            },
        );
        let mut listed = BTreeMap::new();
        listed.insert(
            "us-east-1".to_string(),
            RegionPrices {
                storage_gb_month: Some(dec!(0.25)),
                ..Default::default()
            },
        );

        let catalog = PricingCatalog::new(configured, PriceTable::default()).merged_with(listed);
        let table = catalog.resolve("us-east-1");
        assert_eq!(table.storage_gb_month, dec!(0.25));
        assert_eq!(table.backup_gb_month, dec!(2));
    }
}
