use super::LineScanner;
use crate::config::UptimePolicy;
use crate::error::{EstimateError, Result};
use crate::models::NodeInfo;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, warn};

const UPTIME_MARKER: &str = "Uptime (seconds)";

pub struct InfoScanner {
    policy: UptimePolicy,
    uptime_seconds: Option<Decimal>,
    datacenter: Option<String>,
    node_id: Option<String>,
}

impl InfoScanner {
    pub fn new(policy: UptimePolicy) -> Self {
        Self {
            policy,
            uptime_seconds: None,
            datacenter: None,
            node_id: None,
        }
    }

    fn reject_uptime(&self, raw: &str, line_number: usize) -> Result<Decimal> {
        match self.policy {
            UptimePolicy::Strict => Err(EstimateError::format(format!(
                "line {}: cannot parse uptime '{}'",
                line_number, raw
            ))),
            UptimePolicy::Lenient => {
                warn!(line_number, raw, "Unparseable uptime, assuming one second");
                Ok(Decimal::ONE)
            }
        }
    }
}

impl LineScanner for InfoScanner {
    type Output = NodeInfo;

    fn scan_line(&mut self, line: &str, line_number: usize) -> Result<()> {
        let line = line.trim();
        let Some((key, value)) = line.split_once(':') else {
            return Ok(());
        };
        let value = value.trim();

        if line.contains(UPTIME_MARKER) {
            let uptime = match Decimal::from_str(value) {
                Ok(seconds) if seconds >= Decimal::ZERO => seconds,
                _ => self.reject_uptime(value, line_number)?,
            };
            debug!(uptime_seconds = %uptime, "Found node uptime");
            self.uptime_seconds = Some(uptime);
            return Ok(());
        }

        match key.trim() {
            "Data Center" if !value.is_empty() => self.datacenter = Some(value.to_string()),
            "ID" if !value.is_empty() => self.node_id = Some(value.to_string()),
            _ => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<NodeInfo> {
        let uptime_seconds = match (self.uptime_seconds, self.policy) {
            (Some(seconds), _) => seconds,
            (None, UptimePolicy::Strict) => {
                return Err(EstimateError::format(format!(
                    "no '{}' line in nodetool info output",
                    UPTIME_MARKER
                )))
            }
            (None, UptimePolicy::Lenient) => {
                warn!("No uptime in nodetool info output, assuming one second");
                Decimal::ONE
            }
        };

        Ok(NodeInfo {
            uptime_seconds,
            datacenter: self.datacenter,
            node_id: self.node_id,
        })
    }
}
