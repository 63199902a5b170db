use super::LineScanner;
use crate::error::Result;
use crate::models::{ClusterTopology, DatacenterStatus, NodeStatus};
use crate::units::SizeToken;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;
use tracing::debug;

/// `UN  10.0.0.1  1.2 GiB  256  ?  <host id>  rack1`
static NODE_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*[UD][NLJMRS*]?\s+(?P<ip>\d+\.\d+\.\d+\.\d+)\s+(?P<load>\d+(?:\.\d+)?\s+[kmgpt]iB).*?(?P<hostid>[0-9a-f\-]{36})",
    )
    .unwrap()
});

const DATACENTER_MARKER: &str = "datacenter:";

#[derive(Default)]
pub struct StatusScanner {
    datacenters: Vec<(String, DatacenterStatus)>,
    current: Option<usize>,
}

impl LineScanner for StatusScanner {
    type Output = ClusterTopology;

    fn scan_line(&mut self, line: &str, line_number: usize) -> Result<()> {
        let trimmed = line.trim();
        let is_marker = trimmed
            .get(..DATACENTER_MARKER.len())
            .map(|prefix| prefix.eq_ignore_ascii_case(DATACENTER_MARKER))
            .unwrap_or(false);
        if is_marker {
            let name = trimmed[DATACENTER_MARKER.len()..].trim();
            self.current = if name.is_empty() {
                None
            } else {
                let index = match self.datacenters.iter().position(|(dc, _)| dc == name) {
                    Some(index) => index,
                    None => {
                        self.datacenters.push((name.to_string(), DatacenterStatus::default()));
                        self.datacenters.len() - 1
                    }
                };
                Some(index)
            };
            return Ok(());
        }

        let Some(index) = self.current else {
            return Ok(());
        };
        let Some(caps) = NODE_ROW.captures(line) else {
            return Ok(());
        };

        let load_gib = match SizeToken::from_str(&caps["load"]) {
            Ok(token) => token.to_gib().round_dp(2),
            Err(e) => {
                debug!(line_number, error = %e, "Skipping node row with unreadable load");
                return Ok(());
            }
        };
        let status = &mut self.datacenters[index].1;
        status.nodes.push(NodeStatus {
            ip: caps["ip"].to_string(),
            load_gib,
            host_id: caps["hostid"].to_string(),
        });
        status.node_count += 1;
        Ok(())
    }

    fn finish(self) -> Result<ClusterTopology> {
        Ok(ClusterTopology {
            datacenters: self.datacenters,
        })
    }
}
