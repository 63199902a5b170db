//! Line-oriented extraction from `nodetool` and `cqlsh` captures.
//!
//! Every capture format gets a [`LineScanner`]: a small state machine fed one line at a time
//! and finalized into its record type. Scanners never fail on a malformed data line; they
//! skip it or fall back to a documented default. The only hard failures are the ones the
//! caller must hear about, such as a missing uptime under [`UptimePolicy::Strict`].
//!
//! Each `parse_*` helper builds a fresh scanner, so running it twice over the same text
//! yields identical records.

pub mod info;
pub mod row_size;
pub mod schema;
pub mod status;
pub mod tablestats;

use crate::config::UptimePolicy;
use crate::error::Result;
use crate::models::{ClusterTopology, NodeInfo, RowSizeTable, SchemaInfo, Tablestats};

pub use info::InfoScanner;
pub use row_size::RowSizeScanner;
pub use status::StatusScanner;
pub use tablestats::TablestatsScanner;

/// Incremental processor for one capture format.
pub trait LineScanner {
    type Output;

    fn scan_line(&mut self, line: &str, line_number: usize) -> Result<()>;
    fn finish(self) -> Result<Self::Output>;
}

/// Drive a scanner over every line of `text`.
pub fn scan_text<S: LineScanner>(text: &str, mut scanner: S) -> Result<S::Output> {
    for (index, line) in text.lines().enumerate() {
        scanner.scan_line(line, index + 1)?;
    }
    scanner.finish()
}

/// Parse `nodetool info`.
pub fn parse_info(text: &str, policy: UptimePolicy) -> Result<NodeInfo> {
    scan_text(text, InfoScanner::new(policy))
}

/// Parse `nodetool tablestats` (or `cfstats`).
pub fn parse_tablestats(text: &str) -> Result<Tablestats> {
    scan_text(text, TablestatsScanner::default())
}

/// Parse `nodetool status`.
pub fn parse_status(text: &str) -> Result<ClusterTopology> {
    scan_text(text, StatusScanner::default())
}

/// Parse row-size sampler output (`ks.table = { lines: 10, average: 849 bytes, ... }`).
pub fn parse_row_sizes(text: &str) -> Result<RowSizeTable> {
    scan_text(text, RowSizeScanner::default())
}

/// Parse `cqlsh -e 'DESCRIBE SCHEMA'` output.
pub fn parse_schema(text: &str) -> SchemaInfo {
    schema::parse(text)
}

/// Value after the first colon, trimmed.
pub(crate) fn value_after_colon(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, value)| value.trim())
}
