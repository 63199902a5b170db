use super::{value_after_colon, LineScanner};
use crate::error::Result;
use crate::models::{TableStat, Tablestats};
use crate::units::SizeToken;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

const SPACE_USED: &str = "Space used (live):";
const COMPRESSION_RATIO: &str = "SSTable Compression Ratio:";
const READ_COUNT: &str = "Local read count:";
const WRITE_COUNT: &str = "Local write count:";

/// Tracks the current keyspace and table and the four metrics of the open table block.
/// A block is emitted on its write-count line once all four metrics are present.
#[derive(Default)]
pub struct TablestatsScanner {
    result: Tablestats,
    keyspace: Option<String>,
    table: Option<String>,
    space_used: Option<Decimal>,
    compression_ratio: Option<Decimal>,
    read_count: Option<Decimal>,
    write_count: Option<Decimal>,
}

impl TablestatsScanner {
    fn reset_metrics(&mut self) {
        self.space_used = None;
        self.compression_ratio = None;
        self.read_count = None;
        self.write_count = None;
    }

    fn emit_if_complete(&mut self) {
        let (Some(keyspace), Some(table)) = (self.keyspace.as_ref(), self.table.as_ref()) else {
            return;
        };
        let (Some(space), Some(ratio), Some(reads), Some(writes)) = (
            self.space_used,
            self.compression_ratio,
            self.read_count,
            self.write_count,
        ) else {
            return;
        };

        let stat = TableStat {
            keyspace: keyspace.clone(),
            table: table.clone(),
            compressed_bytes: space,
            compression_ratio: ratio,
            local_read_count: reads,
            local_write_count: writes,
        };
        let replaced = self
            .result
            .keyspaces
            .entry(keyspace.clone())
            .or_default()
            .insert(table.clone(), stat);
        if replaced.is_some() {
            debug!(keyspace = %keyspace, table = %table, "Table reported twice, keeping the later block");
        }

        self.table = None;
        self.reset_metrics();
    }
}

/// Plain byte count, or a human-readable size from `tablestats -H`.
fn parse_space(raw: &str) -> Decimal {
    Decimal::from_str(raw)
        .ok()
        .or_else(|| SizeToken::from_str(raw).ok().map(|token| token.to_bytes()))
        .unwrap_or_else(|| {
            debug!(raw, "Unparseable space used, defaulting to 0");
            Decimal::ZERO
        })
}

fn parse_or(raw: &str, default: Decimal) -> Decimal {
    Decimal::from_str(raw).unwrap_or(default)
}

impl LineScanner for TablestatsScanner {
    type Output = Tablestats;

    fn scan_line(&mut self, line: &str, _line_number: usize) -> Result<()> {
        let line = line.trim();

        if line.starts_with("Keyspace") {
            self.keyspace = value_after_colon(line).map(str::to_string);
            if let Some(keyspace) = &self.keyspace {
                self.result.keyspaces.entry(keyspace.clone()).or_default();
            }
            self.table = None;
            return Ok(());
        }

        if self.keyspace.is_none() {
            return Ok(());
        }

        if line.starts_with("Table:") || line.starts_with("Table (index):") {
            self.table = value_after_colon(line).map(str::to_string);
            self.reset_metrics();
            return Ok(());
        }

        if self.table.is_none() {
            return Ok(());
        }

        let Some(value) = value_after_colon(line) else {
            return Ok(());
        };
        if line.contains(SPACE_USED) {
            self.space_used = Some(parse_space(value));
        } else if line.contains(COMPRESSION_RATIO) {
            self.compression_ratio = Some(parse_or(value, Decimal::ONE));
        } else if line.contains(READ_COUNT) {
            self.read_count = Some(parse_or(value, Decimal::ZERO));
        } else if line.contains(WRITE_COUNT) {
            self.write_count = Some(parse_or(value, Decimal::ZERO));
            self.emit_if_complete();
        }
        Ok(())
    }

    fn finish(self) -> Result<Tablestats> {
        Ok(self.result)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_tablestats;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const TABLESTATS: &str = "\
Total number of tables: 2
----------------
Keyspace : app
\tRead Count: 10
\t\tTable: users
\t\tSSTable count: 4
\t\tSpace used (live): 1000000000
\t\tSpace used (total): 1000000000
\t\tSSTable Compression Ratio: 0.5
\t\tLocal read count: 50000
\t\tLocal read latency: 0.120 ms
\t\tLocal write count: 200000
\t\tLocal write latency: 0.030 ms

\t\tTable (index): users.by_email
\t\tSpace used (live): 1.5 GiB
\t\tSSTable Compression Ratio: NaN
\t\tLocal read count: oops
\t\tLocal write count: 7
----------------
Keyspace : empty_ks
----------------
";

    #[test]
    fn test_parse_blocks_and_defaults() {
        let stats = parse_tablestats(TABLESTATS).unwrap();
        assert_eq!(stats.table_count(), 2);
        assert!(stats.keyspaces["empty_ks"].is_empty());

        let users = stats.get("app", "users").unwrap();
        assert_eq!(users.compressed_bytes, dec!(1000000000));
        assert_eq!(users.compression_ratio, dec!(0.5));
        assert_eq!(users.local_read_count, dec!(50000));
        assert_eq!(users.local_write_count, dec!(200000));

        let index = stats.get("app", "users.by_email").unwrap();
        assert_eq!(index.compressed_bytes, dec!(1.5) * dec!(1073741824));
        assert_eq!(index.compression_ratio, Decimal::ONE);
        assert_eq!(index.local_read_count, Decimal::ZERO);
    }

    #[test]
    fn test_incomplete_block_is_dropped() {
        let text = "\
Keyspace : app
Table: partial
Space used (live): 10
Local read count: 1
Local write count: 1
Table: complete
Space used (live): 10
SSTable Compression Ratio: 0.4
Local read count: 1
Local write count: 1
";
        let stats = parse_tablestats(text).unwrap();
        assert!(stats.get("app", "partial").is_none());
        assert!(stats.get("app", "complete").is_some());
    }

    #[test]
    fn test_parse_is_idempotent_and_deduplicates() {
        let doubled = format!("{}{}", TABLESTATS, TABLESTATS);
        let once = parse_tablestats(TABLESTATS).unwrap();
        assert_eq!(parse_tablestats(TABLESTATS).unwrap(), once);
        assert_eq!(parse_tablestats(&doubled).unwrap(), once);
    }

    #[test]
    fn test_keyspace_line_without_colon_clears_context() {
        let text = "\
Keyspace app
Table: users
Space used (live): 10
SSTable Compression Ratio: 0.4
Local read count: 1
Local write count: 1
";
        let stats = parse_tablestats(text).unwrap();
        assert_eq!(stats.table_count(), 0);
    }
}
