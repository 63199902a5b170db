use super::LineScanner;
use crate::error::Result;
use crate::models::{RowSizeFields, RowSizeTable};
use tracing::debug;

/// Driver errors printed by the sampler instead of a result.
const ERROR_MARKERS: &[&str] = &["NoHostAvailable"];

#[derive(Default)]
pub struct RowSizeScanner {
    result: RowSizeTable,
}

impl LineScanner for RowSizeScanner {
    type Output = RowSizeTable;

    fn scan_line(&mut self, line: &str, line_number: usize) -> Result<()> {
        let line = line.trim();
        if ERROR_MARKERS.iter().any(|marker| line.contains(marker)) {
            debug!(line_number, "Skipping sampler error line");
            return Ok(());
        }
        let Some((key, body)) = line.split_once('=') else {
            return Ok(());
        };

        let body = body.trim();
        let Some(inner) = body.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) else {
            return Ok(());
        };

        let fields: RowSizeFields = inner
            .split(',')
            .map(str::trim)
            .filter(|segment| segment.contains(": "))
            .filter_map(|segment| segment.split_once(':'))
            .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            .collect();

        self.result.tables.insert(key.trim().to_string(), fields);
        Ok(())
    }

    fn finish(self) -> Result<RowSizeTable> {
        Ok(self.result)
    }
}
