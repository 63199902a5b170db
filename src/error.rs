//! Error taxonomy for the estimation core.
//!
//! Field-level anomalies inside a capture (a malformed number, an unknown
//! line) never surface here: scanners recover with documented defaults.
//! What remains are the failures a caller has to act on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstimateError {
    /// Input that cannot be interpreted at all (bad size unit, missing uptime under the strict policy).
    #[error("Format error: {0}")]
    Format(String),

    /// Required run parameter absent or unusable, e.g. a node count of zero.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Region or price key not present in a price table. Callers recover with a fallback.
    #[error("Price lookup miss: {table} has no entry for '{key}'")]
    LookupMiss { table: String, key: String },

    /// A denominator that would be zero or negative.
    #[error("Arithmetic guard: {0}")]
    ArithmeticGuard(String),
}

impl EstimateError {
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn lookup_miss(table: impl Into<String>, key: impl Into<String>) -> Self {
        Self::LookupMiss {
            table: table.into(),
            key: key.into(),
        }
    }

    pub fn arithmetic(msg: impl Into<String>) -> Self {
        Self::ArithmeticGuard(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EstimateError>;
