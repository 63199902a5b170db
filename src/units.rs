//! Binary size units as printed by `nodetool` (`12.3 GiB`, `512 KiB`).

use crate::error::{EstimateError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const BINARY_STEP: Decimal = dec!(1024);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeUnit {
    KiB,
    MiB,
    GiB,
    TiB,
    PiB,
}

impl SizeUnit {
    /// Power of 1024 relative to GiB.
    fn exponent(self) -> i32 {
        match self {
            SizeUnit::KiB => -2,
            SizeUnit::MiB => -1,
            SizeUnit::GiB => 0,
            SizeUnit::TiB => 1,
            SizeUnit::PiB => 2,
        }
    }
}

impl FromStr for SizeUnit {
    type Err = EstimateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kib" => Ok(SizeUnit::KiB),
            "mib" => Ok(SizeUnit::MiB),
            "gib" => Ok(SizeUnit::GiB),
            "tib" => Ok(SizeUnit::TiB),
            "pib" => Ok(SizeUnit::PiB),
            other => Err(EstimateError::format(format!("unsupported size unit '{}'", other))),
        }
    }
}

impl fmt::Display for SizeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SizeUnit::KiB => "KiB",
            SizeUnit::MiB => "MiB",
            SizeUnit::GiB => "GiB",
            SizeUnit::TiB => "TiB",
            SizeUnit::PiB => "PiB",
        };
        f.write_str(label)
    }
}

/// A magnitude paired with its unit, e.g. `12.3 GiB`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeToken {
    pub magnitude: Decimal,
    pub unit: SizeUnit,
}

impl SizeToken {
    pub fn new(magnitude: Decimal, unit: SizeUnit) -> Self {
        Self { magnitude, unit }
    }

    pub fn to_gib(&self) -> Decimal {
        let mut value = self.magnitude;
        let exponent = self.unit.exponent();
        for _ in 0..exponent.abs() {
            if exponent > 0 {
                value *= BINARY_STEP;
            } else {
                value /= BINARY_STEP;
            }
        }
        value
    }

    pub fn to_bytes(&self) -> Decimal {
        self.to_gib() * BINARY_STEP * BINARY_STEP * BINARY_STEP
    }
}

impl FromStr for SizeToken {
    type Err = EstimateError;

    /// Parses `<number> <unit>`; any whitespace between the two is accepted.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let (Some(number), Some(unit), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EstimateError::format(format!("expected '<number> <unit>', got '{}'", s.trim())));
        };
        let magnitude = Decimal::from_str(number)
            .map_err(|_| EstimateError::format(format!("invalid size magnitude '{}'", number)))?;
        Ok(Self::new(magnitude, unit.parse()?))
    }
}

impl fmt::Display for SizeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.magnitude, self.unit)
    }
}

/// Convert a magnitude and a unit label (case-insensitive) to GiB.
pub fn to_gib(magnitude: Decimal, unit: &str) -> Result<Decimal> {
    Ok(SizeToken::new(magnitude, unit.parse()?).to_gib())
}
