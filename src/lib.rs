//! Cassandra TCO Library
//!
//! Estimates what a running Apache Cassandra cluster would cost on Amazon Keyspaces, or as a
//! self-managed deployment on EC2, from the diagnostics an operator can capture on the nodes:
//! `nodetool tablestats`, `nodetool info`, `nodetool status`, a per-table row-size sample and
//! the CQL schema.
//!
//! ## Pipeline
//!
//! 1. [`parser`] turns each text capture into typed facts. Field-level anomalies fall back to
//!    documented defaults; structurally broken input is a [`EstimateError::Format`].
//! 2. [`aggregation`] converts per-node counters into per-second request units and scales a
//!    single replica's view up to the whole datacenter using node count and replication factor.
//! 3. [`projection`] prices the scaled usage per region in on-demand and provisioned modes;
//!    [`compute`] prices EC2 instances, EBS volumes, snapshots and network egress.
//! 4. [`display`] renders the result as colored tables or JSON.
//!
//! All arithmetic uses [`rust_decimal::Decimal`], so results are exact and reproducible.
//!
//! ## Modules
//!
//! - [`models`] - capture facts, usage and cost result types
//! - [`units`] - storage unit conversion
//! - [`parser`] - line scanners for the nodetool/cqlsh captures
//! - [`samples`] - capture directory discovery and async loading
//! - [`pricing`] - regional managed-service price tables and price-list parsing
//! - [`config`] - TOML configuration with environment overrides
//! - [`logging`] - `tracing` subscriber setup
//! - [`analyzer`] - the end-to-end pipeline behind each CLI command
//!
//! ## Example
//!
//! ```rust
//! use cassandra_tco::parser;
//!
//! let stats = parser::parse_tablestats(
//!     "Keyspace : shop\n\tTable: orders\n\tSpace used (live): 1000\n\
//!      \tSSTable Compression Ratio: 0.5\n\tLocal read count: 10\n\tLocal write count: 20\n",
//! ).unwrap();
//! assert_eq!(stats.table_count(), 1);
//! ```

pub mod aggregation;
pub mod analyzer;
pub mod compute;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod models;
pub mod parser;
pub mod pricing;
pub mod projection;
pub mod samples;
pub mod units;

pub use aggregation::{AggregationEngine, AggregationInput};
pub use analyzer::{CostAnalyzer, Report};
pub use config::Config;
pub use error::{EstimateError, Result};
pub use models::*;
pub use projection::CostProjector;
