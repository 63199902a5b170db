//! Discovery and loading of per-node capture files.
//!
//! A multi-datacenter capture directory looks like:
//!
//! ```text
//! captures/
//! ├── status.txt            nodetool status (optional)
//! ├── schema.cql            cqlsh DESCRIBE SCHEMA (optional)
//! ├── us-east/
//! │   ├── node1/{tablestats.txt, info.txt, rowsize.txt}
//! │   └── node2/...
//! └── eu-west/
//!     └── node1/...
//! ```
//!
//! Only node directories holding a tablestats capture are considered; `rowsize.txt` may be
//! missing, in which case every table gets the default row size.

use crate::config::UptimePolicy;
use crate::models::NodeSample;
use crate::parser;
use anyhow::{Context, Result};
use futures::future::try_join_all;
use glob::glob;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

const TABLESTATS_NAMES: &[&str] = &["tablestats.txt", "cfstats.txt"];
const INFO_NAMES: &[&str] = &["info.txt"];
const ROW_SIZE_NAMES: &[&str] = &["rowsize.txt", "row_size.txt"];
const STATUS_NAMES: &[&str] = &["status.txt"];
const SCHEMA_NAMES: &[&str] = &["schema.cql", "schema.txt"];

/// Capture files of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleFiles {
    pub datacenter: String,
    pub node_id: String,
    pub tablestats: PathBuf,
    pub info: PathBuf,
    pub row_size: Option<PathBuf>,
}

pub struct SampleDiscovery {
    root: PathBuf,
}

impl SampleDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn status_file(&self) -> Option<PathBuf> {
        first_existing(&self.root, STATUS_NAMES)
    }

    pub fn schema_file(&self) -> Option<PathBuf> {
        first_existing(&self.root, SCHEMA_NAMES)
    }

    /// Node directories two levels below the root, sorted by datacenter then node.
    pub fn discover(&self) -> Result<Vec<SampleFiles>> {
        if !self.root.is_dir() {
            anyhow::bail!("Samples directory not found: {}", self.root.display());
        }

        let mut node_dirs = BTreeSet::new();
        for name in TABLESTATS_NAMES {
            let pattern = self.root.join("*").join("*").join(name);
            let entries = glob(&pattern.to_string_lossy())
                .with_context(|| format!("Invalid glob pattern: {}", pattern.display()))?;
            for entry in entries.flatten() {
                if let Some(parent) = entry.parent() {
                    node_dirs.insert(parent.to_path_buf());
                }
            }
        }

        let mut samples = Vec::new();
        for node_dir in node_dirs {
            let (Some(node_id), Some(datacenter)) = (
                file_name(&node_dir),
                node_dir.parent().and_then(file_name),
            ) else {
                continue;
            };
            let Some(info) = first_existing(&node_dir, INFO_NAMES) else {
                warn!(node_dir = %node_dir.display(), "Skipping node without info.txt");
                continue;
            };
            let Some(tablestats) = first_existing(&node_dir, TABLESTATS_NAMES) else {
                continue;
            };

            debug!(datacenter = %datacenter, node = %node_id, "Discovered node capture");
            samples.push(SampleFiles {
                datacenter,
                node_id,
                tablestats,
                info,
                row_size: first_existing(&node_dir, ROW_SIZE_NAMES),
            });
        }

        info!(root = %self.root.display(), nodes = samples.len(), "Sample discovery complete");
        Ok(samples)
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

fn first_existing(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|name| dir.join(name)).find(|path| path.is_file())
}

/// Read a capture file; `-` reads standard input.
pub async fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        tokio::io::stdin()
            .read_to_string(&mut content)
            .await
            .context("Failed to read standard input")?;
        return Ok(content);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read input file: {}", path.display()))
}

pub async fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(path) => read_input(path).await.map(Some),
        None => Ok(None),
    }
}

/// Read and parse one node's captures.
pub async fn load_sample(files: &SampleFiles, policy: UptimePolicy) -> Result<NodeSample> {
    let (tablestats, info, row_size) = futures::try_join!(
        read_input(&files.tablestats),
        read_input(&files.info),
        read_optional(files.row_size.as_deref()),
    )?;

    let info = parser::parse_info(&info, policy)
        .with_context(|| format!("Failed to parse {}", files.info.display()))?;
    let tablestats = parser::parse_tablestats(&tablestats)
        .with_context(|| format!("Failed to parse {}", files.tablestats.display()))?;
    let row_sizes = match row_size {
        Some(text) => parser::parse_row_sizes(&text)?,
        None => Default::default(),
    };

    Ok(NodeSample {
        datacenter: Some(files.datacenter.clone()),
        node_id: files.node_id.clone(),
        info,
        tablestats,
        row_sizes,
    })
}

/// Load every discovered node concurrently.
pub async fn load_samples(files: &[SampleFiles], policy: UptimePolicy) -> Result<Vec<NodeSample>> {
    try_join_all(files.iter().map(|f| load_sample(f, policy))).await
}
