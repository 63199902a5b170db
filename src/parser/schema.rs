//! Keyspace replication and table membership from CQL `DESCRIBE SCHEMA` text.
//!
//! Only `CREATE KEYSPACE` and `CREATE TABLE` statements are read; everything else in the
//! dump (types, indexes, views, options) is ignored.

use crate::models::{KeyspaceSchema, SchemaInfo};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static KEYSPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)CREATE\s+KEYSPACE\s+(?:IF\s+NOT\s+EXISTS\s+)?"?(\w+)"?\s+WITH\s+replication\s*=\s*\{([^}]*)\}"#,
    )
    .unwrap()
});

static CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"'class'\s*:\s*'([\w.$]+)'").unwrap());

static REPLICATION_PAIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"'([^']+)'\s*:\s*'(\d+)'").unwrap());

static TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?"?(\w+)"?\s*\.\s*"?(\w+)"?"#).unwrap()
});

const REPLICATION_FACTOR_KEY: &str = "replication_factor";

pub fn parse(text: &str) -> SchemaInfo {
    let mut schema = SchemaInfo::default();

    for caps in KEYSPACE.captures_iter(text) {
        let name = caps[1].to_string();
        let options = &caps[2];

        let replication_class = CLASS
            .captures(options)
            .map(|class| {
                let full = &class[1];
                full.rsplit('.').next().unwrap_or(full).to_string()
            })
            .unwrap_or_default();

        let mut keyspace = KeyspaceSchema {
            replication_class,
            ..Default::default()
        };
        for pair in REPLICATION_PAIR.captures_iter(options) {
            let Ok(factor) = pair[2].parse::<u32>() else {
                continue;
            };
            if &pair[1] == REPLICATION_FACTOR_KEY {
                keyspace.simple_replication_factor = Some(factor);
            } else if keyspace.is_network_topology() {
                keyspace.datacenters.insert(pair[1].to_string(), factor);
            }
        }

        debug!(
            keyspace = %name,
            class = %keyspace.replication_class,
            datacenters = keyspace.datacenters.len(),
            "Parsed keyspace definition"
        );
        schema.keyspaces.insert(name, keyspace);
    }

    for caps in TABLE.captures_iter(text) {
        match schema.keyspaces.get_mut(&caps[1]) {
            Some(keyspace) => keyspace.tables.push(caps[2].to_string()),
            None => debug!(keyspace = &caps[1], table = &caps[2], "Table for unknown keyspace"),
        }
    }

    schema
}
