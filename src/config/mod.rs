//! Operator configuration: a single YAML document describing global
//! defaults and the per-table overrides the planner needs.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use serde::Deserialize;

use crate::model::TableConfig;
use crate::util::{validate_earliest_timestamp_query, Identifier};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTableConfig {
    name: String,
    retention_period: Option<String>,
    partition_period: Option<String>,
    earliest_timestamp_query: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    partition_period: String,
    num_empty_partitions: usize,
    #[serde(default)]
    noop: bool,
    tables: Vec<RawTableConfig>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub partition_period: Duration,
    pub num_empty_partitions: usize,
    pub noop: bool,
    pub tables: Vec<TableConfig>,
}

/// Parses a duration string of the form `<N>d` or `<N>h` (days or hours).
/// No other units are accepted; this matches the only two units used
/// anywhere in the config schema.
fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let (digits, unit) = raw.split_at(raw.len().saturating_sub(1));
    let value: i64 = digits
        .parse()
        .with_context(|| format!("invalid duration '{raw}'"))?;
    match unit {
        "d" => Ok(Duration::days(value)),
        "h" => Ok(Duration::hours(value)),
        other => bail!("unsupported duration unit '{other}' in '{raw}' (use 'd' or 'h')"),
    }
}

impl Config {
    pub fn from_str(yaml: &str) -> Result<Config> {
        let raw: RawConfig =
            serde_yaml::from_str(yaml).context("failed to parse configuration YAML")?;

        let partition_period = parse_duration(&raw.partition_period)?;

        let mut tables = Vec::with_capacity(raw.tables.len());
        for t in raw.tables {
            let name = Identifier::new(t.name.clone())
                .with_context(|| format!("invalid table name '{}'", t.name))?;
            let mut table = TableConfig::new(name);
            table.retention_period = t
                .retention_period
                .as_deref()
                .map(parse_duration)
                .transpose()?;
            table.partition_period = t
                .partition_period
                .as_deref()
                .map(parse_duration)
                .transpose()?;
            if let Some(query) = &t.earliest_timestamp_query {
                validate_earliest_timestamp_query(query)
                    .with_context(|| format!("invalid earliest_timestamp_query for '{}'", t.name))?;
            }
            table.earliest_timestamp_query = t.earliest_timestamp_query;
            tables.push(table);
        }

        Ok(Config {
            partition_period,
            num_empty_partitions: raw.num_empty_partitions,
            noop: raw.noop,
            tables,
        })
    }

    pub fn from_path(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Config::from_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
partition_period: 30d
num_empty_partitions: 2
noop: false
tables:
  - name: my_big_table
    retention_period: 90d
    partition_period: 7d
    earliest_timestamp_query: >
      SELECT UNIX_TIMESTAMP(created_at) FROM my_big_table
      WHERE id > ? ORDER BY id ASC LIMIT 1;
  - name: small_table
"#;

    #[test]
    fn parses_sample_configuration() {
        let config = Config::from_str(SAMPLE).unwrap();
        assert_eq!(config.num_empty_partitions, 2);
        assert_eq!(config.partition_period, Duration::days(30));
        assert!(!config.noop);
        assert_eq!(config.tables.len(), 2);
        assert_eq!(config.tables[0].name.as_str(), "my_big_table");
        assert_eq!(config.tables[0].retention_period, Some(Duration::days(90)));
        assert_eq!(config.tables[0].partition_period, Some(Duration::days(7)));
        assert!(config.tables[0].earliest_timestamp_query.is_some());
        assert_eq!(config.tables[1].retention_period, None);
    }

    #[test]
    fn rejects_unknown_top_level_keys() {
        let bad = format!("{SAMPLE}\nextra_key: true\n");
        assert!(Config::from_str(&bad).is_err());
    }

    #[test]
    fn rejects_malformed_earliest_timestamp_query() {
        let bad = r#"
partition_period: 30d
num_empty_partitions: 1
tables:
  - name: t
    earliest_timestamp_query: "UPDATE t SET x = ?;"
"#;
        assert!(Config::from_str(bad).is_err());
    }

    #[test]
    fn from_path_reads_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rangepart.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = Config::from_path(&path).unwrap();
        assert_eq!(config.tables.len(), 2);
    }

    #[test]
    fn rejects_unsupported_duration_unit() {
        let bad = r#"
partition_period: 30w
num_empty_partitions: 1
tables: []
"#;
        assert!(Config::from_str(bad).is_err());
    }
}
