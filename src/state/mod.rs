//! State-snapshot read/write (§4.H, §6): a YAML document recording the
//! current position of every configured table at the instant it was taken,
//! consumed later by the bootstrap planner.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `{time: <UTC datetime>, tables: { <name>: { <col>: <int>, … }, … }}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSnapshot {
    pub time: DateTime<Utc>,
    pub tables: BTreeMap<String, BTreeMap<String, i64>>,
}

impl StateSnapshot {
    pub fn new(time: DateTime<Utc>) -> Self {
        StateSnapshot {
            time,
            tables: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, table: impl Into<String>, positions: BTreeMap<String, i64>) {
        self.tables.insert(table.into(), positions);
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize state snapshot")
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("failed to parse state snapshot")
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml)
            .with_context(|| format!("failed to write state snapshot to {}", path.display()))
    }

    pub fn read_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read state snapshot from {}", path.display()))?;
        Self::from_yaml(&text)
    }

    /// Looks up a table's recorded position, ordered to match `range_columns`.
    pub fn position_for(&self, table: &str, range_columns: &[String]) -> Option<Vec<i64>> {
        let positions = self.tables.get(table)?;
        range_columns
            .iter()
            .map(|c| positions.get(c).copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trips_through_yaml() {
        let mut snapshot = StateSnapshot::new(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        let mut positions = BTreeMap::new();
        positions.insert("id".to_string(), 1000);
        snapshot.record("orders", positions);

        let yaml = snapshot.to_yaml().unwrap();
        let parsed = StateSnapshot::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.time, snapshot.time);
        assert_eq!(
            parsed.position_for("orders", &["id".to_string()]),
            Some(vec![1000])
        );
    }

    #[test]
    fn position_for_missing_table_is_none() {
        let snapshot = StateSnapshot::new(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(snapshot.position_for("missing", &["id".to_string()]), None);
    }

    #[test]
    fn write_to_and_read_from_round_trip_through_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.yaml");

        let mut snapshot = StateSnapshot::new(Utc.with_ymd_and_hms(2021, 6, 1, 0, 0, 0).unwrap());
        let mut positions = BTreeMap::new();
        positions.insert("id".to_string(), 4200);
        snapshot.record("orders", positions);
        snapshot.write_to(&path).unwrap();

        let read_back = StateSnapshot::read_from(&path).unwrap();
        assert_eq!(read_back.time, snapshot.time);
        assert_eq!(
            read_back.position_for("orders", &["id".to_string()]),
            Some(vec![4200])
        );
    }

    #[test]
    fn rejects_unknown_top_level_keys() {
        let yaml = "time: 2021-01-01T00:00:00Z\ntables: {}\nextra_key: true\n";
        assert!(StateSnapshot::from_yaml(yaml).is_err());
    }

    #[test]
    fn position_for_missing_column_is_none() {
        let mut snapshot = StateSnapshot::new(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        let mut positions = BTreeMap::new();
        positions.insert("id".to_string(), 1000);
        snapshot.record("orders", positions);
        assert_eq!(
            snapshot.position_for("orders", &["id".to_string(), "shard".to_string()]),
            None
        );
    }
}
