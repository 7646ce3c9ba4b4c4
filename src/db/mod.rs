//! Database transport (out of scope for the engine itself — see §1 of the
//! specification this crate implements; included only so the CLI has a real
//! connection to drive the core with). Grounded on the teacher's
//! `pg::connection::PgConnection`, ported from `postgres` to `mysql`, with
//! the `async_trait`-based trait shape borrowed from the pack's own
//! `db::Db` abstraction so the CLI can be tested against an in-memory fake.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySql, Pool, Row};

/// Everything the CLI needs from a live database connection.
#[async_trait]
pub trait Connection {
    async fn show_create_table(&self, table: &str) -> Result<String>;
    /// All column names of `table`, in declaration order.
    async fn describe(&self, table: &str) -> Result<Vec<String>>;
    async fn create_options(&self, table: &str) -> Result<String>;
    async fn current_position(&self, table: &str, range_columns: &[String]) -> Result<Vec<i64>>;
    async fn run_earliest_timestamp_query(&self, query: &str, bound: i64) -> Result<DateTime<Utc>>;
    async fn execute(&self, statement: &str) -> Result<()>;
}

pub struct SqlxConnection {
    pool: Pool<MySql>,
}

impl SqlxConnection {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await
            .context("failed to connect to database")?;
        Ok(SqlxConnection { pool })
    }
}

#[async_trait]
impl Connection for SqlxConnection {
    async fn show_create_table(&self, table: &str) -> Result<String> {
        let row = sqlx::query(&format!("SHOW CREATE TABLE `{table}`"))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("SHOW CREATE TABLE `{table}` failed"))?;
        let ddl: String = row.try_get(1).context("missing CREATE TABLE column")?;
        Ok(ddl)
    }

    async fn describe(&self, table: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT COLUMN_NAME FROM INFORMATION_SCHEMA.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
             ORDER BY ORDINAL_POSITION",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("DESCRIBE `{table}` failed"))?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(0).context("missing COLUMN_NAME column"))
            .collect()
    }

    async fn create_options(&self, table: &str) -> Result<String> {
        let row = sqlx::query(
            "SELECT CREATE_OPTIONS FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("CREATE_OPTIONS lookup for `{table}` failed"))?;
        row.try_get(0).context("missing CREATE_OPTIONS column")
    }

    async fn current_position(&self, table: &str, range_columns: &[String]) -> Result<Vec<i64>> {
        let cols = range_columns
            .iter()
            .map(|c| format!("MAX(`{c}`)"))
            .collect::<Vec<_>>()
            .join(", ");
        let row = sqlx::query(&format!("SELECT {cols} FROM `{table}`"))
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("current-position query for `{table}` failed"))?;
        (0..range_columns.len())
            .map(|i| row.try_get::<i64, _>(i).context("non-integer position column"))
            .collect()
    }

    async fn run_earliest_timestamp_query(&self, query: &str, bound: i64) -> Result<DateTime<Utc>> {
        let row = sqlx::query(query)
            .bind(bound)
            .fetch_one(&self.pool)
            .await
            .context("earliest-timestamp query failed")?;
        let unix: i64 = row.try_get(0).context("earliest-timestamp query returned no row")?;
        Utc.timestamp_opt(unix, 0)
            .single()
            .context("earliest-timestamp query returned an invalid unix timestamp")
    }

    async fn execute(&self, statement: &str) -> Result<()> {
        sqlx::query(statement)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to execute: {statement}"))?;
        Ok(())
    }
}

/// In-memory fixtures standing in for a real connection in tests, since the
/// engine itself never opens one.
pub mod testing {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::Connection;

    #[derive(Debug, Default)]
    pub struct FakeConnection {
        pub create_tables: BTreeMap<String, String>,
        pub create_options: BTreeMap<String, String>,
        pub columns: BTreeMap<String, Vec<String>>,
        pub positions: BTreeMap<String, Vec<i64>>,
        pub earliest_timestamps: BTreeMap<i64, DateTime<Utc>>,
        pub executed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Connection for FakeConnection {
        async fn show_create_table(&self, table: &str) -> Result<String> {
            self.create_tables
                .get(table)
                .cloned()
                .ok_or_else(|| anyhow!("no fixture CREATE TABLE for `{table}`"))
        }

        async fn describe(&self, table: &str) -> Result<Vec<String>> {
            self.columns
                .get(table)
                .cloned()
                .ok_or_else(|| anyhow!("no fixture column list for `{table}`"))
        }

        async fn create_options(&self, table: &str) -> Result<String> {
            self.create_options
                .get(table)
                .cloned()
                .ok_or_else(|| anyhow!("no fixture CREATE_OPTIONS for `{table}`"))
        }

        async fn current_position(&self, table: &str, _range_columns: &[String]) -> Result<Vec<i64>> {
            self.positions
                .get(table)
                .cloned()
                .ok_or_else(|| anyhow!("no fixture position for `{table}`"))
        }

        async fn run_earliest_timestamp_query(&self, _query: &str, bound: i64) -> Result<DateTime<Utc>> {
            self.earliest_timestamps
                .get(&bound)
                .copied()
                .ok_or_else(|| anyhow!("no fixture earliest timestamp for bound {bound}"))
        }

        async fn execute(&self, statement: &str) -> Result<()> {
            self.executed.lock().unwrap().push(statement.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeConnection;
    use super::Connection;

    #[tokio::test]
    async fn fake_connection_records_executed_statements() {
        let fake = FakeConnection::default();
        fake.execute("ALTER TABLE t DROP PARTITION IF EXISTS p1;").await.unwrap();
        assert_eq!(fake.executed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fake_connection_describe_returns_fixture_columns() {
        let mut fake = FakeConnection::default();
        fake.columns
            .insert("orders".to_string(), vec!["id".to_string(), "total".to_string()]);
        let columns = fake.describe("orders").await.unwrap();
        assert_eq!(columns, vec!["id".to_string(), "total".to_string()]);
    }
}
