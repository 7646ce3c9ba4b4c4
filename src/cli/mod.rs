//! CLI front end (out of scope for the engine itself — see §1). Thin
//! dispatch: load config, open a connection, call into the core modules,
//! print or execute the result. Grounded on the teacher's own
//! `#[derive(Parser)]`/`#[derive(Subcommand)]` shape in `src/cli/mod.rs`.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::db::{Connection, SqlxConnection};
use crate::model::{Partition, PlannerError, Position, TableConfig};
use crate::state::StateSnapshot;
use crate::stats::Counters;
use crate::{bootstrap, drop, parser, planner, sql};

#[derive(Parser)]
#[command(name = "rangepart")]
#[command(about = "Offline partition-lifecycle planner for RANGE-partitioned MariaDB/MySQL tables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL each table's planner would emit, without executing it.
    Plan {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        database: String,
    },
    /// Plan and execute.
    Run {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        database: String,
        #[arg(long)]
        noop: bool,
    },
    /// Run only the drop planner.
    Drop {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        database: String,
    },
    /// Bootstrap a table against a prior state snapshot.
    Migrate {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        database: String,
        #[arg(long)]
        table: String,
        #[arg(long)]
        state: PathBuf,
    },
    /// Write the current positions of all configured tables to a snapshot.
    Snapshot {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        database: String,
        #[arg(long)]
        out: PathBuf,
    },
}

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let counters = Counters::new();

    match cli.command {
        Commands::Plan { config, database } => {
            let config = Config::from_path(&config)?;
            let db = SqlxConnection::new(&database).await?;
            for table in &config.tables {
                match plan_for_table(&db, &config, table, &counters).await {
                    Ok(statements) => statements.iter().for_each(|s| println!("{s}")),
                    Err(e) => log_table_error(&counters, table, &e),
                }
            }
        }
        Commands::Run { config, database, noop } => {
            let config = Config::from_path(&config)?;
            let db = SqlxConnection::new(&database).await?;
            for table in &config.tables {
                match plan_for_table(&db, &config, table, &counters).await {
                    Ok(statements) if config.noop || noop => {
                        statements.iter().for_each(|s| println!("{s}"));
                    }
                    Ok(statements) => {
                        for statement in &statements {
                            db.execute(statement).await?;
                        }
                        if !statements.is_empty() {
                            counters.record_plan_emitted();
                        }
                    }
                    Err(e) => log_table_error(&counters, table, &e),
                }
            }
        }
        Commands::Drop { config, database } => {
            let config = Config::from_path(&config)?;
            let db = SqlxConnection::new(&database).await?;
            for table in &config.tables {
                match drop_for_table(&db, table).await {
                    Ok(Some((statement, dropped))) => {
                        println!("{statement}");
                        db.execute(&statement).await?;
                        counters.record_plan_emitted();
                        counters.record_partitions_dropped(dropped);
                    }
                    Ok(None) => {}
                    Err(e) => log_table_error(&counters, table, &e),
                }
            }
        }
        Commands::Migrate {
            config,
            database,
            table,
            state,
        } => {
            let config = Config::from_path(&config)?;
            let table_config = config
                .tables
                .iter()
                .find(|t| t.name.as_str() == table)
                .with_context(|| format!("table '{table}' is not in the config"))?;
            let db = SqlxConnection::new(&database).await?;
            let create_options = db.create_options(table_config.name.as_str()).await?;
            parser::check_table_compatibility(&create_options)?;
            let ddl = db.show_create_table(table_config.name.as_str()).await?;
            let (range_columns, _partitions) = parser::parse_create_table(&ddl)?;
            let current_values = db
                .current_position(table_config.name.as_str(), &range_columns)
                .await?;
            let current = Position::new(current_values);

            let snapshot = StateSnapshot::read_from(&state)?;
            let prior_values = snapshot
                .position_for(table_config.name.as_str(), &range_columns)
                .with_context(|| format!("no prior position recorded for '{table}'"))?;
            let prior = Position::new(prior_values);

            let lifespan = table_config.partition_period.unwrap_or(config.partition_period);
            let all_columns = db.describe(table_config.name.as_str()).await?;
            let statements = bootstrap::plan_bootstrap(
                &table_config.name,
                &range_columns,
                &all_columns,
                &current,
                &prior,
                snapshot.time,
                Utc::now(),
                lifespan,
                config.num_empty_partitions,
            )?;
            statements.iter().for_each(|s| println!("{s}"));
        }
        Commands::Snapshot { config, database, out } => {
            let config = Config::from_path(&config)?;
            let db = SqlxConnection::new(&database).await?;
            let mut snapshot = StateSnapshot::new(Utc::now());
            for table in &config.tables {
                let ddl = db.show_create_table(table.name.as_str()).await?;
                let (range_columns, _partitions) = parser::parse_create_table(&ddl)?;
                let values = db.current_position(table.name.as_str(), &range_columns).await?;
                let positions: BTreeMap<String, i64> =
                    range_columns.into_iter().zip(values).collect();
                snapshot.record(table.name.as_str(), positions);
            }
            snapshot.write_to(&out)?;
        }
    }

    Ok(())
}

fn log_table_error(counters: &Counters, table: &TableConfig, error: &anyhow::Error) {
    counters.record_error();
    tracing::error!(table = %table.name, error = %error, "table run failed");
}

/// Resolves `run_earliest_timestamp_query` for every historical Bounded
/// partition up front (the core's rate-input callback is synchronous; the
/// network round-trip it stands in for is not), keying the result by the
/// partition's single-column bound.
async fn resolve_earliest_timestamps(
    db: &SqlxConnection,
    query: &str,
    partitions: &[Partition],
) -> Result<HashMap<i64, DateTime<Utc>>> {
    let mut resolved = HashMap::new();
    for partition in partitions {
        let Some(bound) = partition.bound() else {
            continue;
        };
        let key = bound.values()[0];
        let ts = db.run_earliest_timestamp_query(query, key).await?;
        resolved.insert(key, ts);
    }
    Ok(resolved)
}

async fn plan_for_table(
    db: &SqlxConnection,
    config: &Config,
    table: &TableConfig,
    counters: &Counters,
) -> Result<Vec<String>> {
    let create_options = db.create_options(table.name.as_str()).await?;
    parser::check_table_compatibility(&create_options)?;
    let ddl = db.show_create_table(table.name.as_str()).await?;
    let (range_columns, partitions) = parser::parse_create_table(&ddl)?;
    let current_values = db.current_position(table.name.as_str(), &range_columns).await?;
    let current = Position::new(current_values);
    let lifespan = table.partition_period.unwrap_or(config.partition_period);

    let resolved = match &table.earliest_timestamp_query {
        Some(query) => resolve_earliest_timestamps(db, query, &partitions).await?,
        None => HashMap::new(),
    };
    let mut earliest_row_after = |partition: &Partition| -> Result<DateTime<Utc>, PlannerError> {
        let key = partition
            .bound()
            .expect("rate-input partitions are always bounded")
            .values()[0];
        resolved.get(&key).copied().ok_or_else(|| PlannerError::NoExactTime {
            partition: partition.name().map(|n| n.as_str().to_string()).unwrap_or_default(),
        })
    };

    let plan = planner::plan_table(
        table,
        &partitions,
        &current,
        Utc::now(),
        lifespan,
        config.num_empty_partitions,
        &mut earliest_row_after,
    )?;
    counters.record_table_processed();
    if !plan.should_run {
        return Ok(Vec::new());
    }
    Ok(sql::render_plan(&table.name, &plan, range_columns.len())?)
}

async fn drop_for_table(db: &SqlxConnection, table: &TableConfig) -> Result<Option<(String, u64)>> {
    let ddl = db.show_create_table(table.name.as_str()).await?;
    let (range_columns, partitions) = parser::parse_create_table(&ddl)?;
    let current_values = db.current_position(table.name.as_str(), &range_columns).await?;
    let current = Position::new(current_values);

    let resolved = match &table.earliest_timestamp_query {
        Some(query) => resolve_earliest_timestamps(db, query, &partitions).await?,
        None => HashMap::new(),
    };
    let mut first_row_after = |partition: &Partition| -> Result<DateTime<Utc>, PlannerError> {
        let key = partition
            .bound()
            .ok_or_else(|| PlannerError::NoExactTime {
                partition: partition.name().map(|n| n.as_str().to_string()).unwrap_or_default(),
            })?
            .values()[0];
        resolved.get(&key).copied().ok_or_else(|| PlannerError::NoExactTime {
            partition: partition.name().map(|n| n.as_str().to_string()).unwrap_or_default(),
        })
    };

    let plan = drop::plan_drops(
        &table.name,
        &partitions,
        &current,
        Utc::now(),
        table.retention_period,
        &mut first_row_after,
    )?;
    Ok(plan.statement.map(|s| (s, plan.candidates.len() as u64)))
}
