//! rangepart - offline partition-lifecycle planner for RANGE-partitioned
//! MariaDB/MySQL tables.
//!
//! Given a table's current partition map and column position, this crate
//! decides which partitions to rename, which new ones to create, and which
//! old ones are safe to drop — without ever issuing a query itself. Callers
//! supply the partition map (parsed from `SHOW CREATE TABLE`), the current
//! position, and any timestamp lookups the table's configuration calls for;
//! the engine hands back plain SQL strings.
//!
//! # Quick Start
//!
//! Use the core planner directly, or [`prelude`] for the common imports:
//!
//! ```no_run
//! use rangepart::prelude::*;
//! use chrono::{Duration, Utc};
//!
//! # fn doc(partitions: &[Partition], config: &TableConfig, current: &Position) -> Result<(), PlannerError> {
//! let mut no_query = |_: &Partition| unreachable!();
//! let plan = plan_table(config, partitions, current, Utc::now(), Duration::days(30), 2, &mut no_query)?;
//! if plan.should_run {
//!     for statement in render_plan(&config.name, &plan, current.arity())? {
//!         println!("{statement}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`model`] - Position, Partition, PlannedPartition, the error taxonomy
//! - [`parser`] - `SHOW CREATE TABLE` partition-map adapter
//! - [`estimate`] - rate estimator and forward predictor
//! - [`planner`] - the plan builder, the heart of the core
//! - [`sql`] - SQL emitter
//! - [`drop`] - drop planner
//! - [`bootstrap`] - shadow-table bootstrap planner
//! - [`prelude`] - convenient re-exports for common usage

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod db;
pub mod drop;
pub mod estimate;
pub mod model;
pub mod parser;
pub mod planner;
pub mod prelude;
pub mod sql;
pub mod state;
pub mod stats;
pub mod util;
