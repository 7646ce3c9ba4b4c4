//! Convenient re-exports for common `rangepart` usage.
//!
//! # Example
//!
//! ```no_run
//! use rangepart::prelude::*;
//! use chrono::{Duration, Utc};
//!
//! # fn doc(partitions: &[Partition], config: &TableConfig) -> Result<(), PlannerError> {
//! let current = Position::new(vec![42]);
//! let mut no_query = |_: &Partition| unreachable!();
//! let plan = plan_table(config, partitions, &current, Utc::now(), Duration::days(30), 2, &mut no_query)?;
//! if plan.should_run {
//!     let statements = render_plan(&config.name, &plan, current.arity())?;
//!     for statement in &statements {
//!         println!("{statement}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// Domain model
pub use crate::model::{
    ChangePartition, NewPartition, Partition, PartitionTimestamp, PlannedPartition, PlannerError,
    Position, TableConfig,
};

// Core operations
pub use crate::bootstrap::plan_bootstrap;
pub use crate::drop::{plan_drops, DropCandidate, DropPlan};
pub use crate::estimate::{predict_position, predict_time, weighted_rate};
pub use crate::parser::{check_table_compatibility, parse_create_table};
pub use crate::planner::{plan_table, Plan};
pub use crate::sql::render_plan;

// Shared helpers
pub use crate::util::Identifier;
