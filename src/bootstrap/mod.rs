//! Bootstrap planner (§4.H): builds a full shadow-table rebuild script when
//! a table has no spare empty partitions to reorganize, seeded from a
//! before/after snapshot of its current position rather than from
//! partition-name history.

use chrono::{DateTime, Duration, Utc};

use crate::model::{format_name_for_date, ChangePartition, NewPartition, Partition, PlannedPartition, PlannerError, Position};
use crate::planner::Plan;
use crate::sql::render_plan;
use crate::util::Identifier;

fn time_offsets(num_entries: usize, first: Duration, subsequent: Duration) -> Vec<Duration> {
    let mut offsets = vec![first];
    while offsets.len() < num_entries {
        offsets.push(*offsets.last().unwrap() + subsequent);
    }
    offsets
}

fn plan_from_offsets(
    eval_time: DateTime<Utc>,
    offsets: &[Duration],
    rate_per_hour: &[f64],
    current: &Position,
    arity: usize,
) -> Plan {
    let mut entries = Vec::with_capacity(offsets.len());
    let last = offsets.len() - 1;
    for (i, offset) in offsets.iter().enumerate() {
        let hours = offset.num_seconds() as f64 / 3600.0;
        let predicted: Vec<i64> = current
            .values()
            .iter()
            .zip(rate_per_hour)
            .map(|(c, r)| c + (r * hours).floor() as i64)
            .collect();
        let predicted_time = eval_time + *offset;

        if i == 0 {
            let placeholder = Partition::Tail {
                name: Identifier::new("p_assumed").unwrap(),
                arity,
            };
            let mut change = ChangePartition::new(placeholder);
            change.new_position = Some(Position::new(predicted));
            change.new_timestamp = Some(predicted_time);
            change.important = true;
            entries.push(PlannedPartition::Change(change));
        } else if i == last {
            entries.push(PlannedPartition::New(NewPartition {
                timestamp: predicted_time,
                position: None,
                set_as_max_value: true,
            }));
        } else {
            entries.push(PlannedPartition::New(NewPartition {
                timestamp: predicted_time,
                position: Some(Position::new(predicted)),
                set_as_max_value: false,
            }));
        }
    }
    Plan {
        entries,
        rate: rate_per_hour.to_vec(),
        should_run: true,
    }
}

/// Plans a full shadow-table rebuild. `range_columns` and `all_columns` are
/// both alphabetically-independent, caller-supplied orderings: `current`
/// and `prior` are positions ordered to match `range_columns`.
#[allow(clippy::too_many_arguments)]
pub fn plan_bootstrap(
    original_table: &Identifier,
    range_columns: &[String],
    all_columns: &[String],
    current: &Position,
    prior: &Position,
    prior_time: DateTime<Utc>,
    eval_time: DateTime<Utc>,
    lifespan: Duration,
    num_empty: usize,
) -> Result<Vec<String>, PlannerError> {
    let delta_t = eval_time - prior_time;
    if delta_t <= Duration::zero() {
        return Err(PlannerError::InsufficientHistory);
    }
    let delta_hours = delta_t.num_seconds() as f64 / 3600.0;
    let rate_per_hour: Vec<f64> = current
        .values()
        .iter()
        .zip(prior.values())
        .map(|(c, p)| (*c - *p) as f64 / delta_hours)
        .collect();

    let arity = range_columns.len();
    let offsets = time_offsets(num_empty + 1, Duration::hours(2), lifespan);
    let plan = plan_from_offsets(eval_time, &offsets, &rate_per_hour, current, arity);

    let shadow_name = format!("{}_new_{}", original_table, eval_time.format("%Y%m%d"));
    let shadow = Identifier::new(shadow_name)?;

    let mut statements = Vec::new();
    statements.push(format!("DROP TABLE IF EXISTS `{shadow}`;"));
    statements.push(format!("CREATE TABLE `{shadow}` LIKE `{original_table}`;"));
    statements.push(format!("ALTER TABLE `{shadow}` REMOVE PARTITIONING;"));

    let cols_clause = range_columns
        .iter()
        .map(|c| format!("`{c}`"))
        .collect::<Vec<_>>()
        .join(", ");
    let range_clause = if arity <= 1 {
        format!("RANGE ({cols_clause})")
    } else {
        format!("RANGE COLUMNS({cols_clause})")
    };
    let maxvalues = vec!["MAXVALUE"; arity].join(", ");
    statements.push(format!(
        "ALTER TABLE `{shadow}` PARTITION BY {range_clause} (PARTITION `p_assumed` VALUES LESS THAN ({maxvalues}));"
    ));

    statements.extend(render_plan(&shadow, &plan, arity)?);

    let mut sorted_columns = all_columns.to_vec();
    sorted_columns.sort();
    let insert_assignments = sorted_columns
        .iter()
        .map(|c| format!("`{c}` = NEW.`{c}`"))
        .collect::<Vec<_>>()
        .join(", ");
    statements.push(format!(
        "CREATE OR REPLACE TRIGGER copy_inserts_from_original_to_shadow AFTER INSERT ON `{original_table}` FOR EACH ROW INSERT INTO `{shadow}` SET {insert_assignments};"
    ));

    let non_range_columns: Vec<&String> = sorted_columns
        .iter()
        .filter(|c| !range_columns.contains(c))
        .collect();
    if !non_range_columns.is_empty() {
        let update_assignments = non_range_columns
            .iter()
            .map(|c| format!("`{c}` = NEW.`{c}`"))
            .collect::<Vec<_>>()
            .join(", ");
        let where_clause = range_columns
            .iter()
            .map(|c| format!("`{c}` = NEW.`{c}`"))
            .collect::<Vec<_>>()
            .join(" AND ");
        statements.push(format!(
            "CREATE OR REPLACE TRIGGER copy_updates_from_original_to_shadow AFTER UPDATE ON `{original_table}` FOR EACH ROW UPDATE `{shadow}` SET {update_assignments} WHERE {where_clause};"
        ));
    }

    Ok(statements)
}
