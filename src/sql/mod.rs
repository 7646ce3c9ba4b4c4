//! SQL emitter (§4.F): renders a plan from [`crate::planner`] into
//! `ALTER TABLE ... REORGANIZE PARTITION ...` statements, preserving the
//! invariant that the table never has fewer empty tail partitions mid-walk
//! than it started with.

use std::collections::HashSet;

use crate::model::{Partition, PlannedPartition, PlannerError};
use crate::planner::Plan;
use crate::util::Identifier;

fn render_bound(partition: &Partition) -> String {
    let arity = partition.arity();
    match partition {
        Partition::Tail { .. } => {
            if arity <= 1 {
                "MAXVALUE".to_string()
            } else {
                format!("({})", vec!["MAXVALUE"; arity].join(", "))
            }
        }
        Partition::Bounded { bound, .. } | Partition::Instant { bound, .. } => {
            let values: Vec<String> = bound.values().iter().map(i64::to_string).collect();
            format!("({})", values.join(", "))
        }
    }
}

/// Renders the REORGANIZE statements for `plan` against `table`. `arity` is
/// the table's range-column count, needed to materialise a plan entry that
/// has no Position of its own (a become-tail marker).
pub fn render_plan(table: &Identifier, plan: &Plan, arity: usize) -> Result<Vec<String>, PlannerError> {
    let mut seen_new = false;
    for entry in &plan.entries {
        match entry {
            PlannedPartition::New(_) => seen_new = true,
            PlannedPartition::Change(_) if seen_new => return Err(PlannerError::PlanOrder),
            _ => {}
        }
    }

    let changes: Vec<&PlannedPartition> = plan
        .entries
        .iter()
        .filter(|e| matches!(e, PlannedPartition::Change(_)))
        .collect();
    let news: Vec<&PlannedPartition> = plan
        .entries
        .iter()
        .filter(|e| matches!(e, PlannedPartition::New(_)))
        .collect();

    if news.is_empty() && !changes.iter().any(|c| c.has_modifications()) {
        return Ok(Vec::new());
    }

    let mut statements = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    let last_change_idx = changes.len().saturating_sub(1);

    for (i, entry) in changes.iter().enumerate().rev() {
        let is_final = i == last_change_idx;
        if !is_final && !entry.has_modifications() {
            continue;
        }
        let change = match entry {
            PlannedPartition::Change(c) => c,
            PlannedPartition::New(_) => unreachable!("changes vector holds only Changes"),
        };

        let mut new_part_list = vec![entry.as_partition(arity)?];
        if is_final {
            for new_entry in &news {
                new_part_list.push(new_entry.as_partition(arity)?);
            }
        }

        let mut rendered_parts = Vec::with_capacity(new_part_list.len());
        for part in &new_part_list {
            let name = part
                .name()
                .expect("materialised partitions are always named");
            if !seen_names.insert(name.as_str().to_string()) {
                return Err(PlannerError::DuplicatePartition {
                    name: name.as_str().to_string(),
                });
            }
            rendered_parts.push(format!(
                "PARTITION `{}` VALUES LESS THAN {}",
                name,
                render_bound(part)
            ));
        }

        let old_name = change.old.name().ok_or(PlannerError::IncompletePlan)?;
        statements.push(format!(
            "ALTER TABLE `{}` REORGANIZE PARTITION `{}` INTO ({});",
            table,
            old_name,
            rendered_parts.join(", ")
        ));
    }

    Ok(statements)
}
