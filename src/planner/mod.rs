//! Plan builder (§4.E) — the heart of the core. Turns a table descriptor, a
//! parsed partition list, the current column position, and an evaluation
//! instant into an ordered list of planned partition changes.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::estimate::{predict_position, predict_time, weighted_rate};
use crate::model::{
    ChangePartition, NewPartition, Partition, PlannedPartition, PlannerError, Position,
    TableConfig,
};

/// The outcome of planning a single table: the ordered entries, the rate
/// vector that produced them, and whether the caller should bother emitting
/// SQL for this plan at all.
#[derive(Debug, Clone)]
pub struct Plan {
    pub entries: Vec<PlannedPartition>,
    pub rate: Vec<f64>,
    pub should_run: bool,
}

/// Builds the rate input set described in §4.C for a table with no
/// earliest-timestamp query: every historical Bounded partition with a real
/// name-date, plus two synthetic Instant partitions that straddle the
/// active partition. The straddle compensates for the active partition's
/// bound sitting in the future relative to the caller's current position:
/// one Instant anchors the active partition's own timestamp to where the
/// table actually is right now, the other anchors "now" to where the active
/// partition's bound will eventually be reached.
fn straddle_active_partition(
    history: &[Partition],
    active: &Partition,
    current_position: &Position,
    eval_time: DateTime<Utc>,
) -> Vec<Partition> {
    let mut set: Vec<Partition> = history
        .iter()
        .filter(|p| p.timestamp().instant().is_some())
        .cloned()
        .collect();
    if let Some(active_ts) = active.timestamp().instant() {
        set.push(Partition::Instant {
            bound: current_position.clone(),
            timestamp: active_ts,
        });
    }
    if let Some(active_bound) = active.bound() {
        set.push(Partition::Instant {
            bound: active_bound.clone(),
            timestamp: eval_time,
        });
    }
    set
}

/// Builds the queried rate input set: one Instant per historical Bounded
/// partition, using the caller-supplied earliest-row-after callback to
/// learn its bound's first-row timestamp, plus one Instant for the active
/// partition at `(eval_time, current_position)`.
fn queried_rate_input(
    history: &[Partition],
    active: &Partition,
    current_position: &Position,
    eval_time: DateTime<Utc>,
    earliest_row_after: &mut dyn FnMut(&Partition) -> Result<DateTime<Utc>, PlannerError>,
) -> Result<Vec<Partition>, PlannerError> {
    let mut set = Vec::with_capacity(history.len() + 1);
    for partition in history {
        let bound = match partition.bound() {
            Some(bound) => bound.clone(),
            None => continue,
        };
        let timestamp = earliest_row_after(partition)?;
        set.push(Partition::Instant { bound, timestamp });
    }
    set.push(Partition::Instant {
        bound: current_position.clone(),
        timestamp: eval_time,
    });
    let _ = active;
    Ok(set)
}

/// Plans a single table per §4.E. `earliest_row_after` is only invoked when
/// `config.earliest_timestamp_query` is set; pass a closure that panics or
/// errors otherwise since it is never called in the implicit path.
pub fn plan_table(
    config: &TableConfig,
    partitions: &[Partition],
    current_position: &Position,
    eval_time: DateTime<Utc>,
    lifespan: Duration,
    required_empty: usize,
    earliest_row_after: &mut dyn FnMut(&Partition) -> Result<DateTime<Utc>, PlannerError>,
) -> Result<Plan, PlannerError> {
    // Step 1: split around the active partition.
    let mut active_idx = None;
    for (i, p) in partitions.iter().enumerate() {
        if p.less_than_position(current_position)? {
            continue;
        }
        active_idx = Some(i);
        break;
    }
    let active_idx = active_idx.ok_or(PlannerError::NoEmptyPartitionsAvailable)?;
    if active_idx + 1 >= partitions.len() {
        return Err(PlannerError::NoEmptyPartitionsAvailable);
    }
    let active = &partitions[active_idx];
    let history = &partitions[..active_idx];
    let empty_future = &partitions[active_idx + 1..];

    // Step 2: rate estimation.
    let rate_input = match &config.earliest_timestamp_query {
        None => straddle_active_partition(history, active, current_position, eval_time),
        Some(_) => {
            queried_rate_input(history, active, current_position, eval_time, earliest_row_after)?
        }
    };
    let rate = weighted_rate(&rate_input)?;

    // Step 3: seed the plan.
    let mut plan: Vec<PlannedPartition> = vec![PlannedPartition::Change(ChangePartition::new(
        active.clone(),
    ))];

    // Step 4: walk the empty partitions in order.
    for partition in empty_future {
        let last = plan.last().expect("plan is seeded");
        let last_position = last.position().ok_or(PlannerError::IncompletePlan)?;
        let last_timestamp = last.timestamp().ok_or(PlannerError::IncompletePlan)?;
        let start_of_fill = predict_time(current_position, &last_position, &rate, eval_time)?;

        if partition.is_tail() {
            let by_lifespan = last_timestamp + lifespan;
            let mut timestamp = by_lifespan.min(start_of_fill);
            let floor_eval = crate::model::floor_to_hour(eval_time);
            if timestamp < floor_eval {
                timestamp = floor_eval;
            }
            let timestamp = crate::model::floor_to_hour(timestamp);
            let position = predict_position(&last_position, &rate, lifespan)?;
            let mut change = ChangePartition::new(partition.clone());
            change.new_timestamp = Some(timestamp);
            change.new_position = Some(position);
            plan.push(PlannedPartition::Change(change));
        } else {
            let mut change = ChangePartition::new(partition.clone());
            let differs = match partition.timestamp().instant() {
                Some(own) => own.date_naive() != start_of_fill.date_naive(),
                None => true,
            };
            if differs {
                change.new_timestamp = Some(start_of_fill);
                change.important = true;
            }
            plan.push(PlannedPartition::Change(change));
        }
    }

    // Step 5: top up to the required empty-tail count.
    while plan.len() < required_empty + 1 {
        let last = plan.last().expect("plan is seeded");
        let last_position = last.position().ok_or(PlannerError::IncompletePlan)?;
        let last_timestamp = last.timestamp().ok_or(PlannerError::IncompletePlan)?;
        let mut timestamp = last_timestamp + lifespan;
        if eval_time > timestamp {
            timestamp = eval_time;
        }
        let timestamp = crate::model::floor_to_hour(timestamp);
        let position = predict_position(&last_position, &rate, lifespan)?;
        plan.push(PlannedPartition::New(NewPartition {
            timestamp,
            position: Some(position),
            set_as_max_value: false,
        }));
    }

    // Step 6: timestamp conflict resolution, bounded by the partition
    // count so a pathological input can never loop forever.
    let existing: HashSet<chrono::NaiveDate> = partitions
        .iter()
        .filter_map(|p| p.timestamp().instant())
        .map(|t| t.date_naive())
        .collect();
    for entry in plan.iter_mut() {
        let mut guard = 0;
        loop {
            guard += 1;
            if guard > partitions.len() + 1 {
                break;
            }
            let candidate = match entry {
                PlannedPartition::Change(c) => match c.new_timestamp {
                    Some(ts) => ts,
                    None => break,
                },
                PlannedPartition::New(n) => n.timestamp,
            };
            if !existing.contains(&candidate.date_naive()) {
                break;
            }
            let bumped = candidate + Duration::days(1);
            match entry {
                PlannedPartition::Change(c) => c.new_timestamp = Some(bumped),
                PlannedPartition::New(n) => n.timestamp = bumped,
            }
        }
    }

    // Step 7: mark the tail. A Change that wraps the table's original Tail
    // and ends up last again after top-up reverts fully to "untouched" —
    // its provisional position/timestamp from step 4 were only needed to
    // seed the rate-projection chain for later entries.
    if let Some(last) = plan.last_mut() {
        match last {
            PlannedPartition::Change(c) => {
                c.new_position = None;
                if c.old.is_tail() {
                    c.new_timestamp = None;
                }
            }
            PlannedPartition::New(n) => {
                n.position = None;
                n.set_as_max_value = true;
            }
        }
    }

    // Step 8: decide whether the caller should emit this plan.
    let should_run = plan.iter().any(|p| matches!(p, PlannedPartition::New(_)))
        || plan.iter().any(|p| match p {
            PlannedPartition::Change(c) => c.important || c.has_modifications(),
            PlannedPartition::New(_) => false,
        });

    Ok(Plan {
        entries: plan,
        rate,
        should_run,
    })
}
