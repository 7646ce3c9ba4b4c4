//! Drop planner (§4.G): walks adjacent partition pairs and selects those
//! old enough to drop under a table's retention period.

use chrono::{DateTime, Duration, Utc};

use crate::model::{Partition, PlannerError, Position};
use crate::util::{pairwise, Identifier};

/// A partition selected for dropping, with the evidence that justified it.
#[derive(Debug, Clone)]
pub struct DropCandidate {
    pub partition: Partition,
    /// First-row timestamp of this partition itself, if known.
    pub oldest: Option<DateTime<Utc>>,
    /// First-row timestamp of the following partition, if known; this is
    /// what ages this partition out.
    pub youngest: Option<DateTime<Utc>>,
    /// Sum over columns of `q[i] - p[i]`, an approximate row count.
    pub approx_row_count: i64,
}

#[derive(Debug, Clone)]
pub struct DropPlan {
    pub statement: Option<String>,
    pub candidates: Vec<DropCandidate>,
}

/// Plans drops per §4.G. `first_row_after` returns the timestamp of the
/// first row strictly beyond a partition's bound; a `NoExactTime` failure
/// is treated as evidence the partition is very old rather than propagated.
pub fn plan_drops(
    table: &Identifier,
    partitions: &[Partition],
    current_position: &Position,
    now: DateTime<Utc>,
    retention_period: Option<Duration>,
    first_row_after: &mut dyn FnMut(&Partition) -> Result<DateTime<Utc>, PlannerError>,
) -> Result<DropPlan, PlannerError> {
    let retention = retention_period.ok_or(PlannerError::NoRetention)?;
    let mut candidates = Vec::new();

    for (p, q) in pairwise(partitions.iter().cloned()) {
        if q.is_tail() || !q.less_than_position(current_position)? {
            // q is the Tail, or q has caught up to (or passed) the current
            // position and is itself being filled — p cannot be dropped.
            break;
        }

        // A NoExactTime failure on either side's lookup is itself evidence
        // the partition is old enough to drop.
        let (p_missing, oldest) = match first_row_after(&p) {
            Ok(ts) => (false, Some(ts)),
            Err(PlannerError::NoExactTime { .. }) => (true, None),
            Err(e) => return Err(e),
        };
        let (droppable, youngest) = match first_row_after(&q) {
            Ok(ts) => (p_missing || now - ts > retention, Some(ts)),
            Err(PlannerError::NoExactTime { .. }) => (true, None),
            Err(e) => return Err(e),
        };

        if droppable {
            let approx_row_count = match (p.bound(), q.bound()) {
                (Some(pb), Some(qb)) => pb
                    .values()
                    .iter()
                    .zip(qb.values())
                    .map(|(a, b)| b - a)
                    .sum(),
                _ => 0,
            };
            candidates.push(DropCandidate {
                partition: p,
                oldest,
                youngest,
                approx_row_count,
            });
        }
    }

    let statement = if candidates.is_empty() {
        None
    } else {
        let names: Vec<String> = candidates
            .iter()
            .map(|c| format!("`{}`", c.partition.name().expect("dropped partitions are named")))
            .collect();
        Some(format!(
            "ALTER TABLE `{}` DROP PARTITION IF EXISTS {};",
            table,
            names.join(",")
        ))
    };

    Ok(DropPlan {
        statement,
        candidates,
    })
}
