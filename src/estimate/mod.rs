//! Rate estimator (§4.C) and forward predictor (§4.D): the two small pure
//! functions the plan builder leans on to turn historical partitions into a
//! per-column positions-per-day estimate, and to project that rate forward
//! in time or position.

use chrono::{DateTime, Duration, Utc};

use crate::model::{floor_to_hour, Partition, PlannerError, Position};
use crate::util::pairwise;

/// The newest pair's weight in `weighted_rate`. Arbitrary, but must be
/// reproduced exactly so outputs are stable across runs.
const WEIGHT_NUMERATOR: f64 = 10000.0;

/// `(p2[i] - p1[i]) / days(t2 - t1)` per column. Returns an empty vector
/// (rather than erroring) when either partition's timestamp is unusable or
/// `t1 >= t2`, so the caller can filter and continue.
pub fn pair_rate(p1: &Partition, p2: &Partition) -> Result<Vec<f64>, PlannerError> {
    let (t1, t2) = match (p1.timestamp().instant(), p2.timestamp().instant()) {
        (Some(t1), Some(t2)) => (t1, t2),
        _ => return Ok(Vec::new()),
    };
    if t1 >= t2 {
        return Ok(Vec::new());
    }
    let b1 = p1
        .bound()
        .ok_or_else(|| PlannerError::UnexpectedPartition {
            message: "rate pair partition has no bound".into(),
        })?;
    let b2 = p2
        .bound()
        .ok_or_else(|| PlannerError::UnexpectedPartition {
            message: "rate pair partition has no bound".into(),
        })?;
    if b1.arity() != b2.arity() {
        return Err(PlannerError::ArityMismatch {
            expected: b1.arity(),
            got: b2.arity(),
        });
    }
    let days = (t2 - t1).num_seconds() as f64 / 86_400.0;
    Ok(b1
        .values()
        .iter()
        .zip(b2.values())
        .map(|(a, b)| (*b - *a) as f64 / days)
        .collect())
}

/// Weighted per-column rate over an ordered list of at least two Bounded
/// (or Instant) partitions: adjacent-pair rates, newer pairs weighted more
/// heavily. The newest pair gets weight `10000`, the oldest `10000/n`.
pub fn weighted_rate(partitions: &[Partition]) -> Result<Vec<f64>, PlannerError> {
    if partitions.len() < 2 {
        return Err(PlannerError::EmptyRateInput);
    }
    let arity = partitions[0].arity();
    let mut rates = Vec::new();
    for (p1, p2) in pairwise(partitions.iter().cloned()) {
        let r = pair_rate(&p1, &p2)?;
        if !r.is_empty() {
            rates.push(r);
        }
    }
    if rates.is_empty() {
        return Err(PlannerError::EmptyRateInput);
    }
    let n = rates.len();
    let mut weighted = vec![0.0; arity];
    let mut weight_sum = 0.0;
    for (k, rate) in rates.iter().enumerate() {
        let weight = WEIGHT_NUMERATOR / (n - k) as f64;
        weight_sum += weight;
        for (i, value) in rate.iter().enumerate() {
            weighted[i] += value * weight;
        }
    }
    Ok(weighted.into_iter().map(|v| v / weight_sum).collect())
}

/// Project `current` forward by `duration` at `rate`. Fails with
/// `NegativeRate` if any column's rate is negative.
pub fn predict_position(
    current: &Position,
    rate: &[f64],
    duration: Duration,
) -> Result<Position, PlannerError> {
    if let Some((column, _)) = rate.iter().enumerate().find(|(_, r)| **r < 0.0) {
        return Err(PlannerError::NegativeRate { column });
    }
    let days = duration.num_seconds() as f64 / 86_400.0;
    Ok(current.add_rate(rate, days))
}

/// Project forward in time to the instant `current` is predicted to reach
/// `target` at `rate`, floored to the hour. Fails with `NonPositiveRate` if
/// any column's rate is non-positive, and `AllNegative` if every column's
/// days-to-target is negative (the target lies entirely in the past).
pub fn predict_time(
    current: &Position,
    target: &Position,
    rate: &[f64],
    eval_time: DateTime<Utc>,
) -> Result<DateTime<Utc>, PlannerError> {
    if let Some((column, _)) = rate.iter().enumerate().find(|(_, r)| **r <= 0.0) {
        return Err(PlannerError::NonPositiveRate { column });
    }
    let days: Vec<f64> = current
        .values()
        .iter()
        .zip(target.values())
        .zip(rate.iter())
        .map(|((c, t), r)| (*t - *c) as f64 / r)
        .collect();
    let max_days = days
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    if days.iter().all(|d| *d < 0.0) {
        return Err(PlannerError::AllNegative);
    }
    let projected = eval_time + Duration::seconds((max_days * 86_400.0) as i64);
    Ok(floor_to_hour(projected))
}
