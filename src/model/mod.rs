//! Domain model: positions, partitions, planned partitions, and the error
//! taxonomy every other module returns.

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;
use thiserror::Error;

use crate::util::Identifier;

/// All failure kinds surfaced by the engine. Kinds, not type names — see
/// the error handling design.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlannerError {
    #[error("table information error: {message}")]
    TableInformation { message: String },

    #[error("arity mismatch: expected {expected}, got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("unexpected partition: {message}")]
    UnexpectedPartition { message: String },

    #[error("duplicate partition name: {name}")]
    DuplicatePartition { name: String },

    #[error("mismatched id: {message}")]
    MismatchedId { message: String },

    #[error("no empty partitions available, run bootstrap instead")]
    NoEmptyPartitionsAvailable,

    #[error("table has no configured retention period")]
    NoRetention,

    #[error("no exact timestamp available for partition {partition}")]
    NoExactTime { partition: String },

    #[error("invalid identifier: {value}")]
    InvalidIdentifier { value: String },

    #[error("insufficient history to bootstrap")]
    InsufficientHistory,

    #[error("no rate pairs remained after filtering")]
    EmptyRateInput,

    #[error("negative rate in column {column}")]
    NegativeRate { column: usize },

    #[error("non-positive rate in column {column}")]
    NonPositiveRate { column: usize },

    #[error("every predicted column delta is negative")]
    AllNegative,

    #[error("plan order violated: a New partition precedes a Change")]
    PlanOrder,

    #[error("incomplete plan: partition has no timestamp")]
    IncompletePlan,
}

/// An ordered tuple of signed 64-bit integers, one per range column.
/// Immutable once constructed; comparisons use the "any coordinate strictly
/// less" rule, matching the RANGE COLUMNS semantics this engine targets
/// (not full lexicographic order).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Position(Vec<i64>);

impl Position {
    pub fn new(values: impl Into<Vec<i64>>) -> Self {
        Position(values.into())
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn values(&self) -> &[i64] {
        &self.0
    }

    /// `self` compares Less than `other` iff some coordinate of `self` is
    /// strictly less than the matching coordinate of `other`; Greater iff
    /// some coordinate is strictly greater and none is less; Equal iff
    /// every coordinate matches.
    pub fn compare(&self, other: &Position) -> Result<Ordering, PlannerError> {
        if self.0.len() != other.0.len() {
            return Err(PlannerError::ArityMismatch {
                expected: self.0.len(),
                got: other.0.len(),
            });
        }
        if self.0 == other.0 {
            return Ok(Ordering::Equal);
        }
        if self.0.iter().zip(other.0.iter()).any(|(a, b)| a < b) {
            return Ok(Ordering::Less);
        }
        Ok(Ordering::Greater)
    }

    pub fn add_rate(&self, rate: &[f64], days: f64) -> Position {
        let values = self
            .0
            .iter()
            .zip(rate.iter())
            .map(|(p, r)| p + (r * days).floor() as i64)
            .collect();
        Position(values)
    }
}

/// Whether a partition's name yields a usable timestamp, and if so whether
/// it is a real date parsed from the name or a synthetic placeholder used
/// only for rate arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionTimestamp {
    Real(DateTime<Utc>),
    Synthetic(DateTime<Utc>),
    None,
}

impl PartitionTimestamp {
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            PartitionTimestamp::Real(t) | PartitionTimestamp::Synthetic(t) => Some(*t),
            PartitionTimestamp::None => None,
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self, PartitionTimestamp::Real(_))
    }
}

struct NamePatterns {
    full: Regex,
    month: Regex,
    year: Regex,
}

fn name_patterns() -> &'static NamePatterns {
    static PATTERNS: OnceLock<NamePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| NamePatterns {
        full: Regex::new(r"^p_(\d{4})(\d{2})(\d{2})$").unwrap(),
        month: Regex::new(r"^p_(\d{4})(\d{2})$").unwrap(),
        year: Regex::new(r"^p_(\d{4})$").unwrap(),
    })
}

/// Parse a partition name into its timestamp per the naming rules: names
/// matching `p_YYYYMMDD`, `p_YYYYMM`, or `p_YYYY` yield a real timestamp;
/// `p_start` yields a synthetic one; `p_initial` and anything not starting
/// with `p_` yield none.
pub fn parse_name_timestamp(name: &str) -> PartitionTimestamp {
    if name == "p_start" {
        let synthetic = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        return PartitionTimestamp::Synthetic(synthetic);
    }
    if name == "p_initial" {
        return PartitionTimestamp::None;
    }
    if !name.starts_with("p_") {
        return PartitionTimestamp::None;
    }
    let patterns = name_patterns();
    if let Some(caps) = patterns.full.captures(name) {
        if let Some(dt) = ymd(&caps[1], &caps[2], &caps[3]) {
            return PartitionTimestamp::Real(dt);
        }
    }
    if let Some(caps) = patterns.month.captures(name) {
        if let Some(dt) = ymd(&caps[1], &caps[2], "1") {
            return PartitionTimestamp::Real(dt);
        }
    }
    if let Some(caps) = patterns.year.captures(name) {
        if let Some(dt) = ymd(&caps[1], "1", "1") {
            return PartitionTimestamp::Real(dt);
        }
    }
    PartitionTimestamp::None
}

fn ymd(y: &str, m: &str, d: &str) -> Option<DateTime<Utc>> {
    let year: i32 = y.parse().ok()?;
    let month: u32 = m.parse().ok()?;
    let day: u32 = d.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

/// Render a date as the canonical `p_YYYYMMDD` partition name.
pub fn format_name_for_date(ts: DateTime<Utc>) -> String {
    format!("p_{}", ts.format("%Y%m%d"))
}

/// Floor a timestamp to the hour: minute, second, and microsecond become
/// zero. All timestamps handled by the engine are UTC.
pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive()
        .and_hms_opt(ts.time().hour(), 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .unwrap_or(ts)
}

/// Exactly one of Bounded, Tail, or Instant.
#[derive(Debug, Clone, PartialEq)]
pub enum Partition {
    Bounded { name: Identifier, bound: Position },
    Tail { name: Identifier, arity: usize },
    /// Synthetic bounded partition carrying an exact timestamp; used only
    /// inside the rate estimator, never persisted or emitted.
    Instant { bound: Position, timestamp: DateTime<Utc> },
}

impl Partition {
    pub fn name(&self) -> Option<&Identifier> {
        match self {
            Partition::Bounded { name, .. } | Partition::Tail { name, .. } => Some(name),
            Partition::Instant { .. } => None,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Partition::Bounded { bound, .. } => bound.arity(),
            Partition::Tail { arity, .. } => *arity,
            Partition::Instant { bound, .. } => bound.arity(),
        }
    }

    pub fn bound(&self) -> Option<&Position> {
        match self {
            Partition::Bounded { bound, .. } | Partition::Instant { bound, .. } => Some(bound),
            Partition::Tail { .. } => None,
        }
    }

    pub fn is_tail(&self) -> bool {
        matches!(self, Partition::Tail { .. })
    }

    /// As in §4.A: real for a name that parses, synthetic for `p_start`,
    /// real for an Instant's explicit instant.
    pub fn timestamp(&self) -> PartitionTimestamp {
        match self {
            Partition::Bounded { name, .. } | Partition::Tail { name, .. } => {
                parse_name_timestamp(name.as_str())
            }
            Partition::Instant { timestamp, .. } => PartitionTimestamp::Real(*timestamp),
        }
    }

    /// `self < position` using the any-coordinate rule; always false for a
    /// Tail (its bound is MAXVALUE in every column).
    pub fn less_than_position(&self, position: &Position) -> Result<bool, PlannerError> {
        match self.bound() {
            Some(bound) => Ok(bound.compare(position)? == Ordering::Less),
            None => Ok(false),
        }
    }

    /// Ordering between two partitions for the "strictly increasing bounds"
    /// invariant: Bounded/Instant compare by bound, Bounded < Tail always,
    /// Tail < anything never.
    pub fn less_than_partition(&self, other: &Partition) -> Result<bool, PlannerError> {
        match (self, other) {
            (Partition::Tail { .. }, _) => Ok(false),
            (_, Partition::Tail { .. }) => Ok(true),
            (a, b) => {
                let ab = a.bound().expect("non-tail partitions have a bound");
                let bb = b.bound().expect("non-tail partitions have a bound");
                Ok(ab.compare(bb)? == Ordering::Less)
            }
        }
    }
}

/// A freshly planned change to a partition, or a freshly created one.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedPartition {
    Change(ChangePartition),
    New(NewPartition),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangePartition {
    pub old: Partition,
    pub new_position: Option<Position>,
    pub new_timestamp: Option<DateTime<Utc>>,
    pub important: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPartition {
    pub timestamp: DateTime<Utc>,
    pub position: Option<Position>,
    pub set_as_max_value: bool,
}

impl ChangePartition {
    pub fn new(old: Partition) -> Self {
        ChangePartition {
            old,
            new_position: None,
            new_timestamp: None,
            important: false,
        }
    }

    /// True iff the new Position differs, or the new timestamp's date
    /// differs from the old's, or the old had no timestamp and the new
    /// does.
    pub fn has_modifications(&self) -> bool {
        if let Some(new_pos) = &self.new_position {
            if self.old.bound() != Some(new_pos) {
                return true;
            }
        }
        let old_ts = self.old.timestamp().instant();
        match (&old_ts, &self.new_timestamp) {
            (None, Some(_)) => true,
            (Some(old), Some(new)) => old.date_naive() != new.date_naive(),
            _ => false,
        }
    }

    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.new_timestamp.or_else(|| self.old.timestamp().instant())
    }

    pub fn effective_position(&self) -> Option<Position> {
        self.new_position.clone().or_else(|| self.old.bound().cloned())
    }
}

impl PlannedPartition {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            PlannedPartition::Change(c) => c.effective_timestamp(),
            PlannedPartition::New(n) => Some(n.timestamp),
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            PlannedPartition::Change(c) => c.effective_position(),
            PlannedPartition::New(n) => n.position.clone(),
        }
    }

    pub fn important(&self) -> bool {
        match self {
            PlannedPartition::Change(c) => c.important,
            PlannedPartition::New(_) => true,
        }
    }

    pub fn has_modifications(&self) -> bool {
        match self {
            PlannedPartition::Change(c) => c.has_modifications(),
            PlannedPartition::New(_) => true,
        }
    }

    /// Materialise a Change or New into a concrete Bounded or Tail.
    /// Requires a timestamp to derive a name; fails with `IncompletePlan`
    /// otherwise.
    pub fn as_partition(&self, arity: usize) -> Result<Partition, PlannerError> {
        let ts = self.timestamp().ok_or(PlannerError::IncompletePlan)?;
        match self {
            PlannedPartition::Change(c) => {
                let name = if c.new_timestamp.is_some() {
                    Identifier::new(format_name_for_date(ts))?
                } else {
                    c.old.name().cloned().ok_or(PlannerError::IncompletePlan)?
                };
                match c.effective_position() {
                    Some(bound) => Ok(Partition::Bounded { name, bound }),
                    None => Ok(Partition::Tail { name, arity }),
                }
            }
            PlannedPartition::New(n) => {
                let name = Identifier::new(format_name_for_date(ts))?;
                if n.set_as_max_value {
                    Ok(Partition::Tail { name, arity })
                } else {
                    let bound = n.position.clone().ok_or(PlannerError::IncompletePlan)?;
                    Ok(Partition::Bounded { name, bound })
                }
            }
        }
    }
}

/// A table's configuration as seen by the engine: name, retention, lifespan
/// override, and the optional earliest-timestamp query. Pure data; no I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    pub name: Identifier,
    pub retention_period: Option<chrono::Duration>,
    pub partition_period: Option<chrono::Duration>,
    pub earliest_timestamp_query: Option<String>,
}

impl TableConfig {
    pub fn new(name: Identifier) -> Self {
        TableConfig {
            name,
            retention_period: None,
            partition_period: None,
            earliest_timestamp_query: None,
        }
    }
}
