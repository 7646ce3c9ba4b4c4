//! Shared helpers: identifier validation and small iterator adapters lifted
//! from the reference implementation's `tools.py`.

use regex::Regex;
use std::sync::OnceLock;

use crate::model::PlannerError;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap())
}

/// A validated SQL identifier. The only way to interpolate a name into SQL
/// is through one of these; constructing one is the single point where
/// `InvalidIdentifier` can be raised.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Result<Self, PlannerError> {
        let value = value.into();
        if value.is_empty() || !identifier_pattern().is_match(&value) {
            return Err(PlannerError::InvalidIdentifier { value });
        }
        Ok(Identifier(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Yields `(a, b)` for every adjacent pair in the iterator, in order.
pub fn pairwise<I>(iter: I) -> impl Iterator<Item = (I::Item, I::Item)>
where
    I: IntoIterator,
    I::Item: Clone,
{
    let mut it = iter.into_iter();
    let first = it.next();
    let mut prev = first;
    std::iter::from_fn(move || {
        let p = prev.clone()?;
        let n = it.next()?;
        prev = Some(n.clone());
        Some((p, n))
    })
}

/// Yields `(item, is_last)` for every item in the iterator.
pub fn with_is_last<I>(iter: I) -> impl Iterator<Item = (I::Item, bool)>
where
    I: IntoIterator,
{
    let mut it = iter.into_iter().peekable();
    std::iter::from_fn(move || {
        let item = it.next()?;
        let is_last = it.peek().is_none();
        Some((item, is_last))
    })
}

/// Validates a caller-supplied earliest-timestamp query per the external
/// interface contract: exactly one `?`, terminated with `;`, and free of any
/// mutating keyword.
pub fn validate_earliest_timestamp_query(query: &str) -> Result<(), PlannerError> {
    let trimmed = query.trim();
    if !trimmed.ends_with(';') {
        return Err(PlannerError::UnexpectedPartition {
            message: "earliest-timestamp query must end with ';'".into(),
        });
    }
    if trimmed.matches('?').count() != 1 {
        return Err(PlannerError::UnexpectedPartition {
            message: "earliest-timestamp query must contain exactly one '?'".into(),
        });
    }
    let upper = trimmed.to_uppercase();
    for verb in ["UPDATE", "INSERT", "DELETE", "SET", "ANALYZE"] {
        if upper.contains(verb) {
            return Err(PlannerError::UnexpectedPartition {
                message: format!("earliest-timestamp query must not contain {verb}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identifier_accepts_alnum_underscore_dash() {
        assert!(Identifier::new("p_20210101").is_ok());
        assert!(Identifier::new("my-table_1").is_ok());
    }

    #[test]
    fn identifier_rejects_special_characters() {
        assert!(Identifier::new("p`; DROP TABLE").is_err());
        assert!(Identifier::new("").is_err());
        assert!(Identifier::new("has space").is_err());
    }

    #[test]
    fn pairwise_walks_adjacent_pairs() {
        let pairs: Vec<_> = pairwise(vec![1, 2, 3, 4]).collect();
        assert_eq!(pairs, vec![(1, 2), (2, 3), (3, 4)]);
    }

    #[test]
    fn pairwise_empty_and_singleton_yield_nothing() {
        assert_eq!(pairwise(Vec::<i32>::new()).count(), 0);
        assert_eq!(pairwise(vec![1]).count(), 0);
    }

    #[test]
    fn with_is_last_flags_final_item() {
        let flagged: Vec<_> = with_is_last(vec!["a", "b", "c"]).collect();
        assert_eq!(flagged, vec![("a", false), ("b", false), ("c", true)]);
    }

    #[test]
    fn earliest_timestamp_query_validation() {
        assert!(validate_earliest_timestamp_query(
            "SELECT ts FROM t WHERE id > ? ORDER BY id LIMIT 1;"
        )
        .is_ok());
        assert!(validate_earliest_timestamp_query("SELECT ts FROM t WHERE id > ? LIMIT 1").is_err());
        assert!(validate_earliest_timestamp_query(
            "SELECT ts FROM t WHERE id > ? AND id > ?;"
        )
        .is_err());
        assert!(validate_earliest_timestamp_query("UPDATE t SET x = ?;").is_err());
    }

    proptest! {
        #[test]
        fn pairwise_yields_len_minus_one_pairs_in_order(values: Vec<i32>) {
            let pairs: Vec<_> = pairwise(values.clone()).collect();
            prop_assert_eq!(pairs.len(), values.len().saturating_sub(1));
            for (i, (a, b)) in pairs.iter().enumerate() {
                prop_assert_eq!(*a, values[i]);
                prop_assert_eq!(*b, values[i + 1]);
            }
        }
    }
}
