//! Partition-map parser adapter (§4.B): turns the text of a
//! `SHOW CREATE TABLE` statement into a range-column list and an ordered
//! partition list, without issuing any query itself.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

use crate::model::{Partition, PlannerError, Position};
use crate::util::Identifier;

struct Patterns {
    range_clause: Regex,
    partition_row: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        range_clause: RegexBuilder::new(r"PARTITION\s+BY\s+RANGE\s*(COLUMNS)?\s*\(([^)]*)\)")
            .case_insensitive(true)
            .build()
            .unwrap(),
        partition_row: RegexBuilder::new(
            r"PARTITION\s+`([A-Za-z0-9_-]+)`\s+VALUES\s+LESS\s+THAN\s*\(([^)]*)\)",
        )
        .case_insensitive(true)
        .build()
        .unwrap(),
    })
}

fn table_information(message: impl Into<String>) -> PlannerError {
    PlannerError::TableInformation {
        message: message.into(),
    }
}

/// Parses the range-column list and ordered partition list out of a
/// `SHOW CREATE TABLE` statement's text.
pub fn parse_create_table(ddl: &str) -> Result<(Vec<String>, Vec<Partition>), PlannerError> {
    let p = patterns();

    let range_caps = p
        .range_clause
        .captures(ddl)
        .ok_or_else(|| table_information("no PARTITION BY RANGE clause found"))?;
    let range_columns: Vec<String> = range_caps[2]
        .split(',')
        .map(|c| c.trim().trim_matches('`').to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if range_columns.is_empty() {
        return Err(table_information("range-column list is empty"));
    }
    let arity = range_columns.len();

    let mut partitions = Vec::new();
    for caps in p.partition_row.captures_iter(ddl) {
        let name = Identifier::new(caps[1].to_string())?;
        let values_str = caps[2].trim();
        let values: Vec<&str> = values_str.split(',').map(str::trim).collect();

        let is_max_value = values.iter().all(|v| v.eq_ignore_ascii_case("maxvalue"));
        if is_max_value {
            if values.len() != arity {
                return Err(table_information(format!(
                    "partition `{name}` MAXVALUE arity {} disagrees with range-column count {arity}",
                    values.len()
                )));
            }
            partitions.push(Partition::Tail { name, arity });
            continue;
        }

        if values.len() != arity {
            return Err(table_information(format!(
                "partition `{name}` arity {} disagrees with range-column count {arity}",
                values.len()
            )));
        }
        let bound: Result<Vec<i64>, _> = values.iter().map(|v| v.parse::<i64>()).collect();
        let bound = bound.map_err(|_| {
            table_information(format!("partition `{name}` has a non-integer bound"))
        })?;
        partitions.push(Partition::Bounded {
            name,
            bound: Position::new(bound),
        });
    }

    if partitions.is_empty() {
        return Err(table_information("no partitions found"));
    }
    if !partitions.last().unwrap().is_tail() {
        return Err(table_information("partition list does not end in a Tail"));
    }

    Ok((range_columns, partitions))
}

/// Checks `INFORMATION_SCHEMA.TABLES.CREATE_OPTIONS` for the `partitioned`
/// marker before the planner or bootstrap planner runs against a table.
pub fn check_table_compatibility(create_options: &str) -> Result<(), PlannerError> {
    if !create_options.to_ascii_lowercase().contains("partitioned") {
        return Err(table_information(
            "table's CREATE_OPTIONS does not contain 'partitioned'",
        ));
    }
    Ok(())
}
