use chrono::{Duration, TimeZone, Utc};
use rangepart::prelude::*;

fn bounded(name: &str, bound: i64) -> Partition {
    Partition::Bounded {
        name: Identifier::new(name).unwrap(),
        bound: Position::new(vec![bound]),
    }
}

fn tail(name: &str, arity: usize) -> Partition {
    Partition::Tail {
        name: Identifier::new(name).unwrap(),
        arity,
    }
}

fn no_query(_p: &Partition) -> Result<chrono::DateTime<Utc>, PlannerError> {
    unreachable!("no earliest-timestamp query configured")
}

/// S1 — no change needed end to end: planner and emitter agree there's
/// nothing to do.
#[test]
fn scenario_s1_no_change_needed_emits_nothing() {
    let partitions = vec![
        bounded("p_20201231", 100),
        bounded("p_20210102", 200),
        tail("future", 1),
    ];
    let config = TableConfig::new(Identifier::new("orders").unwrap());
    let current = Position::new(vec![50]);
    let eval_time = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();

    let plan = plan_table(
        &config,
        &partitions,
        &current,
        eval_time,
        Duration::days(7),
        2,
        &mut no_query,
    )
    .unwrap();
    assert!(!plan.should_run);

    let statements = render_plan(&config.name, &plan, current.arity()).unwrap();
    assert!(statements.is_empty());
}

/// S2 — rename and new tail end to end: the emitter must produce exactly
/// one REORGANIZE statement.
#[test]
fn scenario_s2_rename_and_new_tail_emits_one_statement() {
    let partitions = vec![
        bounded("p_20201231", 100),
        bounded("p_20210102", 200),
        tail("future", 1),
    ];
    let config = TableConfig::new(Identifier::new("orders").unwrap());
    let current = Position::new(vec![50]);
    let eval_time = Utc.with_ymd_and_hms(2021, 1, 1, 23, 55, 0).unwrap();

    let plan = plan_table(
        &config,
        &partitions,
        &current,
        eval_time,
        Duration::days(2),
        3,
        &mut no_query,
    )
    .unwrap();
    assert!(plan.should_run);

    let statements = render_plan(&config.name, &plan, current.arity()).unwrap();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].starts_with("ALTER TABLE `orders` REORGANIZE PARTITION `p_20210102` INTO ("));
    assert!(statements[0].ends_with(");"));
}

/// S3 — multi-column reorganize end to end, against a parsed partition map.
#[test]
fn scenario_s3_multi_column_reorganize_from_parsed_ddl() {
    let ddl = "CREATE TABLE `events` (`shard` int, `id` bigint) \
               PARTITION BY RANGE COLUMNS(`shard`, `id`) \
               (PARTITION `p_20210101` VALUES LESS THAN (100, 100000), \
               PARTITION `p_20210103` VALUES LESS THAN (300, 300000), \
               PARTITION `future` VALUES LESS THAN (MAXVALUE, MAXVALUE))";
    let (range_columns, partitions) = parse_create_table(ddl).unwrap();
    assert_eq!(range_columns, vec!["shard".to_string(), "id".to_string()]);

    let config = TableConfig::new(Identifier::new("events").unwrap());
    let current = Position::new(vec![150, 150_000]);
    let eval_time = Utc.with_ymd_and_hms(2021, 1, 10, 1, 0, 0).unwrap();

    // empty_future holds only the Tail, so two required empty slots force a
    // synthetic New beyond it and the Tail keeps its rename intact.
    let plan = plan_table(
        &config,
        &partitions,
        &current,
        eval_time,
        Duration::days(30),
        2,
        &mut no_query,
    )
    .unwrap();

    let statements = render_plan(&config.name, &plan, current.arity()).unwrap();
    assert_eq!(statements.len(), 1);
    assert!(statements[0].starts_with("ALTER TABLE `events` REORGANIZE PARTITION `p_20210103` INTO ("));
}

/// S6 — timestamp conflict resolution end to end: the emitted plan never
/// produces two partitions that would materialise to the same name.
#[test]
fn scenario_s6_timestamp_conflicts_never_collide_in_emitted_sql() {
    let partitions = vec![
        bounded("p_20210101", 100),
        bounded("p_20210103", 102),
        bounded("p_20210104", 103),
        tail("future", 1),
    ];
    let config = TableConfig::new(Identifier::new("t").unwrap());
    let current = Position::new(vec![50]);
    let eval_time = Utc.with_ymd_and_hms(2021, 1, 3, 0, 0, 0).unwrap();

    let plan = plan_table(
        &config,
        &partitions,
        &current,
        eval_time,
        Duration::days(1),
        1,
        &mut no_query,
    )
    .unwrap();

    let statements = render_plan(&config.name, &plan, current.arity()).unwrap();
    let mut seen = std::collections::HashSet::new();
    for statement in &statements {
        for name in extract_partition_names(statement) {
            assert!(seen.insert(name.clone()), "duplicate partition name {name} in emitted SQL");
        }
    }
}

fn extract_partition_names(statement: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = statement;
    while let Some(start) = rest.find("PARTITION `") {
        let after = &rest[start + "PARTITION `".len()..];
        if let Some(end) = after.find('`') {
            names.push(after[..end].to_string());
            rest = &after[end + 1..];
        } else {
            break;
        }
    }
    names
}
