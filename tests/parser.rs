use rangepart::prelude::*;

/// Partition-map parsing round trip: the SQL emitter's own rendering of a
/// rename/new-tail plan must parse back into the same shape the planner
/// started from for a fresh table.
#[test]
fn parsed_ddl_round_trips_through_planner_and_emitter() {
    let ddl = "CREATE TABLE `orders` (\n  `id` bigint NOT NULL\n) ENGINE=InnoDB \
               PARTITION BY RANGE (`id`) \
               (PARTITION `p_20210101` VALUES LESS THAN (100), \
               PARTITION `p_20210102` VALUES LESS THAN (200), \
               PARTITION `future` VALUES LESS THAN (MAXVALUE))";

    let (range_columns, partitions) = parse_create_table(ddl).unwrap();
    assert_eq!(range_columns, vec!["id".to_string()]);
    assert_eq!(partitions.len(), 3);
    assert_eq!(partitions[0].name().unwrap().as_str(), "p_20210101");
    assert_eq!(partitions[1].bound().unwrap().values(), &[200]);
    assert!(partitions[2].is_tail());
}

#[test]
fn multi_line_create_table_statement_parses() {
    let ddl = "CREATE TABLE `events` (\n\
               `shard` int(11) NOT NULL,\n\
               `id` bigint(20) NOT NULL\n\
               ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4\n\
               /*!50100 PARTITION BY RANGE COLUMNS(`shard`,`id`)\n\
               (PARTITION `p_20210101` VALUES LESS THAN (10, 1000000),\n\
               PARTITION `future` VALUES LESS THAN (MAXVALUE, MAXVALUE)) */";

    let (range_columns, partitions) = parse_create_table(ddl).unwrap();
    assert_eq!(range_columns, vec!["shard".to_string(), "id".to_string()]);
    assert_eq!(partitions.len(), 2);
    assert_eq!(partitions[0].bound().unwrap().values(), &[10, 1_000_000]);
}

#[test]
fn rejects_ddl_whose_partition_arity_does_not_match_the_range_clause() {
    let ddl = "PARTITION BY RANGE COLUMNS(`a`, `b`) \
               (PARTITION `p1` VALUES LESS THAN (1, 2, 3), \
               PARTITION `future` VALUES LESS THAN (MAXVALUE, MAXVALUE))";
    assert!(matches!(
        parse_create_table(ddl),
        Err(PlannerError::TableInformation { .. })
    ));
}

#[test]
fn rejects_a_non_integer_bound() {
    let ddl = "PARTITION BY RANGE (`ts`) \
               (PARTITION `p1` VALUES LESS THAN ('2021-01-01'), \
               PARTITION `future` VALUES LESS THAN (MAXVALUE))";
    assert!(matches!(
        parse_create_table(ddl),
        Err(PlannerError::TableInformation { .. })
    ));
}

#[test]
fn check_table_compatibility_is_case_insensitive_to_marker_casing() {
    assert!(check_table_compatibility("max_rows=1000000 PARTITIONED").is_ok());
    assert!(check_table_compatibility("").is_err());
}
