use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rangepart::prelude::*;

fn bounded(name: String, bound: i64) -> Partition {
    Partition::Bounded {
        name: Identifier::new(name).unwrap(),
        bound: Position::new(vec![bound]),
    }
}

fn tail() -> Partition {
    Partition::Tail {
        name: Identifier::new("future").unwrap(),
        arity: 1,
    }
}

/// A table with a long partition history: one per day for two years, plus
/// a handful of empty tail slots still ahead of the current position.
fn large_partition_list() -> Vec<Partition> {
    let base = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
    let mut partitions = Vec::with_capacity(740);
    for day in 0..730 {
        let date = base + Duration::days(day);
        let name = format!("p_{}", date.format("%Y%m%d"));
        let bound = day * 1000;
        partitions.push(bounded(name, bound));
    }
    for day in 730..735 {
        let date = base + Duration::days(day);
        let name = format!("p_{}", date.format("%Y%m%d"));
        let bound = day * 1000;
        partitions.push(bounded(name, bound));
    }
    partitions.push(tail());
    partitions
}

fn plan_table_benchmark(c: &mut Criterion) {
    let partitions = large_partition_list();
    let config = TableConfig::new(Identifier::new("events").unwrap());
    let current = Position::new(vec![729_500]);
    let eval_time = Utc.with_ymd_and_hms(2021, 1, 1, 12, 0, 0).unwrap();
    let mut no_query = |_: &Partition| unreachable!("no earliest-timestamp query in this benchmark");

    c.bench_function("plan_table over 735 partitions", |b| {
        b.iter(|| {
            let plan = plan_table(
                black_box(&config),
                black_box(&partitions),
                black_box(&current),
                black_box(eval_time),
                black_box(Duration::days(1)),
                black_box(3),
                &mut no_query,
            )
            .unwrap();
            black_box(plan);
        });
    });
}

criterion_group!(benches, plan_table_benchmark);
criterion_main!(benches);
