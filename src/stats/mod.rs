//! Counters the driver updates per table run (out of scope for the engine
//! itself — see §1). Grounded on the teacher's `estimate::MigrationEstimate`/
//! `TableStats` shape: a plain data struct with a rendering method, no
//! network code of its own.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Counters {
    pub tables_processed: AtomicU64,
    pub plans_emitted: AtomicU64,
    pub partitions_dropped: AtomicU64,
    pub errors: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Counters::default()
    }

    pub fn record_table_processed(&self) {
        self.tables_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_plan_emitted(&self) {
        self.plans_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_partitions_dropped(&self, count: u64) {
        self.partitions_dropped.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn render_prometheus(&self) -> String {
        format!(
            "# TYPE rangepart_tables_processed counter\n\
             rangepart_tables_processed {}\n\
             # TYPE rangepart_plans_emitted counter\n\
             rangepart_plans_emitted {}\n\
             # TYPE rangepart_partitions_dropped counter\n\
             rangepart_partitions_dropped {}\n\
             # TYPE rangepart_errors counter\n\
             rangepart_errors {}\n",
            self.tables_processed.load(Ordering::Relaxed),
            self.plans_emitted.load(Ordering::Relaxed),
            self.partitions_dropped.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
        )
    }
}
