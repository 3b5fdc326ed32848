//! Ingestion stats, protected by a read-write mutex, and mirrored into
//! `metrics` gauges/counters for scraping.

use parking_lot::RwLock;

#[derive(Debug, Clone, Default)]
pub struct IngestionStatsSnapshot {
    pub total_processed: u64,
    pub total_errors: u64,
    pub last_extraction_ms: u64,
    pub last_dgraph_write_ms: u64,
    pub avg_duration_ms: f64,
}

#[derive(Default)]
struct Inner {
    total_processed: u64,
    total_errors: u64,
    last_extraction_ms: u64,
    last_dgraph_write_ms: u64,
    total_duration_ms: u64,
}

pub struct IngestionStats {
    inner: RwLock<Inner>,
}

impl Default for IngestionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestionStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn record_success(&self, extraction_ms: u64, dgraph_write_ms: u64, total_ms: u64) {
        let mut inner = self.inner.write();
        inner.total_processed += 1;
        inner.last_extraction_ms = extraction_ms;
        inner.last_dgraph_write_ms = dgraph_write_ms;
        inner.total_duration_ms += total_ms;
        drop(inner);

        metrics::counter!("rmk_ingestion_total_processed").increment(1);
        metrics::histogram!("rmk_ingestion_duration_ms").record(total_ms as f64);
    }

    pub fn record_error(&self) {
        self.inner.write().total_errors += 1;
        metrics::counter!("rmk_ingestion_total_errors").increment(1);
    }

    #[must_use]
    pub fn snapshot(&self) -> IngestionStatsSnapshot {
        let inner = self.inner.read();
        let avg_duration_ms = if inner.total_processed > 0 {
            inner.total_duration_ms as f64 / inner.total_processed as f64
        } else {
            0.0
        };
        IngestionStatsSnapshot {
            total_processed: inner.total_processed,
            total_errors: inner.total_errors,
            last_extraction_ms: inner.last_extraction_ms,
            last_dgraph_write_ms: inner.last_dgraph_write_ms,
            avg_duration_ms,
        }
    }
}
