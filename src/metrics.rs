// src/metrics.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct Metrics {
    pub msgs_total: AtomicU64,
    pub signals_total: AtomicU64,
    pub signals_dropped: AtomicU64,
    pub reports_total: AtomicU64,

    // cheap per-batch ingest latency "histogram" (µs buckets)
    pub ingest_b0: AtomicU64,
    pub ingest_b1: AtomicU64,
    pub ingest_b2: AtomicU64,
    pub ingest_b3: AtomicU64,
    pub ingest_b4: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inc_msgs(&self) {
        self.msgs_total.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_signals(&self) {
        self.signals_total.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_signals_dropped(&self) {
        self.signals_dropped.fetch_add(1, Ordering::Relaxed);
    }
    #[inline]
    pub fn inc_reports(&self) {
        self.reports_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_ingest(&self, dur: Duration) {
        let us = dur.as_micros() as u64;
        // buckets: <50µs, <100µs, <250µs, <1ms, >=1ms
        if us < 50 {
            self.ingest_b0.fetch_add(1, Ordering::Relaxed);
        } else if us < 100 {
            self.ingest_b1.fetch_add(1, Ordering::Relaxed);
        } else if us < 250 {
            self.ingest_b2.fetch_add(1, Ordering::Relaxed);
        } else if us < 1_000 {
            self.ingest_b3.fetch_add(1, Ordering::Relaxed);
        } else {
            self.ingest_b4.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn summary(&self) -> String {
        let msgs = self.msgs_total.load(Ordering::Relaxed);
        let signals = self.signals_total.load(Ordering::Relaxed);
        let dropped = self.signals_dropped.load(Ordering::Relaxed);
        let reports = self.reports_total.load(Ordering::Relaxed);

        let b0 = self.ingest_b0.load(Ordering::Relaxed);
        let b1 = self.ingest_b1.load(Ordering::Relaxed);
        let b2 = self.ingest_b2.load(Ordering::Relaxed);
        let b3 = self.ingest_b3.load(Ordering::Relaxed);
        let b4 = self.ingest_b4.load(Ordering::Relaxed);

        format!(
            "msgs={msgs} signals={signals} signals_dropped={dropped} reports={reports} \
             ingest_us[<50]={b0} [<100]={b1} [<250]={b2} [<1000]={b3} [>=1000]={b4}"
        )
    }
}
