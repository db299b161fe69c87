//! Shared counters for an ingestion run.

use std::{
    num::NonZeroU64,
    sync::atomic::{AtomicU64, Ordering},
};

use log::info;

use super::IngestSummary;

/// Lock-free tallies updated by every worker.
#[derive(Debug)]
pub(crate) struct IngestCounters {
    interval: NonZeroU64,
    total: AtomicU64,
    matched: AtomicU64,
    unresolved: AtomicU64,
    out_of_scope: AtomicU64,
    undecodable: AtomicU64,
    duplicates: AtomicU64,
    failed_writes: AtomicU64,
    skipped_records: AtomicU64,
}

/// Reason a fact was dropped without being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Discard {
    Unresolved,
    OutOfScope,
    Undecodable,
    Duplicate,
    FailedWrite,
}

impl IngestCounters {
    pub(crate) const fn new(interval: NonZeroU64) -> Self {
        Self {
            interval,
            total: AtomicU64::new(0),
            matched: AtomicU64::new(0),
            unresolved: AtomicU64::new(0),
            out_of_scope: AtomicU64::new(0),
            undecodable: AtomicU64::new(0),
            duplicates: AtomicU64::new(0),
            failed_writes: AtomicU64::new(0),
            skipped_records: AtomicU64::new(0),
        }
    }

    /// Count a fact picked up by a worker, logging progress on every
    /// interval boundary. Returns whether a progress line was logged.
    pub(crate) fn processed(&self) -> bool {
        let total = self.total.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        let tick = total.is_multiple_of(self.interval.get());
        if tick {
            info!(
                "ingestion progress: {total} facts processed, {} matched",
                self.matched.load(Ordering::Relaxed)
            );
        }
        tick
    }

    pub(crate) fn matched(&self) {
        self.matched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self, reason: Discard) {
        let counter = match reason {
            Discard::Unresolved => &self.unresolved,
            Discard::OutOfScope => &self.out_of_scope,
            Discard::Undecodable => &self.undecodable,
            Discard::Duplicate => &self.duplicates,
            Discard::FailedWrite => &self.failed_writes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn skipped(&self) {
        self.skipped_records.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn summary(&self, cancelled: bool) -> IngestSummary {
        IngestSummary {
            total: self.total.load(Ordering::SeqCst),
            matched: self.matched.load(Ordering::SeqCst),
            unresolved: self.unresolved.load(Ordering::SeqCst),
            out_of_scope: self.out_of_scope.load(Ordering::SeqCst),
            undecodable: self.undecodable.load(Ordering::SeqCst),
            duplicates: self.duplicates.load(Ordering::SeqCst),
            failed_writes: self.failed_writes.load(Ordering::SeqCst),
            skipped_records: self.skipped_records.load(Ordering::SeqCst),
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 5, vec![1, 2, 3, 4, 5])]
    #[case(3, 7, vec![3, 6])]
    #[case(10, 9, vec![])]
    fn progress_is_reported_on_interval_boundaries(
        #[case] interval: u64,
        #[case] facts: u64,
        #[case] expected: Vec<u64>,
    ) {
        let counters = IngestCounters::new(NonZeroU64::new(interval).expect("non-zero interval"));
        let ticks: Vec<u64> = (1..=facts).filter(|_| counters.processed()).collect();
        assert_eq!(ticks, expected);
    }

    #[rstest]
    fn summary_reflects_each_counter() {
        let counters = IngestCounters::new(NonZeroU64::MIN);
        for _ in 0..4 {
            assert!(counters.processed());
        }
        counters.matched();
        counters.dropped(Discard::Unresolved);
        counters.dropped(Discard::Duplicate);
        counters.dropped(Discard::FailedWrite);
        counters.skipped();

        let summary = counters.summary(false);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.matched, 1);
        assert_eq!(summary.unresolved, 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.failed_writes, 1);
        assert_eq!(summary.skipped_records, 1);
        assert_eq!(summary.out_of_scope, 0);
        assert!(!summary.cancelled);
    }
}
