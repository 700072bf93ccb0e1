//! Fan-in join over concurrent asset outcomes.
//!
//! The aggregator itself is plain data: it is only ever driven from the
//! loader's single consumer loop, which serializes all mutation and the
//! completion check (see [`Loader::load_assets`](super::Loader::load_assets)).

use crate::types::AssetRecord;

/// Terminal outcome of reconciling one asset
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AssetLoadResult {
    /// Newly materialized by the asset source
    Finished,
    /// Content was already present, on disk or upstream
    AlreadyExists,
    /// Lookup, merge, or fetch failed
    Errored,
    /// Declared out of scope by the skip policy
    Skipped,
}

/// Progress counts reported after each completion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AssetProgress {
    /// Assets loaded or found already present so far
    pub successful: usize,
    /// Assets errored so far
    pub failed: usize,
    /// Total assets in the manifest
    pub total: usize,
}

/// The four completion buckets, handed to finalize once the join closes
pub(crate) struct Buckets {
    pub finished: Vec<AssetRecord>,
    pub existing: Vec<AssetRecord>,
    pub errored: Vec<AssetRecord>,
    pub skipped: Vec<AssetRecord>,
    /// Fixed target count, set before fan-out began
    pub total: usize,
}

/// Buckets asset outcomes and decides when the join is complete
pub(crate) struct CompletionAggregator {
    total: usize,
    finished: Vec<AssetRecord>,
    existing: Vec<AssetRecord>,
    errored: Vec<AssetRecord>,
    skipped: Vec<AssetRecord>,
}

impl CompletionAggregator {
    /// Create an aggregator expecting `total` completions
    pub fn new(total: usize) -> Self {
        Self {
            total,
            finished: Vec::new(),
            existing: Vec::new(),
            errored: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Route one asset outcome into its bucket and report progress
    pub fn record(&mut self, asset: AssetRecord, result: AssetLoadResult) -> AssetProgress {
        match result {
            AssetLoadResult::Finished => self.finished.push(asset),
            AssetLoadResult::AlreadyExists => self.existing.push(asset),
            AssetLoadResult::Errored => self.errored.push(asset),
            AssetLoadResult::Skipped => self.skipped.push(asset),
        }

        debug_assert!(self.resolved() <= self.total);

        AssetProgress {
            successful: self.finished.len() + self.existing.len(),
            failed: self.errored.len(),
            total: self.total,
        }
    }

    /// Whether every expected asset has resolved into exactly one bucket
    pub fn is_complete(&self) -> bool {
        self.resolved() == self.total
    }

    fn resolved(&self) -> usize {
        self.finished.len() + self.existing.len() + self.errored.len() + self.skipped.len()
    }

    /// Consume the aggregator, yielding the buckets for finalize
    pub fn into_buckets(self) -> Buckets {
        Buckets {
            finished: self.finished,
            existing: self.existing,
            errored: self.errored,
            skipped: self.skipped,
            total: self.total,
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn asset(key: &str) -> AssetRecord {
        AssetRecord::new(key)
    }

    #[test]
    fn outcomes_route_to_their_buckets() {
        let mut agg = CompletionAggregator::new(4);
        agg.record(asset("a"), AssetLoadResult::Finished);
        agg.record(asset("b"), AssetLoadResult::AlreadyExists);
        agg.record(asset("c"), AssetLoadResult::Errored);
        agg.record(asset("d"), AssetLoadResult::Skipped);

        assert!(agg.is_complete());
        let buckets = agg.into_buckets();
        assert_eq!(buckets.finished.len(), 1);
        assert_eq!(buckets.existing.len(), 1);
        assert_eq!(buckets.errored.len(), 1);
        assert_eq!(buckets.skipped.len(), 1);
        assert_eq!(buckets.total, 4);
    }

    #[test]
    fn progress_counts_successes_and_failures_separately() {
        let mut agg = CompletionAggregator::new(3);

        let p = agg.record(asset("a"), AssetLoadResult::Finished);
        assert_eq!((p.successful, p.failed, p.total), (1, 0, 3));

        let p = agg.record(asset("b"), AssetLoadResult::Errored);
        assert_eq!((p.successful, p.failed, p.total), (1, 1, 3));

        // Found-on-disk counts as success, same as a fresh download
        let p = agg.record(asset("c"), AssetLoadResult::AlreadyExists);
        assert_eq!((p.successful, p.failed, p.total), (2, 1, 3));
    }

    #[test]
    fn progress_is_monotonic_and_bounded_by_total() {
        let mut agg = CompletionAggregator::new(5);
        let results = [
            AssetLoadResult::Finished,
            AssetLoadResult::Skipped,
            AssetLoadResult::Errored,
            AssetLoadResult::AlreadyExists,
            AssetLoadResult::Finished,
        ];

        let mut last = (0, 0);
        for (i, result) in results.into_iter().enumerate() {
            let p = agg.record(asset(&format!("asset-{i}")), result);
            assert!(p.successful >= last.0);
            assert!(p.failed >= last.1);
            assert!(p.successful + p.failed <= p.total);
            last = (p.successful, p.failed);
        }

        assert!(agg.is_complete());
    }

    #[test]
    fn skipped_assets_complete_the_join_without_counting_as_progress() {
        let mut agg = CompletionAggregator::new(2);

        let p = agg.record(asset("a"), AssetLoadResult::Finished);
        assert_eq!((p.successful, p.failed), (1, 0));
        assert!(!agg.is_complete());

        let p = agg.record(asset("b"), AssetLoadResult::Skipped);
        assert_eq!((p.successful, p.failed), (1, 0));
        assert!(agg.is_complete());
    }

    #[test]
    fn zero_target_is_complete_before_any_completion() {
        let agg = CompletionAggregator::new(0);
        assert!(agg.is_complete());
    }
}
