//! Monitor Metrics
//!
//! Counter-based observability for the monitor, reported as a `BTreeMap` so
//! the output has deterministic, alphabetical key ordering — reproducible in
//! tests and stable when exported.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

/// Counters tracked across a monitor's lifetime.
///
/// Structural churn (creations, drops, folds) is recorded here; the live
/// allocated-byte figure stays on the monitor itself because it is part of
/// the eviction logic, not just reporting.
#[derive(Debug, Default, Clone)]
pub struct MonitorMetrics {
    /// Packets offered to the monitor, sampled or not.
    pub packets: u64,

    /// Packets that passed the sampling decision and updated rates.
    pub sampled: u64,

    /// Counter entries allocated.
    pub counters_created: u64,

    /// Counter entries destroyed by folds or resets.
    pub counters_dropped: u64,

    /// Trie nodes allocated (the root is not counted).
    pub nodes_created: u64,

    /// Trie nodes destroyed by folds or resets.
    pub nodes_dropped: u64,

    /// Fold passes run, including those issued by forced folds.
    pub folds: u64,

    /// Threshold-escalation fold sequences run.
    pub forced_folds: u64,

    /// Allocations refused because of the memory ceiling.
    pub alloc_refusals: u64,

    /// High-water mark of the allocated-byte counter.
    pub peak_alloced_bytes: u64,
}

impl MonitorMetrics {
    /// Creates a zeroed metrics block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a packet arrival and whether it was sampled.
    pub(crate) fn record_packet(&mut self, sampled: bool) {
        self.packets += 1;
        if sampled {
            self.sampled += 1;
        }
    }

    /// Tracks the allocation high-water mark.
    pub(crate) fn note_alloced(&mut self, alloced_bytes: usize) {
        self.peak_alloced_bytes = self.peak_alloced_bytes.max(alloced_bytes as u64);
    }

    /// Converts the counters to a `BTreeMap` for reporting.
    ///
    /// Derived ratios are included only when their denominator is non-zero.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("packets".to_string(), self.packets as f64);
        metrics.insert("sampled".to_string(), self.sampled as f64);
        metrics.insert("counters_created".to_string(), self.counters_created as f64);
        metrics.insert("counters_dropped".to_string(), self.counters_dropped as f64);
        metrics.insert("nodes_created".to_string(), self.nodes_created as f64);
        metrics.insert("nodes_dropped".to_string(), self.nodes_dropped as f64);
        metrics.insert("folds".to_string(), self.folds as f64);
        metrics.insert("forced_folds".to_string(), self.forced_folds as f64);
        metrics.insert("alloc_refusals".to_string(), self.alloc_refusals as f64);
        metrics.insert(
            "peak_alloced_bytes".to_string(),
            self.peak_alloced_bytes as f64,
        );

        if self.packets > 0 {
            metrics.insert(
                "observed_sampling_ratio".to_string(),
                self.sampled as f64 / self.packets as f64,
            );
        }
        if self.folds > 0 {
            metrics.insert(
                "nodes_dropped_per_fold".to_string(),
                self.nodes_dropped as f64 / self.folds as f64,
            );
        }

        metrics
    }
}
