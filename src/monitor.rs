//! Per-Address Rate Monitor
//!
//! [`RateMonitor`] owns the whole data structure: the root trie node, the
//! age list, the byte accounting and the configuration, and exposes the
//! packet-path entry points next to the administrative operations.
//!
//! # Update Path
//!
//! A packet contributes to one counter per trie level, from the configured
//! byte offset down to the full 4-byte address. Counters and nodes are
//! created lazily on first use; under a memory ceiling a refused allocation
//! truncates the walk for that packet (deeper statistics simply are not
//! recorded) and schedules a forced fold once the walk is over, so eviction
//! never runs under the feet of an in-progress descent.
//!
//! # Eviction
//!
//! `fold` scans the age list — not the tree — deleting every node whose
//! owning counter has decayed below the threshold in both directions, until
//! usage drops below the reclaim target or the chain is exhausted. The scan
//! direction alternates randomly between calls so repeated partial folds do
//! not starve one end of the list. `forced_fold` re-runs `fold` with a
//! strictly growing threshold until usage fits the ceiling; the positive
//! increment plus the finite node population guarantee termination even
//! when every surviving branch is equally active.

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use core::fmt;
use core::fmt::Write as _;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::agelist::AgeList;
use crate::config::{clamp_memmax, CountMode, MonitorConfig};
use crate::errors::{AdminError, ConfigError};
use crate::estimator::{tick_now, unparse_rate, RateEstimator, Tick};
use crate::metrics::MonitorMetrics;
use crate::trie::{Annotation, CounterEntry, NodeArena, NodeId, TrieNode, COUNTER_COST,
    MAX_DEPTH, NODE_COST};

/// Measures per-address traffic rates, hierarchically by address byte.
///
/// One instance carries all state; all methods take `&mut self` and a caller
/// that shares the monitor across threads wraps it in the concurrent
/// front-end (see the `concurrent` module) or its own lock.
///
/// # Examples
///
/// ```
/// use ratemon_rs::{MonitorConfig, RateMonitor};
///
/// let mut mon = RateMonitor::init(MonitorConfig::default()).unwrap();
/// // 10.0.0.1, forward direction, sampled.
/// mon.record(1, &[10, 0, 0, 1], true, true);
/// let dump = mon.look(2);
/// assert!(dump.contains("10.0.0.1"));
/// ```
pub struct RateMonitor {
    count_packets: bool,
    offset: usize,
    thresh: u64,
    memmax: usize,
    ratio: u32,
    annotate: bool,
    arena: NodeArena,
    root: NodeId,
    ages: AgeList,
    alloced_mem: usize,
    reset_tick: Tick,
    rng: SmallRng,
    metrics: MonitorMetrics,
}

impl RateMonitor {
    /// Validates `config` and builds an empty monitor around a fresh root
    /// node.
    ///
    /// The root is permanent: it is not a member of the age list, carries no
    /// owning counter, and no fold ever touches it.
    pub fn init(config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut arena = NodeArena::new();
        let root = arena.insert(TrieNode::new(None));
        Ok(RateMonitor {
            count_packets: config.mode == CountMode::Packets,
            offset: config.offset,
            thresh: config.scaled_thresh(),
            memmax: config.memmax_bytes(),
            ratio: config.ratio,
            annotate: config.annotate,
            arena,
            root,
            ages: AgeList::new(),
            alloced_mem: 0,
            reset_tick: tick_now(),
            rng: SmallRng::seed_from_u64(0x5eed_1e57_0dd5_u64),
            metrics: MonitorMetrics::new(),
        })
    }

    /// Push-path entry point: port 0 is the forward direction, anything
    /// else reverse. Applies the configured sampling ratio and the
    /// process clock.
    ///
    /// Returns the annotation level the packet should carry, if any.
    pub fn push(&mut self, port: usize, packet: &[u8]) -> Option<u8> {
        let sampled = u32::from(self.rng.gen::<u16>()) <= self.ratio;
        self.record(tick_now(), packet, port == 0, sampled)
    }

    /// Pull-path entry point: like [`push`](Self::push) but every pulled
    /// packet is inspected, bypassing the sampling ratio.
    pub fn pull(&mut self, port: usize, packet: &[u8]) -> Option<u8> {
        self.record(tick_now(), packet, port == 0, true)
    }

    /// Updates statistics for each address byte of `packet` at tick `now`.
    ///
    /// `sampled` is the caller's sampling decision: unsampled packets
    /// neither create structure nor move rates, but still pick up
    /// annotations along the already-existing part of their path. A packet
    /// too short to hold an address at the configured offset is a no-op.
    ///
    /// Returns the level of the deepest unexpired annotation on the path,
    /// if annotation is enabled.
    pub fn record(
        &mut self,
        now: Tick,
        packet: &[u8],
        forward: bool,
        sampled: bool,
    ) -> Option<u8> {
        self.metrics.record_packet(sampled);
        let end = self.offset.checked_add(MAX_DEPTH)?;
        let addr = packet.get(self.offset..end)?;
        let amount = if self.count_packets {
            1
        } else {
            packet.len() as u64
        };

        let mut anno = None;
        let mut node = self.root;
        let mut refused = false;
        let mut seed: Option<(RateEstimator, RateEstimator)> = None;

        for depth in 0..MAX_DEPTH {
            let byte = addr[depth];
            if self.arena.get(node).counter(byte).is_none() {
                if !sampled {
                    break;
                }
                let (fwd, rev) = match seed.take() {
                    Some((f, r)) => (Some(f), Some(r)),
                    None => (None, None),
                };
                if !self.make_counter(node, byte, fwd, rev, now) {
                    refused = true;
                    break;
                }
            }

            let mut child = None;
            if let Some(entry) = self.arena.get_mut(node).counter_mut(byte) {
                if sampled {
                    if forward {
                        entry.fwd.update(now, amount);
                    } else {
                        entry.rev.update(now, amount);
                    }
                }
                if self.annotate {
                    if let Some(a) = entry.anno {
                        if now < a.expires {
                            anno = Some(a.level);
                        }
                    }
                }
                child = entry.child;
            }

            if depth + 1 == MAX_DEPTH {
                break;
            }
            match child {
                Some(c) => node = c,
                None => {
                    if !sampled {
                        break;
                    }
                    let Some(new_id) = self.make_node(node, byte) else {
                        refused = true;
                        break;
                    };
                    if let Some(entry) = self.arena.get_mut(node).counter_mut(byte) {
                        // The first counter of the fresh level inherits the
                        // owner's rates: until other byte values show up, it
                        // accounts for all of the owner's traffic.
                        seed = Some((entry.fwd.clone(), entry.rev.clone()));
                        entry.child = Some(new_id);
                    }
                    node = new_id;
                }
            }
        }

        if refused {
            self.metrics.alloc_refusals += 1;
            self.forced_fold(now);
        }
        anno
    }

    /// Allocates the counter for `byte` in `node`, refusing when a non-zero
    /// ceiling would be exceeded.
    fn make_counter(
        &mut self,
        node: NodeId,
        byte: u8,
        fwd: Option<RateEstimator>,
        rev: Option<RateEstimator>,
        now: Tick,
    ) -> bool {
        if self.memmax != 0 && self.alloced_mem + COUNTER_COST > self.memmax {
            return false;
        }
        self.arena
            .get_mut(node)
            .set_counter(byte, CounterEntry::new(fwd, rev, now));
        self.alloced_mem += COUNTER_COST;
        self.metrics.counters_created += 1;
        self.metrics.note_alloced(self.alloced_mem);
        true
    }

    /// Allocates a child node under the counter `(parent, byte)` and links
    /// it into the age list. The caller stores the returned id in the
    /// owning counter.
    fn make_node(&mut self, parent: NodeId, byte: u8) -> Option<NodeId> {
        if self.memmax != 0 && self.alloced_mem + NODE_COST > self.memmax {
            return None;
        }
        let id = self.arena.insert(TrieNode::new(Some((parent, byte))));
        self.ages.push_front(&mut self.arena, id);
        self.alloced_mem += NODE_COST;
        self.metrics.nodes_created += 1;
        self.metrics.note_alloced(self.alloced_mem);
        Some(id)
    }

    /// Destroys `id` and everything below it, post-order: every slot's
    /// child subtree first, then the slot's counter, then the node itself —
    /// unlinking it from the age list and clearing the owning counter's
    /// child reference. Returns the node's former age-list neighbors so a
    /// scan positioned on it can resume.
    fn destroy_subtree(&mut self, id: NodeId) -> crate::agelist::Splice {
        for byte in 0..=u8::MAX {
            let taken = self.arena.get_mut(id).take_counter(byte);
            if let Some(entry) = taken {
                if let Some(child) = entry.child {
                    self.destroy_subtree(child);
                }
                self.alloced_mem -= COUNTER_COST;
                self.metrics.counters_dropped += 1;
            }
        }
        let splice = self.ages.unlink(&mut self.arena, id);
        if let Some((pnode, pbyte)) = self.arena.get(id).parent {
            if let Some(owner) = self.arena.get_mut(pnode).counter_mut(pbyte) {
                owner.child = None;
            }
        }
        self.arena.remove(id);
        self.alloced_mem -= NODE_COST;
        self.metrics.nodes_dropped += 1;
        splice
    }

    /// Reclaims memory by deleting every scanned node whose owning counter
    /// is, as of `now`, below `thresh` in both directions.
    ///
    /// The scan walks the age list from a randomly chosen end and stops as
    /// soon as usage drops below the reclaim target: the ceiling when one
    /// is configured, otherwise 90% of the usage observed at entry (with no
    /// ceiling there is no reason to trim further).
    pub fn fold(&mut self, thresh: u64, now: Tick) {
        self.metrics.folds += 1;
        let forward = self.rng.gen::<bool>();
        let target = if self.memmax != 0 {
            self.memmax
        } else {
            self.alloced_mem - self.alloced_mem / 10
        };

        let mut cur = if forward {
            self.ages.head()
        } else {
            self.ages.tail()
        };
        while let Some(id) = cur {
            let Some((pnode, pbyte)) = self.arena.get(id).parent else {
                // A parentless node is the root; never eligible.
                cur = self.age_step(id, forward);
                continue;
            };
            let mut both_low = false;
            if let Some(owner) = self.arena.get_mut(pnode).counter_mut(pbyte) {
                owner.fwd.update(now, 0);
                if owner.fwd.average() < thresh {
                    owner.rev.update(now, 0);
                    both_low = owner.rev.average() < thresh;
                }
            }
            if both_low {
                // Destruction splices the chain; resume from the neighbor
                // recorded at unlink time, not from freed state.
                let splice = self.destroy_subtree(id);
                if self.alloced_mem < target {
                    break;
                }
                cur = if forward { splice.next } else { splice.prev };
            } else {
                cur = self.age_step(id, forward);
            }
        }
    }

    fn age_step(&self, id: NodeId, forward: bool) -> Option<NodeId> {
        let node = self.arena.get(id);
        if forward {
            node.age_next
        } else {
            node.age_prev
        }
    }

    /// Folds with an escalating threshold until usage fits the ceiling.
    ///
    /// Starts at the configured threshold and raises it by 5% of the
    /// configured value (at least 1) per pass, so even a population of
    /// equally active branches is eventually trimmed. At least one pass
    /// always runs: the refusal path invokes this at-ceiling, and must
    /// still open room for new branches. No-op without a ceiling.
    pub fn forced_fold(&mut self, now: Tick) {
        if self.memmax == 0 {
            return;
        }
        self.metrics.forced_folds += 1;
        let step = (self.thresh / 20).max(1);
        let mut thresh = self.thresh;
        loop {
            self.fold(thresh, now);
            thresh += step;
            if self.alloced_mem <= self.memmax {
                break;
            }
        }
    }

    /// Renders the hierarchical dump: a line with the ticks elapsed since
    /// the last reset, then one line per counter with a non-zero rate in
    /// either direction, showing the dotted address prefix and the forward
    /// and reverse rates in events per second. Children of a printed entry
    /// follow, tab-indented, with the prefix extended by their byte value.
    pub fn look(&mut self, now: Tick) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", now.saturating_sub(self.reset_tick));
        self.dump_node(self.root, "", now, &mut out);
        out
    }

    fn dump_node(&mut self, id: NodeId, prefix: &str, now: Tick, out: &mut String) {
        for byte in 0..=u8::MAX {
            let mut line = None;
            let mut child = None;
            if let Some(entry) = self.arena.get_mut(id).counter_mut(byte) {
                entry.fwd.update(now, 0);
                entry.rev.update(now, 0);
                if entry.fwd.average() > 0 || entry.rev.average() > 0 {
                    line = Some((
                        unparse_rate(entry.fwd.rate_per_sec()),
                        unparse_rate(entry.rev.rate_per_sec()),
                    ));
                    child = entry.child;
                }
            }
            let Some((fwd, rev)) = line else { continue };
            let label = if prefix.is_empty() {
                format!("{byte}")
            } else {
                format!("{prefix}.{byte}")
            };
            let _ = writeln!(out, "{label}\t{fwd}\t{rev}");
            if let Some(c) = child {
                let deeper = format!("\t{label}");
                self.dump_node(c, &deeper, now, out);
            }
        }
    }

    /// Destroys all of the root's counters and everything beneath them and
    /// restarts the elapsed-time baseline at `now`.
    pub fn reset(&mut self, now: Tick) {
        for byte in 0..=u8::MAX {
            let taken = self.arena.get_mut(self.root).take_counter(byte);
            if let Some(entry) = taken {
                if let Some(child) = entry.child {
                    self.destroy_subtree(child);
                }
                self.alloced_mem -= COUNTER_COST;
                self.metrics.counters_dropped += 1;
            }
        }
        self.reset_tick = now;
    }

    /// Replaces the memory ceiling (KiB, 0 = unbounded, non-zero clamped to
    /// the floor) and force-folds immediately if current usage no longer
    /// fits.
    pub fn set_memmax(&mut self, kb: u32, now: Tick) {
        self.memmax = clamp_memmax(kb);
        if self.memmax != 0 && self.alloced_mem > self.memmax {
            self.forced_fold(now);
        }
    }

    /// Installs an annotation rule: packets matching the first `level + 1`
    /// bytes of `addr` carry `level` until tick `expires`. Walks the trie
    /// down to that depth, creating counters and nodes as needed.
    pub fn set_anno_level(
        &mut self,
        addr: [u8; 4],
        level: u8,
        expires: Tick,
        now: Tick,
    ) -> Result<(), AdminError> {
        if usize::from(level) >= MAX_DEPTH {
            return Err(AdminError::LevelOutOfRange);
        }
        let mut node = self.root;
        for depth in 0..=usize::from(level) {
            let byte = addr[depth];
            if self.arena.get(node).counter(byte).is_none()
                && !self.make_counter(node, byte, None, None, now)
            {
                return Err(AdminError::OutOfMemory);
            }
            if depth == usize::from(level) {
                if let Some(entry) = self.arena.get_mut(node).counter_mut(byte) {
                    entry.anno = Some(Annotation { level, expires });
                }
                break;
            }
            let child = self.arena.get(node).counter(byte).and_then(|c| c.child);
            node = match child {
                Some(c) => c,
                None => {
                    let Some(new_id) = self.make_node(node, byte) else {
                        return Err(AdminError::OutOfMemory);
                    };
                    if let Some(entry) = self.arena.get_mut(node).counter_mut(byte) {
                        entry.child = Some(new_id);
                    }
                    new_id
                }
            };
        }
        Ok(())
    }

    /// The effective (ratio-rescaled) fold threshold.
    pub fn thresh(&self) -> u64 {
        self.thresh
    }

    /// Bytes currently accounted to live counters and non-root nodes.
    pub fn alloced_mem(&self) -> usize {
        self.alloced_mem
    }

    /// The memory ceiling in bytes; 0 means unbounded.
    pub fn memmax(&self) -> usize {
        self.memmax
    }

    /// Ticks elapsed since the last reset.
    pub fn elapsed(&self, now: Tick) -> Tick {
        now.saturating_sub(self.reset_tick)
    }

    /// Lifetime counters.
    pub fn metrics(&self) -> &MonitorMetrics {
        &self.metrics
    }

    /// The metrics report, extended with the live gauges.
    pub fn report(&self) -> BTreeMap<String, f64> {
        let mut report = self.metrics.to_btreemap();
        report.insert("alloced_bytes".into(), self.alloced_mem as f64);
        report.insert("memmax_bytes".into(), self.memmax as f64);
        report.insert("thresh".into(), self.thresh as f64);
        report
    }

    pub(crate) fn reset_baseline(&self) -> Tick {
        self.reset_tick
    }
}

impl fmt::Debug for RateMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateMonitor")
            .field("thresh", &self.thresh)
            .field("memmax", &self.memmax)
            .field("alloced_mem", &self.alloced_mem)
            .field("nodes", &self.ages.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MEMMAX_FLOOR_KB, RATIO_ONE};
    use alloc::vec::Vec;

    fn mk(config: MonitorConfig) -> RateMonitor {
        RateMonitor::init(config).unwrap()
    }

    fn bounded(kb: u32) -> RateMonitor {
        mk(MonitorConfig {
            memmax_kb: kb,
            ..MonitorConfig::default()
        })
    }

    /// Recomputes the accounted byte total by walking the live tree.
    fn walk_bytes(mon: &RateMonitor) -> usize {
        fn visit(mon: &RateMonitor, id: NodeId, charge_node: bool) -> usize {
            let mut total = if charge_node { NODE_COST } else { 0 };
            for byte in 0..=u8::MAX {
                if let Some(entry) = mon.arena.get(id).counter(byte) {
                    total += COUNTER_COST;
                    if let Some(child) = entry.child {
                        total += visit(mon, child, true);
                    }
                }
            }
            total
        }
        visit(mon, mon.root, false)
    }

    fn age_ids(mon: &RateMonitor, forward: bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = if forward {
            mon.ages.head()
        } else {
            mon.ages.tail()
        };
        while let Some(id) = cur {
            out.push(id);
            cur = mon.age_step(id, forward);
        }
        out
    }

    fn assert_agelist_consistent(mon: &RateMonitor) {
        let fwd = age_ids(mon, true);
        let mut bwd = age_ids(mon, false);
        bwd.reverse();
        assert_eq!(fwd, bwd);
        assert_eq!(fwd.len(), mon.ages.len());
        assert!(!fwd.contains(&mon.root), "root joined the age list");
        for (i, id) in fwd.iter().enumerate() {
            assert!(!fwd[i + 1..].contains(id), "node listed twice");
        }
    }

    #[test]
    fn test_record_builds_full_depth() {
        let mut mon = mk(MonitorConfig::default());
        mon.record(1, &[10, 0, 0, 1], true, true);
        // 4 counters (one per byte) and 3 non-root nodes (depths 2..4).
        assert_eq!(mon.metrics.counters_created, 4);
        assert_eq!(mon.metrics.nodes_created, 3);
        assert_eq!(mon.ages.len(), 3);
        assert_eq!(mon.alloced_mem, 4 * COUNTER_COST + 3 * NODE_COST);
        assert_eq!(mon.alloced_mem, walk_bytes(&mon));
        assert_agelist_consistent(&mon);
    }

    #[test]
    fn test_shared_prefix_shares_nodes() {
        let mut mon = mk(MonitorConfig::default());
        mon.record(1, &[10, 0, 0, 1], true, true);
        mon.record(1, &[10, 0, 0, 2], true, true);
        // Only the leaf counter differs.
        assert_eq!(mon.metrics.counters_created, 5);
        assert_eq!(mon.metrics.nodes_created, 3);
        assert_eq!(mon.alloced_mem, walk_bytes(&mon));
    }

    #[test]
    fn test_short_packet_is_noop() {
        let mut mon = mk(MonitorConfig {
            offset: 2,
            ..MonitorConfig::default()
        });
        assert_eq!(mon.record(1, &[10, 0, 0, 1], true, true), None);
        assert_eq!(mon.metrics.counters_created, 0);
        assert_eq!(mon.alloced_mem, 0);
    }

    #[test]
    fn test_offset_extraction() {
        let mut mon = mk(MonitorConfig {
            offset: 2,
            ..MonitorConfig::default()
        });
        mon.record(1, &[0xff, 0xff, 192, 168, 1, 7], true, true);
        let dump = mon.look(2);
        assert!(dump.contains("192"), "dump: {dump}");
    }

    #[test]
    fn test_unsampled_packet_creates_nothing() {
        let mut mon = mk(MonitorConfig::default());
        mon.record(1, &[10, 0, 0, 1], true, false);
        assert_eq!(mon.metrics.counters_created, 0);
        assert_eq!(mon.alloced_mem, 0);
    }

    #[test]
    fn test_bytes_mode_counts_payload() {
        let mut mon = mk(MonitorConfig {
            mode: CountMode::Bytes,
            ..MonitorConfig::default()
        });
        let packet = [10u8, 0, 0, 1, 0, 0, 0, 0, 0, 0];
        for tick in 0..100 {
            mon.record(tick, &packet, true, true);
        }
        mon.record(100, &packet, true, true);
        let entry = mon.arena.get(mon.root).counter(10).unwrap();
        // 10 bytes per tick, converged near 10 << RATE_SCALE.
        assert!(entry.fwd.average() > 8 << crate::estimator::RATE_SCALE);
    }

    #[test]
    fn test_direction_split() {
        let mut mon = mk(MonitorConfig::default());
        for tick in 0..100 {
            mon.record(tick, &[10, 0, 0, 1], true, true);
        }
        mon.record(100, &[10, 0, 0, 1], false, true);
        let entry = mon.arena.get(mon.root).counter(10).unwrap();
        assert!(entry.fwd.average() > 0);
        // One reverse packet barely moves the reverse average.
        assert!(entry.rev.average() < entry.fwd.average());
    }

    #[test]
    fn test_seeded_child_inherits_parent_rate() {
        let mut mon = mk(MonitorConfig::default());
        for tick in 0..200 {
            mon.record(tick, &[10, 0, 0, 1], true, true);
        }
        let root_entry = mon.arena.get(mon.root).counter(10).unwrap();
        let child = root_entry.child.unwrap();
        let deep_entry = mon.arena.get(child).counter(0).unwrap();
        // Both levels saw every packet from the start; the deeper counter
        // was seeded, not started cold.
        let a = root_entry.fwd.average();
        let b = deep_entry.fwd.average();
        assert!(b >= a - a / 8, "root {a}, child {b}");
    }

    #[test]
    fn test_accounting_exact_after_churn() {
        let mut mon = bounded(MEMMAX_FLOOR_KB);
        for i in 0..40u8 {
            mon.record(1, &[10, i, 0, 1], true, true);
        }
        assert_eq!(mon.alloced_mem, walk_bytes(&mon));
        mon.fold(u64::MAX, 500);
        assert_eq!(mon.alloced_mem, walk_bytes(&mon));
        for i in 0..10u8 {
            mon.record(600, &[20, i, 0, 1], true, true);
        }
        mon.reset(700);
        assert_eq!(mon.alloced_mem, 0);
        assert_eq!(mon.alloced_mem, walk_bytes(&mon));
        assert_eq!(mon.ages.len(), 0);
    }

    #[test]
    fn test_agelist_consistent_after_folds() {
        let mut mon = mk(MonitorConfig::default());
        for i in 0..30u8 {
            let tick = if i % 3 == 0 { 100 } else { 0 };
            mon.record(tick, &[i, i, i, i], true, true);
        }
        assert_agelist_consistent(&mon);
        mon.fold(1 << 20, 110);
        assert_agelist_consistent(&mon);
        mon.fold(u64::MAX, 500);
        assert_agelist_consistent(&mon);
    }

    #[test]
    fn test_root_immunity() {
        let mut mon = mk(MonitorConfig::default());
        for i in 0..10u8 {
            mon.record(1, &[i, 0, 0, 1], true, true);
        }
        for round in 0..5 {
            mon.fold(u64::MAX, 100 + round);
        }
        mon.forced_fold(200);
        assert!(mon.arena.get(mon.root).parent.is_none());
        // Only the root node remains; its counters survive folds.
        assert_eq!(mon.arena.len(), 1);
        assert_eq!(mon.alloced_mem, 10 * COUNTER_COST);
    }

    #[test]
    fn test_fold_keeps_active_branches() {
        let mut mon = mk(MonitorConfig::default());
        // 10.* goes idle after tick 0; 20.* stays hot until the fold.
        mon.record(0, &[10, 1, 1, 1], true, true);
        for tick in 0..200 {
            mon.record(tick, &[20, 2, 2, 2], true, true);
        }
        mon.fold(1 << 5, 200);
        assert!(mon.arena.get(mon.root).counter(10).unwrap().child.is_none());
        assert!(mon.arena.get(mon.root).counter(20).unwrap().child.is_some());
        assert_agelist_consistent(&mon);
    }

    #[test]
    fn test_fold_unbounded_trims_at_most_tenth() {
        let mut mon = mk(MonitorConfig::default());
        for i in 0..50u8 {
            mon.record(0, &[i, 0, 0, 1], true, true);
        }
        let before = mon.alloced_mem;
        mon.fold(u64::MAX, 1000);
        // Without a ceiling the scan stops at the 90% target.
        assert!(mon.alloced_mem < before);
        assert!(mon.alloced_mem >= before / 2);
    }

    #[test]
    fn test_forced_fold_reaches_floor_ceiling() {
        let mut mon = bounded(MEMMAX_FLOOR_KB);
        // Equal low rates everywhere; creation stops at the ceiling and the
        // forced fold must still find room.
        for a in 0..100u8 {
            for b in 0..4u8 {
                mon.record(1, &[a, b, 0, 1], true, true);
            }
        }
        assert!(mon.alloced_mem <= mon.memmax);
        mon.forced_fold(2);
        assert!(mon.alloced_mem <= mon.memmax);
        assert_eq!(mon.arena.get(mon.root).parent, None);
        assert_eq!(mon.alloced_mem, walk_bytes(&mon));
    }

    #[test]
    fn test_ceiling_truncates_depth_silently() {
        let mut mon = bounded(MEMMAX_FLOOR_KB);
        let mut i = 0u16;
        // Fill until refusals happen; usage must never exceed the ceiling.
        while mon.metrics.alloc_refusals == 0 && i < 2000 {
            let a = (i / 256) as u8;
            let b = (i % 256) as u8;
            mon.record(1, &[a, b, 1, 1], true, true);
            assert!(mon.alloced_mem <= mon.memmax);
            i += 1;
        }
        assert!(mon.metrics.alloc_refusals > 0, "ceiling never hit");
        assert_eq!(mon.alloced_mem, walk_bytes(&mon));
        assert_agelist_consistent(&mon);
    }

    #[test]
    fn test_lowering_ceiling_forces_fold() {
        let mut mon = mk(MonitorConfig::default());
        for a in 0..60u8 {
            mon.record(1, &[a, 1, 1, 1], true, true);
        }
        let before = mon.alloced_mem;
        assert!(before > MEMMAX_FLOOR_KB as usize * 1024);
        mon.set_memmax(MEMMAX_FLOOR_KB, 2);
        assert!(mon.alloced_mem <= mon.memmax);
        assert!(mon.metrics.forced_folds > 0);
    }

    #[test]
    fn test_set_memmax_clamps_to_floor() {
        let mut mon = mk(MonitorConfig::default());
        mon.set_memmax(1, 0);
        assert_eq!(mon.memmax(), MEMMAX_FLOOR_KB as usize * 1024);
        mon.set_memmax(0, 0);
        assert_eq!(mon.memmax(), 0);
    }

    #[test]
    fn test_sampling_prescales_threshold() {
        let mon = mk(MonitorConfig {
            thresh: 1000,
            ratio: RATIO_ONE / 4,
            ..MonitorConfig::default()
        });
        assert_eq!(mon.thresh(), 250);
        assert_eq!(mon.thresh(), (1000u64 * (RATIO_ONE as u64 / 4)) >> 16);
    }

    #[test]
    fn test_annotation_window() {
        let mut mon = mk(MonitorConfig::default());
        // Level 2: match on the first three bytes of 10.0.0.x.
        mon.set_anno_level([10, 0, 0, 1], 2, 500, 0).unwrap();
        assert_eq!(mon.record(100, &[10, 0, 0, 9], true, true), Some(2));
        assert_eq!(mon.record(100, &[10, 0, 1, 9], true, true), None);
        assert_eq!(mon.record(600, &[10, 0, 0, 9], true, true), None);
    }

    #[test]
    fn test_annotation_deepest_match_wins() {
        let mut mon = mk(MonitorConfig::default());
        mon.set_anno_level([10, 0, 0, 1], 0, 500, 0).unwrap();
        mon.set_anno_level([10, 0, 0, 1], 3, 500, 0).unwrap();
        assert_eq!(mon.record(100, &[10, 0, 0, 1], true, true), Some(3));
        // Prefix-only match picks up the shallower rule.
        assert_eq!(mon.record(100, &[10, 9, 9, 9], true, true), Some(0));
    }

    #[test]
    fn test_annotation_applies_to_unsampled_packets() {
        let mut mon = mk(MonitorConfig::default());
        mon.set_anno_level([10, 0, 0, 1], 1, 500, 0).unwrap();
        assert_eq!(mon.record(100, &[10, 0, 7, 7], true, false), Some(1));
        // Still no rate side effects from the unsampled packet.
        assert_eq!(mon.metrics.sampled, 0);
    }

    #[test]
    fn test_annotate_toggle_off() {
        let mut mon = mk(MonitorConfig {
            annotate: false,
            ..MonitorConfig::default()
        });
        mon.set_anno_level([10, 0, 0, 1], 2, 500, 0).unwrap();
        assert_eq!(mon.record(100, &[10, 0, 0, 1], true, true), None);
    }

    #[test]
    fn test_anno_level_out_of_range() {
        let mut mon = mk(MonitorConfig::default());
        assert_eq!(
            mon.set_anno_level([10, 0, 0, 1], 4, 500, 0),
            Err(AdminError::LevelOutOfRange)
        );
    }

    #[test]
    fn test_reset_restarts_baseline() {
        let mut mon = mk(MonitorConfig::default());
        mon.record(1, &[10, 0, 0, 1], true, true);
        mon.record(1, &[10, 0, 0, 2], true, true);
        assert!(mon.look(50).lines().count() > 1);
        mon.reset(100);
        let dump = mon.look(101);
        assert_eq!(dump.lines().next(), Some("1"));
        assert_eq!(dump.lines().count(), 1, "dump: {dump}");
        assert_eq!(mon.alloced_mem, 0);
    }

    #[test]
    fn test_look_shows_both_prefixes_to_depth() {
        let mut mon = mk(MonitorConfig::default());
        for tick in 0..50 {
            mon.record(tick, &[10, 0, 0, 1], true, true);
            mon.record(tick, &[10, 0, 0, 2], false, true);
        }
        let dump = mon.look(50);
        assert!(dump.contains("\t\t\t10.0.0.1\t"), "dump: {dump}");
        assert!(dump.contains("\t\t\t10.0.0.2\t"), "dump: {dump}");
        // Intermediate prefixes appear once each.
        assert_eq!(dump.matches("\t10.0\t").count(), 1, "dump: {dump}");
    }

    #[test]
    fn test_look_skips_decayed_entries() {
        let mut mon = mk(MonitorConfig::default());
        mon.record(0, &[10, 0, 0, 1], true, true);
        // Far past the decay horizon, the entry reads as silent.
        let dump = mon.look(10_000);
        assert_eq!(dump.lines().count(), 1, "dump: {dump}");
    }

    #[test]
    fn test_report_includes_gauges() {
        let mut mon = bounded(200);
        mon.record(1, &[10, 0, 0, 1], true, true);
        let report = mon.report();
        assert_eq!(report.get("memmax_bytes"), Some(&(200.0 * 1024.0)));
        assert_eq!(
            report.get("alloced_bytes"),
            Some(&(mon.alloced_mem() as f64))
        );
        assert!(report.get("counters_created").copied().unwrap() >= 4.0);
    }
}
