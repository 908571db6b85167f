#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! Quick orientation for the crate's modules and the shape of the API.
//!
//! ## Data Flow
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          RateMonitor                                 │
//! │                                                                      │
//! │  packet ──▶ record() ──▶ root TrieNode                               │
//! │                            │ byte 0                                  │
//! │                            ▼                                         │
//! │                       CounterEntry ── fwd/rev RateEstimator          │
//! │                            │ child                                   │
//! │                            ▼                                         │
//! │                        TrieNode  ◀──┐                                │
//! │                            │ byte 1 │  every non-root node is        │
//! │                            ▼        │  threaded onto one flat        │
//! │                           ...       │  age list, scanned by          │
//! │                                     │  fold() for O(1) removal       │
//! │   ceiling exceeded ──▶ forced_fold()┘                                │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Entry Points
//!
//! | Call | Purpose |
//! |------|---------|
//! | [`RateMonitor::init`] | validate config, allocate the root |
//! | [`RateMonitor::push`] / [`RateMonitor::pull`] | packet-path updates with the process clock |
//! | [`RateMonitor::record`] | packet-path update with an explicit tick |
//! | [`RateMonitor::fold`] / [`RateMonitor::forced_fold`] | evict low-rate branches |
//! | [`RateMonitor::look`] | hierarchical rate dump |
//! | [`handlers`] | string-in/string-out operator surface |
//!
//! ## Example
//!
//! ```rust
//! use ratemon_rs::{MonitorConfig, RateMonitor};
//!
//! let mut mon = RateMonitor::init(MonitorConfig {
//!     memmax_kb: 1024,
//!     ..MonitorConfig::default()
//! })
//! .unwrap();
//!
//! // Forward packets from 10.0.0.1, one per tick.
//! for tick in 0..100 {
//!     mon.record(tick, &[10, 0, 0, 1], true, true);
//! }
//!
//! let dump = mon.look(100);
//! assert!(dump.contains("10.0.0.1"));
//! assert!(mon.alloced_mem() <= mon.memmax());
//! ```

#![no_std]

/// Fixed-point EWMA rate estimation.
///
/// Provides the [`RateEstimator`](estimator::RateEstimator) every counter
/// carries (one forward, one reverse), the shared tick time base, and the
/// fixed-point pretty-printer used by the dump.
pub mod estimator;

/// Trie data model: nodes, counters, and the index arena they live in.
///
/// Internal infrastructure. Nodes refer to each other through stable arena
/// indices instead of pointers, so eviction is index patching rather than
/// pointer surgery.
pub(crate) mod trie;

/// The flat doubly linked chain of live non-root nodes.
///
/// Internal infrastructure scanned by the eviction engine in place of the
/// tree, giving O(1) removal from any position.
pub(crate) mod agelist;

/// Monitor configuration structures.
///
/// Public-field configuration with one-shot validation at
/// [`RateMonitor::init`]; a rejected configuration is never partially
/// applied.
pub mod config;

/// Operator-facing error types for configuration and administration.
pub mod errors;

/// The monitor itself: update path, eviction engine, dump, administration.
pub mod monitor;

/// String-in/string-out administrative handlers.
///
/// The operator surface: read handlers for the threshold, the dump and the
/// memory gauges, write handlers for reset, ceiling changes and annotation
/// rules.
pub mod handlers;

/// Monitor metrics system.
///
/// Lifetime counters for packets, structural churn and folds, reported as a
/// deterministic `BTreeMap`.
pub mod metrics;

/// Concurrent monitor front-end.
///
/// One coarse lock around the whole monitor; the dump path tries the lock
/// without blocking and degrades to an `unavailable` response under
/// contention.
///
/// Available when the `concurrent` feature is enabled.
#[cfg(feature = "concurrent")]
pub mod concurrent;

// Re-export the monitor and its configuration surface
pub use config::{CountMode, MonitorConfig};
pub use errors::{AdminError, ConfigError};
pub use metrics::MonitorMetrics;
pub use monitor::RateMonitor;

#[cfg(feature = "concurrent")]
pub use concurrent::ConcurrentRateMonitor;
