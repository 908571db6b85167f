//! Concurrent Monitor Front-End
//!
//! [`ConcurrentRateMonitor`] shares one [`RateMonitor`] between the packet
//! path and the administrative handlers. All mutation is serialized by a
//! single coarse `parking_lot::Mutex` held for the whole operation; no
//! mutating call suspends mid-flight, so the blocking acquire on the hot
//! path is bounded by the duration of one other in-flight mutation.
//!
//! The one deliberate exception is [`look`](ConcurrentRateMonitor::look):
//! the dump tries the lock without blocking and degrades to an
//! `unavailable` response when it loses the race, trading read freshness
//! for never stalling the caller behind a fold. The elapsed-time header is
//! still produced in that case, from an atomic snapshot of the reset
//! baseline maintained outside the lock.
//!
//! # Why One Mutex?
//!
//! Every operation on the monitor mutates it: even the dump advances the
//! estimators it reads. A reader-writer scheme would promise concurrency it
//! cannot deliver, so the front-end uses a plain `Mutex` and keeps the
//! degraded dump path as the only concession to contention.
//!
//! Available when the `concurrent` feature is enabled.

extern crate alloc;
extern crate std;

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::config::MonitorConfig;
use crate::errors::{AdminError, ConfigError};
use crate::estimator::Tick;
use crate::monitor::RateMonitor;

/// A [`RateMonitor`] behind a single exclusive lock, safe to share across
/// threads.
///
/// # Examples
///
/// ```
/// use ratemon_rs::{ConcurrentRateMonitor, MonitorConfig};
/// use std::sync::Arc;
/// use std::thread;
///
/// let mon = Arc::new(ConcurrentRateMonitor::init(MonitorConfig::default()).unwrap());
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let mon = Arc::clone(&mon);
///         thread::spawn(move || {
///             for i in 0..100u8 {
///                 mon.record(1, &[10, t, i, 1], true, true);
///             }
///         })
///     })
///     .collect();
/// for h in handles {
///     h.join().unwrap();
/// }
/// assert!(mon.look(2).contains("10"));
/// ```
pub struct ConcurrentRateMonitor {
    inner: Mutex<RateMonitor>,
    /// Snapshot of the reset baseline, readable without the lock so the
    /// degraded dump can still report elapsed time.
    reset_tick: AtomicU64,
}

impl ConcurrentRateMonitor {
    /// Validates `config` and builds the shared monitor.
    pub fn init(config: MonitorConfig) -> Result<Self, ConfigError> {
        let mon = RateMonitor::init(config)?;
        let reset_tick = AtomicU64::new(mon.reset_baseline());
        Ok(ConcurrentRateMonitor {
            inner: Mutex::new(mon),
            reset_tick,
        })
    }

    /// Push-path entry point; see [`RateMonitor::push`].
    pub fn push(&self, port: usize, packet: &[u8]) -> Option<u8> {
        self.inner.lock().push(port, packet)
    }

    /// Pull-path entry point; see [`RateMonitor::pull`].
    pub fn pull(&self, port: usize, packet: &[u8]) -> Option<u8> {
        self.inner.lock().pull(port, packet)
    }

    /// Updates statistics for one packet; see [`RateMonitor::record`].
    pub fn record(&self, now: Tick, packet: &[u8], forward: bool, sampled: bool) -> Option<u8> {
        self.inner.lock().record(now, packet, forward, sampled)
    }

    /// Runs one eviction pass; see [`RateMonitor::fold`].
    pub fn fold(&self, thresh: u64, now: Tick) {
        self.inner.lock().fold(thresh, now);
    }

    /// Folds with an escalating threshold; see [`RateMonitor::forced_fold`].
    pub fn forced_fold(&self, now: Tick) {
        self.inner.lock().forced_fold(now);
    }

    /// Destroys all statistics and restarts the elapsed-time baseline.
    pub fn reset(&self, now: Tick) {
        let mut mon = self.inner.lock();
        mon.reset(now);
        self.reset_tick.store(mon.reset_baseline(), Ordering::Relaxed);
    }

    /// Replaces the memory ceiling; see [`RateMonitor::set_memmax`].
    pub fn set_memmax(&self, kb: u32, now: Tick) {
        self.inner.lock().set_memmax(kb, now);
    }

    /// Installs an annotation rule; see [`RateMonitor::set_anno_level`].
    pub fn set_anno_level(
        &self,
        addr: [u8; 4],
        level: u8,
        expires: Tick,
        now: Tick,
    ) -> Result<(), AdminError> {
        self.inner.lock().set_anno_level(addr, level, expires, now)
    }

    /// Renders the hierarchical dump without blocking.
    ///
    /// If another operation holds the lock, returns the elapsed-time header
    /// followed by an `unavailable` marker instead of waiting for it.
    pub fn look(&self, now: Tick) -> String {
        match self.inner.try_lock() {
            Some(mut mon) => mon.look(now),
            None => {
                let elapsed = now.saturating_sub(self.reset_tick.load(Ordering::Relaxed));
                format!("{elapsed}\nunavailable\n")
            }
        }
    }

    /// The effective (ratio-rescaled) fold threshold.
    pub fn thresh(&self) -> u64 {
        self.inner.lock().thresh()
    }

    /// Bytes currently accounted to live counters and non-root nodes.
    pub fn alloced_mem(&self) -> usize {
        self.inner.lock().alloced_mem()
    }

    /// The memory ceiling in bytes; 0 means unbounded.
    pub fn memmax(&self) -> usize {
        self.inner.lock().memmax()
    }

    /// The metrics report, extended with the live gauges.
    pub fn report(&self) -> BTreeMap<String, f64> {
        self.inner.lock().report()
    }

    /// Runs `f` with exclusive access to the underlying monitor.
    ///
    /// For compound administrative sequences that must not interleave with
    /// the packet path, e.g. a read-modify-write over several handlers.
    pub fn with_monitor<R>(&self, f: impl FnOnce(&mut RateMonitor) -> R) -> R {
        let mut mon = self.inner.lock();
        let out = f(&mut mon);
        self.reset_tick.store(mon.reset_baseline(), Ordering::Relaxed);
        out
    }
}

impl fmt::Debug for ConcurrentRateMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(mon) => f.debug_tuple("ConcurrentRateMonitor").field(&*mon).finish(),
            None => f.write_str("ConcurrentRateMonitor(<locked>)"),
        }
    }
}
