//! Time-Decayed Rate Estimation
//!
//! This module provides the fixed-point EWMA rate estimator used by every
//! counter in the monitor, together with the process-wide tick clock all
//! estimators share.
//!
//! # Time Base
//!
//! Rates are measured against a coarse tick clock ([`Tick`], [`TICK_HZ`] ticks
//! per second). All estimators that are ever compared against each other must
//! use the same time base; within this crate that is guaranteed because every
//! estimator is driven from the monitor's single clock.
//!
//! With the `std` feature enabled, [`tick_now`] returns the number of ticks
//! elapsed since the first call in this process. In `no_std` environments it
//! returns 0 and callers supply ticks explicitly (the whole update API takes
//! an explicit `now` for exactly this reason).
//!
//! # Fixed-Point Representation
//!
//! [`RateEstimator::average`] returns the decayed events-per-tick average
//! scaled by `2^RATE_SCALE`. The scale makes sub-1-per-tick rates
//! representable without floating point, which keeps the hot packet path
//! integer-only. Use [`unparse_rate`] to render a scaled value for an
//! operator.

extern crate alloc;

use alloc::format;
use alloc::string::String;

/// Monotonic coarse time unit used by all estimators.
pub type Tick = u64;

/// Ticks per second of the estimator time base.
pub const TICK_HZ: u64 = 100;

/// Number of fixed-point fraction bits in [`RateEstimator::average`] values.
pub const RATE_SCALE: u32 = 10;

/// Weight of one tick's sample in the decayed average (`1/2^STABILITY_SHIFT`).
const STABILITY_SHIFT: u32 = 4;

/// After this many idle ticks the average has decayed below one fixed-point
/// unit for any realistic load, so catch-up short-circuits to zero.
const DECAY_HORIZON: u64 = 64;

/// An exponentially weighted moving average over discrete event counts.
///
/// Events are accumulated into the current tick's bucket; whenever the clock
/// advances, the bucket is folded into the running average and empty ticks
/// decay it. The estimator never reads a clock itself: `update` takes the
/// current tick, so a zero-amount update is the idiom for "advance the decay
/// without adding load".
///
/// # Examples
///
/// ```
/// use ratemon_rs::estimator::{RateEstimator, RATE_SCALE};
///
/// let mut est = RateEstimator::new(0);
/// for tick in 0..64 {
///     est.update(tick, 8);
/// }
/// est.update(64, 0);
/// // Converges toward 8 events/tick in fixed point.
/// assert!(est.average() > 6 << RATE_SCALE);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RateEstimator {
    /// Decayed events-per-tick average, scaled by `2^RATE_SCALE`.
    avg: u64,
    /// Events accumulated in the tick `tick`, not yet folded into `avg`.
    bucket: u64,
    /// The tick `bucket` belongs to.
    tick: Tick,
}

impl RateEstimator {
    /// Creates an estimator with a zero rate, anchored at `now`.
    pub fn new(now: Tick) -> Self {
        RateEstimator {
            avg: 0,
            bucket: 0,
            tick: now,
        }
    }

    /// Records `amount` events at tick `now`.
    ///
    /// An `amount` of 0 only advances the decay. A `now` earlier than the
    /// last seen tick folds the events into the current bucket instead of
    /// rewinding.
    pub fn update(&mut self, now: Tick, amount: u64) {
        self.advance(now);
        self.bucket = self.bucket.saturating_add(amount);
    }

    /// The decayed events-per-tick average, scaled by `2^RATE_SCALE`.
    ///
    /// Reflects the state as of the last `update`; callers that need the
    /// value "as of now" issue a zero-amount update first.
    pub fn average(&self) -> u64 {
        self.avg
    }

    /// The decayed events-per-second average, scaled by `2^RATE_SCALE`.
    pub fn rate_per_sec(&self) -> u64 {
        self.avg.saturating_mul(TICK_HZ)
    }

    /// Folds the pending bucket into the average and decays over the ticks
    /// elapsed since the last update.
    fn advance(&mut self, now: Tick) {
        if now <= self.tick {
            return;
        }
        let elapsed = now - self.tick;
        self.tick = now;
        if elapsed > DECAY_HORIZON {
            self.avg = 0;
            self.bucket = 0;
            return;
        }
        let sample = (self.bucket << RATE_SCALE) as i64;
        self.bucket = 0;
        let mut avg = self.avg as i64;
        avg += (sample - avg) >> STABILITY_SHIFT;
        for _ in 1..elapsed {
            if avg == 0 {
                break;
            }
            // Arithmetic shift rounds toward negative infinity, so the
            // average drains all the way to zero instead of stalling.
            avg += (-avg) >> STABILITY_SHIFT;
        }
        self.avg = avg.max(0) as u64;
    }
}

/// Renders a `2^RATE_SCALE` fixed-point value as a decimal string.
///
/// ```
/// use ratemon_rs::estimator::{unparse_rate, RATE_SCALE};
///
/// assert_eq!(unparse_rate(3 << RATE_SCALE), "3.000");
/// assert_eq!(unparse_rate(1 << (RATE_SCALE - 1)), "0.500");
/// ```
pub fn unparse_rate(scaled: u64) -> String {
    let mask = (1u64 << RATE_SCALE) - 1;
    let frac = ((scaled & mask) * 1000) >> RATE_SCALE;
    format!("{}.{:03}", scaled >> RATE_SCALE, frac)
}

/// The current tick of the process-wide clock.
///
/// Ticks count up from the first call in this process.
#[cfg(feature = "std")]
pub fn tick_now() -> Tick {
    extern crate std;
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let epoch = EPOCH.get_or_init(Instant::now);
    (epoch.elapsed().as_millis() as u64).saturating_mul(TICK_HZ) / 1000
}

/// Always 0 in `no_std` environments; callers supply ticks explicitly.
#[cfg(not(feature = "std"))]
pub fn tick_now() -> Tick {
    0
}
