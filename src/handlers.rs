//! Operator Handlers
//!
//! The administrative surface of the monitor as string-in/string-out
//! functions: read handlers render a piece of state, write handlers parse
//! their argument string, validate it fully, and only then mutate the
//! monitor. A rejected request returns an [`AdminError`] and leaves the
//! monitor untouched.
//!
//! These functions assume the caller already holds whatever lock guards the
//! monitor; the `concurrent` module provides the locked front-end.

extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::errors::AdminError;
use crate::estimator::{Tick, TICK_HZ};
use crate::monitor::RateMonitor;

/// Renders the hierarchical dump, preceded by the elapsed-ticks header.
pub fn look_read(mon: &mut RateMonitor, now: Tick) -> String {
    mon.look(now)
}

/// Renders the effective (ratio-rescaled) fold threshold.
pub fn thresh_read(mon: &RateMonitor) -> String {
    format!("{}", mon.thresh())
}

/// Renders the currently allocated byte count.
pub fn mem_read(mon: &RateMonitor) -> String {
    format!("{}\n", mon.alloced_mem())
}

/// Renders the memory ceiling in bytes (0 = unbounded).
pub fn memmax_read(mon: &RateMonitor) -> String {
    format!("{}\n", mon.memmax())
}

/// Destroys all collected statistics and restarts the elapsed-time baseline.
pub fn reset_write(mon: &mut RateMonitor, now: Tick) {
    mon.reset(now);
}

/// Sets the memory ceiling from a one-integer argument string, in KiB.
///
/// Non-zero values below the floor are raised to it; lowering the ceiling
/// below current usage triggers an immediate forced fold.
pub fn memmax_write(mon: &mut RateMonitor, args: &str, now: Tick) -> Result<(), AdminError> {
    let args = split_args(args);
    if args.len() != 1 {
        return Err(AdminError::ExpectedArgs(1));
    }
    let kb: u32 = args[0].parse().map_err(|_| AdminError::NotAnInteger)?;
    mon.set_memmax(kb, now);
    Ok(())
}

/// Installs an annotation rule from an `address level seconds` argument
/// string.
///
/// `level` selects the prefix depth (0 matches the first address byte, 3 a
/// full host address); `seconds` says how long from now the rule stays
/// active and must be positive.
pub fn anno_level_write(
    mon: &mut RateMonitor,
    args: &str,
    now: Tick,
) -> Result<(), AdminError> {
    let args = split_args(args);
    if args.len() != 3 {
        return Err(AdminError::ExpectedArgs(3));
    }
    let addr = parse_addr(args[0])?;
    let level: u8 = args[1]
        .parse()
        .map_err(|_| AdminError::LevelOutOfRange)?;
    let seconds: u64 = args[2].parse().map_err(|_| AdminError::BadExpiry)?;
    if seconds == 0 {
        return Err(AdminError::BadExpiry);
    }
    let expires = now.saturating_add(seconds.saturating_mul(TICK_HZ));
    mon.set_anno_level(addr, level, expires, now)
}

/// Splits an argument string on commas and whitespace, both of which the
/// operator syntax accepts.
fn split_args(args: &str) -> Vec<&str> {
    args.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parses a dotted-quad address.
fn parse_addr(s: &str) -> Result<[u8; 4], AdminError> {
    let mut addr = [0u8; 4];
    let mut parts = s.split('.');
    for byte in &mut addr {
        let part = parts.next().ok_or(AdminError::NotAnAddress)?;
        *byte = part.parse().map_err(|_| AdminError::NotAnAddress)?;
    }
    if parts.next().is_some() {
        return Err(AdminError::NotAnAddress);
    }
    Ok(addr)
}
