#![no_std]
//! The monitor must stay fully usable without `std`: explicit ticks in,
//! `alloc` strings out. These tests compile the crate-facing API in a
//! `no_std` test binary.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use ratemon_rs::{handlers, MonitorConfig, RateMonitor};

#[test]
fn test_monitor_without_std_clock() {
    let mut mon = RateMonitor::init(MonitorConfig::default()).unwrap();
    for tick in 0..100u64 {
        mon.record(tick, &[172, 16, 0, 1], true, true);
    }
    let dump: String = mon.look(100);
    let prefixes: Vec<&str> = dump
        .lines()
        .skip(1)
        .map(|l| l.trim_start_matches('\t').split('\t').next().unwrap())
        .collect();
    assert!(prefixes.contains(&"172.16.0.1"));
}

#[test]
fn test_eviction_without_std_clock() {
    let mut mon = RateMonitor::init(MonitorConfig {
        memmax_kb: 100,
        ..MonitorConfig::default()
    })
    .unwrap();
    for i in 0..2000u16 {
        mon.record(1, &[(i / 256) as u8, (i % 256) as u8, 0, 1], true, true);
        assert!(mon.alloced_mem() <= mon.memmax());
    }
    mon.forced_fold(500);
    assert!(mon.alloced_mem() <= mon.memmax());
}

#[test]
fn test_handlers_without_std_clock() {
    let mut mon = RateMonitor::init(MonitorConfig::default()).unwrap();
    handlers::anno_level_write(&mut mon, "172.16.0.1 1 5", 0).unwrap();
    assert_eq!(mon.record(10, &[172, 16, 9, 9], true, true), Some(1));
    handlers::reset_write(&mut mon, 10);
    assert_eq!(mon.alloced_mem(), 0);
}
