//! Simulation runner
//!
//! Feeds a packet stream to a freshly configured monitor while keeping an
//! exact per-address tally on the side, then compares the monitor's final
//! dump against that ground truth. The comparison goes through the public
//! dump format on purpose: the simulator sees exactly what an operator
//! would see.

use std::time::Instant;

use ahash::AHashMap;

use crate::models::{AddressTruth, ComparisonRow, Packet, SimulationConfig, SimulationResult};
use ratemon_rs::config::RATIO_ONE;
use ratemon_rs::estimator::TICK_HZ;
use ratemon_rs::{ConfigError, CountMode, MonitorConfig, RateMonitor};

/// Drives one monitor over one packet stream
pub struct SimulationRunner {
    config: SimulationConfig,
}

impl SimulationRunner {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Runs the stream through the monitor and scores the result
    pub fn run(&self, packets: &[Packet]) -> Result<SimulationResult, ConfigError> {
        let started = Instant::now();
        let mut mon = RateMonitor::init(MonitorConfig {
            mode: if self.config.count_bytes {
                CountMode::Bytes
            } else {
                CountMode::Packets
            },
            offset: 0,
            ratio: RATIO_ONE,
            thresh: self.config.thresh,
            memmax_kb: self.config.memmax_kb,
            annotate: false,
        })?;

        let mut truth: AHashMap<u32, AddressTruth> = AHashMap::new();
        let mut end_tick = 0u64;
        for p in packets {
            mon.record(p.tick, &p.addr, p.forward, true);

            let amount = if self.config.count_bytes {
                u64::from(p.len)
            } else {
                1
            };
            let entry = truth.entry(p.addr_key()).or_insert_with(|| AddressTruth {
                first_tick: p.tick,
                ..AddressTruth::default()
            });
            if p.forward {
                entry.fwd_events += amount;
            } else {
                entry.rev_events += amount;
            }
            entry.last_tick = p.tick;
            end_tick = end_tick.max(p.tick);
        }

        let dump = mon.look(end_tick + 1);
        let leaves = parse_leaves(&dump);

        let mut rows = Vec::with_capacity(leaves.len());
        let mut err_sum = 0.0;
        let mut err_count = 0usize;
        for (address, est_fwd_rate, est_rev_rate) in leaves {
            let key = addr_key(&address);
            let Some(t) = key.and_then(|k| truth.get(&k)) else {
                continue;
            };
            // Exact mean over the address's own active window.
            let window_secs = (t.last_tick - t.first_tick + 1) as f64 / TICK_HZ as f64;
            let true_fwd_rate = t.fwd_events as f64 / window_secs;
            let true_rev_rate = t.rev_events as f64 / window_secs;
            let fwd_rel_err = if true_fwd_rate > 0.0 {
                ((est_fwd_rate - true_fwd_rate) / true_fwd_rate).abs()
            } else {
                0.0
            };
            if true_fwd_rate > 0.0 {
                err_sum += fwd_rel_err;
                err_count += 1;
            }
            rows.push(ComparisonRow {
                address,
                true_fwd_rate,
                true_rev_rate,
                est_fwd_rate,
                est_rev_rate,
                fwd_rel_err,
            });
        }
        rows.sort_by(|a, b| b.true_fwd_rate.total_cmp(&a.true_fwd_rate));

        Ok(SimulationResult {
            total_packets: packets.len() as u64,
            unique_hosts: truth.len(),
            surviving_hosts: rows.len(),
            alloced_bytes: mon.alloced_mem(),
            memmax_bytes: mon.memmax(),
            mean_abs_rel_err: if err_count > 0 {
                err_sum / err_count as f64
            } else {
                0.0
            },
            rows,
            monitor_report: mon.report(),
            duration: started.elapsed(),
        })
    }
}

/// Extracts the full-depth (four-octet) rows from a dump: lines indented
/// three levels, carrying `addr\tfwd\trev`.
fn parse_leaves(dump: &str) -> Vec<(String, f64, f64)> {
    dump.lines()
        .filter(|line| line.starts_with("\t\t\t"))
        .filter_map(|line| {
            let mut cols = line.trim_start_matches('\t').split('\t');
            let addr = cols.next()?.to_string();
            let fwd: f64 = cols.next()?.parse().ok()?;
            let rev: f64 = cols.next()?.parse().ok()?;
            Some((addr, fwd, rev))
        })
        .collect()
}

/// Packs a dotted quad back into the ground-truth map key
fn addr_key(s: &str) -> Option<u32> {
    let mut addr = [0u8; 4];
    let mut octets = s.split('.');
    for byte in &mut addr {
        *byte = octets.next()?.parse().ok()?;
    }
    if octets.next().is_some() {
        return None;
    }
    Some(u32::from_be_bytes(addr))
}
