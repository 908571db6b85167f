// Data models for rate monitor simulation

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// One observed packet, as fed to the monitor
#[derive(Debug, Clone, Copy)]
pub struct Packet {
    /// Tick the packet arrived at (monitor time base)
    pub tick: u64,
    /// 4-byte address the monitor aggregates on
    pub addr: [u8; 4],
    /// Request direction (true) or reply direction (false)
    pub forward: bool,
    /// Payload length in bytes
    pub len: u16,
}

impl Packet {
    pub fn new(tick: u64, addr: [u8; 4], forward: bool, len: u16) -> Self {
        Self {
            tick,
            addr,
            forward,
            len,
        }
    }

    /// Address packed into a map key
    pub fn addr_key(&self) -> u32 {
        u32::from_be_bytes(self.addr)
    }

    /// Dotted-quad rendering, matching the monitor's dump labels
    pub fn addr_string(&self) -> String {
        let [a, b, c, d] = self.addr;
        format!("{a}.{b}.{c}.{d}")
    }
}

/// Exact per-address event counts (packets, or bytes in byte-counting
/// mode), the ground truth estimates are compared against
#[derive(Debug, Default, Clone, Copy)]
pub struct AddressTruth {
    /// Forward events observed
    pub fwd_events: u64,
    /// Reverse events observed
    pub rev_events: u64,
    /// First tick this address was seen
    pub first_tick: u64,
    /// Last tick this address was seen
    pub last_tick: u64,
}

/// Configuration for a simulation run
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Memory ceiling handed to the monitor, in KiB (0 = unbounded)
    pub memmax_kb: u32,
    /// Fold survival threshold (fixed-point events per tick)
    pub thresh: u32,
    /// Count payload bytes instead of packets
    pub count_bytes: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            memmax_kb: 0,
            thresh: 1,
            count_bytes: false,
        }
    }
}

/// Per-address comparison between the monitor's estimate and ground truth
#[derive(Debug, Serialize)]
pub struct ComparisonRow {
    /// Dotted-quad address
    pub address: String,
    /// Exact mean forward rate over the address's active window (pkts/sec)
    pub true_fwd_rate: f64,
    /// Exact mean reverse rate (pkts/sec)
    pub true_rev_rate: f64,
    /// Monitor's estimated forward rate at end of run (pkts/sec)
    pub est_fwd_rate: f64,
    /// Monitor's estimated reverse rate (pkts/sec)
    pub est_rev_rate: f64,
    /// |est - true| / true for the forward direction, when defined
    pub fwd_rel_err: f64,
}

/// Results of a simulation run
#[derive(Debug)]
pub struct SimulationResult {
    /// Packets fed to the monitor
    pub total_packets: u64,
    /// Distinct addresses in the input
    pub unique_hosts: usize,
    /// Addresses still reported at full depth by the final dump
    pub surviving_hosts: usize,
    /// Bytes the monitor holds at the end of the run
    pub alloced_bytes: usize,
    /// The ceiling it ran under (bytes, 0 = unbounded)
    pub memmax_bytes: usize,
    /// Mean absolute relative error of the forward estimate, over
    /// surviving addresses with non-zero truth
    pub mean_abs_rel_err: f64,
    /// Per-address comparison rows, sorted by true forward rate descending
    pub rows: Vec<ComparisonRow>,
    /// The monitor's own metrics report
    pub monitor_report: BTreeMap<String, f64>,
    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "packets:         {}", self.total_packets)?;
        writeln!(f, "unique hosts:    {}", self.unique_hosts)?;
        writeln!(f, "surviving hosts: {}", self.surviving_hosts)?;
        writeln!(
            f,
            "monitor memory:  {} bytes (ceiling {})",
            self.alloced_bytes,
            if self.memmax_bytes == 0 {
                "unbounded".to_string()
            } else {
                format!("{} bytes", self.memmax_bytes)
            }
        )?;
        write!(
            f,
            "mean |rel err|:  {:.3} over surviving forward rates",
            self.mean_abs_rel_err
        )
    }
}
