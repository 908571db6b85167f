//! Synthetic traffic generation
//!
//! Produces bidirectional packet streams with a skewed address
//! distribution: a small "hot" set of hosts carries most of the traffic,
//! the long tail is touched rarely. That shape is what makes the monitor's
//! eviction interesting — cold branches must be folded away while hot
//! branches keep their statistics.

use crate::models::Packet;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use ratemon_rs::estimator::TICK_HZ;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Parameters for synthetic traffic
#[derive(Debug, Clone)]
pub struct TrafficConfig {
    /// Total duration in seconds
    pub duration_secs: u32,
    /// Packets per second across all hosts
    pub pps: u32,
    /// Number of distinct hosts
    pub hosts: u32,
    /// Percentage of hosts considered hot
    pub hot_hosts_percent: u8,
    /// Percentage of traffic sent by the hot hosts
    pub hot_traffic_percent: u8,
    /// Percentage of packets in the reverse direction
    pub reverse_percent: u8,
    /// RNG seed, for reproducible runs
    pub seed: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            pps: 2_000,
            hosts: 5_000,
            hot_hosts_percent: 10,
            hot_traffic_percent: 80,
            reverse_percent: 30,
            seed: 7,
        }
    }
}

/// Generator for synthetic packet streams
pub struct TrafficGenerator {
    config: TrafficConfig,
}

impl TrafficGenerator {
    pub fn new(config: TrafficConfig) -> Self {
        Self { config }
    }

    /// Maps a host index to a stable address under 10.0.0.0/8, spreading
    /// hosts across /16 and /24 prefixes so the trie grows in breadth and
    /// depth
    fn host_addr(host: u32) -> [u8; 4] {
        let b = host.to_be_bytes();
        [10, b[1], b[2], b[3]]
    }

    /// Generates the packet stream in memory, sorted by tick
    pub fn synthesize(&self) -> Vec<Packet> {
        let c = &self.config;
        let mut rng = SmallRng::seed_from_u64(c.seed);
        let hot_hosts = (u64::from(c.hosts) * u64::from(c.hot_hosts_percent) / 100).max(1) as u32;
        let total = u64::from(c.duration_secs) * u64::from(c.pps);
        let mut packets = Vec::with_capacity(total as usize);

        for n in 0..total {
            // Spread each second's packets uniformly over its ticks.
            let sec = n / u64::from(c.pps);
            let tick = sec * TICK_HZ + rng.gen_range(0..TICK_HZ);

            let host = if rng.gen_range(0..100) < u32::from(c.hot_traffic_percent) {
                rng.gen_range(0..hot_hosts)
            } else {
                rng.gen_range(hot_hosts..c.hosts.max(hot_hosts + 1))
            };
            let forward = rng.gen_range(0..100) >= u32::from(c.reverse_percent);
            let len = rng.gen_range(64..1500);
            packets.push(Packet::new(tick, Self::host_addr(host), forward, len));
        }

        packets.sort_by_key(|p| p.tick);
        packets
    }

    /// Generates the stream and writes it as one CSV log under `dir`
    pub fn write_log(&self, dir: &Path) -> std::io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join("packets.csv");
        let mut out = BufWriter::new(File::create(&path)?);
        writeln!(out, "tick,addr,dir,len")?;
        for p in self.synthesize() {
            writeln!(
                out,
                "{},{},{},{}",
                p.tick,
                p.addr_string(),
                if p.forward { "fwd" } else { "rev" },
                p.len
            )?;
        }
        out.flush()?;
        Ok(path)
    }
}
