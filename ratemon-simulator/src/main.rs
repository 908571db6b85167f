use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod generator;
mod input;
mod models;
mod runner;
mod stats;

use generator::{TrafficConfig, TrafficGenerator};
use input::LogReader;
use models::SimulationConfig;
use runner::SimulationRunner;

/// Rate monitor simulator CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Subcommands for the CLI
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a monitor over synthetic or recorded traffic and score it
    Simulate {
        /// Directory containing packet logs; synthesizes traffic if absent
        #[arg(short, long, value_name = "DIR")]
        input_dir: Option<PathBuf>,

        /// Memory ceiling for the monitor in KiB (0 = unbounded)
        #[arg(long, default_value = "0")]
        memmax: u32,

        /// Fold survival threshold (fixed-point events per tick)
        #[arg(long, default_value = "1")]
        thresh: u32,

        /// Count payload bytes instead of packets
        #[arg(long)]
        bytes: bool,

        /// Duration of synthesized traffic in seconds
        #[arg(long, default_value = "60")]
        duration: u32,

        /// Packets per second of synthesized traffic
        #[arg(long, default_value = "2000")]
        pps: u32,

        /// Number of distinct hosts in synthesized traffic
        #[arg(long, default_value = "5000")]
        hosts: u32,

        /// RNG seed for synthesized traffic
        #[arg(long, default_value = "7")]
        seed: u64,

        /// Export per-address comparison rows to a CSV file
        #[arg(long, value_name = "PATH")]
        output_csv: Option<PathBuf>,
    },

    /// Generate random packet logs
    Generate {
        /// Duration in seconds
        #[arg(long, default_value = "60")]
        duration: u32,

        /// Packets per second
        #[arg(long, default_value = "2000")]
        pps: u32,

        /// Number of distinct hosts
        #[arg(long, default_value = "5000")]
        hosts: u32,

        /// Percentage of hosts that are hot
        #[arg(long, default_value = "10")]
        hot_hosts: u8,

        /// Percentage of traffic sent by the hot hosts
        #[arg(long, default_value = "80")]
        hot_traffic: u8,

        /// Percentage of packets in the reverse direction
        #[arg(long, default_value = "30")]
        reverse: u8,

        /// RNG seed
        #[arg(long, default_value = "7")]
        seed: u64,

        /// Output directory
        #[arg(short, long, default_value = "packet_logs")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Some(Commands::Generate {
            duration,
            pps,
            hosts,
            hot_hosts,
            hot_traffic,
            reverse,
            seed,
            output,
        }) => {
            let config = TrafficConfig {
                duration_secs: duration,
                pps,
                hosts,
                hot_hosts_percent: hot_hosts,
                hot_traffic_percent: hot_traffic,
                reverse_percent: reverse,
                seed,
            };
            let path = TrafficGenerator::new(config).write_log(&output)?;
            println!("Wrote packet log to {}", path.display());
            Ok(())
        }

        Some(Commands::Simulate {
            input_dir,
            memmax,
            thresh,
            bytes,
            duration,
            pps,
            hosts,
            seed,
            output_csv,
        }) => run_simulation(
            input_dir, memmax, thresh, bytes, duration, pps, hosts, seed, output_csv,
        ),

        // Default: simulate with synthesized traffic and default knobs.
        None => run_simulation(None, 0, 1, false, 60, 2_000, 5_000, 7, None),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_simulation(
    input_dir: Option<PathBuf>,
    memmax: u32,
    thresh: u32,
    bytes: bool,
    duration: u32,
    pps: u32,
    hosts: u32,
    seed: u64,
    output_csv: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let packets = match &input_dir {
        Some(dir) => {
            println!("Reading packet logs from {}", dir.display());
            LogReader::new(dir).parse_all_files()?
        }
        None => {
            println!(
                "Synthesizing traffic: {duration}s at {pps} pps across {hosts} hosts (seed {seed})"
            );
            TrafficGenerator::new(TrafficConfig {
                duration_secs: duration,
                pps,
                hosts,
                seed,
                ..TrafficConfig::default()
            })
            .synthesize()
        }
    };
    if packets.is_empty() {
        return Err("no packets to simulate".into());
    }

    println!("Monitor: memmax = {memmax} KiB, thresh = {thresh}, mode = {}",
        if bytes { "bytes" } else { "packets" });

    let config = SimulationConfig {
        memmax_kb: memmax,
        thresh,
        count_bytes: bytes,
    };
    let result = SimulationRunner::new(config).run(&packets)?;
    stats::print_report(&result);

    if let Some(path) = output_csv {
        stats::export_csv(&result, &path)?;
        println!("\nComparison rows exported to {}", path.display());
    }
    Ok(())
}
