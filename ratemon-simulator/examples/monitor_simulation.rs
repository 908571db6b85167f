extern crate ratemon_rs;

use std::env;
use std::path::PathBuf;

use ratemon_simulator::generator::{TrafficConfig, TrafficGenerator};
use ratemon_simulator::input::LogReader;
use ratemon_simulator::models::SimulationConfig;
use ratemon_simulator::runner::SimulationRunner;
use ratemon_simulator::stats;

fn main() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();

    // Optional: a directory of packet logs to replay instead of
    // synthesizing traffic.
    let packets = if args.len() > 1 {
        let dir = PathBuf::from(&args[1]);
        if !dir.is_dir() {
            return Err(format!("Input directory does not exist: {dir:?}"));
        }
        println!("Replaying packet logs from {dir:?}");
        LogReader::new(&dir)
            .parse_all_files()
            .map_err(|e| format!("Failed to parse logs: {e}"))?
    } else {
        println!("No input directory provided. Synthesizing traffic...");
        TrafficGenerator::new(TrafficConfig {
            duration_secs: 30,
            pps: 1_000,
            hosts: 10_000,
            ..TrafficConfig::default()
        })
        .synthesize()
    };

    let memmax_kb = if args.len() > 2 {
        args[2].parse::<u32>().unwrap_or(256)
    } else {
        256
    };

    println!("Rate Monitor Simulation");
    println!("=======================");
    println!("Packets: {}", packets.len());
    println!("Ceiling: {memmax_kb} KiB");

    let config = SimulationConfig {
        memmax_kb,
        ..SimulationConfig::default()
    };
    let result = SimulationRunner::new(config)
        .run(&packets)
        .map_err(|e| format!("Simulation failed: {e}"))?;
    stats::print_report(&result);
    Ok(())
}
