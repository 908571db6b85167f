// Statistics reporting and CSV export for simulation runs

use crate::models::SimulationResult;
use std::error::Error;
use std::path::Path;

/// How many of the top comparison rows to print in the console report
const TOP_ROWS: usize = 15;

/// Prints the run summary and the hottest addresses to stdout
pub fn print_report(result: &SimulationResult) {
    println!("\nSimulation completed in {:.2?}", result.duration);
    println!("{result}");

    println!("\nMonitor counters:");
    for (key, value) in &result.monitor_report {
        println!("  {key:<26} {value:.0}");
    }

    if result.rows.is_empty() {
        return;
    }
    println!("\nTop addresses by true forward rate (events/sec):");
    println!(
        "{:<18} {:>12} {:>12} {:>12} {:>12} {:>8}",
        "address", "true fwd", "est fwd", "true rev", "est rev", "err"
    );
    for row in result.rows.iter().take(TOP_ROWS) {
        println!(
            "{:<18} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>7.1}%",
            row.address,
            row.true_fwd_rate,
            row.est_fwd_rate,
            row.true_rev_rate,
            row.est_rev_rate,
            row.fwd_rel_err * 100.0
        );
    }
    if result.rows.len() > TOP_ROWS {
        println!("  ... {} more rows", result.rows.len() - TOP_ROWS);
    }
}

/// Writes every comparison row to a CSV file
pub fn export_csv(result: &SimulationResult, path: &Path) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in &result.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ComparisonRow;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn tiny_result() -> SimulationResult {
        SimulationResult {
            total_packets: 10,
            unique_hosts: 1,
            surviving_hosts: 1,
            alloced_bytes: 1000,
            memmax_bytes: 0,
            mean_abs_rel_err: 0.05,
            rows: vec![ComparisonRow {
                address: "10.0.0.1".to_string(),
                true_fwd_rate: 100.0,
                true_rev_rate: 10.0,
                est_fwd_rate: 95.0,
                est_rev_rate: 11.0,
                fwd_rel_err: 0.05,
            }],
            monitor_report: BTreeMap::new(),
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_export_csv_round_trips_header_and_row() {
        let path = std::env::temp_dir().join("ratemon-sim-stats-test.csv");
        export_csv(&tiny_result(), &path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("address,true_fwd_rate,true_rev_rate,est_fwd_rate,est_rev_rate,fwd_rel_err")
        );
        assert!(lines.next().unwrap().starts_with("10.0.0.1,100.0,10.0,95.0,11.0"));
        std::fs::remove_file(&path).ok();
    }
}
