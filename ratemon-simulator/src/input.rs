//! Input data handling for the simulator
//!
//! Parses packet logs written by the generator (or by an external capture
//! tool) back into the in-memory stream the runner consumes. One CSV row
//! per packet: `tick,addr,dir,len`.

use crate::models::Packet;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Error types for log parsing
#[derive(Debug)]
pub enum LogParseError {
    IoError(io::Error),
    ParseError(String),
}

impl std::fmt::Display for LogParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogParseError::IoError(e) => write!(f, "I/O error: {e}"),
            LogParseError::ParseError(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for LogParseError {}

impl From<io::Error> for LogParseError {
    fn from(err: io::Error) -> Self {
        LogParseError::IoError(err)
    }
}

/// Reader for packet logs
pub struct LogReader {
    input_dir: PathBuf,
}

impl LogReader {
    /// Create a new reader for the given input directory
    pub fn new<P: AsRef<Path>>(input_dir: P) -> Self {
        Self {
            input_dir: input_dir.as_ref().to_path_buf(),
        }
    }

    /// Get all log files in the input directory, sorted by name
    pub fn get_log_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut log_files = Vec::new();
        for entry in fs::read_dir(&self.input_dir)? {
            let path = entry?.path();
            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext == "log" || ext == "csv" || ext == "txt" {
                        log_files.push(path);
                    }
                }
            }
        }
        log_files.sort();
        Ok(log_files)
    }

    /// Parse a single line into a Packet
    fn parse_line(line: &str, line_num: usize) -> Result<Option<Packet>, LogParseError> {
        let line = line.trim();
        // Skip empty lines, comments, and the header row.
        if line.is_empty() || line.starts_with('#') || (line_num == 0 && line.contains("tick")) {
            return Ok(None);
        }

        let mut parts = line.splitn(4, ',');
        let bad = |what: &str, got: &str| {
            LogParseError::ParseError(format!("line {}: bad {what}: {got}", line_num + 1))
        };

        let tick_str = parts.next().unwrap_or_default().trim();
        let tick = tick_str.parse::<u64>().map_err(|_| bad("tick", tick_str))?;

        let addr_str = parts
            .next()
            .ok_or_else(|| bad("row", line))?
            .trim();
        let mut addr = [0u8; 4];
        let mut octets = addr_str.split('.');
        for byte in &mut addr {
            let octet = octets.next().ok_or_else(|| bad("address", addr_str))?;
            *byte = octet.parse().map_err(|_| bad("address", addr_str))?;
        }
        if octets.next().is_some() {
            return Err(bad("address", addr_str));
        }

        let dir_str = parts.next().ok_or_else(|| bad("row", line))?.trim();
        let forward = match dir_str {
            "fwd" => true,
            "rev" => false,
            other => return Err(bad("direction", other)),
        };

        let len_str = parts.next().ok_or_else(|| bad("row", line))?.trim();
        let len = len_str.parse::<u16>().map_err(|_| bad("length", len_str))?;

        Ok(Some(Packet::new(tick, addr, forward, len)))
    }

    /// Parse a single log file
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Packet>, LogParseError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut packets = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            if let Some(packet) = Self::parse_line(&line?, line_num)? {
                packets.push(packet);
            }
        }
        Ok(packets)
    }

    /// Parse all log files in the input directory, merged and sorted by tick
    pub fn parse_all_files(&self) -> Result<Vec<Packet>, LogParseError> {
        let mut all = Vec::new();
        for file in self.get_log_files()? {
            all.extend(self.parse_file(&file)?);
        }
        all.sort_by_key(|p| p.tick);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let p = LogReader::parse_line("120,10.0.3.7,fwd,512", 5)
            .unwrap()
            .unwrap();
        assert_eq!(p.tick, 120);
        assert_eq!(p.addr, [10, 0, 3, 7]);
        assert!(p.forward);
        assert_eq!(p.len, 512);

        let p = LogReader::parse_line("9,192.168.0.1,rev,64", 1)
            .unwrap()
            .unwrap();
        assert!(!p.forward);
    }

    #[test]
    fn test_header_and_comments_skipped() {
        assert!(LogReader::parse_line("tick,addr,dir,len", 0)
            .unwrap()
            .is_none());
        assert!(LogReader::parse_line("# comment", 3).unwrap().is_none());
        assert!(LogReader::parse_line("", 3).unwrap().is_none());
    }

    #[test]
    fn test_malformed_lines_error() {
        assert!(LogReader::parse_line("x,10.0.0.1,fwd,64", 1).is_err());
        assert!(LogReader::parse_line("1,10.0.0,fwd,64", 1).is_err());
        assert!(LogReader::parse_line("1,10.0.0.1,sideways,64", 1).is_err());
        assert!(LogReader::parse_line("1,10.0.0.1,fwd", 1).is_err());
    }

    #[test]
    fn test_round_trip_through_generator_log() {
        use crate::generator::{TrafficConfig, TrafficGenerator};
        let dir = std::env::temp_dir().join("ratemon-sim-roundtrip");
        let gen = TrafficGenerator::new(TrafficConfig {
            duration_secs: 1,
            pps: 200,
            hosts: 50,
            ..TrafficConfig::default()
        });
        gen.write_log(&dir).unwrap();
        let packets = LogReader::new(&dir).parse_all_files().unwrap();
        assert_eq!(packets.len(), 200);
        std::fs::remove_dir_all(&dir).ok();
    }
}
