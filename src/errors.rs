//! Operator-Facing Errors
//!
//! Configuration and administrative errors are reported synchronously with a
//! descriptive message and leave the monitor untouched; a rejected change is
//! never partially applied.

use core::fmt;

/// A construction-time configuration rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The counting mode string was neither `PACKETS` nor `BYTES`.
    BadMode,
    /// The sampling ratio was above the fixed-point representation of 1.
    RatioOutOfRange,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::BadMode => {
                write!(f, "monitor type should be \"PACKETS\" or \"BYTES\"")
            }
            ConfigError::RatioOutOfRange => write!(f, "ratio must be between 0 and 1"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// A rejected administrative request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminError {
    /// The request did not carry the expected number of arguments.
    ExpectedArgs(usize),
    /// An argument could not be parsed as an integer.
    NotAnInteger,
    /// An argument could not be parsed as a dotted-quad address.
    NotAnAddress,
    /// The annotation level was outside 0..=3.
    LevelOutOfRange,
    /// The annotation expiry was not a positive number of seconds.
    BadExpiry,
    /// The walk could not allocate under the configured memory ceiling.
    OutOfMemory,
}

impl fmt::Display for AdminError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminError::ExpectedArgs(n) => write!(f, "expecting {n} argument(s)"),
            AdminError::NotAnInteger => write!(f, "not an integer"),
            AdminError::NotAnAddress => write!(f, "not an IP address"),
            AdminError::LevelOutOfRange => {
                write!(f, "level must be between 0 and 3")
            }
            AdminError::BadExpiry => write!(f, "expiry must be > 0 seconds"),
            AdminError::OutOfMemory => write!(f, "memory ceiling reached"),
        }
    }
}

impl core::error::Error for AdminError {}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_messages_are_descriptive() {
        assert!(ConfigError::BadMode.to_string().contains("PACKETS"));
        assert!(ConfigError::RatioOutOfRange.to_string().contains("ratio"));
        assert_eq!(AdminError::ExpectedArgs(3).to_string(), "expecting 3 argument(s)");
        assert!(AdminError::LevelOutOfRange.to_string().contains("level"));
    }
}
