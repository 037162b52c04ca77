//! Error types and process exit codes for configuration handling.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Structured exit codes reported by the process.
///
/// When a code travels through the interrupt-cause word it is shifted left by
/// eight bits so it cannot be confused with a raw signal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    /// Bad command line arguments.
    Args = 1,
    /// The configuration file could not be opened or read.
    ConfFile = 2,
    /// Malformed configuration.
    Conf = 3,
    /// More `new_channel` directives than the channel table can hold.
    TooManyChannels = 4,
    /// A mandatory file could not be created.
    CreateFile = 5,
    /// A generated file could not be removed.
    DelFile = 6,
    /// Device open or tuning failure, including the tuning watchdog.
    Tune = 7,
    /// Anything else.
    Generic = 12,
}

impl ExitCode {
    /// Numeric value of the code.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map a numeric value back to a code.
    pub fn from_code(value: i32) -> Option<Self> {
        match value {
            1 => Some(ExitCode::Args),
            2 => Some(ExitCode::ConfFile),
            3 => Some(ExitCode::Conf),
            4 => Some(ExitCode::TooManyChannels),
            5 => Some(ExitCode::CreateFile),
            6 => Some(ExitCode::DelFile),
            7 => Some(ExitCode::Tune),
            12 => Some(ExitCode::Generic),
            _ => None,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(value: ExitCode) -> Self {
        value.code()
    }
}

/// Fatal configuration errors.
///
/// Every variant stops the process; warnings are logged where they occur and
/// never surface as an error.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be opened.
    #[error("{}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be read.
    #[error("{}: read error after line {line}: {source}", path.display())]
    Read {
        path: PathBuf,
        line: usize,
        #[source]
        source: io::Error,
    },

    /// A channel-scoped directive appeared before any `new_channel`.
    #[error("{keyword} : You have to start a channel first (using new_channel)")]
    NoChannel { keyword: String },

    /// Channel table capacity exceeded.
    #[error("Too many channels : {count} limit : {limit}")]
    TooManyChannels { count: usize, limit: usize },

    /// A PID in a `pids` directive is outside the accepted range.
    #[error("Config issue : in pids, given pid : {pid}")]
    PidOutOfRange { pid: i64 },

    /// A `pids` directive lists more PIDs than a channel can carry.
    #[error("Too many pids : {count} channel : {channel}")]
    TooManyPids { count: usize, channel: usize },

    /// `pmt_pid` outside the accepted range.
    #[error("Configuration issue in pmt_pid, given PID : {pid}")]
    PmtPidOutOfRange { pid: i64 },

    /// A directive that requires a value had none.
    #[error("{keyword} : missing value")]
    MissingValue { keyword: String },

    /// A directive value could not be interpreted.
    #[error("{keyword} : bad value {value:?}")]
    InvalidValue { keyword: String, value: String },

    /// Neither multicast nor unicast output is enabled.
    #[error("NO Multicast AND NO unicast. No data can be send")]
    NoOutput,
}

impl ConfigError {
    /// Exit code reported for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            ConfigError::Open { .. } | ConfigError::Read { .. } => ExitCode::ConfFile,
            ConfigError::TooManyChannels { .. } => ExitCode::TooManyChannels,
            _ => ExitCode::Conf,
        }
    }

    pub(crate) fn invalid(keyword: &str, value: &str) -> Self {
        ConfigError::InvalidValue {
            keyword: keyword.to_string(),
            value: value.to_string(),
        }
    }
}

/// Error returned when a keyword-style value is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown value {0:?}")]
pub struct ParseValueError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_roundtrip() {
        for code in [
            ExitCode::Args,
            ExitCode::ConfFile,
            ExitCode::Conf,
            ExitCode::TooManyChannels,
            ExitCode::CreateFile,
            ExitCode::DelFile,
            ExitCode::Tune,
            ExitCode::Generic,
        ] {
            assert_eq!(ExitCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ExitCode::from_code(0), None);
    }

    #[test]
    fn test_config_error_exit_codes() {
        let err = ConfigError::TooManyChannels { count: 129, limit: 128 };
        assert_eq!(err.exit_code(), ExitCode::TooManyChannels);

        let err = ConfigError::Open {
            path: PathBuf::from("/nonexistent"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(err.exit_code(), ExitCode::ConfFile);

        assert_eq!(ConfigError::NoOutput.exit_code(), ExitCode::Conf);
        assert_eq!(
            ConfigError::NoChannel { keyword: "pids".into() }.to_string(),
            "pids : You have to start a channel first (using new_channel)"
        );
    }
}
