//! Core data types used throughout tadpole.

use std::path::PathBuf;

/// A key in the database, represented as a byte vector. Binary-safe: no
/// byte value, including embedded NUL, is special.
pub type Key = Vec<u8>;

/// A value in the database, represented as a byte vector. Binary-safe.
pub type Value = Vec<u8>;

/// An exact-length constraint on keys and values, set by the `fixed-length`
/// config directive. When present, `GET`/`PUT`/`DELETE`/`SCAN` reject any
/// key or value whose length does not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLength {
    pub key_len: usize,
    pub val_len: usize,
}

/// Log verbosity, ordered from most to least chatty. A message is emitted
/// only when its level is `>=` the configured `loglevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Verbose,
    Notice,
    Warning,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Some(LogLevel::Debug),
            "verbose" => Some(LogLevel::Verbose),
            "notice" => Some(LogLevel::Notice),
            "warning" => Some(LogLevel::Warning),
            _ => None,
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Notice
    }
}

/// Process-wide configuration, populated by the config file loader
/// (`tadpole-server::config`) and read by every other component.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub loglevel: LogLevel,
    pub dir: Option<PathBuf>,
    /// `None` means log to stdout.
    pub logfile: Option<PathBuf>,
    pub daemonize: bool,
    pub pidfile: Option<PathBuf>,
    pub fixed_length: Option<FixedLength>,
    pub dbfilename: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 6666,
            loglevel: LogLevel::default(),
            dir: None,
            logfile: None,
            daemonize: false,
            pidfile: None,
            fixed_length: None,
            dbfilename: "tadpole.db".to_string(),
        }
    }
}
