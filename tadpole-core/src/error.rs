//! Error types for tadpole.
//!
//! `Config`/`Corruption` are fatal at startup, `Protocol` closes the
//! offending connection, and `Command` becomes a `-ERR …\r\n` reply while
//! the connection stays up.

use thiserror::Error;

/// The main error type for tadpole operations
#[derive(Error, Debug)]
pub enum Error {
    /// An I/O error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration directive was malformed, or the config file could not be read
    #[error("{0}")]
    Config(String),

    /// The byte stream violated RESP framing rules
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A command was rejected for semantic reasons (unknown name, bad arity,
    /// fixed-length mismatch, bad cursor order); formatted back to the client
    /// as a RESP error reply
    #[error("{0}")]
    Command(String),

    /// The on-disk snapshot did not match the expected `"<key> <value>\n"` format
    #[error("{0}")]
    Corruption(String),
}

/// A specialized Result type for tadpole operations
pub type Result<T> = std::result::Result<T, Error>;
