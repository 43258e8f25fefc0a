//! Core types and error handling shared by tadpole's storage and server crates.
//!
//! - Common error types with [`Error`] and [`Result`]
//! - Wire-level data types: [`Key`], [`Value`]
//! - Server-wide configuration: [`ServerConfig`], [`FixedLength`], [`LogLevel`]
//!
//! # Example
//!
//! ```
//! use tadpole_core::{Key, Value};
//!
//! let key: Key = b"foo".to_vec();
//! let value: Value = b"bar".to_vec();
//! ```

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
