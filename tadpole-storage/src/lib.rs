//! Storage layer for tadpole: an in-memory ordered key/value map and its
//! on-disk snapshot format.
//!
//! - [`skiplist::SkipMap`]: the skiplist + membership-set map that backs
//!   every command handler.
//! - [`snapshot`]: loading the map from, and saving it to, the flat
//!   `"<key> <value>\n"` snapshot file.
//!
//! # Example
//!
//! ```
//! use tadpole_storage::skiplist::SkipMap;
//!
//! let mut map = SkipMap::new();
//! map.insert(b"foo".to_vec(), b"bar".to_vec());
//! assert_eq!(map.search(b"foo"), Some(&b"bar".to_vec()));
//! ```

pub mod skiplist;
pub mod snapshot;

pub use skiplist::SkipMap;
