// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! reedindex - an in-memory, concurrent B+tree over opaque byte-string
//! keys and values.
//!
//! ## Quick start
//!
//! ```rust
//! use reedindex::btree::{Order, Record, Tree};
//!
//! let tree = Tree::new(Order::new(32).unwrap());
//! tree.insert(Record::new(b"k".to_vec(), b"v".to_vec()));
//! assert_eq!(tree.search(b"k"), Some(b"v".to_vec()));
//! ```
//!
//! ## Architecture
//!
//! - **btree**: node identity, leaf/internal-node shapes, the arena
//!   allocator, and the mutation engine (search/insert/update/delete)
//! - **concurrent**: a worker pool fronting a `Tree` with the
//!   caller-supplied "done sink" completion model
//! - **error**: the crate-wide error type, used only for constructor-time
//!   and configuration failures
//!
//! Persistence, write-ahead logging, and multi-key transactions are out of
//! scope; this crate holds its whole tree in memory for the lifetime of
//! the process.

pub mod btree;
pub mod concurrent;
pub mod error;

pub use btree::{Order, Record, Tree, TreeMetadata};
pub use concurrent::TreeController;
pub use error::{TreeError, TreeResult};
