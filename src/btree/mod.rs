// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The in-memory concurrent B+tree: arena-backed nodes, per-node locking,
//! and the mutation engine that keeps the tree balanced under concurrent
//! insert/search/update/delete.

pub mod leaf;
pub mod node;
pub mod store;
pub mod tree;
pub mod types;


pub use store::NodeStore;
pub use tree::Tree;
pub use types::{is_leaf_id, NodeId, Order, Record, TreeMetadata};
