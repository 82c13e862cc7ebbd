// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Arena and allocator: the only component permitted to mint node ids.
//!
//! Leaves and internal nodes live in two separate backing vectors, each
//! indexed directly by id (internal-node ids are offset by
//! [`LEAF_ID_BOUND`]). Both vectors, plus the tree-level bookkeeping
//! (root, counters, allocator cursors), sit behind one `RwLock`: growth
//! needs to be serialized against every id-to-node resolution, and this is
//! the simplest discipline that guarantees it (§5, §9 "Growth of the
//! arena").

use crate::btree::leaf::Leaf;
use crate::btree::node::InternalNode;
use crate::btree::types::{NodeId, TreeMetadata, ARENA_CEILING, LEAF_ID_BOUND};
use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};
use std::sync::Arc;

type LeafHandle = Arc<RwLock<Leaf>>;
type NodeHandle = Arc<RwLock<InternalNode>>;

/// Owned read guard over a leaf, independent of the `Arc` it was drawn
/// from. Lets the mutation engine hold an ancestor path of guards in a
/// plain `Vec` instead of fighting borrowed-guard lifetimes.
pub type LeafReadGuard = ArcRwLockReadGuard<RawRwLock, Leaf>;
pub type LeafWriteGuard = ArcRwLockWriteGuard<RawRwLock, Leaf>;
pub type NodeReadGuard = ArcRwLockReadGuard<RawRwLock, InternalNode>;
pub type NodeWriteGuard = ArcRwLockWriteGuard<RawRwLock, InternalNode>;

struct StoreInner {
    root: NodeId,
    leaf_count: i32,
    node_count: i32,
    leaf_max: usize,
    node_max: usize,
    first_leaf: NodeId,
    leaves: Vec<LeafHandle>,
    nodes: Vec<NodeHandle>,
}

/// Dense, grow-only arena mapping ids to leaves or internal nodes.
pub struct NodeStore {
    inner: RwLock<StoreInner>,
}

const INITIAL_CAPACITY: usize = 64;

impl NodeStore {
    /// Creates a store seeded with a single empty root leaf (id `0`).
    pub fn new() -> Self {
        let root_leaf: LeafHandle = Arc::new(RwLock::new(Leaf::new(0)));
        NodeStore {
            inner: RwLock::new(StoreInner {
                root: 0,
                leaf_count: 1,
                node_count: 0,
                leaf_max: INITIAL_CAPACITY,
                node_max: INITIAL_CAPACITY,
                first_leaf: 0,
                leaves: vec![root_leaf],
                nodes: Vec::new(),
            }),
        }
    }

    pub fn root(&self) -> NodeId {
        self.inner.read().root
    }

    pub fn set_root(&self, id: NodeId) {
        self.inner.write().root = id;
    }

    pub fn first_leaf(&self) -> NodeId {
        self.inner.read().first_leaf
    }

    pub fn set_first_leaf(&self, id: NodeId) {
        self.inner.write().first_leaf = id;
    }

    pub fn metadata(&self) -> TreeMetadata {
        let inner = self.inner.read();
        TreeMetadata {
            order: 0, // filled in by Tree::metadata, which knows the configured order
            root: inner.root,
            leaf_count: inner.leaf_count,
            node_count: inner.node_count,
            last_leaf: inner.leaves.len() as i32 - 1,
            last_node: inner.nodes.len() as i32 - 1,
            first_leaf: inner.first_leaf,
        }
    }

    /// Allocates a fresh, empty leaf and returns its id.
    pub fn new_leaf(&self) -> NodeId {
        let mut inner = self.inner.write();
        let id = inner.leaves.len() as NodeId;
        if inner.leaves.len() >= inner.leaf_max {
            let grown = (inner.leaf_max * 2).min(ARENA_CEILING);
            inner.leaves.reserve(grown.saturating_sub(inner.leaves.len()));
            inner.leaf_max = grown;
            log::debug!("leaf arena grown to {grown}");
        }
        inner.leaves.push(Arc::new(RwLock::new(Leaf::new(id))));
        inner.leaf_count += 1;
        log::trace!("leaf {id} allocated");
        id
    }

    /// Allocates a fresh, empty internal node and returns its id.
    pub fn new_node(&self) -> NodeId {
        let mut inner = self.inner.write();
        let index = inner.nodes.len();
        let id = LEAF_ID_BOUND + index as NodeId;
        if inner.nodes.len() >= inner.node_max {
            let grown = (inner.node_max * 2).min(ARENA_CEILING);
            inner.nodes.reserve(grown.saturating_sub(inner.nodes.len()));
            inner.node_max = grown;
            log::debug!("internal-node arena grown to {grown}");
        }
        inner.nodes.push(Arc::new(RwLock::new(InternalNode::new(id))));
        inner.node_count += 1;
        log::trace!("internal node {id} allocated");
        id
    }

    /// Resolves a leaf id to its handle, or `None` if `id` is not a leaf
    /// id or is out of range.
    pub fn get_leaf(&self, id: NodeId) -> Option<LeafHandle> {
        if id >= LEAF_ID_BOUND {
            return None;
        }
        self.inner.read().leaves.get(id as usize).cloned()
    }

    /// Resolves an internal-node id to its handle, or `None` if `id` is
    /// not an internal-node id or is out of range.
    pub fn get_node(&self, id: NodeId) -> Option<NodeHandle> {
        if id < LEAF_ID_BOUND {
            return None;
        }
        let index = (id - LEAF_ID_BOUND) as usize;
        self.inner.read().nodes.get(index).cloned()
    }

    pub fn read_leaf(&self, id: NodeId) -> Option<LeafReadGuard> {
        self.get_leaf(id).map(|h| h.read_arc())
    }

    pub fn write_leaf(&self, id: NodeId) -> Option<LeafWriteGuard> {
        self.get_leaf(id).map(|h| h.write_arc())
    }

    pub fn read_node(&self, id: NodeId) -> Option<NodeReadGuard> {
        self.get_node(id).map(|h| h.read_arc())
    }

    pub fn write_node(&self, id: NodeId) -> Option<NodeWriteGuard> {
        self.get_node(id).map(|h| h.write_arc())
    }

    /// Decrements the live leaf counter. Called by the mutation engine
    /// when a leaf merge retires a leaf; the slot's tombstone is set by
    /// the caller directly on the leaf (it already holds the write lock).
    pub fn dec_leaf_count(&self) {
        self.inner.write().leaf_count -= 1;
    }

    /// Decrements the live internal-node counter, symmetric to
    /// [`NodeStore::dec_leaf_count`].
    pub fn dec_node_count(&self) {
        self.inner.write().node_count -= 1;
    }

    /// Forces the internal-node counter to an exact value. Used only by
    /// root collapse to a leaf, where the whole internal-node population
    /// the tree ever allocates along the collapsing path should read as
    /// zero live nodes (Open Question (a), resolved as required
    /// behaviour: see REDESIGN FLAGS).
    pub fn zero_node_count(&self) {
        self.inner.write().node_count = 0;
    }

    pub fn leaf_count(&self) -> i32 {
        self.inner.read().leaf_count
    }

    pub fn node_count(&self) -> i32 {
        self.inner.read().node_count
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}
