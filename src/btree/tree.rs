// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The tree itself: search, insert, update, delete, and the split/merge
//! machinery that keeps the arena's shape balanced.
//!
//! Every public operation takes a write lock on each internal node it
//! descends through and holds it for the whole call (§5). For insert and
//! delete this matters beyond mutual exclusion: once a leaf splits or two
//! siblings merge, the fix-up walks back up through exactly the ancestors
//! already held, reusing their guards rather than re-locking anything a
//! calling frame still owns. `path` below is that held-ancestor stack,
//! nearest-to-the-leaf last.

use crate::btree::leaf::Leaf;
use crate::btree::node::InternalNode;
use crate::btree::store::{NodeStore, NodeWriteGuard};
use crate::btree::types::{is_leaf_id, NodeId, Order, Record, TreeMetadata};

/// A B+tree of opaque byte-string keys to byte-string values.
pub struct Tree {
    order: Order,
    store: NodeStore,
}

impl Tree {
    pub fn new(order: Order) -> Self {
        Tree {
            order,
            store: NodeStore::new(),
        }
    }

    pub fn metadata(&self) -> TreeMetadata {
        let mut metadata = self.store.metadata();
        metadata.order = self.order.value();
        metadata
    }

    /// Exposes the arena for structural invariant checks in the
    /// property-test suite.
    #[cfg(test)]
    pub(crate) fn store(&self) -> &NodeStore {
        &self.store
    }

    /// Looks up `key`, coupling read locks one level at a time: a node's
    /// lock is dropped only once its chosen child has been locked.
    pub fn search(&self, key: &[u8]) -> Option<Vec<u8>> {
        let mut current = self.store.root();
        let mut parent_guard = None;
        loop {
            if is_leaf_id(current) {
                let leaf_handle = self.store.get_leaf(current)?;
                let leaf = leaf_handle.read_arc();
                drop(parent_guard);
                return leaf.search(key);
            }
            let node_guard = self.store.read_node(current)?;
            let next = node_guard.child_for(key);
            drop(parent_guard);
            parent_guard = Some(node_guard);
            current = next;
        }
    }

    /// Overwrites the value for an existing key. No structural change is
    /// possible, so internal nodes are only ever read-locked.
    pub fn update(&self, record: Record) -> bool {
        let mut current = self.store.root();
        let mut parent_guard = None;
        loop {
            if is_leaf_id(current) {
                let Some(leaf_handle) = self.store.get_leaf(current) else {
                    return false;
                };
                let mut leaf = leaf_handle.write_arc();
                drop(parent_guard);
                return leaf.update_local(record);
            }
            let Some(node_guard) = self.store.read_node(current) else {
                return false;
            };
            let next = node_guard.child_for(&record.key);
            drop(parent_guard);
            parent_guard = Some(node_guard);
            current = next;
        }
    }

    /// Inserts `record`. Returns `false` without effect if the key already
    /// exists.
    pub fn insert(&self, record: Record) -> bool {
        let mut path: Vec<NodeWriteGuard> = Vec::new();
        let mut current = self.store.root();
        while !is_leaf_id(current) {
            let Some(guard) = self.store.write_node(current) else {
                return false;
            };
            let next = guard.child_for(&record.key);
            path.push(guard);
            current = next;
        }
        let leaf_id = current;
        let Some(mut leaf) = self.store.write_leaf(leaf_id) else {
            return false;
        };

        if !leaf.insert_local(record) {
            return false;
        }
        if !leaf.is_overfull(self.order) {
            return true;
        }

        let mut child_id = leaf_id;
        let mut pending = self.split_leaf(leaf_id, &mut leaf);
        drop(leaf);

        while let Some((separator, right_id)) = pending.take() {
            let Some(mut parent) = path.pop() else {
                break;
            };
            parent.insert_once_local(separator, child_id, right_id);
            if parent.is_overfull(self.order) {
                child_id = parent.id;
                pending = self.split_node(parent.id, &mut parent);
            }
        }
        true
    }

    /// Deletes `key`. Returns `false` without effect if it is absent.
    pub fn delete(&self, key: &[u8]) -> bool {
        let mut path: Vec<NodeWriteGuard> = Vec::new();
        let mut current = self.store.root();
        while !is_leaf_id(current) {
            let Some(guard) = self.store.write_node(current) else {
                return false;
            };
            let next = guard.child_for(key);
            path.push(guard);
            current = next;
        }
        let leaf_id = current;
        let Some(mut leaf) = self.store.write_leaf(leaf_id) else {
            return false;
        };

        let Some((index, _removed)) = leaf.delete_local(key) else {
            return false;
        };
        log::debug!("leaf {leaf_id} removed a key");

        let leaf_is_root = leaf.father.is_none();
        if index == 0 && !leaf.is_empty() && !leaf_is_root {
            let new_min = leaf.records[0].key.clone();
            drop(leaf);
            self.walk_replace(&mut path, key, new_min);
        } else {
            drop(leaf);
        }

        if !leaf_is_root {
            self.walk_merge(&mut path, key);
        }
        true
    }

    // -- insert-side structural helpers -------------------------------

    fn split_leaf(&self, id: NodeId, leaf: &mut Leaf) -> Option<(Vec<u8>, NodeId)> {
        let right_id = self.store.new_leaf();
        let moved = leaf.split_off(self.order);
        let separator = moved[0].key.clone();
        let old_next = leaf.next;
        leaf.next = Some(right_id);
        let father = leaf.father;

        {
            let Some(mut right) = self.store.write_leaf(right_id) else {
                debug_assert!(false, "leaf {right_id} was just allocated but failed to resolve");
                return None;
            };
            right.records = moved;
            right.prev = Some(id);
            right.next = old_next;
            right.father = father;
        }
        if let Some(next_id) = old_next {
            if let Some(mut next_leaf) = self.store.write_leaf(next_id) {
                next_leaf.prev = Some(right_id);
            }
        }
        log::debug!("leaf {id} split into new right leaf {right_id}");

        match father {
            Some(_) => Some((separator, right_id)),
            None => {
                let root_id = self.store.new_node();
                {
                    let Some(mut root) = self.store.write_node(root_id) else {
                        debug_assert!(false, "internal node {root_id} was just allocated but failed to resolve");
                        return None;
                    };
                    root.keys = vec![separator];
                    root.children = vec![id, right_id];
                }
                leaf.father = Some(root_id);
                if let Some(mut right) = self.store.write_leaf(right_id) {
                    right.father = Some(root_id);
                }
                self.store.set_root(root_id);
                log::debug!("root promoted to new internal node {root_id}");
                None
            }
        }
    }

    fn split_node(&self, id: NodeId, node: &mut InternalNode) -> Option<(Vec<u8>, NodeId)> {
        let right_id = self.store.new_node();
        let (promoted, right_keys, right_children) = node.split_off(self.order);
        self.reparent_children(&right_children, right_id);
        let father = node.father;

        {
            let Some(mut right) = self.store.write_node(right_id) else {
                debug_assert!(false, "internal node {right_id} was just allocated but failed to resolve");
                return None;
            };
            right.keys = right_keys;
            right.children = right_children;
            right.father = father;
        }
        log::debug!("internal node {id} split into new right node {right_id}");

        match father {
            Some(_) => Some((promoted, right_id)),
            None => {
                let root_id = self.store.new_node();
                {
                    let Some(mut root) = self.store.write_node(root_id) else {
                        debug_assert!(false, "internal node {root_id} was just allocated but failed to resolve");
                        return None;
                    };
                    root.keys = vec![promoted];
                    root.children = vec![id, right_id];
                }
                node.father = Some(root_id);
                if let Some(mut right) = self.store.write_node(right_id) {
                    right.father = Some(root_id);
                }
                self.store.set_root(root_id);
                log::debug!("root promoted to new internal node {root_id}");
                None
            }
        }
    }

    fn reparent_children(&self, child_ids: &[NodeId], new_father: NodeId) {
        for &id in child_ids {
            if is_leaf_id(id) {
                if let Some(mut g) = self.store.write_leaf(id) {
                    g.father = Some(new_father);
                }
            } else if let Some(mut g) = self.store.write_node(id) {
                g.father = Some(new_father);
            }
        }
    }

    // -- delete-side structural helpers -------------------------------

    /// Searches the held ancestor path from nearest to furthest for an
    /// exact `old_key`, patching the first match. Does not consume
    /// `path`: a merge fix-up may still need the same guards afterward.
    fn walk_replace(&self, path: &mut [NodeWriteGuard], old_key: &[u8], new_key: Vec<u8>) {
        for ancestor in path.iter_mut().rev() {
            if ancestor.replace_key(old_key, new_key.clone()) {
                return;
            }
        }
    }

    /// Attempts to merge the sibling pair straddling `key` at the leaf's
    /// immediate parent, then cascades through remaining internal-node
    /// levels as far as the merges keep succeeding.
    fn walk_merge(&self, path: &mut Vec<NodeWriteGuard>, original_key: &[u8]) {
        let Some(mut node) = path.pop() else {
            return;
        };
        let removed_key = node.keys.first().cloned();
        let mut cascade = self.merge_leaf_children(&mut node, original_key);

        if !node.removed {
            if let Some(removed_key) = removed_key {
                if !node.replace_key(original_key, removed_key.clone()) {
                    for ancestor in path.iter_mut().rev() {
                        if ancestor.replace_key(original_key, removed_key.clone()) {
                            break;
                        }
                    }
                }
            }
        }
        drop(node);

        while let Some(pivot) = cascade.take() {
            let Some(mut next) = path.pop() else {
                break;
            };
            cascade = self.merge_node_children(&mut next, &pivot);
        }
    }

    /// Merges the two leaf children of `node` that straddle `key`, if
    /// their combined size fits within one leaf. Returns the pivot to
    /// re-locate with at the next ancestor level, when this level is not
    /// the root and the merge went through.
    fn merge_leaf_children(&self, node: &mut InternalNode, key: &[u8]) -> Option<Vec<u8>> {
        let mut index = node.locate(key);
        if index == 0 {
            index = 1;
        }
        if index == 0 || index > node.keys.len() {
            return None;
        }
        let left_id = node.children[index - 1];
        let right_id = node.children[index];
        let left_handle = self.store.get_leaf(left_id)?;
        let right_handle = self.store.get_leaf(right_id)?;
        let mut left = left_handle.write_arc();
        let mut right = right_handle.write_arc();
        if !left.can_merge_with(&right, self.order) {
            return None;
        }

        node.remove_pair_at(index - 1);
        left.absorb(&mut right);
        left.next = right.next;
        let right_next = right.next;
        right.removed = true;
        drop(right);
        if let Some(next_id) = right_next {
            if let Some(mut next_leaf) = self.store.write_leaf(next_id) {
                next_leaf.prev = Some(left_id);
            }
        }
        self.store.dec_leaf_count();
        log::debug!("leaves {left_id} and {right_id} merged");

        if node.father.is_some() {
            Some(left.min_key().unwrap_or_default())
        } else if node.is_empty() {
            node.removed = true;
            left.father = None;
            self.store.set_root(left_id);
            self.store.zero_node_count();
            log::debug!("root collapsed to leaf {left_id}");
            None
        } else {
            None
        }
    }

    /// Merges the two internal-node children of `node` that straddle
    /// `key`. Mirrors [`Tree::merge_leaf_children`] but additionally
    /// re-splits the survivor if absorbing the parent separator overflows
    /// it, and reparents the absorbed node's children.
    fn merge_node_children(&self, node: &mut InternalNode, key: &[u8]) -> Option<Vec<u8>> {
        let mut index = node.locate(key);
        if index == 0 {
            index = 1;
        }
        if index == 0 || index > node.keys.len() {
            return None;
        }
        let left_id = node.children[index - 1];
        let right_id = node.children[index];
        let left_handle = self.store.get_node(left_id)?;
        let right_handle = self.store.get_node(right_id)?;
        let mut left = left_handle.write_arc();
        let mut right = right_handle.write_arc();
        if !left.can_merge_with(&right, self.order) {
            return None;
        }

        let cascade_pivot = node.keys.first().cloned();
        let separator = node.keys[index - 1].clone();
        let moved_children = right.children.clone();
        left.absorb(separator, &mut right);
        right.removed = true;
        self.reparent_children(&moved_children, left_id);
        node.remove_pair_at(index - 1);
        self.store.dec_node_count();
        log::debug!("internal nodes {left_id} and {right_id} merged");

        if left.is_overfull(self.order) {
            self.split_node(left_id, &mut left);
            return None;
        }

        if node.father.is_some() {
            return cascade_pivot;
        }
        if node.is_empty() {
            node.removed = true;
            left.father = None;
            self.store.set_root(left_id);
            self.store.dec_node_count();
            log::debug!("root collapsed to internal node {left_id}");
        }
        None
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new(Order::default())
    }
}
