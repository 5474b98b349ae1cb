// This file is part of midnight-rhs.
// Copyright (C) 2025 Midnight Foundation
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Test scaffolding: an in-memory sparse Merkle tree.
//!
//! This is the tree the service's submitters are assumed to maintain. Tests
//! build one here, push its nodes to a service (or resolve against it
//! directly), and check the proofs the descent reconstructs.

use crate::proof::{ClientError, NodeResolver};
use std::collections::HashMap;
use storage::hash::Hash;
use storage::node::{Node, NodeError, NodeType};
use thiserror::Error;

/// A bounded-depth sparse Merkle tree held in memory.
///
/// Insertion follows the usual sparse-tree scheme: a leaf lives at the
/// shallowest slot its key bits reach; when two keys share a prefix, the
/// resident leaf is pushed down through middle nodes until the paths split.
/// Empty subtrees are the zero hash and are never materialized.
#[derive(Clone, Debug)]
pub struct MemoryTree {
    max_levels: usize,
    root: Hash,
    nodes: HashMap<Hash, Node>,
}

/// Failure to insert into a [`MemoryTree`].
#[derive(Debug, Error)]
pub enum TreeError {
    /// The key bits ran out of tree.
    #[error("reached maximum tree depth")]
    MaxLevel,
    /// The key is already present.
    #[error("key already exists in the tree")]
    KeyExists,
    /// The descent hit a node that is neither a leaf nor a middle node.
    #[error("unexpected node type in tree")]
    Corrupted,
    /// Hashing a new node failed.
    #[error(transparent)]
    Node(#[from] NodeError),
}

impl MemoryTree {
    /// An empty tree of the given depth.
    pub fn new(max_levels: usize) -> Self {
        MemoryTree {
            max_levels,
            root: Hash::ZERO,
            nodes: HashMap::new(),
        }
    }

    /// The current root, the zero hash while the tree is empty.
    pub fn root(&self) -> Hash {
        self.root
    }

    /// Every stored node, in no particular order, ready for submission.
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes.values().cloned().collect()
    }

    /// Inserts a `(key, value)` leaf.
    pub fn add(&mut self, key: Hash, value: Hash) -> Result<(), TreeError> {
        let leaf = Node::leaf(key, value)?;
        let root = self.root;
        self.root = self.add_leaf(leaf, root, 0, &key)?;
        Ok(())
    }

    fn store(&mut self, node: Node) -> Hash {
        let hash = node.hash;
        self.nodes.insert(hash, node);
        hash
    }

    fn add_leaf(
        &mut self,
        leaf: Node,
        at: Hash,
        lvl: usize,
        key: &Hash,
    ) -> Result<Hash, TreeError> {
        if lvl > self.max_levels - 1 {
            return Err(TreeError::MaxLevel);
        }
        if at.is_zero() {
            return Ok(self.store(leaf));
        }
        let resident = self.nodes.get(&at).ok_or(TreeError::Corrupted)?.clone();
        match resident.node_type() {
            NodeType::Leaf => {
                if resident.children[0] == *key {
                    return Err(TreeError::KeyExists);
                }
                self.push_leaf(leaf, &resident, lvl, key)
            }
            NodeType::Middle => {
                let middle = if key.bit(lvl) {
                    let next = self.add_leaf(leaf, resident.children[1], lvl + 1, key)?;
                    Node::middle(resident.children[0], next)?
                } else {
                    let next = self.add_leaf(leaf, resident.children[0], lvl + 1, key)?;
                    Node::middle(next, resident.children[1])?
                };
                Ok(self.store(middle))
            }
            _ => Err(TreeError::Corrupted),
        }
    }

    // Pushes an existing leaf down until its path and the new key's path
    // diverge, then hangs both leaves off one middle node.
    fn push_leaf(
        &mut self,
        leaf: Node,
        resident: &Node,
        lvl: usize,
        key: &Hash,
    ) -> Result<Hash, TreeError> {
        if lvl > self.max_levels - 2 {
            return Err(TreeError::MaxLevel);
        }
        let resident_key = resident.children[0];
        if key.bit(lvl) == resident_key.bit(lvl) {
            let next = self.push_leaf(leaf, resident, lvl + 1, key)?;
            let middle = if key.bit(lvl) {
                Node::middle(Hash::ZERO, next)?
            } else {
                Node::middle(next, Hash::ZERO)?
            };
            return Ok(self.store(middle));
        }
        let middle = if key.bit(lvl) {
            Node::middle(resident.hash, leaf.hash)?
        } else {
            Node::middle(leaf.hash, resident.hash)?
        };
        self.store(leaf);
        Ok(self.store(middle))
    }
}

impl NodeResolver for MemoryTree {
    async fn node_by_hash(&self, hash: &Hash) -> Result<Node, ClientError> {
        self.nodes.get(hash).cloned().ok_or(ClientError::NotFound)
    }
}
