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

//! Reconstructing Merkle proofs from `ByHash` lookups.

use serde::{Deserialize, Deserializer, Serialize};
use std::future::Future;
use storage::hash::Hash;
use storage::node::{Node, NodeError, NodeType};
use thiserror::Error;

/// The deepest descent the proof builder will attempt.
pub const MAX_TREE_DEPTH: usize = storage::hash::HASH_BYTES * 8;

/// A source of nodes by hash, usually a remote reverse hash service.
pub trait NodeResolver {
    /// Resolves a hash to the node it addresses.
    fn node_by_hash(
        &self,
        hash: &Hash,
    ) -> impl Future<Output = Result<Node, ClientError>> + Send;
}

/// Failure to resolve a node.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service does not know the hash.
    #[error("node not found")]
    NotFound,
    /// The service answered outside its wire contract.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    /// The transport failed.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
    /// The returned node does not satisfy its own content address.
    #[error("invalid node in response: {0}")]
    BadNode(#[from] NodeError),
}

/// Failure to build or verify a proof.
#[derive(Debug, Error)]
pub enum ProofError {
    /// The descent did not terminate within [`MAX_TREE_DEPTH`] levels.
    #[error("tree depth is too high")]
    TreeTooDeep,
    /// The descent hit a node that is neither a middle node nor a leaf.
    #[error("found unexpected node type in tree: {0}")]
    UnexpectedNode(Hash),
    /// A non-existence proof cannot carry an aux node for the queried key.
    #[error("non-existence proof checked against the aux node key")]
    AuxKeyMatches,
    /// The hash does not address an identity state node.
    #[error("node {0} is not an identity state: expected three children with a non-leaf tag")]
    NotAStateNode(Hash),
    /// A lookup failed.
    #[error(transparent)]
    Resolver(#[from] ClientError),
    /// Rehashing during verification failed.
    #[error(transparent)]
    Node(#[from] NodeError),
}

/// The leaf disproving membership in a non-existence proof: the `(key,
/// value)` of the leaf found where the queried key would live.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct NodeAux {
    /// The key of the leaf at the descent terminus.
    pub key: Hash,
    /// Its value.
    pub value: Hash,
}

/// An existence or non-existence proof for one key against one root.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Proof {
    /// Whether the key is present in the tree.
    pub existence: bool,
    /// Off-path siblings, one per middle node crossed, shallowest first.
    #[serde(default, deserialize_with = "nullable_siblings")]
    pub siblings: Vec<Hash>,
    /// For non-existence, the mismatching leaf at the terminus, if any.
    #[serde(
        rename = "aux_node",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub node_aux: Option<NodeAux>,
}

fn nullable_siblings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<Hash>, D::Error> {
    Ok(Option::<Vec<Hash>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Walks the tree under `root` towards `key` and reconstructs a proof from
/// remote lookups alone.
///
/// At depth `d` the `d`-th least significant bit of `key` selects the child
/// to follow (0 descends left); the other child is recorded as a sibling.
/// The walk ends at the zero hash (empty subtree), at a leaf, or with an
/// error after [`MAX_TREE_DEPTH`] levels.
pub async fn generate_proof<R: NodeResolver>(
    resolver: &R,
    root: Hash,
    key: Hash,
) -> Result<Proof, ProofError> {
    let mut siblings = Vec::new();
    let mut next = root;
    for depth in 0..MAX_TREE_DEPTH {
        if next.is_zero() {
            return Ok(Proof {
                existence: false,
                siblings,
                node_aux: None,
            });
        }
        let node = resolver.node_by_hash(&next).await?;
        match node.node_type() {
            NodeType::Leaf => {
                if node.children[0] == key {
                    return Ok(Proof {
                        existence: true,
                        siblings,
                        node_aux: None,
                    });
                }
                // A different leaf occupies the slot the key would live in.
                return Ok(Proof {
                    existence: false,
                    siblings,
                    node_aux: Some(NodeAux {
                        key: node.children[0],
                        value: node.children[1],
                    }),
                });
            }
            NodeType::Middle => {
                if key.bit(depth) {
                    siblings.push(node.children[0]);
                    next = node.children[1];
                } else {
                    siblings.push(node.children[1]);
                    next = node.children[0];
                }
            }
            _ => return Err(ProofError::UnexpectedNode(node.hash)),
        }
    }
    Err(ProofError::TreeTooDeep)
}

impl Proof {
    /// Folds the proof back up into the root it commits to.
    ///
    /// Starts from the leaf hash of `(key, value)` for existence, the aux
    /// leaf or the zero hash for non-existence, then absorbs siblings from
    /// the deepest up, with the key bit at each level choosing the operand
    /// order.
    pub fn root(&self, key: &Hash, value: &Hash) -> Result<Hash, ProofError> {
        if self.siblings.len() > MAX_TREE_DEPTH {
            return Err(ProofError::TreeTooDeep);
        }
        let mut acc = if self.existence {
            Node::leaf(*key, *value)?.hash
        } else {
            match &self.node_aux {
                None => Hash::ZERO,
                Some(aux) => {
                    if aux.key == *key {
                        return Err(ProofError::AuxKeyMatches);
                    }
                    Node::leaf(aux.key, aux.value)?.hash
                }
            }
        };
        for lvl in (0..self.siblings.len()).rev() {
            acc = if key.bit(lvl) {
                Node::middle(self.siblings[lvl], acc)?.hash
            } else {
                Node::middle(acc, self.siblings[lvl])?.hash
            };
        }
        Ok(acc)
    }

    /// Whether the proof is consistent with `root` for `(key, value)`.
    pub fn verify(&self, root: &Hash, key: &Hash, value: &Hash) -> bool {
        self.root(key, value).is_ok_and(|r| r == *root)
    }
}

/// Resolves an identity state hash to the revocation tree root it commits
/// to, the second element of the state triple.
pub async fn revocation_tree_root<R: NodeResolver>(
    resolver: &R,
    state: Hash,
) -> Result<Hash, ProofError> {
    let node = resolver.node_by_hash(&state).await?;
    if node.node_type() != NodeType::State {
        return Err(ProofError::NotAStateNode(state));
    }
    Ok(node.children[1])
}
