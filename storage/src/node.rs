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

//! The node model and its hash-integrity contract.

use crate::hash::{Hash, poseidon_hash};
use light_poseidon::PoseidonError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The largest children list a node may carry.
pub const MAX_CHILDREN: usize = 16;

/// A tree node: a hash and the children it commits to.
///
/// The store does not distinguish node variants; consumers classify by arity
/// with [`Node::node_type`]. A middle node has two children `(left, right)`,
/// a leaf three `(key, value, 1)`, an identity state three with a different
/// trailing element.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Node {
    /// The Poseidon hash of `children`, the node's identity.
    pub hash: Hash,
    /// Child hashes in submission order.
    #[serde(default)]
    pub children: Vec<Hash>,
}

/// Semantic node variant, inferred from the children list.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NodeType {
    /// `(left, right)` of a sparse Merkle tree.
    Middle,
    /// `(key, value, 1)`.
    Leaf,
    /// An identity state triple `(claims_root, revocation_root, roots_root)`.
    State,
    /// Any other arity.
    Unknown,
}

/// A node that fails its integrity contract.
#[derive(Debug, Error)]
pub enum NodeError {
    /// The hash does not match the Poseidon hash of the children.
    #[error("node hash is not correct")]
    IncorrectHash,
    /// The zero hash is reserved for the empty subtree.
    #[error("hash cannot be zero")]
    ZeroHash,
    /// The children list exceeds [`MAX_CHILDREN`].
    #[error("node has {0} children, at most {MAX_CHILDREN} are supported")]
    TooManyChildren(usize),
    /// The Poseidon parameter set does not cover this arity.
    #[error(transparent)]
    Poseidon(#[from] PoseidonError),
}

impl Node {
    /// A leaf node `(key, value, 1)`.
    pub fn leaf(key: Hash, value: Hash) -> Result<Self, NodeError> {
        let children = vec![key, value, Hash::ONE];
        Ok(Node {
            hash: Self::hash_children(&children)?,
            children,
        })
    }

    /// A middle node `(left, right)`.
    pub fn middle(left: Hash, right: Hash) -> Result<Self, NodeError> {
        let children = vec![left, right];
        Ok(Node {
            hash: Self::hash_children(&children)?,
            children,
        })
    }

    /// The Poseidon hash of a children list; the zero hash for an empty one.
    pub fn hash_children(children: &[Hash]) -> Result<Hash, NodeError> {
        if children.is_empty() {
            return Ok(Hash::ZERO);
        }
        if children.len() > MAX_CHILDREN {
            return Err(NodeError::TooManyChildren(children.len()));
        }
        let elems: Vec<_> = children.iter().map(Hash::to_fr).collect();
        Ok(Hash::from_fr(&poseidon_hash(&elems)?))
    }

    /// Checks the hash-integrity contract: the hash must equal the Poseidon
    /// hash of the children and must not be the reserved zero hash.
    pub fn validate(&self) -> Result<(), NodeError> {
        if Self::hash_children(&self.children)? != self.hash {
            return Err(NodeError::IncorrectHash);
        }
        if self.hash.is_zero() {
            return Err(NodeError::ZeroHash);
        }
        Ok(())
    }

    /// Classifies the node by arity.
    pub fn node_type(&self) -> NodeType {
        match self.children.len() {
            2 => NodeType::Middle,
            3 if self.children[2] == Hash::ONE => NodeType::Leaf,
            3 => NodeType::State,
            _ => NodeType::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Fr;
    use std::str::FromStr;

    fn hash_from_int(s: &str) -> Hash {
        Hash::from_fr(&Fr::from_str(s).unwrap())
    }

    fn make_node(hash: &str, children: &[&str]) -> Node {
        Node {
            hash: hash_from_int(hash),
            children: children.iter().map(|c| hash_from_int(c)).collect(),
        }
    }

    #[test]
    fn hash_children_matches_known_values() {
        let cases = [
            // both children non-zero
            make_node(
                "16938931282012536952003457515784019977456394464750325752202529629073057526316",
                &[
                    "13668806873217811193138343672265398727158334092717678918544074543040898436197",
                    "6845643050256962634421298815823256099092239904213746305198440125223303121384",
                ],
            ),
            // left child zero
            make_node(
                "387517862079401946799376409801990709903441669470895093924339414901271074750",
                &[
                    "0",
                    "16938931282012536952003457515784019977456394464750325752202529629073057526316",
                ],
            ),
            // leaf
            make_node(
                "13668806873217811193138343672265398727158334092717678918544074543040898436197",
                &["13260572831089785859", "0", "1"],
            ),
        ];
        for node in cases {
            assert_eq!(Node::hash_children(&node.children).unwrap(), node.hash);
            node.validate().unwrap();
        }
    }

    #[test]
    fn hash_children_of_nothing_is_zero() {
        assert_eq!(Node::hash_children(&[]).unwrap(), Hash::ZERO);
    }

    #[test]
    fn validate_rejects_incorrect_hash() {
        let node = make_node(
            "13668806873217811193138343672265398727158334092717678918544074543040898436198",
            &["13260572831089785859", "0", "1"],
        );
        let err = node.validate().unwrap_err();
        assert!(matches!(err, NodeError::IncorrectHash));
        assert_eq!(err.to_string(), "node hash is not correct");
    }

    #[test]
    fn validate_rejects_zero_hash() {
        // An empty children list hashes to zero, so the hashes agree and the
        // zero-hash rule is what rejects the node.
        let node = Node {
            hash: Hash::ZERO,
            children: vec![],
        };
        let err = node.validate().unwrap_err();
        assert!(matches!(err, NodeError::ZeroHash));
        assert_eq!(err.to_string(), "hash cannot be zero");

        // A zero hash over a non-empty children list is a plain mismatch.
        let node = Node {
            hash: Hash::ZERO,
            children: vec![Hash::from(1u64), Hash::from(2u64)],
        };
        assert!(matches!(node.validate(), Err(NodeError::IncorrectHash)));
    }

    #[test]
    fn hash_children_rejects_oversized_lists() {
        let children = vec![Hash::from(1u64); MAX_CHILDREN + 1];
        assert!(matches!(
            Node::hash_children(&children),
            Err(NodeError::TooManyChildren(17))
        ));
    }

    #[test]
    fn json_decoding() {
        let node: Node = serde_json::from_str(
            r#"{
  "hash": "2c32381aebce52c0c5c5a1fb92e726f66d977b58a1c8a0c14bb31ef968187325",
  "children": [
    "658c7a65594ebb0815e1cc20f54284ccdb51bb1625f103c116ce58444145381e",
    "e809a4ed2cf98922910e456f1e56862bb958777f5ff0ea6799360113257f220f"
  ]
}"#,
        )
        .unwrap();
        let want = make_node(
            "16938931282012536952003457515784019977456394464750325752202529629073057526316",
            &[
                "13668806873217811193138343672265398727158334092717678918544074543040898436197",
                "6845643050256962634421298815823256099092239904213746305198440125223303121384",
            ],
        );
        assert_eq!(node, want);
        assert_eq!(node.node_type(), NodeType::Middle);

        let leaf: Node = serde_json::from_str(
            r#"{
  "hash": "658c7a65594ebb0815e1cc20f54284ccdb51bb1625f103c116ce58444145381e",
  "children": [
    "037c4d7bbb0407b8000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "0100000000000000000000000000000000000000000000000000000000000000"
  ]
}"#,
        )
        .unwrap();
        assert_eq!(
            leaf,
            make_node(
                "13668806873217811193138343672265398727158334092717678918544074543040898436197",
                &["13260572831089785859", "0", "1"],
            )
        );
        assert_eq!(leaf.node_type(), NodeType::Leaf);
        leaf.validate().unwrap();
    }

    #[test]
    fn json_decoding_without_children() {
        let node: Node = serde_json::from_str(
            r#"{"hash": "0100000000000000000000000000000000000000000000000000000000000000"}"#,
        )
        .unwrap();
        assert!(node.children.is_empty());
        assert!(matches!(node.validate(), Err(NodeError::IncorrectHash)));
    }

    #[test]
    fn json_encoding() {
        let node = make_node(
            "13668806873217811193138343672265398727158334092717678918544074543040898436197",
            &["13260572831089785859", "0", "1"],
        );
        let encoded = serde_json::to_value(&node).unwrap();
        let want: serde_json::Value = serde_json::from_str(
            r#"{
  "hash": "658c7a65594ebb0815e1cc20f54284ccdb51bb1625f103c116ce58444145381e",
  "children": [
    "037c4d7bbb0407b8000000000000000000000000000000000000000000000000",
    "0000000000000000000000000000000000000000000000000000000000000000",
    "0100000000000000000000000000000000000000000000000000000000000000"
  ]
}"#,
        )
        .unwrap();
        assert_eq!(encoded, want);
    }

    #[test]
    fn state_nodes_are_not_leaves() {
        let state = Node {
            children: vec![Hash::ZERO, Hash::from(7u64), Hash::ZERO],
            hash: Node::hash_children(&[Hash::ZERO, Hash::from(7u64), Hash::ZERO]).unwrap(),
        };
        assert_eq!(state.node_type(), NodeType::State);
    }
}
