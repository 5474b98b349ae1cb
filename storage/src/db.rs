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

//! The content-addressed node store.

mod sql;
pub use sql::{INSERT_CHUNK_SIZE, SqlStorage};

use crate::hash::Hash;
use crate::node::{Node, NodeError};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// A store failure, either a violated node contract or a backend problem.
///
/// The backend variants are retryable at a higher layer; the node variants
/// are caller bugs and surface as bad requests.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No node with the requested hash.
    #[error("node does not exist")]
    NotFound,
    /// A node in the batch violates the integrity contract.
    #[error(transparent)]
    Node(#[from] NodeError),
    /// The database rejected an operation.
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),
    /// No connection could be borrowed from the pool.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// Persistence for tree nodes keyed by their hash.
///
/// Both operations are idempotent: a node's children are immutable once
/// committed, and re-submitting an already-stored hash is a no-op whatever
/// children accompany it.
pub trait NodeStorage: Send + Sync {
    /// Persists a batch of nodes.
    ///
    /// Every node is validated before anything is written, so a batch with an
    /// invalid node leaves the store unchanged. Large batches are committed
    /// in chunks; a backend failure can leave earlier chunks committed.
    fn save_nodes(&self, nodes: &[Node]) -> Result<(), StorageError>;

    /// Looks up a node by hash, children in submission order.
    fn by_hash(&self, hash: &Hash) -> Result<Node, StorageError>;
}

/// An in-memory store with the same semantics as [`SqlStorage`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryStorage {
    nodes: Arc<Mutex<HashMap<Hash, Vec<Hash>>>>,
}

impl InMemoryStorage {
    fn lock_nodes(&self) -> MutexGuard<'_, HashMap<Hash, Vec<Hash>>> {
        self.nodes.lock().expect("store lock poisoned")
    }
}

impl NodeStorage for InMemoryStorage {
    fn save_nodes(&self, nodes: &[Node]) -> Result<(), StorageError> {
        for node in nodes {
            node.validate()?;
        }
        let mut stored = self.lock_nodes();
        for node in nodes {
            if let Entry::Vacant(entry) = stored.entry(node.hash) {
                entry.insert(node.children.clone());
            }
        }
        Ok(())
    }

    fn by_hash(&self, hash: &Hash) -> Result<Node, StorageError> {
        let children = self
            .lock_nodes()
            .get(hash)
            .cloned()
            .ok_or(StorageError::NotFound)?;
        Ok(Node {
            hash: *hash,
            children,
        })
    }
}
