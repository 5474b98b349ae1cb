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

#![deny(unreachable_pub)]
#![deny(missing_docs)]
//! A database of content-addressed sparse Merkle tree nodes.
//!
//! Nodes are keyed by their Poseidon hash over the BN254 scalar field, so a
//! row can never change its payload without invalidating its key. The store
//! accepts batches of nodes, deduplicates re-submissions, and serves nodes
//! back by hash for proof reconstruction.

pub mod db;
pub mod hash;
pub mod node;

pub use db::{InMemoryStorage, NodeStorage, SqlStorage, StorageError};
pub use hash::Hash;
pub use node::{Node, NodeError, NodeType};
