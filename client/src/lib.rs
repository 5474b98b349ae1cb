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
//! Client-side proof generation against a reverse hash service.
//!
//! The service only answers `ByHash` lookups; everything else happens here.
//! [`generate_proof`] walks a sparse Merkle tree from its root through remote
//! lookups alone and reconstructs an existence or non-existence proof, which
//! [`Proof::root`] can fold back up to verify against a claimed root.

pub mod http;
pub mod proof;
pub mod test_utilities;

pub use http::RhsClient;
pub use proof::{
    ClientError, NodeAux, NodeResolver, Proof, ProofError, generate_proof, revocation_tree_root,
};
