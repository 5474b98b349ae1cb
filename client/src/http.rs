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

//! The HTTP client for a reverse hash service.

use crate::proof::{ClientError, NodeResolver};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use storage::hash::Hash;
use storage::node::Node;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A [`NodeResolver`] talking to a reverse hash service over HTTP.
#[derive(Clone, Debug)]
pub struct RhsClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct StatusEnvelope {
    status: String,
}

#[derive(Deserialize)]
struct NodeEnvelope {
    node: Node,
}

impl RhsClient {
    /// A client for the service at `base_url`, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        RhsClient {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Submits a batch of nodes, all-or-nothing from the caller's view.
    pub async fn submit_nodes(&self, nodes: &[Node]) -> Result<(), ClientError> {
        let response = self
            .http
            .post(format!("{}/node", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .json(nodes)
            .send()
            .await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::UnexpectedResponse(format!(
                "submit returned {status}: {body}"
            )));
        }
        Ok(())
    }
}

impl NodeResolver for RhsClient {
    async fn node_by_hash(&self, hash: &Hash) -> Result<Node, ClientError> {
        let response = self
            .http
            .get(format!("{}/node/{}", self.base_url, hash))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => {
                let envelope: StatusEnvelope = response.json().await?;
                if envelope.status == "not found" {
                    Err(ClientError::NotFound)
                } else {
                    Err(ClientError::UnexpectedResponse(format!(
                        "404 with status {:?}",
                        envelope.status
                    )))
                }
            }
            StatusCode::OK => {
                let envelope: NodeEnvelope = response.json().await?;
                let node = envelope.node;
                // The service is untrusted; hold the response to its own
                // content address before using it.
                if node.hash != *hash {
                    return Err(ClientError::UnexpectedResponse(format!(
                        "asked for node {hash}, got {}",
                        node.hash
                    )));
                }
                node.validate()?;
                Ok(node)
            }
            status => Err(ClientError::UnexpectedResponse(format!(
                "lookup returned {status}"
            ))),
        }
    }
}
