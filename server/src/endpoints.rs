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

//! Request handlers and their JSON envelopes.

use actix_web::error::BlockingError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError, get, post, web};
use serde::Serialize;
use storage::hash::Hash;
use storage::node::Node;
use storage::{NodeStorage, StorageError};
use thiserror::Error;
use tracing::error;

/// An error already shaped for the wire.
///
/// Validation problems carry a precise caller-visible message; backend
/// problems are logged here and surfaced opaquely.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request is malformed or carries an invalid node.
    #[error("{0}")]
    BadRequest(String),
    /// No node under the requested hash.
    #[error("node not found")]
    NotFound,
    /// The backend failed; details are in the log.
    #[error("internal error")]
    Internal,
}

#[derive(Serialize)]
struct StatusBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    error: String,
}

#[derive(Serialize)]
struct NodeBody {
    status: &'static str,
    node: Node,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::BadRequest(message) => HttpResponse::BadRequest().json(ErrorBody {
                status: "error",
                error: message.clone(),
            }),
            ApiError::NotFound => HttpResponse::NotFound().json(StatusBody {
                status: "not found",
            }),
            ApiError::Internal => HttpResponse::InternalServerError().json(ErrorBody {
                status: "error",
                error: self.to_string(),
            }),
        }
    }
}

fn storage_error(err: StorageError) -> ApiError {
    match err {
        StorageError::NotFound => ApiError::NotFound,
        StorageError::Node(e) => ApiError::BadRequest(e.to_string()),
        e => {
            error!("storage failure: {e}");
            ApiError::Internal
        }
    }
}

fn blocking_error(err: BlockingError) -> ApiError {
    error!("blocking pool failure: {err}");
    ApiError::Internal
}

/// Liveness probe.
#[get("/ping")]
pub(crate) async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(StatusBody { status: "OK" })
}

/// Serves a stored node by its hex hash.
#[get("/node/{hash}")]
pub(crate) async fn node_by_hash(
    storage: web::Data<dyn NodeStorage>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let hash = Hash::from_hex(&path).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let storage = storage.into_inner();
    let node = web::block(move || storage.by_hash(&hash))
        .await
        .map_err(blocking_error)?
        .map_err(storage_error)?;
    Ok(HttpResponse::Ok().json(NodeBody {
        status: "OK",
        node,
    }))
}

/// Accepts a batch of nodes.
///
/// The whole batch is validated up front so the error can name the first
/// offending node by its 1-based position; only then does anything reach the
/// store.
#[post("/node")]
pub(crate) async fn submit_nodes(
    storage: web::Data<dyn NodeStorage>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let nodes: Vec<Node> =
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    for (i, node) in nodes.iter().enumerate() {
        node.validate()
            .map_err(|e| ApiError::BadRequest(format!("error parsing node #{}: {e}", i + 1)))?;
    }
    let storage = storage.into_inner();
    web::block(move || storage.save_nodes(&nodes))
        .await
        .map_err(blocking_error)?
        .map_err(storage_error)?;
    Ok(HttpResponse::Ok().json(StatusBody { status: "OK" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use actix_web::test::{TestRequest, call_service, init_service};
    use actix_web::{App, web::Data};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Arc;
    use storage::InMemoryStorage;

    // A storage that can be told to fail, for exercising the 500 path.
    struct FlakyStorage {
        nodes: HashMap<Hash, Node>,
        failing: Vec<Hash>,
    }

    impl NodeStorage for FlakyStorage {
        fn save_nodes(&self, _nodes: &[Node]) -> Result<(), StorageError> {
            unimplemented!("lookup-only mock")
        }

        fn by_hash(&self, hash: &Hash) -> Result<Node, StorageError> {
            if self.failing.contains(hash) {
                return Err(StorageError::Sql(rusqlite::Error::QueryReturnedNoRows));
            }
            self.nodes.get(hash).cloned().ok_or(StorageError::NotFound)
        }
    }

    fn make_node(hash: &str, children: &[&str]) -> Node {
        Node {
            hash: Hash::from_hex(hash).unwrap(),
            children: children.iter().map(|c| Hash::from_hex(c).unwrap()).collect(),
        }
    }

    const MIDDLE_HASH: &str = "2c32381aebce52c0c5c5a1fb92e726f66d977b58a1c8a0c14bb31ef968187325";
    const LEAF_HASH: &str = "658c7a65594ebb0815e1cc20f54284ccdb51bb1625f103c116ce58444145381e";
    const RIGHT_HASH: &str = "e809a4ed2cf98922910e456f1e56862bb958777f5ff0ea6799360113257f220f";
    const FAILING_HASH: &str =
        "11111111114ebb0815e1cc20f54284ccdb51bb1625f103c116ce58444145381e";

    fn lookup_fixture() -> FlakyStorage {
        let middle = make_node(MIDDLE_HASH, &[LEAF_HASH, RIGHT_HASH]);
        let leaf = make_node(
            LEAF_HASH,
            &[
                "037c4d7bbb0407b8000000000000000000000000000000000000000000000000",
                "0000000000000000000000000000000000000000000000000000000000000000",
                "0100000000000000000000000000000000000000000000000000000000000000",
            ],
        );
        FlakyStorage {
            nodes: HashMap::from([(middle.hash, middle), (leaf.hash, leaf)]),
            failing: vec![Hash::from_hex(FAILING_HASH).unwrap()],
        }
    }

    async fn get_json(
        storage: Arc<dyn NodeStorage>,
        path: &str,
    ) -> (StatusCode, Value) {
        let app = init_service(
            App::new()
                .app_data(Data::from(storage))
                .service(ping)
                .service(node_by_hash)
                .service(submit_nodes),
        )
        .await;
        let response = call_service(&app, TestRequest::get().uri(path).to_request()).await;
        let status = response.status();
        let body = to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[actix_web::test]
    async fn lookup_returns_middle_node() {
        let (status, body) =
            get_json(Arc::new(lookup_fixture()), &format!("/node/{MIDDLE_HASH}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "status": "OK",
                "node": {
                    "hash": MIDDLE_HASH,
                    "children": [LEAF_HASH, RIGHT_HASH]
                }
            })
        );
    }

    #[actix_web::test]
    async fn lookup_returns_leaf_node() {
        let (status, body) =
            get_json(Arc::new(lookup_fixture()), &format!("/node/{LEAF_HASH}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["node"]["children"].as_array().unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn lookup_of_unknown_hash_is_not_found() {
        let (status, body) = get_json(
            Arc::new(lookup_fixture()),
            "/node/00000000004ebb0815e1cc20f54284ccdb51bb1625f103c116ce58444145381e",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"status": "not found"}));
    }

    #[actix_web::test]
    async fn lookup_backend_failure_is_opaque() {
        let (status, body) =
            get_json(Arc::new(lookup_fixture()), &format!("/node/{FAILING_HASH}")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"status": "error", "error": "internal error"}));
    }

    #[actix_web::test]
    async fn lookup_rejects_malformed_hex() {
        let (status, body) = get_json(Arc::new(lookup_fixture()), "/node/123abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, _) = get_json(
            Arc::new(lookup_fixture()),
            "/node/zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn submit_points_at_the_first_invalid_node() {
        let storage: Arc<dyn NodeStorage> = Arc::new(InMemoryStorage::default());
        let app = init_service(
            App::new()
                .app_data(Data::from(storage))
                .service(submit_nodes),
        )
        .await;

        // Second node's hash has its last nibble flipped.
        let body = json!([
            {
                "hash": MIDDLE_HASH,
                "children": [LEAF_HASH, RIGHT_HASH]
            },
            {
                "hash": "658c7a65594ebb0815e1cc20f54284ccdb51bb1625f103c116ce58444145381f",
                "children": [
                    "037c4d7bbb0407b8000000000000000000000000000000000000000000000000",
                    "0000000000000000000000000000000000000000000000000000000000000000",
                    "0100000000000000000000000000000000000000000000000000000000000000"
                ]
            }
        ]);
        let response = call_service(
            &app,
            TestRequest::post()
                .uri("/node")
                .set_json(&body)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body()).await.unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({
                "status": "error",
                "error": "error parsing node #2: node hash is not correct"
            })
        );
    }
}
