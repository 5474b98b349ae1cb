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
#![deny(warnings)]
//! The reverse hash service: tree nodes in, tree nodes out, keyed by hash.

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use std::sync::Arc;
use storage::NodeStorage;

use crate::endpoints::{node_by_hash, ping, submit_nodes};

pub mod endpoints;

/// Builds the HTTP server on `listen_addr` and returns it with the bound
/// port. Binding port 0 picks a free port, which tests rely on.
///
/// Requests are handled on independent tasks; the storage handle is the only
/// thing they share. Shutdown drains in-flight requests for up to 10 s.
pub fn server(
    listen_addr: &str,
    storage: Arc<dyn NodeStorage>,
) -> std::io::Result<(Server, u16)> {
    let http_server = HttpServer::new(move || {
        App::new()
            .app_data(Data::from(storage.clone()))
            .service(ping)
            .service(node_by_hash)
            .service(submit_nodes)
            .wrap(Logger::new("%a %r; took %Ts"))
            .wrap(cors())
    })
    .shutdown_timeout(10)
    .bind(listen_addr)?;
    let port = http_server.addrs()[0].port();
    let srv = http_server.run();
    Ok((srv, port))
}

// Browser verifiers fetch nodes from anywhere; the API is public by design.
fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec!["Accept", "Content-Type", "X-CSRF-Token"])
        .max_age(300)
}
