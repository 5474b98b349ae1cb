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
use clap::Parser;

use midnight_rhs_server::server;
use std::path::PathBuf;
use std::sync::Arc;
use storage::SqlStorage;
use tracing::{Level, info};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, Registry};

#[derive(Parser, Debug)]
struct Args {
    /// SQLite database file backing the node store.
    #[arg(long, default_value = "rhs.db", env = "RHS_DB")]
    db: PathBuf,
    #[arg(long, default_value = "0.0.0.0:8080", env = "RHS_LISTEN_ADDR")]
    listen_addr: String,
    #[arg(short, long, env = "RHS_VERBOSE")]
    verbose: bool,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let storage = SqlStorage::file(&args.db).map_err(std::io::Error::other)?;

    let (srv, port) = server(&args.listen_addr, Arc::new(storage))?;
    info!("Listening on {} (port {port})", args.listen_addr);
    srv.await
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    Registry::default()
        .with(tracing_subscriber::fmt::layer().with_filter(Targets::new().with_default(level)))
        .try_init()
        .ok();
}
