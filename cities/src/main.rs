// Airbase
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Entry point to the cities service.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

use airbase_cities::db::init_schema;
use airbase_cities::{DbOptions, ServerOptions, serve};
use log::error;
use std::process;

/// Prefix of all environment variables that configure the service.
const ENV_PREFIX: &str = "AIRBASE";

/// Gathers the configuration, prepares the database and runs the server until shutdown.
async fn run() -> Result<(), String> {
    let server_opts = ServerOptions::from_env(ENV_PREFIX)?;
    let db_opts = DbOptions::from_env(ENV_PREFIX)?;

    let db =
        db_opts.connect().await.map_err(|e| format!("Failed to connect to database: {}", e))?;
    let schema_result = match db.ex().await {
        Ok(mut ex) => init_schema(&mut ex).await,
        Err(e) => Err(e),
    };
    if let Err(e) = schema_result {
        db.close().await;
        return Err(format!("Failed to initialize database schema: {}", e));
    }

    serve(server_opts.socket_addr(), db).await.map_err(|e| format!("Server failed: {}", e))
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        error!("{}", e);
        process::exit(1);
    }
}
