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

//! REST service to manage cities and the airports that serve them.

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

#[cfg(feature = "postgres")]
use airbase_core::db::postgres::{self, PostgresOptions};
#[cfg(feature = "sqlite")]
use airbase_core::db::sqlite;
use airbase_core::db::{Db, DbResult};
use airbase_core::env::get_optional_var;
use log::{info, warn};
use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

pub mod db;
mod driver;
use driver::Driver;
pub(crate) mod model;
mod rest;
use rest::app;

/// Default port to listen on when none is configured.
const DEFAULT_PORT: u16 = 8000;

/// Configuration of the listening socket.
#[derive(Debug, PartialEq)]
pub struct ServerOptions {
    /// Address to bind to.
    pub bind_addr: IpAddr,

    /// Port to listen on.
    pub port: u16,
}

impl ServerOptions {
    /// Initializes a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use the optional variables `<prefix>_BIND_ADDR` and `<prefix>_PORT`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            bind_addr: get_optional_var::<IpAddr>(prefix, "BIND_ADDR")?
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: get_optional_var::<u16>(prefix, "PORT")?.unwrap_or(DEFAULT_PORT),
        })
    }

    /// Returns the socket address described by these options.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

/// Configuration of the database backend.
#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub enum DbOptions {
    /// Connection details for a PostgreSQL server.
    #[cfg(feature = "postgres")]
    Postgres(PostgresOptions),

    /// Connection string for an SQLite database.
    #[cfg(feature = "sqlite")]
    Sqlite(String),
}

impl DbOptions {
    /// Initializes a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// SQLite is used if `<prefix>_SQLITE_URI` is set.  Otherwise, PostgreSQL is configured from
    /// the `<prefix>_PGSQL_*` variables.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        match get_optional_var::<String>(prefix, "SQLITE_URI")? {
            #[cfg(feature = "sqlite")]
            Some(uri) => Ok(DbOptions::Sqlite(uri)),

            #[cfg(not(feature = "sqlite"))]
            Some(_) => {
                Err(format!("{}_SQLITE_URI is set but SQLite support is not built in", prefix))
            }

            #[cfg(feature = "postgres")]
            None => {
                let opts = PostgresOptions::from_env(&format!("{}_PGSQL", prefix))?;
                Ok(DbOptions::Postgres(opts))
            }

            #[cfg(not(feature = "postgres"))]
            None => Err(format!("{}_SQLITE_URI is required without PostgreSQL support", prefix)),
        }
    }

    /// Establishes the connection to the configured database.
    pub async fn connect(self) -> DbResult<Arc<dyn Db + Send + Sync>> {
        match self {
            #[cfg(feature = "postgres")]
            DbOptions::Postgres(opts) => {
                info!("Using PostgreSQL database {} at {}:{}", opts.database, opts.host, opts.port);
                Ok(Arc::new(postgres::PostgresDb::connect(opts)?))
            }

            #[cfg(feature = "sqlite")]
            DbOptions::Sqlite(uri) => {
                info!("Using SQLite database {}", uri);
                Ok(Arc::new(sqlite::connect(&uri).await?))
            }
        }
    }
}

/// Waits until the user asks the server to terminate.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested; draining connections"),
        Err(e) => {
            warn!("Cannot listen for shutdown requests: {}", e);
            std::future::pending::<()>().await
        }
    }
}

/// Serves the application on `listener` backed by `db` until `shutdown` completes.
///
/// The database is closed once the server stops, regardless of the outcome.
async fn serve_until<F>(
    listener: TcpListener,
    db: Arc<dyn Db + Send + Sync>,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = app(Driver::new(db.clone()));
    let result = match listener.local_addr() {
        Ok(addr) => {
            info!("Listening on {}", addr);
            axum::serve(listener, app).with_graceful_shutdown(shutdown).await
        }
        Err(e) => Err(e),
    };
    db.close().await;
    result
}

/// Instantiates all resources to serve the application on `bind_addr` using `db`.
///
/// While it'd be nice to push this responsibility to `main`, doing so would force us to expose many
/// crate-internal types to the public, which in turn would make dead code detection harder.
pub async fn serve(
    bind_addr: impl Into<SocketAddr>,
    db: Arc<dyn Db + Send + Sync>,
) -> io::Result<()> {
    let listener = match TcpListener::bind(bind_addr.into()).await {
        Ok(listener) => listener,
        Err(e) => {
            db.close().await;
            return Err(e);
        }
    };
    serve_until(listener, db, shutdown_signal()).await
}
