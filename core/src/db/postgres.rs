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

//! PostgreSQL backend.

use crate::db::{BackendExecutor, DbError, DbResult, Executor, PooledDb, classify_sqlx_error};
use crate::env::{get_optional_var, get_required_var};
use derivative::Derivative;
use regex::Regex;
use sqlx::error::DatabaseError;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, Postgres};
use std::time::Duration;

/// Maximum time to wait for a connection from the pool before reporting `DbError::Unavailable`.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

/// Executor for PostgreSQL connections.
pub type PostgresExecutor = BackendExecutor<Postgres>;

/// Database backed by a pool of PostgreSQL connections.
pub type PostgresDb = PooledDb<Postgres>;

/// Interprets the SQLSTATE codes we care about.
fn classify(e: &dyn DatabaseError) -> Option<DbError> {
    match e.code()?.as_ref() {
        "23505" => Some(DbError::AlreadyExists(e.message().to_owned())),
        "53300" => Some(DbError::Unavailable),
        code => Some(DbError::BackendError(format!("pgsql error {}: {}", code, e.message()))),
    }
}

/// Converts a PostgreSQL `sqlx` error into a `DbError`.
///
/// Unique violations (23505) become `DbError::AlreadyExists` and running out of server
/// connections (53300) becomes `DbError::Unavailable`.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    classify_sqlx_error(e, classify)
}

crate::db::impl_pooled_db!(Postgres, Executor::Postgres, map_sqlx_error);

/// Connection settings for a PostgreSQL server.
#[derive(Derivative)]
#[derivative(Debug, Default, PartialEq)]
pub struct PostgresOptions {
    /// Server hostname or address.
    pub host: String,

    /// Server port, usually 5432.
    pub port: u16,

    /// Name of the database to use.
    pub database: String,

    /// Role to log in as.
    pub username: String,

    /// Password for `username`.  Without one, authentication falls back to whatever the server
    /// or the client environment permit, such as `trust` rules or a `.pgpass` file.
    #[derivative(Debug = "ignore")]
    pub password: Option<String>,

    /// Connections the pool keeps open even when idle.
    pub min_connections: Option<u32>,

    /// Upper bound on the connections the pool opens.
    pub max_connections: Option<u32>,
}

impl PostgresOptions {
    /// Reads the settings from the `<prefix>_HOST`, `<prefix>_PORT`, `<prefix>_DATABASE` and
    /// `<prefix>_USERNAME` variables, which are required, and from the optional
    /// `<prefix>_PASSWORD`, `<prefix>_MIN_CONNECTIONS` and `<prefix>_MAX_CONNECTIONS`.
    pub fn from_env(prefix: &str) -> Result<PostgresOptions, String> {
        Ok(PostgresOptions {
            host: get_required_var(prefix, "HOST")?,
            port: get_required_var(prefix, "PORT")?,
            database: get_required_var(prefix, "DATABASE")?,
            username: get_required_var(prefix, "USERNAME")?,
            password: get_optional_var(prefix, "PASSWORD")?,
            min_connections: get_optional_var(prefix, "MIN_CONNECTIONS")?,
            max_connections: get_optional_var(prefix, "MAX_CONNECTIONS")?,
        })
    }

    /// Translates these settings into the `sqlx` connection options.
    fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username);
        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }

    /// Translates these settings into the `sqlx` pool options.
    fn pool_options(&self) -> PgPoolOptions {
        let mut pool = PgPoolOptions::new().acquire_timeout(ACQUIRE_TIMEOUT);
        if let Some(n) = self.min_connections {
            pool = pool.min_connections(n);
        }
        if let Some(n) = self.max_connections {
            pool = pool.max_connections(n);
        }
        pool
    }
}

impl PooledDb<Postgres> {
    /// Creates a pool for the server described by `opts`.
    ///
    /// Connections are opened on first use, so an unreachable server is only reported once the
    /// pool is first used.
    pub fn connect(opts: PostgresOptions) -> DbResult<Self> {
        let pool = opts.pool_options().connect_lazy_with(opts.connect_options());
        Ok(Self::from_pool(pool))
    }
}

/// Runs every statement in `schema`, one at a time.
///
/// Statements are separated by semicolons, which therefore cannot appear in `--` comments.
pub async fn run_schema(ex: &mut PostgresExecutor, schema: &str) -> DbResult<()> {
    let comment = Regex::new(r"(?m)--.*$").map_err(|e| DbError::BackendError(e.to_string()))?;
    let schema = comment.replace_all(schema, "");
    let statements = schema.split(';').map(str::trim).filter(|stmt| !stmt.is_empty());
    for stmt in statements {
        sqlx::query(stmt).execute(ex.conn()).await.map_err(map_sqlx_error)?;
    }
    Ok(())
}

/// Helpers to test against a real server.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Connects to the server configured in the `PGSQL_TEST_*` variables.
    ///
    /// The pool holds exactly one connection whose `search_path` points at `pg_temp`, which makes
    /// every table created by the test private to it and gone once the pool closes.
    pub async fn setup() -> PostgresDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();

        let opts = PostgresOptions {
            min_connections: Some(1),
            max_connections: Some(1),
            ..PostgresOptions::from_env("PGSQL_TEST").unwrap()
        };
        let db = PostgresDb::connect(opts).unwrap();

        let mut ex = db.typed_ex().await.unwrap();
        sqlx::query("SET search_path TO pg_temp").execute(ex.conn()).await.unwrap();
        db
    }
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use super::*;
    use crate::db::Db;
    use crate::db::tests::generate_db_tests;
    use std::sync::Arc;

    generate_db_tests!(
        Arc::new(setup().await),
        #[ignore = "Requires a PostgreSQL server configured via PGSQL_TEST_*"]
    );

    /// Complete set of variables for the `AIRPG` prefix.
    const ALL_VARS: [(&str, Option<&str>); 7] = [
        ("AIRPG_HOST", Some("db.internal")),
        ("AIRPG_PORT", Some("6432")),
        ("AIRPG_DATABASE", Some("airbase")),
        ("AIRPG_USERNAME", Some("airbase_rw")),
        ("AIRPG_PASSWORD", Some("hunter2")),
        ("AIRPG_MIN_CONNECTIONS", Some("2")),
        ("AIRPG_MAX_CONNECTIONS", Some("16")),
    ];

    /// Returns `ALL_VARS` with the variables in `unset` removed.
    fn vars_without(unset: &[&str]) -> Vec<(&'static str, Option<&'static str>)> {
        ALL_VARS
            .iter()
            .map(|(name, value)| (*name, if unset.contains(name) { None } else { *value }))
            .collect()
    }

    #[test]
    fn test_options_from_env_everything_set() {
        temp_env::with_vars(ALL_VARS, || {
            assert_eq!(
                PostgresOptions {
                    host: "db.internal".to_owned(),
                    port: 6432,
                    database: "airbase".to_owned(),
                    username: "airbase_rw".to_owned(),
                    password: Some("hunter2".to_owned()),
                    min_connections: Some(2),
                    max_connections: Some(16),
                },
                PostgresOptions::from_env("AIRPG").unwrap()
            );
        });
    }

    #[test]
    fn test_options_from_env_optional_unset() {
        let vars =
            vars_without(&["AIRPG_PASSWORD", "AIRPG_MIN_CONNECTIONS", "AIRPG_MAX_CONNECTIONS"]);
        temp_env::with_vars(vars, || {
            let opts = PostgresOptions::from_env("AIRPG").unwrap();
            assert_eq!("db.internal", opts.host);
            assert_eq!(None, opts.password);
            assert_eq!(None, opts.min_connections);
            assert_eq!(None, opts.max_connections);
        });
    }

    #[test]
    fn test_options_from_env_required_unset() {
        for name in ["AIRPG_HOST", "AIRPG_PORT", "AIRPG_DATABASE", "AIRPG_USERNAME"] {
            temp_env::with_vars(vars_without(&[name]), || {
                let err = PostgresOptions::from_env("AIRPG").unwrap_err();
                assert_eq!(format!("Required environment variable {} not present", name), err);
            });
        }
    }

    #[test]
    fn test_options_from_env_bad_number() {
        let mut vars = vars_without(&[]);
        for var in vars.iter_mut().filter(|(name, _)| *name == "AIRPG_MAX_CONNECTIONS") {
            var.1 = Some("lots");
        }
        temp_env::with_vars(vars, || {
            let err = PostgresOptions::from_env("AIRPG").unwrap_err();
            assert!(err.contains("'lots'"), "Unexpected error: {}", err);
            assert!(err.contains("AIRPG_MAX_CONNECTIONS"), "Unexpected error: {}", err);
        });
    }

    #[test]
    fn test_options_debug_hides_password() {
        let opts = PostgresOptions {
            username: "airbase_rw".to_owned(),
            password: Some("hunter2".to_owned()),
            ..Default::default()
        };
        let debug = format!("{:?}", opts);
        assert!(debug.contains("airbase_rw"));
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    #[ignore = "Requires a PostgreSQL server configured via PGSQL_TEST_*"]
    async fn test_run_schema_and_unique_violation() {
        let db = setup().await;

        let mut ex = db.typed_ex().await.unwrap();
        let schema = "
            -- Codes are unique.
            CREATE TABLE gates (code TEXT UNIQUE NOT NULL);
            INSERT INTO gates (code) VALUES ('B12');
        ";
        run_schema(&mut ex, schema).await.unwrap();
        let err = sqlx::query("INSERT INTO gates (code) VALUES ('B12')")
            .execute(ex.conn())
            .await
            .map_err(map_sqlx_error)
            .unwrap_err();
        match err {
            DbError::AlreadyExists(msg) => assert!(msg.contains("gates"), "Bad message: {}", msg),
            e => panic!("Unexpected error: {:?}", e),
        }
        drop(ex);

        db.close().await;
    }
}
