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

//! SQLite backend.

use crate::db::{BackendExecutor, DbError, DbResult, Executor, PooledDb, classify_sqlx_error};
use sqlx::error::{DatabaseError, ErrorKind};
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

/// Executor for SQLite connections.
pub type SqliteExecutor = BackendExecutor<Sqlite>;

/// Database backed by a pool of SQLite connections.
pub type SqliteDb = PooledDb<Sqlite>;

/// Interprets the constraint violations reported by SQLite.
fn classify(e: &dyn DatabaseError) -> Option<DbError> {
    match e.kind() {
        ErrorKind::UniqueViolation => Some(DbError::AlreadyExists(e.message().to_owned())),
        _ => None,
    }
}

/// Converts an SQLite `sqlx` error into a `DbError`.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    classify_sqlx_error(e, classify)
}

crate::db::impl_pooled_db!(Sqlite, Executor::Sqlite, map_sqlx_error);

/// Returns true if `uri` names a database that only lives in memory.
fn is_in_memory(uri: &str) -> bool {
    uri == ":memory:" || uri.starts_with("sqlite::memory:") || uri.contains("mode=memory")
}

/// Opens a pool for the database at `uri`.
///
/// `uri` is either a file path, an `sqlite://` URI or `:memory:`.  Missing database files are
/// created.  In-memory databases vanish with their last connection, so their pools keep one
/// connection open until closed.
pub async fn connect(uri: &str) -> DbResult<SqliteDb> {
    let options = SqliteConnectOptions::from_str(uri).map_err(map_sqlx_error)?;
    let mut pool_options = SqlitePoolOptions::new();
    if is_in_memory(uri) {
        pool_options = pool_options.min_connections(1).idle_timeout(None).max_lifetime(None);
    }
    let pool = pool_options
        .connect_with(options.create_if_missing(true))
        .await
        .map_err(map_sqlx_error)?;
    Ok(PooledDb::from_pool(pool))
}

/// Runs all the statements in `schema` as a single batch.
pub async fn run_schema(ex: &mut SqliteExecutor, schema: &str) -> DbResult<()> {
    sqlx::raw_sql(schema).execute(ex.conn()).await.map_err(map_sqlx_error).map(|_| ())
}

/// Helpers to test against SQLite.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Opens a fresh in-memory database.
    pub async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        connect(":memory:").await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use super::*;
    use crate::db::Db;
    use crate::db::tests::generate_db_tests;
    use std::sync::Arc;

    generate_db_tests!(Arc::new(setup().await));

    /// Same tests as above, carrying an attribute the way the PostgreSQL ones do.
    mod tagged {
        use super::*;

        generate_db_tests!(Arc::new(setup().await), #[cfg_attr(miri, ignore)]);
    }

    /// Opens a database with a `gates` table that already holds gate `B12`.
    async fn setup_with_gates() -> (SqliteDb, SqliteExecutor) {
        let db = setup().await;
        let mut ex = db.typed_ex().await.unwrap();
        run_schema(
            &mut ex,
            "CREATE TABLE gates (code TEXT UNIQUE NOT NULL); INSERT INTO gates VALUES ('B12');",
        )
        .await
        .unwrap();
        (db, ex)
    }

    #[tokio::test]
    async fn test_unique_violation_is_already_exists() {
        let (db, mut ex) = setup_with_gates().await;

        let err = sqlx::query("INSERT INTO gates VALUES ('B12')")
            .execute(ex.conn())
            .await
            .map_err(map_sqlx_error)
            .unwrap_err();
        match err {
            DbError::AlreadyExists(msg) => {
                assert!(msg.contains("gates.code"), "Bad message: {}", msg)
            }
            e => panic!("Unexpected error: {:?}", e),
        }

        drop(ex);
        db.close().await;
    }

    #[tokio::test]
    async fn test_missing_row_is_not_found() {
        let (db, mut ex) = setup_with_gates().await;

        let err = sqlx::query("SELECT code FROM gates WHERE code = 'C1'")
            .fetch_one(ex.conn())
            .await
            .map_err(map_sqlx_error)
            .err()
            .unwrap();
        assert_eq!(DbError::NotFound, err);

        drop(ex);
        db.close().await;
    }

    #[tokio::test]
    async fn test_unknown_table_is_backend_error() {
        let (db, mut ex) = setup_with_gates().await;

        let err = sqlx::query("DELETE FROM terminals")
            .execute(ex.conn())
            .await
            .map_err(map_sqlx_error)
            .unwrap_err();
        match err {
            DbError::BackendError(msg) => {
                assert!(msg.contains("terminals"), "Bad message: {}", msg)
            }
            e => panic!("Unexpected error: {:?}", e),
        }

        drop(ex);
        db.close().await;
    }

    #[test]
    fn test_is_in_memory() {
        assert!(is_in_memory(":memory:"));
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("file:cities?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://var/airbase.db"));
        assert!(!is_in_memory("/var/lib/airbase/memory.db"));
    }

    #[tokio::test]
    async fn test_in_memory_pool_keeps_a_connection() {
        let db = setup().await;

        let options = db.pool.options();
        assert_eq!(1, options.get_min_connections());
        assert_eq!(None, options.get_idle_timeout());
        assert_eq!(None, options.get_max_lifetime());

        db.close().await;
    }

    #[tokio::test]
    async fn test_file_pool_uses_defaults() {
        let dir = std::env::temp_dir().join(format!("airbase-sqlite-pool-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pool.db");

        let db = connect(path.to_str().unwrap()).await.unwrap();
        assert_eq!(0, db.pool.options().get_min_connections());
        assert!(db.pool.options().get_idle_timeout().is_some());
        db.close().await;

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_connect_creates_missing_file() {
        let dir = std::env::temp_dir().join(format!("airbase-sqlite-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("new.db");
        let _ = std::fs::remove_file(&path);

        let db = connect(path.to_str().unwrap()).await.unwrap();
        run_schema(&mut db.typed_ex().await.unwrap(), "CREATE TABLE t (x INTEGER)").await.unwrap();
        db.close().await;

        assert!(path.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
