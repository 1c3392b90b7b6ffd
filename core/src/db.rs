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

//! Database access shared by all services.
//!
//! Services enable the backends they want through the `postgres` and `sqlite` features and write
//! their queries against `Executor`.  Each variant of `Executor` carries a connection typed for
//! its backend, which lets `sqlx` check the types of the bound parameters and decoded rows.
//!
//! A request obtains its own handle to the database: a pooled connection from `Db::ex` when
//! statements can run independently, or a transaction from `Db::begin` when they must be applied
//! together.  A transaction that is dropped before `TxExecutor::commit` is rolled back, so
//! returning early with `?` discards any partial writes.

use crate::model::ModelError;
use async_trait::async_trait;
use log::warn;
use sqlx::error::DatabaseError;
use sqlx::pool::PoolConnection;
use sqlx::{Database, Pool, Transaction};

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Failures reported by the database layer.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// A write was rejected by a uniqueness or reference constraint.  Carries the message reported
    /// by the database.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Anything we do not know how to classify.
    #[error("Database error: {0}")]
    BackendError(String),

    /// Data stored in the database could not be converted to our types.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    /// The row being read or modified does not exist.
    #[error("Entity not found")]
    NotFound,

    /// No connection could be obtained in time.
    #[error("Unavailable")]
    Unavailable,
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::DataIntegrityError(e.to_string())
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Verifies that a statement meant to modify a single existing row did exactly that.
///
/// Zero affected rows means that the row did not exist.
pub fn ensure_one_row(rows_affected: u64) -> DbResult<()> {
    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        n => Err(DbError::BackendError(format!("Expected to affect one row but affected {}", n))),
    }
}

/// Converts an `sqlx` error into a `DbError`.
///
/// Errors raised by the database server are first handed to `classify`, which knows how to read
/// the codes of a specific backend.  Whatever it does not recognize becomes a `BackendError`.
pub(crate) fn classify_sqlx_error(
    e: sqlx::Error,
    classify: fn(&dyn DatabaseError) -> Option<DbError>,
) -> DbError {
    match e {
        sqlx::Error::Database(e) => {
            classify(e.as_ref()).unwrap_or_else(|| DbError::BackendError(e.to_string()))
        }
        sqlx::Error::ColumnDecode { source, .. } => DbError::DataIntegrityError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        sqlx::Error::PoolTimedOut => DbError::Unavailable,
        e => DbError::BackendError(e.to_string()),
    }
}

/// A connection to a specific backend, either taken from the pool or inside a transaction.
#[derive(Debug)]
pub enum BackendExecutor<DB: Database> {
    /// A pooled connection in autocommit mode.
    Direct(PoolConnection<DB>),

    /// A connection with an open transaction.
    InTx(Transaction<'static, DB>),
}

impl<DB: Database> BackendExecutor<DB> {
    /// Returns the raw connection to pass to `sqlx` queries.
    pub fn conn(&mut self) -> &mut DB::Connection {
        match self {
            BackendExecutor::Direct(conn) => &mut **conn,
            BackendExecutor::InTx(tx) => &mut **tx,
        }
    }

    /// Commits the open transaction, if any.  Direct connections have nothing to commit.
    async fn commit(self) -> Result<(), sqlx::Error> {
        match self {
            BackendExecutor::Direct(_) => Ok(()),
            BackendExecutor::InTx(tx) => tx.commit().await,
        }
    }
}

/// Database executor for any of the enabled backends.
///
/// Callers match on the variant to issue SQL in the dialect of the backend.
pub enum Executor {
    /// PostgreSQL connection.
    #[cfg(feature = "postgres")]
    Postgres(postgres::PostgresExecutor),

    /// SQLite connection.
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteExecutor),
}

/// An `Executor` with an open transaction.  Dropping it without calling `commit` rolls back.
pub struct TxExecutor {
    ex: Executor,
}

impl TxExecutor {
    /// Gives access to the executor running the transaction.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.ex
    }

    /// Commits the transaction.
    pub async fn commit(self) -> DbResult<()> {
        match self.ex {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => ex.commit().await.map_err(postgres::map_sqlx_error),

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => ex.commit().await.map_err(sqlite::map_sqlx_error),
        }
    }
}

/// Handle to a database shared by all requests of a service.
#[async_trait]
pub trait Db {
    /// Takes a connection from the pool to run statements outside of a transaction.
    async fn ex(&self) -> DbResult<Executor>;

    /// Opens a transaction.  The caller must `commit` it for its writes to persist.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Closes the pool once all outstanding connections have been returned to it.
    async fn close(&self);
}

/// A `Db` backed by an `sqlx` connection pool.
pub struct PooledDb<DB: Database> {
    pool: Pool<DB>,
}

impl<DB: Database> PooledDb<DB> {
    /// Takes ownership of an already-configured `pool`.
    pub(crate) fn from_pool(pool: Pool<DB>) -> Self {
        Self { pool }
    }

    /// Takes a connection from the pool typed for this backend.
    pub async fn typed_ex(&self) -> Result<BackendExecutor<DB>, sqlx::Error> {
        Ok(BackendExecutor::Direct(self.pool.acquire().await?))
    }
}

impl<DB: Database> Drop for PooledDb<DB> {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("Dropping {} pool without having called close() first", DB::NAME);
        }
    }
}

/// Implements `Db` for the `PooledDb` of the `$db` backend.
///
/// `$variant` is the `Executor` variant that wraps connections of this backend and `$map_err` is
/// the function that converts its `sqlx` errors.
#[cfg(any(feature = "postgres", feature = "sqlite"))]
macro_rules! impl_pooled_db [
    ( $db:ty, $variant:path, $map_err:path ) => {
        #[async_trait::async_trait]
        impl $crate::db::Db for $crate::db::PooledDb<$db> {
            async fn ex(&self) -> $crate::db::DbResult<$crate::db::Executor> {
                let conn = self.pool.acquire().await.map_err($map_err)?;
                Ok($variant($crate::db::BackendExecutor::Direct(conn)))
            }

            async fn begin(&self) -> $crate::db::DbResult<$crate::db::TxExecutor> {
                let tx = self.pool.begin().await.map_err($map_err)?;
                Ok($crate::db::TxExecutor { ex: $variant($crate::db::BackendExecutor::InTx(tx)) })
            }

            async fn close(&self) {
                self.pool.close().await;
            }
        }
    }
];

#[cfg(any(feature = "postgres", feature = "sqlite"))]
pub(crate) use impl_pooled_db;

/// Helpers to run the same tests against every backend.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    pub use paste::paste;

    /// Defines one `#[tokio::test]` per `name` that calls `module::name` with the database
    /// produced by `setup`.
    ///
    /// `setup` is evaluated anew for every test.  An optional leading attribute, such as
    /// `#[ignore]`, is applied to all the generated tests.
    ///
    /// ```ignore
    /// generate_tests!(#[ignore] setup().await => crate::db::tests { test_one, test_two });
    /// ```
    #[macro_export]
    macro_rules! generate_tests [
        ( #[$extra:meta] $setup:expr => $module:path { $( $name:ident ),+ $(,)? } ) => {
            $(
                #[tokio::test]
                #[$extra]
                async fn $name() {
                    $crate::db::testutils::paste! {
                        $module :: [< $name >]($setup).await;
                    }
                }
            )+
        };

        ( $setup:expr => $module:path { $( $name:ident ),+ $(,)? } ) => {
            $(
                #[tokio::test]
                async fn $name() {
                    $crate::db::testutils::paste! {
                        $module :: [< $name >]($setup).await;
                    }
                }
            )+
        };
    ];

    pub use generate_tests;
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_ensure_one_row() {
        assert_eq!(Err(DbError::NotFound), ensure_one_row(0));
        assert_eq!(Ok(()), ensure_one_row(1));
        assert_eq!(
            Err(DbError::BackendError("Expected to affect one row but affected 7".to_owned())),
            ensure_one_row(7)
        );
    }

    #[test]
    fn test_model_error_is_integrity_error() {
        assert_eq!(
            DbError::DataIntegrityError("Name cannot be empty".to_owned()),
            DbError::from(ModelError("Name cannot be empty".to_owned()))
        );
    }

    #[test]
    fn test_classify_sqlx_error_without_database_error() {
        fn never(_: &dyn DatabaseError) -> Option<DbError> {
            panic!("Must not be called for errors not raised by the server");
        }

        assert_eq!(DbError::NotFound, classify_sqlx_error(sqlx::Error::RowNotFound, never));
        assert_eq!(DbError::Unavailable, classify_sqlx_error(sqlx::Error::PoolTimedOut, never));
        match classify_sqlx_error(sqlx::Error::Protocol("garbled".to_owned()), never) {
            DbError::BackendError(msg) => assert!(msg.contains("garbled"), "Bad message: {}", msg),
            e => panic!("Unexpected error: {:?}", e),
        }
    }
}
