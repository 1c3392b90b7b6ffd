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

//! Test utilities for the business layer.

use crate::db;
use crate::driver::Driver;
use airbase_core::db::{Db, Executor};
use std::sync::Arc;

/// An in-memory database with the schema in place and a `Driver` backed by it.
pub(crate) struct TestContext {
    /// Database shared with `driver`, for direct inspection.
    db: Arc<dyn Db + Send + Sync>,

    /// Driver under test.
    driver: Driver,
}

impl TestContext {
    /// Creates a fresh database and its driver.
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> =
            Arc::new(airbase_core::db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        Self { driver: Driver::new(db.clone()), db }
    }

    /// Takes a connection to query the database behind the driver's back.
    pub(crate) async fn ex(&self) -> Executor {
        self.db.ex().await.unwrap()
    }

    /// Returns a handle to the driver, which is consumed by every operation.
    pub(crate) fn driver(&self) -> Driver {
        self.driver.clone()
    }
}
