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

//! Business logic for the service.

use airbase_core::db::{Db, DbError};
use airbase_core::driver::DriverError;
use log::warn;
use std::sync::Arc;

mod cities;
mod city;
#[cfg(test)]
pub(crate) mod testutils;

/// Message returned to the caller when a city does not exist.
const CITY_NOT_FOUND: &str = "City not found";

/// Business logic.
///
/// The public operations exposed by the driver are all "one shot": they start and commit a
/// transaction, so it's incorrect for the caller to use two separate calls.  For this reason,
/// these operations consume the driver in an attempt to minimize the possibility of executing
/// two operations.
#[derive(Clone)]
pub(crate) struct Driver {
    /// The database that the driver uses for persistence.
    db: Arc<dyn Db + Send + Sync>,
}

impl Driver {
    /// Creates a new driver backed by the given injected components.
    pub(crate) fn new(db: Arc<dyn Db + Send + Sync>) -> Self {
        Self { db }
    }
}

/// Translates a database error `e` that happened while doing `what` with one or more cities.
///
/// Errors that carry no meaning to the caller are logged and reported as backend errors prefixed
/// by `what`.
fn map_city_error(what: &str, e: DbError) -> DriverError {
    match e {
        DbError::AlreadyExists(msg) => {
            DriverError::AlreadyExists(format!("City or airport already exists: {}", msg))
        }
        DbError::NotFound => DriverError::NotFound(CITY_NOT_FOUND.to_owned()),
        DbError::BackendError(msg) | DbError::DataIntegrityError(msg) => {
            warn!("{}: {}", what, msg);
            DriverError::BackendError(format!("{}: {}", what, msg))
        }
        e @ DbError::Unavailable => {
            warn!("{}: {}", what, e);
            DriverError::BackendError(format!("{}: {}", what, e))
        }
    }
}
