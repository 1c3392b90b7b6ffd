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

//! Test utilities for the REST API.

use crate::db;
use crate::driver::testutils::TestContext as DriverContext;
use crate::model::*;
use crate::rest::app;
use airbase_core::db::DbError;
use axum::Router;

/// A `Router` for the service backed by a fresh in-memory database.
pub(crate) struct TestContext {
    /// Access to the database behind the app.
    driver: DriverContext,

    /// The app under test.
    app: Router,
}

impl TestContext {
    /// Creates the database and the app that serves it.
    pub(crate) async fn setup() -> Self {
        let driver = DriverContext::setup().await;
        let app = app(driver.driver());
        Self { driver, app }
    }

    /// Returns a copy of the app to send a request to.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Discards the context and keeps only the app.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Stores a city directly in the database.
    pub(crate) async fn create_city(
        &self,
        city_name: &'static str,
        airport_name: &'static str,
    ) -> City {
        let mut ex = self.driver.ex().await;
        db::create_city(&mut ex, CityName::from(city_name), AirportName::from(airport_name))
            .await
            .unwrap()
    }

    /// Reads a city directly from the database, if it exists.
    pub(crate) async fn get_city(&self, id: CityId) -> Option<City> {
        match db::get_city(&mut self.driver.ex().await, id).await {
            Ok(city) => Some(city),
            Err(DbError::NotFound) => None,
            Err(e) => panic!("Failed to get city {:?}: {:?}", id, e),
        }
    }

    /// Counts the cities stored in the database.
    pub(crate) async fn count_cities(&self) -> usize {
        db::count_cities(&mut self.driver.ex().await).await.unwrap()
    }
}
