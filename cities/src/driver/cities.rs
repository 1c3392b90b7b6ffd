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

//! Operations on the collection of cities.

use crate::db;
use crate::driver::{Driver, map_city_error};
use crate::model::{AirportName, City, CityName};
use airbase_core::driver::DriverResult;

impl Driver {
    /// Creates a new city named `city_name` that is served by `airport_name`.
    pub(crate) async fn create_city(
        self,
        city_name: CityName,
        airport_name: AirportName,
    ) -> DriverResult<City> {
        let what = "Failed to create city";
        let mut tx = self.db.begin().await.map_err(|e| map_city_error(what, e))?;
        let city = db::create_city(tx.ex(), city_name, airport_name)
            .await
            .map_err(|e| map_city_error(what, e))?;
        tx.commit().await.map_err(|e| map_city_error(what, e))?;
        Ok(city)
    }

    /// Gets a list of all existing cities.
    pub(crate) async fn get_cities(self) -> DriverResult<Vec<City>> {
        let what = "Failed to get cities";
        let mut ex = self.db.ex().await.map_err(|e| map_city_error(what, e))?;
        let cities = db::get_cities(&mut ex).await.map_err(|e| map_city_error(what, e))?;
        Ok(cities)
    }
}
